//! Per-extension join of peer, queue and channel records.

use std::collections::HashMap;

use crate::correlate::bridge::partner_of;
use crate::model::{
    ActiveCall, ActivityState, AgentStatus, ChannelRecord, EffectiveState, PeerRecord, QueueMembershipRecord,
};
use crate::parser::PeerTable;

/// Resolve one state out of any number of membership records.
///
/// Engaged (busy, on hold, ringing) beats paused, paused beats available,
/// available beats unknown. Unavailable records are configured-but-offline
/// members and take no part. The result does not depend on record order.
pub fn resolve_state<'a>(records: impl IntoIterator<Item = &'a QueueMembershipRecord>) -> EffectiveState {
    let mut engaged = false;
    let mut paused = false;
    let mut available = false;

    for record in records {
        if record.activity_state == ActivityState::Unavailable {
            continue;
        }
        engaged |= record.activity_state.is_engaged();
        paused |= record.paused;
        available |= record.activity_state == ActivityState::Available;
    }

    if engaged {
        EffectiveState::Engaged
    } else if paused {
        EffectiveState::Paused
    } else if available {
        EffectiveState::Available
    } else {
        EffectiveState::Unknown
    }
}

/// Build the status of one extension from its records.
///
/// `memberships` may contain records of other extensions; only the ones for
/// `extension` are used. `channels` is the full snapshot so bridge partners
/// can be found.
pub fn aggregate_agent<'a>(
    extension: &str,
    peer: Option<&PeerRecord>,
    memberships: impl IntoIterator<Item = &'a QueueMembershipRecord>,
    channels: &[ChannelRecord],
    technology_prefix: &str,
) -> AgentStatus {
    let records: Vec<&QueueMembershipRecord> = memberships
        .into_iter()
        .filter(|record| record.extension == extension)
        .collect();

    let mut queues: Vec<String> = Vec::new();
    for record in &records {
        if !queues.contains(&record.queue_id) {
            queues.push(record.queue_id.clone());
        }
    }

    let display_name = records
        .iter()
        .filter(|record| !record.paused)
        .chain(records.iter())
        .map(|record| record.display_name.as_str())
        .find(|name| !name.is_empty() && *name != extension)
        .unwrap_or(extension)
        .to_string();

    AgentStatus {
        extension: extension.to_string(),
        display_name,
        registered: peer.map(|peer| peer.registered),
        ip_address: peer.and_then(|peer| peer.ip_address.clone()),
        queues,
        effective_state: resolve_state(records.iter().copied()),
        pause_reason: records.iter().find_map(|record| record.pause_reason.clone()),
        active_call: active_call(extension, channels, technology_prefix),
        login_age_seconds: records.iter().find_map(|record| record.login_age_seconds),
        last_call_age_seconds: records.iter().find_map(|record| record.last_call_age_seconds),
    }
}

/// The extension's own leg when present, otherwise any channel billed to it
fn active_call(extension: &str, channels: &[ChannelRecord], technology_prefix: &str) -> Option<ActiveCall> {
    let channel = channels
        .iter()
        .find(|channel| channel.is_leg_of(extension, technology_prefix))
        .or_else(|| channels.iter().find(|channel| channel.belongs_to(extension)))?;

    Some(ActiveCall {
        channel: channel.channel_name.clone(),
        duration_seconds: channel.duration_seconds,
        peer_channel: partner_of(channels, &channel.channel_name).map(str::to_string),
    })
}

/// Statuses for every extension with at least one usable membership record,
/// in order of first appearance.
pub fn aggregate_agents(
    peers: &PeerTable,
    memberships: &[QueueMembershipRecord],
    channels: &[ChannelRecord],
    technology_prefix: &str,
) -> Vec<AgentStatus> {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&QueueMembershipRecord>> = HashMap::new();

    for record in memberships {
        let group = grouped.entry(record.extension.as_str()).or_default();
        if group.is_empty() {
            order.push(record.extension.as_str());
        }
        group.push(record);
    }

    order
        .into_iter()
        .filter(|extension| {
            grouped[extension]
                .iter()
                .any(|record| record.activity_state != ActivityState::Unavailable)
        })
        .map(|extension| {
            aggregate_agent(
                extension,
                peers.get(extension),
                grouped[extension].iter().copied(),
                channels,
                technology_prefix,
            )
        })
        .collect()
}
