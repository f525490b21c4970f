//! Parser for the verbose channel listing (`core show channels verbose`).
//!
//! ```text
//! Channel              Context        Extension  Prio State  Application  Data   CallerID  Duration  Accountcode PeerAccount BridgeID
//! SIP/2020-00000001    from-queue     3001       1    Up     Queue        Q1,t   5551234   00:01:23  2020        2020        b1
//! ```
//!
//! Columns are whitespace separated and several of them may be empty, so only
//! the positions that hold up in practice are used: the first column, the
//! trailing account / bridge columns and the application at index 5.

use tracing::debug;

use crate::model::ChannelRecord;
use crate::parser::scan::find_duration;

/// Column of the dialplan application
const APPLICATION_COLUMN: usize = 5;

/// Minimum tokens for a line to carry the trailing account columns
const MIN_TOKENS: usize = 2;

/// Placeholder values the switch prints for empty columns
const EMPTY_MARKERS: [&str; 3] = ["(None)", "<none>", "<unknown>"];

/// Parse every channel line of the listing, in input order
pub fn parse_channels(text: &str, technology_prefix: &str) -> Vec<ChannelRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if !line.starts_with(technology_prefix) {
            continue;
        }
        match parse_channel_line(line) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    debug!("📡 Parsed {} channels ({} short lines skipped)", records.len(), skipped);
    records
}

/// Parse one channel line. `None` when it is too short to carry the account columns.
pub fn parse_channel_line(line: &str) -> Option<ChannelRecord> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return None;
    }

    let last = tokens[tokens.len() - 1];
    let account = tokens[tokens.len() - 2];

    Some(ChannelRecord {
        channel_name: tokens[0].to_string(),
        extension: column(account),
        peer_account: column(last),
        duration_seconds: find_duration(tokens.iter().copied()),
        bridge_id: column(last),
        application: tokens.get(APPLICATION_COLUMN).and_then(|token| column(token)),
    })
}

fn column(token: &str) -> Option<String> {
    if token.is_empty() || EMPTY_MARKERS.contains(&token) {
        None
    } else {
        Some(token.to_string())
    }
}

/// Channels belonging to an extension, in listing order
pub fn channels_for<'a>(channels: &'a [ChannelRecord], extension: &str) -> Vec<&'a ChannelRecord> {
    channels.iter().filter(|channel| channel.belongs_to(extension)).collect()
}

/// Channels left behind by the queue connector for an extension: the account
/// code is the agent's and the application is still the queue. These are the
/// legs an operator hangs up to free a stuck agent.
pub fn hangup_candidates(channels: &[ChannelRecord], extension: &str, queue_application: &str) -> Vec<String> {
    channels
        .iter()
        .filter(|channel| channel.extension.as_deref() == Some(extension))
        .filter(|channel| channel.application.as_deref() == Some(queue_application))
        .map(|channel| channel.channel_name.clone())
        .collect()
}
