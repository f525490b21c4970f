use std::collections::HashSet;

use crate::model::{CallPair, ChannelRecord};

/// Pair up channels that share a bridge id.
///
/// Each channel is paired with the first other channel (by listing order)
/// carrying the same bridge id and a different name. Pairs come out once, in
/// order of their first channel. Channels without a partner produce nothing.
pub fn correlate_bridges(channels: &[ChannelRecord]) -> Vec<CallPair> {
    let mut pairs = Vec::new();
    let mut paired: HashSet<&str> = HashSet::new();

    for channel in channels {
        if paired.contains(channel.channel_name.as_str()) {
            continue;
        }
        let Some(bridge_id) = channel.bridge_id.as_deref() else {
            continue;
        };
        let Some(partner) = find_partner(channels, channel, bridge_id) else {
            continue;
        };
        if paired.contains(partner.channel_name.as_str()) {
            continue;
        }

        paired.insert(&channel.channel_name);
        paired.insert(&partner.channel_name);
        pairs.push(CallPair {
            bridge_id: bridge_id.to_string(),
            first: channel.channel_name.clone(),
            second: partner.channel_name.clone(),
        });
    }

    pairs
}

/// Name of the channel bridged with `channel_name`, if any
pub fn partner_of<'a>(channels: &'a [ChannelRecord], channel_name: &str) -> Option<&'a str> {
    let channel = channels.iter().find(|c| c.channel_name == channel_name)?;
    let bridge_id = channel.bridge_id.as_deref()?;
    find_partner(channels, channel, bridge_id).map(|partner| partner.channel_name.as_str())
}

fn find_partner<'a>(channels: &'a [ChannelRecord], channel: &ChannelRecord, bridge_id: &str) -> Option<&'a ChannelRecord> {
    channels
        .iter()
        .find(|other| other.bridge_id.as_deref() == Some(bridge_id) && other.channel_name != channel.channel_name)
}
