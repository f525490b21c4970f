//! Structured records extracted from the diagnostic command outputs, and the
//! per-agent / per-queue views built from them.
//!
//! Everything here is a plain value: produced by one request, never mutated
//! after construction, serialized in camelCase for the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One live call leg from the channel listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    pub channel_name: String,
    /// Account code (last-but-one column)
    pub extension: Option<String>,
    /// Peer account code (last column)
    pub peer_account: Option<String>,
    pub duration_seconds: Option<u64>,
    pub bridge_id: Option<String>,
    pub application: Option<String>,
}

impl ChannelRecord {
    /// True when either account column names the extension
    pub fn belongs_to(&self, extension: &str) -> bool {
        self.extension.as_deref() == Some(extension) || self.peer_account.as_deref() == Some(extension)
    }

    /// True when this is the extension's own leg, e.g. `SIP/3001-0000002a`
    pub fn is_leg_of(&self, extension: &str, technology_prefix: &str) -> bool {
        self.channel_name
            .strip_prefix(technology_prefix)
            .and_then(|rest| rest.strip_prefix(extension))
            .map_or(false, |rest| rest.starts_with('-'))
    }
}

/// Member activity as printed by the queue listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityState {
    Available,
    Busy,
    Ringing,
    OnHold,
    Unavailable,
    Unknown,
}

impl ActivityState {
    /// Busy, on hold or ringing
    pub fn is_engaged(self) -> bool {
        matches!(self, ActivityState::Busy | ActivityState::OnHold | ActivityState::Ringing)
    }
}

/// One member line of one queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMembershipRecord {
    pub extension: String,
    pub display_name: String,
    pub queue_id: String,
    pub activity_state: ActivityState,
    pub paused: bool,
    pub pause_reason: Option<String>,
    pub login_age_seconds: Option<u64>,
    pub last_call_age_seconds: Option<u64>,
}

/// Registration state of one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    pub extension: String,
    pub registered: bool,
    pub ip_address: Option<String>,
}

/// Two channels joined by the same bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPair {
    pub bridge_id: String,
    pub first: String,
    pub second: String,
}

impl CallPair {
    /// Unordered membership test
    pub fn contains(&self, channel_name: &str) -> bool {
        self.first == channel_name || self.second == channel_name
    }

    /// The other side of the pair
    pub fn other(&self, channel_name: &str) -> Option<&str> {
        if self.first == channel_name {
            Some(&self.second)
        } else if self.second == channel_name {
            Some(&self.first)
        } else {
            None
        }
    }
}

/// Resolved agent state, in descending priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectiveState {
    Engaged,
    Paused,
    Available,
    Unknown,
}

/// Call currently attached to an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCall {
    pub channel: String,
    pub duration_seconds: Option<u64>,
    pub peer_channel: Option<String>,
}

/// Correlated view of one extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub extension: String,
    pub display_name: String,
    /// `None` when no peer line was available for the extension
    pub registered: Option<bool>,
    pub ip_address: Option<String>,
    pub queues: Vec<String>,
    pub effective_state: EffectiveState,
    pub pause_reason: Option<String>,
    pub active_call: Option<ActiveCall>,
    pub login_age_seconds: Option<u64>,
    pub last_call_age_seconds: Option<u64>,
}

/// Per-queue counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    pub queue_id: String,
    pub calls_waiting: u64,
    pub total_members: usize,
    pub busy_count: usize,
    pub available_count: usize,
    pub unavailable_count: usize,
    pub paused_count: usize,
}

/// Agents per effective state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTotals {
    pub engaged: usize,
    pub paused: usize,
    pub available: usize,
    pub unknown: usize,
}

impl StateTotals {
    pub fn tally<'a>(agents: impl IntoIterator<Item = &'a AgentStatus>) -> Self {
        let mut totals = StateTotals::default();
        for agent in agents {
            match agent.effective_state {
                EffectiveState::Engaged => totals.engaged += 1,
                EffectiveState::Paused => totals.paused += 1,
                EffectiveState::Available => totals.available += 1,
                EffectiveState::Unknown => totals.unknown += 1,
            }
        }
        totals
    }
}

/// Aggregated result for one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSnapshot {
    pub scope: String,
    pub captured_at: DateTime<Utc>,
    pub agents: Vec<AgentStatus>,
    pub queues: Vec<QueueSummary>,
    pub totals: StateTotals,
    pub calls_waiting: u64,
    pub call_pairs: Vec<CallPair>,
}

impl ScopeSnapshot {
    pub fn agent(&self, extension: &str) -> Option<&AgentStatus> {
        self.agents.iter().find(|agent| agent.extension == extension)
    }
}

/// A response that may have come from the cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Served<T> {
    #[serde(flatten)]
    pub data: T,
    /// True when no command was issued to produce this response
    pub cache: bool,
}

impl<T> Served<T> {
    pub fn fresh(data: T) -> Self {
        Self { data, cache: false }
    }

    pub fn cached(data: T) -> Self {
        Self { data, cache: true }
    }
}

/// Everything known about one extension, straight from the switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDetail {
    pub status: AgentStatus,
    /// All channels that belong to the extension
    pub channels: Vec<ChannelRecord>,
    /// Raw queue lines mentioning the extension, for operator inspection
    pub member_lines: Vec<String>,
}
