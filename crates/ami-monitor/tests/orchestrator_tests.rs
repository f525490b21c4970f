//! Integration tests for the query orchestrator
//!
//! A scripted control link stands in for the manager session so the whole
//! pipeline (normalize → parse → correlate → cache) runs against realistic
//! listings without a switch.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rvoip_ami_monitor::prelude::*;
use serde_json::json;

const QUEUE_Q17: &[&str] = &[
    "Q17 has 2 calls (max unlimited) in 'rrmemory' strategy (12s holdtime, 95s talktime), W:0, C:41, A:3, SL:0.0% within 0s",
    "   Members: ",
    "      Ana Ruiz (SIP/3001) (ringinuse disabled) (dynamic) (In use) has taken 4 calls (last was 30 secs ago) (login was 3600 secs ago)",
    "      Luis (SIP/3002) (dynamic) (paused:Break was 60 secs ago) (Not in use) has taken 1 calls",
    "      SIP/3004 (Unavailable) has taken no calls yet",
    "   Callers: ",
    "      1. SIP/trunk-0000000a (wait: 0:10, prio: 0)",
    "      2. SIP/trunk-0000000c (wait: 0:05, prio: 0)",
];

const QUEUE_Q18: &str = "Q18 has 0 calls (max unlimited) in 'ringall' strategy\r\n   Members: \r\n      Ana Ruiz (SIP/3001) (dynamic) (Not in use) has taken 0 calls\r\n      Eva (SIP/3003) (dynamic) (Ringing)\r\n   No Callers\r\n";

const CHANNELS: &[&str] = &[
    "Channel              Context     Extension Prio State   Application Data            CallerID Duration Accountcode PeerAccount BridgeID",
    "SIP/3001-0000000b    from-queue  s         1    Up      AppQueue    (Outgoing Line) 3001     00:02:00 3001        b7",
    "SIP/trunk-0000000a   from-trunk  s         1    Up      Queue       Q17,t           555      00:02:05 3001        b7",
    "SIP/3003-0000000d    macro-dial  s         1    Ringing Dial        SIP/3003,30     3003     00:00:04 3003        (None)",
    "3 active channels",
    "2 active calls",
];

const PEERS: &str = "Name/username   Host           Dyn Port  Status\n3001/3001       10.0.0.5       D   5060  OK (4 ms)\n3002/3002       (Unspecified)  D   0     UNKNOWN\n3003/3003       10.0.0.7       D   5060  OK (9 ms)\n3 sip peers [Monitored: 2 online, 1 offline]";

/// Control link answering from canned replies and recording every command
#[derive(Default)]
struct ScriptedLink {
    replies: HashMap<String, AmiReply>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedLink {
    fn reply(mut self, command: &str, reply: impl Into<AmiReply>) -> Self {
        self.replies.insert(command.to_string(), reply.into());
        self
    }

    fn fail(&self, command: &str) {
        self.failing.lock().insert(command.to_string());
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ControlLink for ScriptedLink {
    async fn invoke(&self, action: &str, params: &ActionParams) -> std::result::Result<AmiReply, LinkError> {
        assert_eq!(action, "Command");
        let command = params.get("command").cloned().unwrap_or_default();
        self.calls.lock().push(command.clone());

        // let concurrent callers interleave
        tokio::task::yield_now().await;

        if self.failing.lock().contains(&command) {
            return Err(LinkError::Timeout(command));
        }
        Ok(self.replies.get(&command).cloned().unwrap_or_else(AmiReply::empty))
    }
}

fn switch() -> ScriptedLink {
    let q17: Vec<String> = QUEUE_Q17.iter().map(|line| line.to_string()).collect();
    let combined = format!("{}\n{}", QUEUE_Q17.join("\n"), QUEUE_Q18);

    ScriptedLink::default()
        .reply("queue show Q17", json!({ "response": "Follows", "output": q17 }))
        .reply("queue show Q18", QUEUE_Q18)
        .reply("queue show", combined)
        .reply("core show channels verbose", json!({ "output": CHANNELS }))
        .reply("sip show peers", json!({ "response": "Success", "content": PEERS }))
}

fn config() -> MonitorConfig {
    let mut scopes = BTreeMap::new();
    scopes.insert("Soporte".to_string(), vec!["Q17".to_string(), "Q18".to_string()]);
    scopes.insert("Movil".to_string(), vec!["Q27".to_string()]);

    let mut config = MonitorConfig::default();
    config.scopes = scopes;
    config
}

fn orchestrator(
    link: ScriptedLink,
) -> (
    QueryOrchestrator<Arc<ScriptedLink>, Arc<ManualClock>>,
    Arc<ScriptedLink>,
    Arc<ManualClock>,
) {
    let link = Arc::new(link);
    let clock = Arc::new(ManualClock::default());
    let orchestrator = QueryOrchestrator::with_clock(link.clone(), config(), clock.clone());
    (orchestrator, link, clock)
}

#[tokio::test]
async fn test_scope_snapshot_aggregates_all_sources() {
    let (orchestrator, link, _clock) = orchestrator(switch());

    let served = orchestrator.scope_snapshot("Soporte").await.expect("snapshot failed");
    assert!(!served.cache);
    let snapshot = served.data;

    let mut issued = link.calls();
    issued.sort();
    assert_eq!(
        issued,
        ["core show channels verbose", "queue show Q17", "queue show Q18", "sip show peers"]
    );

    // 3004 is only ever Unavailable and drops out of the agent list
    let extensions: Vec<_> = snapshot.agents.iter().map(|a| a.extension.as_str()).collect();
    assert_eq!(extensions, ["3001", "3002", "3003"]);

    let ana = snapshot.agent("3001").unwrap();
    assert_eq!(ana.display_name, "Ana Ruiz");
    assert_eq!(ana.effective_state, EffectiveState::Engaged);
    assert_eq!(ana.queues, ["Q17", "Q18"]);
    assert_eq!(ana.registered, Some(true));
    assert_eq!(ana.ip_address.as_deref(), Some("10.0.0.5"));
    assert_eq!(ana.login_age_seconds, Some(3600));
    assert_eq!(ana.last_call_age_seconds, Some(30));
    let call = ana.active_call.as_ref().expect("Ana should be on a call");
    assert_eq!(call.channel, "SIP/3001-0000000b");
    assert_eq!(call.duration_seconds, Some(120));
    assert_eq!(call.peer_channel.as_deref(), Some("SIP/trunk-0000000a"));

    let luis = snapshot.agent("3002").unwrap();
    assert_eq!(luis.effective_state, EffectiveState::Paused);
    assert_eq!(luis.pause_reason.as_deref(), Some("Break"));
    assert_eq!(luis.registered, Some(false));
    assert_eq!(luis.ip_address, None);
    assert_eq!(luis.active_call, None);

    let eva = snapshot.agent("3003").unwrap();
    assert_eq!(eva.effective_state, EffectiveState::Engaged);
    assert_eq!(eva.active_call.as_ref().map(|c| c.channel.as_str()), Some("SIP/3003-0000000d"));
    assert_eq!(eva.active_call.as_ref().and_then(|c| c.peer_channel.clone()), None);

    assert_eq!(
        snapshot.totals,
        StateTotals {
            engaged: 2,
            paused: 1,
            available: 0,
            unknown: 0
        }
    );
    assert_eq!(snapshot.calls_waiting, 2);

    assert_eq!(
        snapshot.queues,
        vec![
            QueueSummary {
                queue_id: "Q17".to_string(),
                calls_waiting: 2,
                total_members: 3,
                busy_count: 1,
                available_count: 0,
                unavailable_count: 1,
                paused_count: 1,
            },
            QueueSummary {
                queue_id: "Q18".to_string(),
                calls_waiting: 0,
                total_members: 2,
                busy_count: 1,
                available_count: 1,
                unavailable_count: 0,
                paused_count: 0,
            },
        ]
    );

    assert_eq!(snapshot.call_pairs.len(), 1);
    assert!(snapshot.call_pairs[0].contains("SIP/3001-0000000b"));
    assert_eq!(snapshot.call_pairs[0].other("SIP/3001-0000000b"), Some("SIP/trunk-0000000a"));
}

#[tokio::test]
async fn test_cache_hit_within_ttl_then_refresh() {
    let (orchestrator, link, clock) = orchestrator(switch());

    let first = orchestrator.scope_snapshot("Soporte").await.unwrap();
    assert!(!first.cache);
    assert_eq!(link.call_count(), 4);

    clock.advance(Duration::from_secs(5));
    let second = orchestrator.scope_snapshot("Soporte").await.unwrap();
    assert!(second.cache);
    assert_eq!(second.data, first.data);
    assert_eq!(link.call_count(), 4);

    clock.advance(Duration::from_secs(5));
    let third = orchestrator.scope_snapshot("Soporte").await.unwrap();
    assert!(!third.cache);
    assert_eq!(link.call_count(), 8);
    assert!(third.data.captured_at > first.data.captured_at);
}

#[tokio::test]
async fn test_failed_source_fails_scope_and_keeps_cache() {
    let (orchestrator, link, clock) = orchestrator(switch());

    let first = orchestrator.scope_snapshot("Soporte").await.unwrap();
    clock.advance(Duration::from_secs(11));
    link.fail("queue show Q18");

    let err = orchestrator.scope_snapshot("Soporte").await.unwrap_err();
    assert!(err.is_unreachable());
    assert!(err.to_string().contains("queue show Q18"));

    // stale entry is still there for the caller to surface
    let stale = orchestrator.cached("Soporte").expect("previous snapshot kept");
    assert_eq!(stale.captured_at, first.data.captured_at);
    assert_eq!(*stale.snapshot, first.data);
}

#[tokio::test]
async fn test_unknown_scope_issues_no_commands() {
    let (orchestrator, link, _clock) = orchestrator(switch());

    let err = orchestrator.scope_snapshot("Ventas").await.unwrap_err();
    assert!(matches!(err, MonitorError::UnknownScope(ref scope) if scope == "Ventas"));
    assert_eq!(link.call_count(), 0);
}

#[tokio::test]
async fn test_all_empty_replies_is_no_data() {
    let (orchestrator, link, _clock) = orchestrator(ScriptedLink::default());

    let err = orchestrator.scope_snapshot("Movil").await.unwrap_err();
    assert!(matches!(err, MonitorError::NoData { ref scope } if scope == "Movil"));
    assert_eq!(link.call_count(), 3);
    assert!(orchestrator.cached("Movil").is_none());
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let (orchestrator, link, _clock) = orchestrator(switch());

    let (a, b) = tokio::join!(
        orchestrator.scope_snapshot("Soporte"),
        orchestrator.scope_snapshot("Soporte")
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(link.call_count(), 4);
    assert_eq!(a.data, b.data);
    assert_eq!([a.cache, b.cache].iter().filter(|cached| **cached).count(), 1);
}

#[tokio::test]
async fn test_calls_waiting_by_scope() {
    let (orchestrator, _link, _clock) = orchestrator(switch());

    let waiting = orchestrator.calls_waiting_by_scope().await.unwrap();
    let expected: BTreeMap<String, u64> = [("Movil".to_string(), 0), ("Soporte".to_string(), 2)].into();
    assert_eq!(waiting, expected);
}

#[tokio::test]
async fn test_extension_detail() {
    let (orchestrator, link, _clock) = orchestrator(switch());

    let detail = orchestrator.extension_detail("3001").await.unwrap();

    let mut issued = link.calls();
    issued.sort();
    assert_eq!(issued, ["core show channels verbose", "queue show", "sip show peers"]);

    assert_eq!(detail.status.extension, "3001");
    assert_eq!(detail.status.effective_state, EffectiveState::Engaged);
    assert_eq!(detail.status.queues, ["Q17", "Q18"]);
    assert_eq!(detail.status.registered, Some(true));

    let channels: Vec<_> = detail.channels.iter().map(|c| c.channel_name.as_str()).collect();
    assert_eq!(channels, ["SIP/3001-0000000b", "SIP/trunk-0000000a"]);

    assert_eq!(detail.member_lines.len(), 2);
    assert!(detail.member_lines.iter().all(|line| line.starts_with("Ana Ruiz (SIP/3001)")));

    // drill-down is never cached
    orchestrator.extension_detail("3001").await.unwrap();
    assert_eq!(link.call_count(), 6);
}

#[tokio::test]
async fn test_channel_queries() {
    let (orchestrator, _link, _clock) = orchestrator(switch());

    let candidates = orchestrator.hangup_candidates("3001").await.unwrap();
    assert_eq!(candidates, ["SIP/trunk-0000000a"]);
    assert!(orchestrator.hangup_candidates("3003").await.unwrap().is_empty());

    let eva = orchestrator.extension_channels("3003").await.unwrap();
    assert_eq!(eva.len(), 1);
    assert_eq!(eva[0].duration_seconds, Some(4));
    assert_eq!(eva[0].bridge_id, None);
}

#[tokio::test]
async fn test_served_snapshot_json_shape() {
    let (orchestrator, _link, _clock) = orchestrator(switch());
    orchestrator.scope_snapshot("Soporte").await.unwrap();
    let served = orchestrator.scope_snapshot("Soporte").await.unwrap();

    let value = serde_json::to_value(&served).unwrap();
    assert_eq!(value["cache"], json!(true));
    assert_eq!(value["scope"], json!("Soporte"));
    assert_eq!(value["callsWaiting"], json!(2));
    assert_eq!(value["agents"][0]["effectiveState"], json!("Engaged"));
    assert_eq!(value["agents"][1]["pauseReason"], json!("Break"));
}
