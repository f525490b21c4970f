//! Parser for queue listings (`queue show` / `queue show <id>`).
//!
//! ```text
//! Q1 has 3 calls (max unlimited) in 'rrmemory' strategy (12s holdtime, 95s talktime), W:0, C:41, A:3, SL:0.0% within 0s
//!    Members:
//!       Ana Ruiz (SIP/3001) (ringinuse disabled) (dynamic) (Not in use) has taken 4 calls (last was 120 secs ago) (login was 3600 secs ago)
//!       Ana Ruiz (SIP/3001) (ringinuse disabled) (dynamic) (paused:Lunch was 60 secs ago) (Not in use) has taken 4 calls
//!       SIP/3002 (ringinuse disabled) (Unavailable) has taken no calls yet
//!    Callers:
//!       1. SIP/trunk-00000012 (wait: 0:10, prio: 0)
//! ```
//!
//! Each queue block runs a small state machine (`Header` → `InMembers` →
//! `Done`). Anything the machine does not recognise is skipped line by line;
//! a block without a `Members:` marker simply yields no members.

use std::collections::HashMap;

use tracing::debug;

use crate::correlate::agents::resolve_state;
use crate::model::{ActivityState, EffectiveState, QueueMembershipRecord, QueueSummary};
use crate::parser::scan::{
    contains_ignore_case, find_ignore_case, interface_extension, paren_groups, queue_header, secs_ago,
    starts_with_ignore_case,
};

const MEMBERS_MARKER: &str = "members:";
const TERMINAL_MARKERS: [&str; 2] = ["callers:", "no callers"];
const PAUSE_MARKER: &str = "paused:";

/// One queue's worth of parsed listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueBlock {
    pub queue_id: String,
    pub calls_waiting: u64,
    pub members: Vec<QueueMembershipRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Header,
    InMembers,
    Done,
}

/// Block being filled; `implicit` when opened by the queue hint, not a header
struct OpenBlock {
    block: QueueBlock,
    state: BlockState,
    implicit: bool,
}

/// Parse a listing into queue blocks, in input order.
///
/// Blocks start at each `<queue> has N calls` header. Lines before the first
/// header are attributed to `queue_hint` (the queue the command was issued
/// for), or to an empty queue id when there is none. When that implicit block
/// is still empty at the first header, the header takes it over instead of
/// opening a second block for the same queue. A trailing implicit block with
/// neither members nor a queue id is dropped.
pub fn parse_queue_listing(text: &str, queue_hint: Option<&str>, technology_prefix: &str) -> Vec<QueueBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<OpenBlock> = None;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some((queue_id, calls)) = queue_header(line) {
            match current.take() {
                Some(open) if open.implicit && open.block.members.is_empty() => {}
                Some(open) => blocks.push(open.block),
                None => {}
            }
            current = Some(OpenBlock {
                block: QueueBlock {
                    queue_id: queue_id.to_string(),
                    calls_waiting: calls,
                    members: Vec::new(),
                },
                state: BlockState::Header,
                implicit: false,
            });
            continue;
        }

        let open = current.get_or_insert_with(|| OpenBlock {
            block: QueueBlock {
                queue_id: queue_hint.unwrap_or_default().to_string(),
                ..Default::default()
            },
            state: BlockState::Header,
            implicit: true,
        });

        match open.state {
            BlockState::Header => {
                if starts_with_ignore_case(line, MEMBERS_MARKER) {
                    open.state = BlockState::InMembers;
                }
            }
            BlockState::InMembers => {
                if TERMINAL_MARKERS.iter().any(|marker| starts_with_ignore_case(line, marker)) {
                    open.state = BlockState::Done;
                } else if let Some(record) = parse_member_line(line, &open.block.queue_id, technology_prefix) {
                    open.block.members.push(record);
                } else {
                    debug!("⏭️ Skipping unrecognised member line in {}: {}", open.block.queue_id, line);
                }
            }
            BlockState::Done => {}
        }
    }

    if let Some(open) = current {
        if !(open.implicit && open.block.members.is_empty() && open.block.queue_id.is_empty()) {
            blocks.push(open.block);
        }
    }

    debug!(
        "📋 Parsed {} queue blocks with {} member lines",
        blocks.len(),
        blocks.iter().map(|b| b.members.len()).sum::<usize>()
    );
    blocks
}

/// Flatten blocks into membership records
pub fn memberships(blocks: &[QueueBlock]) -> impl Iterator<Item = &QueueMembershipRecord> {
    blocks.iter().flat_map(|block| block.members.iter())
}

/// Parse one member entry. `None` when the line names no `<prefix><digits>` interface.
pub fn parse_member_line(line: &str, queue_id: &str, technology_prefix: &str) -> Option<QueueMembershipRecord> {
    let extension = interface_extension(line, technology_prefix)?;
    let notes = annotations(line, technology_prefix);
    let (paused, pause_reason) = pause_annotation(&notes);

    Some(QueueMembershipRecord {
        extension: extension.to_string(),
        display_name: display_name(line, extension, technology_prefix),
        queue_id: queue_id.to_string(),
        activity_state: activity_of(&notes),
        paused,
        pause_reason,
        login_age_seconds: secs_ago(line, "login"),
        last_call_age_seconds: secs_ago(line, "last"),
    })
}

/// Parenthesized annotations following the `(<prefix>...)` interface group.
/// A line that starts with the bare interface has no display name, so all of
/// its groups count.
fn annotations<'a>(line: &'a str, technology_prefix: &str) -> Vec<&'a str> {
    let groups = paren_groups(line);
    match groups.iter().position(|group| group.starts_with(technology_prefix)) {
        Some(interface) => groups[interface + 1..].to_vec(),
        None => groups,
    }
}

/// Member activity from the annotations of a line; keyword precedence, first
/// match wins. Display names never take part.
pub fn classify_activity(line: &str, technology_prefix: &str) -> ActivityState {
    activity_of(&annotations(line, technology_prefix))
}

fn activity_of(notes: &[&str]) -> ActivityState {
    let mentions = |keyword: &str| notes.iter().any(|note| contains_ignore_case(note, keyword));
    let reads = |keyword: &str| notes.iter().any(|note| note.trim().eq_ignore_ascii_case(keyword));

    if mentions("unavailable") {
        ActivityState::Unavailable
    } else if mentions("busy") || mentions("in call") || reads("in use") {
        ActivityState::Busy
    } else if mentions("on hold") {
        ActivityState::OnHold
    } else if mentions("ringing") {
        ActivityState::Ringing
    } else if mentions("not in use") {
        ActivityState::Available
    } else {
        ActivityState::Unknown
    }
}

fn pause_annotation(notes: &[&str]) -> (bool, Option<String>) {
    for note in notes {
        if starts_with_ignore_case(note, PAUSE_MARKER) {
            let reason = &note[PAUSE_MARKER.len()..];
            let reason = match find_ignore_case(reason, " was ") {
                Some(cut) => &reason[..cut],
                None => reason,
            }
            .trim();
            return (true, (!reason.is_empty()).then(|| reason.to_string()));
        }
        if note.trim().eq_ignore_ascii_case("paused") {
            return (true, None);
        }
    }
    (false, None)
}

fn display_name(line: &str, extension: &str, technology_prefix: &str) -> String {
    let marker = format!("({}", technology_prefix);
    match line.find(&marker) {
        Some(index) if index > 0 => line[..index].trim().to_string(),
        _ => extension.to_string(),
    }
}

impl QueueBlock {
    /// Counters over the distinct extensions of this queue. Each extension is
    /// resolved with the agent priority rule restricted to this queue.
    pub fn summary(&self) -> QueueSummary {
        let mut order: Vec<&str> = Vec::new();
        let mut by_extension: HashMap<&str, Vec<&QueueMembershipRecord>> = HashMap::new();
        for record in &self.members {
            let entry = by_extension.entry(record.extension.as_str()).or_default();
            if entry.is_empty() {
                order.push(record.extension.as_str());
            }
            entry.push(record);
        }

        let mut summary = QueueSummary {
            queue_id: self.queue_id.clone(),
            calls_waiting: self.calls_waiting,
            total_members: order.len(),
            ..Default::default()
        };

        for extension in order {
            let records = &by_extension[extension];
            if records.iter().all(|r| r.activity_state == ActivityState::Unavailable) {
                summary.unavailable_count += 1;
                continue;
            }
            match resolve_state(records.iter().copied()) {
                EffectiveState::Engaged => summary.busy_count += 1,
                EffectiveState::Paused => summary.paused_count += 1,
                EffectiveState::Available | EffectiveState::Unknown => summary.available_count += 1,
            }
        }

        summary
    }
}
