//! Text-to-record extraction for the three diagnostic listings.
//!
//! All parsers are pure functions over normalized text (see
//! [`crate::ami::normalize`]). They never fail: unrecognised lines are skipped
//! and a listing without the expected markers produces an empty record set.
//! Output order always follows input line order.

pub mod channels;
pub mod peers;
pub mod queues;
pub mod scan;

pub use channels::{channels_for, hangup_candidates, parse_channel_line, parse_channels};
pub use peers::{parse_peer_line, parse_peers, PeerTable};
pub use queues::{classify_activity, memberships, parse_member_line, parse_queue_listing, QueueBlock};
