//! Parser for the peer registration listing (`sip show peers`).
//!
//! ```text
//! Name/username             Host                                    Dyn Forcerport Comedia    ACL Port     Status      Description
//! 3001/3001                 10.0.0.5                                 D  Auto (No)  No             5060     OK (12 ms)
//! 3002/3002                 (Unspecified)                            D  Auto (No)  No             0        UNKNOWN
//! 2 sip peers [Monitored: 1 online, 1 offline Unmonitored: 0 online, 0 offline]
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::model::PeerRecord;

const HEADER_NAME: &str = "Name/username";
const SUCCESS_MARKER: &str = "OK";
const UNSPECIFIED_HOST: &str = "(Unspecified)";

/// Peers keyed by extension; the first line seen for an extension wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerTable {
    peers: Vec<PeerRecord>,
    index: HashMap<String, usize>,
}

impl PeerTable {
    pub fn get(&self, extension: &str) -> Option<&PeerRecord> {
        self.index.get(extension).map(|&i| &self.peers[i])
    }

    /// Peers in listing order
    pub fn iter(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    fn insert(&mut self, record: PeerRecord) {
        if self.index.contains_key(&record.extension) {
            return;
        }
        self.index.insert(record.extension.clone(), self.peers.len());
        self.peers.push(record);
    }
}

/// Parse the whole listing
pub fn parse_peers(text: &str) -> PeerTable {
    let mut table = PeerTable::default();
    for line in text.lines().map(str::trim) {
        if let Some(record) = parse_peer_line(line) {
            table.insert(record);
        }
    }
    debug!("🌐 Parsed {} peers", table.len());
    table
}

/// Parse one line. `None` unless the first token reads `<extension>/...`.
pub fn parse_peer_line(line: &str) -> Option<PeerRecord> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next()?;
    if name == HEADER_NAME {
        return None;
    }
    let (extension, _) = name.split_once('/')?;
    if extension.is_empty() {
        return None;
    }

    let ip_address = tokens
        .next()
        .filter(|host| *host != UNSPECIFIED_HOST)
        .map(str::to_string);

    Some(PeerRecord {
        extension: extension.to_string(),
        registered: line.contains(SUCCESS_MARKER),
        ip_address,
    })
}
