//! Reply normalization.
//!
//! The manager client hands back `Command` output in whatever shape its
//! transport produced: a plain string, a list of lines, or an object carrying
//! the text under one of several field names. [`normalize`] is the single
//! place that shape is looked at; parsers only ever see the canonical text.

use std::collections::BTreeMap;

/// Field names that may carry command output, in lookup order
pub const OUTPUT_FIELDS: [&str; 4] = ["output", "message", "content", "data"];

/// Raw reply of one diagnostic command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmiReply {
    Text(String),
    Lines(Vec<String>),
    Fields(BTreeMap<String, AmiReply>),
}

impl AmiReply {
    pub fn empty() -> Self {
        AmiReply::Text(String::new())
    }
}

impl From<String> for AmiReply {
    fn from(text: String) -> Self {
        AmiReply::Text(text)
    }
}

impl From<&str> for AmiReply {
    fn from(text: &str) -> Self {
        AmiReply::Text(text.to_string())
    }
}

impl From<Vec<String>> for AmiReply {
    fn from(lines: Vec<String>) -> Self {
        AmiReply::Lines(lines)
    }
}

impl From<serde_json::Value> for AmiReply {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::String(text) => AmiReply::Text(text),
            Value::Array(items) => AmiReply::Lines(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(text) => text,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Value::Object(map) => {
                AmiReply::Fields(map.into_iter().map(|(key, value)| (key, AmiReply::from(value))).collect())
            }
            Value::Null => AmiReply::empty(),
            other => AmiReply::Text(other.to_string()),
        }
    }
}

/// Canonical newline-delimited text of a reply. Never fails; an unusable
/// reply yields an empty string.
pub fn normalize(reply: &AmiReply) -> String {
    let raw = match reply {
        AmiReply::Text(text) => text.clone(),
        AmiReply::Lines(lines) => lines.join("\n"),
        AmiReply::Fields(fields) => OUTPUT_FIELDS
            .iter()
            .filter_map(|name| fields.get(*name))
            .map(normalize)
            .find(|text| !text.is_empty())
            .unwrap_or_default(),
    };
    canonical_line_endings(raw)
}

fn canonical_line_endings(raw: String) -> String {
    if !raw.contains('\r') && !raw.contains("\\n") {
        return raw;
    }
    raw.replace("\r\n", "\n").replace('\r', "\n").replace("\\n", "\n")
}
