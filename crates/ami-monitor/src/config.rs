use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Operational areas, each mapped to the queues it owns
    pub scopes: BTreeMap<String, Vec<String>>,

    /// Snapshot cache configuration
    pub cache: CacheConfig,

    /// CLI vocabulary of the switch
    pub commands: CommandConfig,

    /// Text extraction knobs
    pub parser: ParserConfig,

    /// Which sources a scope query consults besides the queues
    pub query: QueryConfig,
}

/// Snapshot cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a scope snapshot stays fresh
    pub ttl_secs: u64,
}

/// Diagnostic command strings, sent verbatim through the control link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Verbose channel listing
    pub channels: String,

    /// Queue listing; a queue id is appended for single-queue queries
    pub queues: String,

    /// Peer registration listing
    pub peers: String,
}

/// Parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Channel technology prefix, including the slash
    pub technology_prefix: String,

    /// Dialplan application that connects a caller to a queue member
    pub queue_application: String,
}

/// Scope query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Also fetch the channel table to fill in active calls
    pub include_channels: bool,

    /// Also fetch the peer table to fill in registration state
    pub include_peers: bool,
}

impl MonitorConfig {
    /// Parse a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: MonitorConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&raw)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.scopes.is_empty() {
            return Err(MonitorError::config("at least one scope must be configured"));
        }

        for (scope, queues) in &self.scopes {
            if scope.trim().is_empty() {
                return Err(MonitorError::config("scope names cannot be empty"));
            }
            if queues.is_empty() {
                return Err(MonitorError::config(format!("scope '{}' has no queues", scope)));
            }
            if let Some(bad) = queues.iter().find(|q| q.trim().is_empty() || q.contains(char::is_whitespace)) {
                return Err(MonitorError::config(format!(
                    "scope '{}' has an invalid queue id: '{}'",
                    scope, bad
                )));
            }
        }

        if self.cache.ttl_secs == 0 {
            return Err(MonitorError::config("cache.ttl_secs must be greater than 0"));
        }

        if self.commands.channels.trim().is_empty()
            || self.commands.queues.trim().is_empty()
            || self.commands.peers.trim().is_empty()
        {
            return Err(MonitorError::config("command strings cannot be empty"));
        }

        if !self.parser.technology_prefix.ends_with('/') || self.parser.technology_prefix.len() < 2 {
            return Err(MonitorError::config(format!(
                "technology_prefix must look like 'SIP/', got '{}'",
                self.parser.technology_prefix
            )));
        }

        Ok(())
    }

    /// Queue ids owned by a scope
    pub fn queues_for(&self, scope: &str) -> Option<&[String]> {
        self.scopes.get(scope).map(Vec::as_slice)
    }

    /// Cache ttl as a duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

impl CommandConfig {
    /// Queue listing restricted to a single queue
    pub fn queue_command(&self, queue_id: &str) -> String {
        format!("{} {}", self.queues, queue_id)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scopes: default_scopes(),
            cache: CacheConfig::default(),
            commands: CommandConfig::default(),
            parser: ParserConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

fn default_scopes() -> BTreeMap<String, Vec<String>> {
    fn queues(ids: &[u32]) -> Vec<String> {
        ids.iter().map(|id| format!("Q{}", id)).collect()
    }

    let mut scopes = BTreeMap::new();
    scopes.insert("Retencion".to_string(), queues(&[1, 3, 5, 16, 23, 74, 77, 78, 79, 80]));
    scopes.insert("Tramites".to_string(), queues(&[4, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 104]));
    scopes.insert(
        "Soporte".to_string(),
        queues(&[17, 18, 19, 20, 21, 22, 24, 25, 26, 70, 71, 81, 82, 100, 103, 106, 110]),
    );
    scopes.insert("Movil".to_string(), queues(&[27, 28, 29, 30, 31, 32, 33, 34, 35, 37]));
    scopes.insert("Pruebas".to_string(), queues(&[102, 107, 108]));
    scopes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 10 }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            channels: "core show channels verbose".to_string(),
            queues: "queue show".to_string(),
            peers: "sip show peers".to_string(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            technology_prefix: "SIP/".to_string(),
            queue_application: "Queue".to_string(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            include_channels: true,
            include_peers: true,
        }
    }
}
