use thiserror::Error;

/// Transport-level failure reported by a [`ControlLink`](crate::ami::ControlLink).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The management session is not connected
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// The switch answered with an error response
    #[error("Action failed: {0}")]
    ActionFailed(String),

    /// The transport gave up waiting for a response
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Anything else the transport wants to report
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Monitor errors
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A diagnostic command could not be delivered or answered
    #[error("Source unreachable while running '{command}': {source}")]
    SourceUnreachable {
        command: String,
        #[source]
        source: LinkError,
    },

    /// Every command in a query group came back empty
    #[error("No data returned for scope '{scope}'")]
    NoData { scope: String },

    /// Scope name not present in configuration
    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Create a new SourceUnreachable error
    pub fn unreachable<S: Into<String>>(command: S, source: LinkError) -> Self {
        Self::SourceUnreachable {
            command: command.into(),
            source,
        }
    }

    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// True when the failure came from the transport rather than from the data
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::SourceUnreachable { .. })
    }
}

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
