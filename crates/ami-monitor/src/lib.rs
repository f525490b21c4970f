//! # Call Center Monitor for Asterisk
//!
//! This crate turns the human-oriented output of Asterisk manager "show"
//! commands into structured call center state: who is on a call, who is
//! paused, who is free, and how many callers are waiting in each queue.
//!
//! ## Features
//!
//! - **Reply Normalization**: Any manager reply shape flattened to plain text
//! - **Listing Parsers**: Channels, queue members and SIP peers from CLI text
//! - **Bridge Correlation**: Legs sharing a bridge joined into call pairs
//! - **Agent Aggregation**: One effective state per extension across all queues
//! - **Query Orchestration**: Concurrent command fan-out with a short TTL cache
//!
//! ## Architecture
//!
//! - [`ami`]: Control-link capability and reply normalization
//! - [`parser`]: Pure text-to-record parsers for the three listings
//! - [`correlate`]: Bridge pairing and per-agent state resolution
//! - [`orchestrator`]: Scope queries, extension drill-down, caching
//! - [`cache`]: Scope-keyed snapshot cache with an injectable clock
//! - [`config`]: Scopes, commands and cache settings
//! - [`logging`]: Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rvoip_ami_monitor::prelude::*;
//!
//! # async fn run(link: impl ControlLink) -> Result<()> {
//! let orchestrator = QueryOrchestrator::new(link, MonitorConfig::default());
//!
//! let served = orchestrator.scope_snapshot("Soporte").await?;
//! for agent in &served.data.agents {
//!     println!("{} {:?}", agent.extension, agent.effective_state);
//! }
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod error;
pub mod config;
pub mod logging;
pub mod model;

// Extraction pipeline
pub mod ami;
pub mod parser;
pub mod correlate;

// Query layer
pub mod cache;
pub mod orchestrator;

// Re-exports for convenience
pub use error::{LinkError, MonitorError, Result};
pub use config::MonitorConfig;
pub use orchestrator::QueryOrchestrator;

/// Prelude module for convenient imports
pub mod prelude {
    // Core types
    pub use crate::{LinkError, MonitorConfig, MonitorError, QueryOrchestrator, Result};

    // Configuration types
    pub use crate::config::{CacheConfig, CommandConfig, ParserConfig, QueryConfig};
    pub use crate::logging::{setup_logging, LoggingConfig};

    // Manager interface
    pub use crate::ami::{normalize, run_command, ActionParams, AmiReply, ControlLink};

    // Records and views
    pub use crate::model::{
        ActiveCall, ActivityState, AgentStatus, CallPair, ChannelRecord, EffectiveState, ExtensionDetail,
        PeerRecord, QueueMembershipRecord, QueueSummary, ScopeSnapshot, Served, StateTotals,
    };

    // Pipeline stages
    pub use crate::correlate::{aggregate_agent, aggregate_agents, correlate_bridges, resolve_state};
    pub use crate::parser::{parse_channels, parse_peers, parse_queue_listing, PeerTable, QueueBlock};

    // Caching
    pub use crate::cache::{CacheEntry, Clock, ManualClock, SnapshotCache, SystemClock};

    // Common external types
    pub use chrono::{DateTime, Utc};
}
