//! Cross-source correlation: bridged call pairs and per-agent status.

pub mod agents;
pub mod bridge;

pub use agents::{aggregate_agent, aggregate_agents, resolve_state};
pub use bridge::{correlate_bridges, partner_of};
