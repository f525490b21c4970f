//! Manager interface boundary: the control-link capability consumed by the
//! orchestrator and the normalization of its replies.

pub mod link;
pub mod reply;

pub use link::{run_command, ActionParams, ControlLink, COMMAND_ACTION};
pub use reply::{normalize, AmiReply, OUTPUT_FIELDS};
