use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::ami::reply::{normalize, AmiReply};
use crate::error::{LinkError, MonitorError, Result};

/// Action name for CLI passthrough
pub const COMMAND_ACTION: &str = "Command";

/// Action parameters, in the order the transport serializes them
pub type ActionParams = BTreeMap<String, String>;

/// Capability to run manager actions on the switch.
///
/// Framing, authentication and reconnects belong to the implementor. One call
/// is one request/response pair; implementations multiplex concurrent calls
/// over their session as they see fit.
#[async_trait]
pub trait ControlLink: Send + Sync {
    async fn invoke(&self, action: &str, params: &ActionParams) -> std::result::Result<AmiReply, LinkError>;
}

#[async_trait]
impl<T: ControlLink + ?Sized> ControlLink for std::sync::Arc<T> {
    async fn invoke(&self, action: &str, params: &ActionParams) -> std::result::Result<AmiReply, LinkError> {
        (**self).invoke(action, params).await
    }
}

/// Run a CLI command and return its normalized text
pub async fn run_command<L: ControlLink + ?Sized>(link: &L, command: &str) -> Result<String> {
    let mut params = ActionParams::new();
    params.insert("command".to_string(), command.to_string());

    let reply = link
        .invoke(COMMAND_ACTION, &params)
        .await
        .map_err(|e| MonitorError::unreachable(command, e))?;

    let text = normalize(&reply);
    debug!("📥 '{}' returned {} bytes", command, text.len());
    Ok(text)
}
