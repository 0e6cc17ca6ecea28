use crate::message::RequestName;
use std::time::Duration;

/// Error type for handler bodies, mirroring the `Result<T, String>` returned
/// by Tauri commands.
pub type HandlerResult<T> = Result<T, String>;

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("'{name}' timed out after {}s", after.as_secs_f32())]
    Timeout { name: RequestName, after: Duration },

    #[error("no handler registered for '{0}'")]
    NoHandler(String),

    #[error("{message}")]
    Handler { name: RequestName, message: String },

    #[error("channel closed while '{0}' was in flight")]
    Disconnected(RequestName),

    #[error("unexpected '{got}' response to '{name}'")]
    UnexpectedResponse { name: RequestName, got: &'static str },

    #[error("malformed payload for '{name}': {source}")]
    Payload {
        name: String,
        source: serde_json::Error,
    },
}

impl IpcError {
    /// Timeouts and handler failures are shown to the user the same way.
    pub fn user_message(&self) -> String {
        match self {
            IpcError::Handler { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
