use thiserror::Error;

use crate::FrameId;

/// Boxed error produced by a serializer strategy.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while dispatching or correlating messages
#[derive(Error, Debug)]
pub enum RpcError {
    /// No serializer is bound to the command and fallback is disabled
    #[error("no serializer registered for command: {0}")]
    UnknownCommand(String),

    /// A serializer strategy failed on a message
    #[error("serialization failed for command `{command}`: {source}")]
    Serialization {
        command: String,
        #[source]
        source: BoxError,
    },

    /// Request timed out waiting for its response
    #[error("request timed out")]
    Timeout,

    /// Request was cancelled by its caller
    #[error("request cancelled")]
    Cancelled,

    /// Connection closed while the request was pending
    #[error("connection closed")]
    ConnectionClosed,

    /// Response payload could not be decoded into the expected type
    #[error("invalid response for frame {frame_id}: {source}")]
    InvalidResponse {
        frame_id: FrameId,
        #[source]
        source: serde_json::Error,
    },

    /// Inbound frame does not have the expected shape
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Transport-level failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl RpcError {
    /// Wrap a strategy failure together with the offending command token.
    pub fn serialization(command: impl Into<String>, source: impl Into<BoxError>) -> Self {
        // ---
        Self::Serialization {
            command: command.into(),
            source: source.into(),
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, RpcError>;
