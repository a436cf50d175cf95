// src/domain/message.rs

//! Typed domain messages and their command tokens.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

/// Case-insensitive command token.
///
/// Keeps the spelling it was created with for display and for the wire;
/// equality and hashing use the lowercased form, so `"Message Send"` and
/// `"message send"` name the same command.
#[derive(Clone)]
pub struct CommandToken {
    raw: Arc<str>,
    folded: Arc<str>,
}

impl CommandToken {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        // ---
        let raw: Arc<str> = token.into();
        let folded: Arc<str> = Arc::from(raw.to_lowercase());
        Self { raw, folded }
    }

    /// The token as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for CommandToken {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for CommandToken {}

impl Hash for CommandToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl fmt::Debug for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.raw)
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for CommandToken {
    fn from(value: &str) -> Self {
        CommandToken::new(value)
    }
}

impl From<String> for CommandToken {
    fn from(value: String) -> Self {
        CommandToken::new(value)
    }
}

impl From<&CommandToken> for CommandToken {
    fn from(value: &CommandToken) -> Self {
        value.clone()
    }
}

/// A typed message exchanged over the connection.
///
/// Implement it by hand, or with [`impl_message!`](crate::impl_message) for
/// serde types whose command never changes.
pub trait Message: Send + Sync + fmt::Debug + 'static {
    /// Command token identifying the message kind.
    fn command(&self) -> &str;

    /// Structural form of the message, used by the generic serializers.
    fn to_payload(&self) -> serde_json::Result<Value>;

    /// Binary attachments sent alongside the payload.
    fn attachments(&self) -> &[Bytes] {
        &[]
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Message {
    /// Downcast to a concrete message type.
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        // ---
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Message whose shape is only known at runtime.
///
/// The structural fallback produces these for inbound commands without a
/// dedicated serializer, and accepts them for outbound commands.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericMessage {
    // ---
    pub command: CommandToken,
    pub payload: Value,
    pub attachments: Vec<Bytes>,
}

impl GenericMessage {
    pub fn new(command: impl Into<CommandToken>, payload: Value) -> Self {
        // ---
        Self {
            command: command.into(),
            payload,
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Bytes>) -> Self {
        // ---
        self.attachments = attachments;
        self
    }
}

impl Message for GenericMessage {
    fn command(&self) -> &str {
        self.command.as_str()
    }

    fn to_payload(&self) -> serde_json::Result<Value> {
        Ok(self.payload.clone())
    }

    fn attachments(&self) -> &[Bytes] {
        &self.attachments
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
