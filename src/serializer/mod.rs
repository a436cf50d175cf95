//! Serializer strategies and the command registry.
//!
//! A strategy turns a [`Message`] into a [`WireEnvelope`] for sending and
//! turns an inbound envelope back into a message. The
//! [`SerializerRegistry`] binds strategies to command tokens and supplies a
//! structural fallback for commands nobody registered.

mod json;
mod registry;
mod structural;

use std::sync::Arc;

use crate::{CommandToken, Message, Result, WireEnvelope};

pub use json::JsonMessageSerializer;
pub use registry::SerializerRegistry;
pub use structural::StructuralSerializer;

/// Serialize/deserialize behavior bound to a command token.
///
/// Failures should be reported as
/// [`RpcError::Serialization`](crate::RpcError::Serialization) carrying the
/// command token.
pub trait MessageSerializer: Send + Sync {
    /// Convert an outbound message to its wire form.
    fn serialize(&self, message: &dyn Message) -> Result<WireEnvelope>;

    /// Convert an inbound envelope to a message.
    ///
    /// `Ok(None)` means the frame is legitimately ignorable and should not
    /// be published.
    fn deserialize(
        &self,
        command: &CommandToken,
        envelope: WireEnvelope,
    ) -> Result<Option<Arc<dyn Message>>>;
}

/// Shared serializer pointer.
pub type SerializerPtr = Arc<dyn MessageSerializer>;
