// src/client/outbound.rs

//! Outbound dispatch: message to serializer to transport.

use crate::{FrameId, Message, OutboundFrame, Result, SerializerRegistry, TransportPtr};

/// Serialize `message` and hand it to the transport.
///
/// Returns the frame identifier the transport assigned. Transport errors
/// propagate unchanged; nothing is retried.
///
/// # Errors
///
/// - [`RpcError::UnknownCommand`](crate::RpcError::UnknownCommand) if the
///   command is unbound and `throw_on_unknown_command` is set
/// - [`RpcError::Serialization`](crate::RpcError::Serialization) if the
///   strategy fails
pub(crate) async fn dispatch(
    transport: &TransportPtr,
    registry: &SerializerRegistry,
    throw_on_unknown_command: bool,
    message: &dyn Message,
) -> Result<FrameId> {
    // ---
    let command = message.command();
    let serializer = registry.resolve_or_fallback(command, throw_on_unknown_command)?;
    let envelope = serializer.serialize(message)?;

    crate::log_debug!(
        "> {command} {} ({} attachments)",
        envelope.payload,
        envelope.attachments.len()
    );

    transport.send_frame(OutboundFrame::new(command, envelope)).await
}
