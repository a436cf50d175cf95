// src/serializer/structural.rs

//! Command-agnostic fallback strategy.

use std::sync::Arc;

use crate::{CommandToken, GenericMessage, Message, Result, RpcError, WireEnvelope};

use super::MessageSerializer;

/// Best-effort structural mapping without command-specific shaping.
///
/// Outbound, the message's own structural payload and attachments are used
/// as-is. Inbound, the envelope becomes a [`GenericMessage`] so that
/// listeners still see commands nobody registered a serializer for.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralSerializer;

impl MessageSerializer for StructuralSerializer {
    fn serialize(&self, message: &dyn Message) -> Result<WireEnvelope> {
        // ---
        let payload = message
            .to_payload()
            .map_err(|err| RpcError::serialization(message.command(), err))?;

        Ok(WireEnvelope::new(payload, message.attachments().to_vec()))
    }

    fn deserialize(
        &self,
        command: &CommandToken,
        envelope: WireEnvelope,
    ) -> Result<Option<Arc<dyn Message>>> {
        // ---
        let message = GenericMessage::new(command, envelope.payload)
            .with_attachments(envelope.attachments);

        Ok(Some(Arc::new(message)))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use bytes::Bytes;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Serialize)]
    struct Chat {
        text: String,
    }

    crate::impl_message!(Chat, "chat");

    #[test]
    fn test_serialize_typed_message() {
        // ---
        let envelope = StructuralSerializer
            .serialize(&Chat { text: "hi".into() })
            .unwrap();

        assert_eq!(envelope.payload, json!({ "text": "hi" }));
        assert!(!envelope.has_attachments());
    }

    #[test]
    fn test_deserialize_keeps_attachment_order() {
        // ---
        let attachments = vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")];
        let envelope = WireEnvelope::new(json!({ "n": 2 }), attachments.clone());

        let message = StructuralSerializer
            .deserialize(&CommandToken::from("Unknown Thing"), envelope)
            .unwrap()
            .expect("structural fallback always yields a message");

        let generic = message.downcast_ref::<GenericMessage>().unwrap();
        assert_eq!(generic.command.as_str(), "Unknown Thing");
        assert_eq!(generic.payload, json!({ "n": 2 }));
        assert_eq!(generic.attachments, attachments);
    }
}
