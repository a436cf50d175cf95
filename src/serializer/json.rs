// src/serializer/json.rs

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::{CommandToken, Message, Result, RpcError, WireEnvelope};

use super::MessageSerializer;

/// Strategy decoding inbound payloads into `T` with `serde_json`.
///
/// Outbound messages are written structurally, exactly like the fallback;
/// the typed part is the inbound direction, where the envelope payload is
/// decoded into `T`. Attachments are not interpreted.
pub struct JsonMessageSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonMessageSerializer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonMessageSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonMessageSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonMessageSerializer<{}>", std::any::type_name::<T>())
    }
}

impl<T> MessageSerializer for JsonMessageSerializer<T>
where
    T: Message + DeserializeOwned,
{
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
        let message: T = serde_json::from_value(envelope.payload)
            .map_err(|err| RpcError::serialization(command.as_str(), err))?;

        Ok(Some(Arc::new(message)))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Welcome {
        ip: String,
        #[serde(default)]
        logged_in: bool,
    }

    crate::impl_message!(Welcome, "welcome");

    #[test]
    fn test_deserialize_typed() {
        // ---
        let serializer = JsonMessageSerializer::<Welcome>::new();
        let envelope = WireEnvelope::json(json!({ "ip": "10.0.0.1", "logged_in": true }));

        let message = serializer
            .deserialize(&CommandToken::from("welcome"), envelope)
            .unwrap()
            .unwrap();

        assert_eq!(
            message.downcast_ref::<Welcome>(),
            Some(&Welcome {
                ip: "10.0.0.1".into(),
                logged_in: true,
            })
        );
    }

    #[test]
    fn test_deserialize_failure_names_command() {
        // ---
        let serializer = JsonMessageSerializer::<Welcome>::new();
        let envelope = WireEnvelope::json(json!({ "ip": 42 }));

        let err = serializer
            .deserialize(&CommandToken::from("Welcome"), envelope)
            .unwrap_err();

        match err {
            RpcError::Serialization { command, .. } => assert_eq!(command, "Welcome"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_serialize_round_shape() {
        // ---
        let serializer = JsonMessageSerializer::<Welcome>::new();
        let envelope = serializer
            .serialize(&Welcome {
                ip: "::1".into(),
                logged_in: false,
            })
            .unwrap();

        assert_eq!(envelope.payload, json!({ "ip": "::1", "logged_in": false }));
    }
}
