// src/domain/envelope.rs

//! Serialized form of a message on the wire.

use bytes::Bytes;
use serde_json::Value;

/// Structured payload plus its binary attachments.
///
/// Produced by serializer strategies and consumed by them when decoding.
/// Attachment order is stable; a concrete serializer may reference
/// attachments by position from inside `payload`, so the core never
/// reorders or renumbers them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WireEnvelope {
    // ---
    /// Tree of scalars, arrays and objects.
    pub payload: Value,

    /// Opaque binary blobs, in wire order.
    pub attachments: Vec<Bytes>,
}

impl WireEnvelope {
    pub fn new(payload: Value, attachments: Vec<Bytes>) -> Self {
        // ---
        Self {
            payload,
            attachments,
        }
    }

    /// Envelope without attachments.
    pub fn json(payload: Value) -> Self {
        // ---
        Self::new(payload, Vec::new())
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}
