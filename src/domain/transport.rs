// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! This module defines the boundary between the dispatch core and the socket
//! transport. The transport owns connection establishment, framing,
//! keep-alive and reconnection; the core only ever sends a frame and receives
//! frames.
//!
//! Concrete implementations of this interface live under `src/transport/`.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{CommandToken, Result, WireEnvelope};

/// Transport-assigned frame identifier.
///
/// Identifiers are unique for the lifetime of one connection. The core
/// compares them for equality only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FrameId {
    fn from(value: u64) -> Self {
        // ---
        FrameId(value)
    }
}

/// Kind of an inbound frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    /// Event carrying a `[command, payload]` array.
    Event,

    /// Event whose payload references binary attachments.
    BinaryEvent,

    /// Acknowledgement of an outbound frame.
    Ack,

    /// Acknowledgement carrying binary attachments.
    BinaryAck,

    /// Transport housekeeping the core does not interpret.
    Other,
}

impl FrameType {
    /// Returns true for frames routed to command dispatch.
    pub fn is_event(self) -> bool {
        // ---
        matches!(self, FrameType::Event | FrameType::BinaryEvent)
    }
}

/// A frame delivered by the transport.
///
/// # Example
///
/// ```
/// # use muxwire::{FrameId, FrameType, InboundFrame};
/// # use serde_json::json;
/// let event = InboundFrame::event("message send", json!({ "text": "hi" }));
/// assert_eq!(event.command(), Some("message send"));
///
/// let ack = InboundFrame::ack(FrameId(7), json!([{ "code": 200 }]));
/// assert_eq!(ack.frame_type, FrameType::Ack);
/// ```
#[derive(Clone, Debug)]
pub struct InboundFrame {
    // ---
    /// Frame kind as classified by the transport.
    pub frame_type: FrameType,

    /// Identifier linking this frame to an earlier outbound frame.
    pub correlation_id: Option<FrameId>,

    /// Structured payload. Event frames carry `[command, payload]`.
    pub payload: Value,

    /// Binary attachments delivered alongside the frame, in wire order.
    pub attachments: Vec<Bytes>,
}

impl InboundFrame {
    // ---
    /// Create a frame of the given type without attachments.
    pub fn new(frame_type: FrameType, correlation_id: Option<FrameId>, payload: Value) -> Self {
        // ---
        Self {
            frame_type,
            correlation_id,
            payload,
            attachments: Vec::new(),
        }
    }

    /// Create an event frame with payload `[command, body]`.
    pub fn event(command: &str, body: Value) -> Self {
        // ---
        Self::new(
            FrameType::Event,
            None,
            Value::Array(vec![Value::String(command.to_string()), body]),
        )
    }

    /// Create an acknowledgement frame answering `correlation_id`.
    pub fn ack(correlation_id: FrameId, payload: Value) -> Self {
        // ---
        Self::new(FrameType::Ack, Some(correlation_id), payload)
    }

    /// Attach binary blobs; a plain event or ack becomes its binary variant.
    pub fn with_attachments(mut self, attachments: Vec<Bytes>) -> Self {
        // ---
        self.frame_type = match self.frame_type {
            FrameType::Event => FrameType::BinaryEvent,
            FrameType::Ack => FrameType::BinaryAck,
            other => other,
        };
        self.attachments = attachments;
        self
    }

    /// Set the correlation identifier.
    pub fn with_correlation_id(mut self, correlation_id: FrameId) -> Self {
        // ---
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Leading string discriminator of an event payload, if any.
    pub fn command(&self) -> Option<&str> {
        // ---
        self.payload.as_array()?.first()?.as_str()
    }
}

impl fmt::Display for InboundFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.frame_type)?;
        if let Some(id) = self.correlation_id {
            write!(f, "#{id}")?;
        }
        write!(f, " {}", self.payload)?;
        if !self.attachments.is_empty() {
            write!(f, " (+{} attachments)", self.attachments.len())?;
        }
        Ok(())
    }
}

/// A serialized command handed to the transport for sending.
#[derive(Clone, Debug)]
pub struct OutboundFrame {
    // ---
    /// Command token written as the event name.
    pub command: CommandToken,

    /// Serialized payload and attachments.
    pub envelope: WireEnvelope,
}

impl OutboundFrame {
    pub fn new(command: impl Into<CommandToken>, envelope: WireEnvelope) -> Self {
        // ---
        Self {
            command: command.into(),
            envelope,
        }
    }
}

/// Something the transport reports to its subscriber.
#[derive(Clone, Debug)]
pub enum TransportEvent {
    /// A frame was received.
    Frame(InboundFrame),

    /// The connection dropped. The transport may reconnect on its own.
    Disconnected { reason: Option<String> },

    /// The transport hit an error it could not attribute to a frame.
    Error(String),
}

/// Handle returned from a successful subscription.
///
/// The inbox closes when the transport is closed; that is the end of the
/// connection's lifetime as far as the core is concerned.
pub struct SubscriptionHandle {
    // ---
    /// Receiver channel for transport events, in delivery order.
    pub inbox: mpsc::Receiver<TransportEvent>,
}

/// Transport abstraction.
///
/// A `Transport` sends frames and delivers inbound frames in order.
/// Implementations must ensure that:
/// - `send_frame()` returns a frame identifier unique for the connection.
/// - `send_frame()` never waits on the subscriber draining its inbox.
/// - Frames are delivered to the inbox in the order they were received.
///
/// The in-memory transport serves as the reference implementation of these
/// semantics.
///
/// # Notes
///
/// This trait uses `async_trait`; the expanded documentation may show explicit
/// lifetimes and a boxed `Future`. Consumers should treat methods as normal
/// `async fn`s.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    // ---
    /// Identifier of this transport instance, used for logging.
    fn transport_id(&self) -> &str;

    /// Send a frame and return the identifier the transport assigned to it.
    async fn send_frame(&self, frame: OutboundFrame) -> Result<FrameId>;

    /// Register the single consumer of inbound transport events.
    async fn subscribe(&self) -> Result<SubscriptionHandle>;

    /// Close the transport and release any associated resources.
    async fn close(&self) -> Result<()>;
}

/// Shared transport pointer.
///
/// This is an `Arc<dyn Transport>`:
/// - `.clone()` is cheap (only increments a reference count)
/// - Multiple clones share the same underlying connection
pub type TransportPtr = Arc<dyn Transport>;

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_command() {
        // ---
        let frame = InboundFrame::event("welcome", json!({ "ip": "::1" }));
        assert_eq!(frame.command(), Some("welcome"));
        assert!(frame.frame_type.is_event());

        let ack = InboundFrame::ack(FrameId(3), json!("welcome"));
        assert_eq!(ack.command(), None);
        assert!(!ack.frame_type.is_event());
    }

    #[test]
    fn test_with_attachments_promotes_type() {
        // ---
        let frame = InboundFrame::event("message send", json!({}))
            .with_attachments(vec![Bytes::from_static(b"\x89PNG")]);
        assert_eq!(frame.frame_type, FrameType::BinaryEvent);

        let ack = InboundFrame::ack(FrameId(1), json!({})).with_attachments(vec![]);
        assert_eq!(ack.frame_type, FrameType::BinaryAck);
    }

    #[test]
    fn test_display() {
        // ---
        let frame = InboundFrame::ack(FrameId(42), json!({ "code": 200 }));
        assert_eq!(frame.to_string(), r#"Ack#42 {"code":200}"#);
    }
}
