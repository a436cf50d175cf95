//! Domain layer public interface.
//!
//! This module defines the wire envelope, the message model and the transport
//! boundary. None of it depends on a concrete transport or on the dispatch
//! machinery built on top.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod envelope;
mod message;
mod transport;

pub use envelope::WireEnvelope;

pub use message::{
    //
    CommandToken,
    GenericMessage,
    Message,
};

pub use transport::{
    //
    FrameId,
    FrameType,
    InboundFrame,
    OutboundFrame,
    SubscriptionHandle,
    Transport,
    TransportEvent,
    TransportPtr,
};
