//! Command dispatch and request/response correlation over one multiplexed
//! socket connection.
//!
//! This library sits between application code and a socket transport. It
//! serializes typed messages through per-command strategies, matches inbound
//! acknowledgements to the requests that caused them by frame identifier,
//! and broadcasts every decoded inbound event to subscribers.
//!
//! ```no_run
//! use muxwire::{ClientBuilder, JsonMessageSerializer};
//! use serde::{Deserialize, Serialize};
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Chat {
//!     text: String,
//! }
//!
//! muxwire::impl_message!(Chat, "message send");
//!
//! # async fn example() -> muxwire::Result<()> {
//! let (transport, _peer) = muxwire::create_memory_transport("bot").await?;
//!
//! let client = ClientBuilder::new(transport)
//!     .serializer("message send", Arc::new(JsonMessageSerializer::<Chat>::new()))
//!     .build()
//!     .await?;
//!
//! let reply: Value = client.request(&Chat { text: "hi".into() }).await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

mod macros;

mod client;
mod client_builder;
mod client_config;
mod correlation;
mod domain;
mod error;
mod serializer;
mod transport;

#[allow(unused_imports)]
pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use client::{FrameDiagnostic, MuxClient};
pub use client_builder::ClientBuilder;
pub use client_config::{
    // ---
    ClientConfig,
    DEFAULT_DIAGNOSTICS_CAPACITY,
    DEFAULT_EVENT_CAPACITY,
    DEFAULT_REQUEST_TIMEOUT,
};

pub use error::{BoxError, Result, RpcError};

pub use correlation::{
    // ---
    merge_into,
    shape_response,
    PendingRequests,
    ResponseHandle,
    RESPONSE_SECTIONS,
};

pub use serializer::{
    // ---
    JsonMessageSerializer,
    MessageSerializer,
    SerializerPtr,
    SerializerRegistry,
    StructuralSerializer,
};

pub use transport::{create_memory_transport, MemoryPeer, SentFrame};

// --- public re-exports
pub use domain::{
    //
    CommandToken,
    FrameId,
    FrameType,
    GenericMessage,
    InboundFrame,
    Message,
    OutboundFrame,
    SubscriptionHandle,
    Transport,
    TransportEvent,
    TransportPtr,
    WireEnvelope,
};

/// Items used by exported macros. Not part of the public API.
#[doc(hidden)]
pub mod __private {
    pub use serde_json::{to_value, Error as JsonError, Value};
}
