//! Request/response correlation.
//!
//! Each outbound request is registered under the frame identifier the
//! transport assigned to it. A matching inbound frame resolves it; cancel,
//! timeout and connection teardown are the other terminal outcomes. Exactly
//! one of them fires per request.
//!
//! # Concurrency
//!
//! The pending map is the only shared mutable state and sits behind a single
//! mutex. Operations are map insert/remove only; decoding and channel sends
//! happen after the lock is released.

mod handle;
mod pending;
mod response;

pub use handle::ResponseHandle;
pub use pending::PendingRequests;
pub use response::{merge_into, shape_response, RESPONSE_SECTIONS};
