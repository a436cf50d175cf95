// src/transport/memory/mod.rs

//! In-memory transport implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `Transport` trait. It is intended primarily for testing, local execution,
//! and as a reference for transport semantics.
//!
//! ## Reference Semantics
//!
//! The in-memory transport defines the **reference behavior** for the transport
//! layer. Socket transports are expected to approximate it as closely as their
//! connection allows and to document any unavoidable deviations.
//!
//! In particular, the in-memory transport establishes the following expectations:
//!
//! - Frame identifiers start at 1 and increase by one per sent frame.
//! - Frames delivered by the peer reach the subscriber in delivery order.
//! - `send_frame()` never waits on the subscriber draining its inbox.
//! - Closing the transport closes the subscriber's inbox.
//!
//! ## Non-Goals
//!
//! This transport does not attempt to emulate framing, keep-alive or
//! reconnection of a real socket. It exists to provide a clear, deterministic
//! baseline against which higher-level behavior can be validated.

mod transport;

pub use transport::{create_transport, MemoryPeer, SentFrame};
