// src/transport/memory/transport.rs

//! In-memory transport implementation.
//!
//! This file contains the concrete implementation of the domain-level
//! `Transport` trait using in-process channels only, plus the [`MemoryPeer`]
//! that plays the remote end of the connection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    // ---
    FrameId,
    InboundFrame,
    OutboundFrame,
    Result,
    RpcError,
    SubscriptionHandle,
    Transport,
    TransportEvent,
    TransportPtr,
};

const INBOX_CAPACITY: usize = 64;

fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// An outbound frame as observed by the peer.
#[derive(Clone, Debug)]
pub struct SentFrame {
    // ---
    /// Identifier the transport assigned when sending.
    pub frame_id: FrameId,
    pub frame: OutboundFrame,
}

/// State shared between the transport and its peer.
struct Shared {
    // ---
    /// Sender side of the subscriber's inbox. `None` once closed.
    inbox: Mutex<Option<mpsc::Sender<TransportEvent>>>,

    /// When set, sends fail with this message.
    rejection: Mutex<Option<String>>,

    closed: AtomicBool,
}

impl Shared {
    fn inbox(&self) -> Result<mpsc::Sender<TransportEvent>> {
        // ---
        lock_ignore_poison(&self.inbox)
            .clone()
            .ok_or(RpcError::ConnectionClosed)
    }
}

/// In-memory transport.
///
/// ## Semantics
///
/// - Exactly one subscriber; a second `subscribe()` fails.
/// - Every sent frame is handed to the peer with its identifier.
/// - `close()` closes the subscriber's inbox and fails later sends.
struct MemoryTransport {
    // ---
    transport_id: String,
    next_frame_id: AtomicU64,
    shared: Arc<Shared>,
    inbox_rx: Mutex<Option<mpsc::Receiver<TransportEvent>>>,
    sent: mpsc::UnboundedSender<SentFrame>,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    // ---
    fn transport_id(&self) -> &str {
        &self.transport_id
    }

    /// Assign the next frame identifier and hand the frame to the peer.
    async fn send_frame(&self, frame: OutboundFrame) -> Result<FrameId> {
        // ---
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(RpcError::ConnectionClosed);
        }
        if let Some(reason) = lock_ignore_poison(&self.shared.rejection).clone() {
            return Err(RpcError::Transport(reason));
        }

        let frame_id = FrameId(self.next_frame_id.fetch_add(1, Ordering::Relaxed));
        crate::log_debug!("{} sent frame {frame_id} ({})", self.transport_id, frame.command);

        // A dropped peer only means nobody is watching.
        let _ = self.sent.send(SentFrame { frame_id, frame });

        Ok(frame_id)
    }

    /// Hand out the inbox receiver. Only the first call succeeds.
    async fn subscribe(&self) -> Result<SubscriptionHandle> {
        // ---
        let inbox = lock_ignore_poison(&self.inbox_rx).take().ok_or_else(|| {
            RpcError::Transport(format!("{} already has a subscriber", self.transport_id))
        })?;

        Ok(SubscriptionHandle { inbox })
    }

    /// Close the transport.
    ///
    /// Drops the inbox sender, so the subscriber sees the end of the stream
    /// once it has drained what was already delivered.
    async fn close(&self) -> Result<()> {
        // ---
        self.shared.closed.store(true, Ordering::Release);
        lock_ignore_poison(&self.shared.inbox).take();
        Ok(())
    }
}

/// Remote end of an in-memory connection.
///
/// Observes every frame the client sends and delivers frames, disconnects
/// and errors back to it.
pub struct MemoryPeer {
    // ---
    shared: Arc<Shared>,
    sent: mpsc::UnboundedReceiver<SentFrame>,
}

impl MemoryPeer {
    // ---
    /// Wait for the next frame the client sends.
    ///
    /// Returns `None` once the transport has been dropped.
    pub async fn next_sent(&mut self) -> Option<SentFrame> {
        self.sent.recv().await
    }

    /// Take the next sent frame if one is already queued.
    pub fn try_next_sent(&mut self) -> Option<SentFrame> {
        self.sent.try_recv().ok()
    }

    /// Deliver a frame to the subscriber.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::ConnectionClosed` if the transport was closed or
    /// the subscriber is gone.
    pub async fn deliver(&self, frame: InboundFrame) -> Result<()> {
        // ---
        self.push(TransportEvent::Frame(frame)).await
    }

    /// Acknowledge a sent frame with `payload`.
    pub async fn respond(&self, frame_id: FrameId, payload: Value) -> Result<()> {
        // ---
        self.deliver(InboundFrame::ack(frame_id, payload)).await
    }

    /// Deliver an event frame `[command, body]`.
    pub async fn emit(&self, command: &str, body: Value) -> Result<()> {
        // ---
        self.deliver(InboundFrame::event(command, body)).await
    }

    /// Report a dropped connection. The transport itself stays usable.
    pub async fn disconnect(&self, reason: Option<&str>) -> Result<()> {
        // ---
        self.push(TransportEvent::Disconnected {
            reason: reason.map(str::to_string),
        })
        .await
    }

    /// Report a transport error not tied to any frame.
    pub async fn raise_error(&self, details: impl Into<String>) -> Result<()> {
        // ---
        self.push(TransportEvent::Error(details.into())).await
    }

    /// Make every later send fail with `RpcError::Transport(reason)`.
    /// `None` accepts sends again.
    pub fn reject_sends(&self, reason: Option<&str>) {
        // ---
        *lock_ignore_poison(&self.shared.rejection) = reason.map(str::to_string);
    }

    /// End the inbound stream without closing the transport for sends.
    pub fn hang_up(&self) {
        // ---
        lock_ignore_poison(&self.shared.inbox).take();
    }

    async fn push(&self, event: TransportEvent) -> Result<()> {
        // ---
        let inbox = self.shared.inbox()?;
        inbox
            .send(event)
            .await
            .map_err(|_| RpcError::ConnectionClosed)
    }
}

/// Create a new in-memory transport and the peer driving its remote end.
///
/// This transport is always available and requires no external resources.
pub async fn create_transport(transport_id: impl Into<String>) -> Result<(TransportPtr, MemoryPeer)> {
    // ---
    let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();

    let shared = Arc::new(Shared {
        inbox: Mutex::new(Some(inbox_tx)),
        rejection: Mutex::new(None),
        closed: AtomicBool::new(false),
    });

    let transport = MemoryTransport {
        // ---
        transport_id: transport_id.into(),
        next_frame_id: AtomicU64::new(1),
        shared: shared.clone(),
        inbox_rx: Mutex::new(Some(inbox_rx)),
        sent: sent_tx,
    };

    let peer = MemoryPeer {
        shared,
        sent: sent_rx,
    };

    Ok((Arc::new(transport), peer))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::WireEnvelope;
    use serde_json::json;

    #[tokio::test]
    async fn test_frame_ids_increase() {
        // ---
        let (transport, mut peer) = create_transport("t").await.unwrap();

        let first = transport
            .send_frame(OutboundFrame::new("ping", WireEnvelope::default()))
            .await
            .unwrap();
        let second = transport
            .send_frame(OutboundFrame::new("ping", WireEnvelope::default()))
            .await
            .unwrap();

        assert_eq!(first, FrameId(1));
        assert_eq!(second, FrameId(2));
        assert_eq!(peer.next_sent().await.unwrap().frame_id, first);
        assert_eq!(peer.next_sent().await.unwrap().frame_id, second);
    }

    #[tokio::test]
    async fn test_single_subscriber() {
        // ---
        let (transport, _peer) = create_transport("t").await.unwrap();

        assert!(transport.subscribe().await.is_ok());
        assert!(matches!(
            transport.subscribe().await,
            Err(RpcError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_delivery_order() {
        // ---
        let (transport, peer) = create_transport("t").await.unwrap();
        let mut handle = transport.subscribe().await.unwrap();

        peer.emit("a", json!(1)).await.unwrap();
        peer.respond(FrameId(3), json!({})).await.unwrap();

        match handle.inbox.recv().await {
            Some(TransportEvent::Frame(frame)) => assert_eq!(frame.command(), Some("a")),
            other => panic!("unexpected event: {other:?}"),
        }
        match handle.inbox.recv().await {
            Some(TransportEvent::Frame(frame)) => {
                assert_eq!(frame.correlation_id, Some(FrameId(3)))
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_ends_stream_and_sends() {
        // ---
        let (transport, peer) = create_transport("t").await.unwrap();
        let mut handle = transport.subscribe().await.unwrap();

        transport.close().await.unwrap();

        assert!(handle.inbox.recv().await.is_none());
        assert!(matches!(
            peer.emit("a", json!(1)).await,
            Err(RpcError::ConnectionClosed)
        ));
        assert!(matches!(
            transport
                .send_frame(OutboundFrame::new("ping", WireEnvelope::default()))
                .await,
            Err(RpcError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_rejected_sends() {
        // ---
        let (transport, peer) = create_transport("t").await.unwrap();

        peer.reject_sends(Some("socket not writable"));
        let err = transport
            .send_frame(OutboundFrame::new("ping", WireEnvelope::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Transport(ref m) if m == "socket not writable"));

        peer.reject_sends(None);
        assert!(transport
            .send_frame(OutboundFrame::new("ping", WireEnvelope::default()))
            .await
            .is_ok());
    }
}
