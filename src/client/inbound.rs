// src/client/inbound.rs

//! Inbound router.
//!
//! Drives the receive loop over the transport's event inbox. Each frame is
//! offered to the correlation engine by its identifier, and event frames are
//! additionally decoded through the serializer registry and published to
//! every message subscriber.
//!
//! ## Error handling
//!
//! Failures while handling one frame (unknown command, malformed payload,
//! serializer errors) are logged and published as [`FrameDiagnostic`]s. They
//! never terminate the receive loop.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::{
    // ---
    CommandToken,
    FrameId,
    InboundFrame,
    Message,
    PendingRequests,
    Result,
    RpcError,
    SerializerRegistry,
    SubscriptionHandle,
    TransportEvent,
    WireEnvelope,
};

use super::send_gate::SendGate;

/// Report of an inbound frame the router could not process.
#[derive(Clone, Debug)]
pub struct FrameDiagnostic {
    // ---
    /// Correlation identifier carried by the frame, if any.
    pub correlation_id: Option<FrameId>,

    /// Command token of the frame, if one could be read.
    pub command: Option<String>,

    /// What went wrong.
    pub error: Arc<RpcError>,
}

pub(crate) struct InboundRouter {
    // ---
    pub(crate) client_id: String,
    pub(crate) registry: Arc<SerializerRegistry>,
    pub(crate) pending: Arc<PendingRequests>,
    pub(crate) events: broadcast::Sender<Arc<dyn Message>>,
    pub(crate) diagnostics: broadcast::Sender<FrameDiagnostic>,
    pub(crate) send_gate: Arc<SendGate>,
    pub(crate) throw_on_unknown_command: bool,
}

impl InboundRouter {
    // ---

    /// Start the receive loop on a background task.
    ///
    /// The loop ends when the transport closes the inbox; the correlation
    /// engine is torn down at that point so no caller waits forever.
    pub(crate) fn spawn(self, mut handle: SubscriptionHandle) -> JoinHandle<()> {
        // ---
        tokio::spawn(async move {
            crate::log_debug!("receive loop started for {}", self.client_id);

            while let Some(event) = handle.inbox.recv().await {
                self.on_transport_event(event).await;
            }

            let failed = self.pending.teardown();
            crate::log_debug!(
                "receive loop stopped for {}, {failed} pending requests closed",
                self.client_id
            );
        })
    }

    pub(crate) async fn on_transport_event(&self, event: TransportEvent) {
        // ---
        match event {
            TransportEvent::Frame(frame) => {
                let correlation_id = frame.correlation_id;
                let command = frame.command().map(str::to_string);

                if let Err(err) = self.on_raw_frame(frame).await {
                    self.report(correlation_id, command, err);
                }
            }
            TransportEvent::Disconnected { reason } => {
                let failed = self.pending.fail_all();
                crate::log_info!(
                    "{} disconnected ({}), {failed} pending requests closed",
                    self.client_id,
                    reason.as_deref().unwrap_or("no reason given")
                );
            }
            TransportEvent::Error(details) => {
                crate::log_error!("{} transport error: {details}", self.client_id);
                self.report(None, None, RpcError::Transport(details));
            }
        }
    }

    /// Route one raw frame.
    pub(crate) async fn on_raw_frame(&self, frame: InboundFrame) -> Result<()> {
        // ---
        crate::log_debug!("< {frame}");

        if frame.correlation_id.is_some() && !self.pending.try_resolve(&frame) {
            // A send may have put this frame on the wire and not yet
            // registered its entry. Wait for in-flight sends, then retry.
            self.send_gate.drain().await;
            self.pending.try_resolve(&frame);
        }

        if !frame.frame_type.is_event() {
            return Ok(());
        }

        let (command, envelope) = split_event(frame)?;

        let serializer = self
            .registry
            .resolve_or_fallback(command.as_str(), self.throw_on_unknown_command)?;

        let Some(message) = serializer.deserialize(&command, envelope)? else {
            crate::log_debug!("serializer for `{command}` filtered the frame");
            return Ok(());
        };

        // No receivers is not an error.
        let _ = self.events.send(message);
        Ok(())
    }

    fn report(&self, correlation_id: Option<FrameId>, command: Option<String>, error: RpcError) {
        // ---
        crate::log_warn!(
            "{} failed to process inbound frame (command: {}): {error}",
            self.client_id,
            command.as_deref().unwrap_or("-")
        );

        let _ = self.diagnostics.send(FrameDiagnostic {
            correlation_id,
            command,
            error: Arc::new(error),
        });
    }
}

/// Split an event payload `[command, body, ..]` into its command token and
/// envelope. A missing body becomes `null`; later elements are ignored.
fn split_event(frame: InboundFrame) -> Result<(CommandToken, WireEnvelope)> {
    // ---
    let Value::Array(items) = frame.payload else {
        return Err(RpcError::InvalidFrame(
            "event payload is not an array".into(),
        ));
    };

    let mut items = items.into_iter();
    let command = match items.next() {
        Some(Value::String(command)) => CommandToken::from(command),
        _ => {
            return Err(RpcError::InvalidFrame(
                "event payload does not start with a command".into(),
            ))
        }
    };
    let body = items.next().unwrap_or(Value::Null);

    Ok((command, WireEnvelope::new(body, frame.attachments)))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{FrameType, GenericMessage, JsonMessageSerializer, MessageSerializer};
    use bytes::Bytes;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Chat {
        text: String,
    }

    crate::impl_message!(Chat, "message send");

    /// Drops every frame it sees.
    struct Silent;

    impl MessageSerializer for Silent {
        fn serialize(&self, message: &dyn Message) -> Result<WireEnvelope> {
            Ok(WireEnvelope::json(message.to_payload().unwrap_or_default()))
        }

        fn deserialize(
            &self,
            _command: &CommandToken,
            _envelope: WireEnvelope,
        ) -> Result<Option<Arc<dyn Message>>> {
            Ok(None)
        }
    }

    struct Harness {
        router: InboundRouter,
        events: broadcast::Receiver<Arc<dyn Message>>,
        diagnostics: broadcast::Receiver<FrameDiagnostic>,
    }

    fn harness(throw_on_unknown_command: bool) -> Harness {
        // ---
        let (events_tx, events) = broadcast::channel(16);
        let (diagnostics_tx, diagnostics) = broadcast::channel(16);

        let registry = SerializerRegistry::new();
        registry.register("message send", Arc::new(JsonMessageSerializer::<Chat>::new()));
        registry.register("typing", Arc::new(Silent));

        let router = InboundRouter {
            client_id: "test".into(),
            registry: Arc::new(registry),
            pending: PendingRequests::new(),
            events: events_tx,
            diagnostics: diagnostics_tx,
            send_gate: Arc::new(SendGate::new()),
            throw_on_unknown_command,
        };

        Harness {
            router,
            events,
            diagnostics,
        }
    }

    #[tokio::test]
    async fn test_event_routed_to_subscribers() {
        // ---
        let mut h = harness(true);

        h.router
            .on_raw_frame(InboundFrame::event("Message Send", json!({ "text": "hi" })))
            .await
            .unwrap();

        let message = h.events.try_recv().unwrap();
        assert_eq!(
            message.downcast_ref::<Chat>(),
            Some(&Chat { text: "hi".into() })
        );
    }

    #[tokio::test]
    async fn test_non_event_frames_ignored() {
        // ---
        let mut h = harness(true);

        let frame = InboundFrame::new(FrameType::Other, None, json!(["message send", {}]));
        h.router.on_raw_frame(frame).await.unwrap();

        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_command_fails_when_throwing() {
        // ---
        let h = harness(true);

        let err = h
            .router
            .on_raw_frame(InboundFrame::event("group update", json!({ "id": 1 })))
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::UnknownCommand(ref c) if c == "group update"));
    }

    #[tokio::test]
    async fn test_unknown_command_falls_back() {
        // ---
        let mut h = harness(false);
        let attachment = Bytes::from_static(b"voice-note");

        let frame = InboundFrame::event("group update", json!({ "id": 1 }))
            .with_attachments(vec![attachment.clone()]);
        h.router.on_raw_frame(frame).await.unwrap();

        let message = h.events.try_recv().unwrap();
        let generic = message.downcast_ref::<GenericMessage>().unwrap();
        assert_eq!(generic.command.as_str(), "group update");
        assert_eq!(generic.payload, json!({ "id": 1 }));
        assert_eq!(generic.attachments, vec![attachment]);
    }

    #[tokio::test]
    async fn test_filtered_frame_not_published() {
        // ---
        let mut h = harness(true);

        h.router
            .on_raw_frame(InboundFrame::event("typing", json!({})))
            .await
            .unwrap();

        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_event() {
        // ---
        let h = harness(true);

        let frame = InboundFrame::new(FrameType::Event, None, json!({ "text": "hi" }));
        let err = h.router.on_raw_frame(frame).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidFrame(_)));

        let frame = InboundFrame::new(FrameType::Event, None, json!([42, {}]));
        let err = h.router.on_raw_frame(frame).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidFrame(_)));
    }

    #[tokio::test]
    async fn test_correlated_event_resolves_and_publishes() {
        // ---
        let mut h = harness(true);
        let handle = h.router.pending.register::<Value>(FrameId(11), None);

        let frame = InboundFrame::event("message send", json!({ "text": "echo" }))
            .with_correlation_id(FrameId(11));
        h.router.on_raw_frame(frame).await.unwrap();

        // Event payloads reach the caller raw, command included.
        assert_eq!(handle.await.unwrap(), json!("message send"));
        assert!(h.events.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_unclaimed_ack_does_not_wait_when_idle() {
        // ---
        let mut h = harness(true);

        let frame = InboundFrame::ack(FrameId(99), json!(["late"]));
        tokio::time::timeout(std::time::Duration::from_millis(50), h.router.on_raw_frame(frame))
            .await
            .expect("router stalled on an unclaimed ack")
            .unwrap();

        assert!(h.events.try_recv().is_err());
        assert!(h.diagnostics.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failures_reported_as_diagnostics() {
        // ---
        let mut h = harness(true);

        h.router
            .on_transport_event(TransportEvent::Frame(InboundFrame::event(
                "group update",
                json!({}),
            )))
            .await;
        h.router
            .on_transport_event(TransportEvent::Error("socket reset".into()))
            .await;

        let first = h.diagnostics.try_recv().unwrap();
        assert_eq!(first.command.as_deref(), Some("group update"));
        assert!(matches!(*first.error, RpcError::UnknownCommand(_)));

        let second = h.diagnostics.try_recv().unwrap();
        assert!(matches!(*second.error, RpcError::Transport(_)));
    }

    #[tokio::test]
    async fn test_disconnect_fails_pending() {
        // ---
        let h = harness(true);
        let handle = h.router.pending.register::<Value>(FrameId(1), None);

        h.router
            .on_transport_event(TransportEvent::Disconnected {
                reason: Some("server restart".into()),
            })
            .await;

        assert!(matches!(handle.await, Err(RpcError::ConnectionClosed)));
        assert!(!h.router.pending.is_closed());
    }
}
