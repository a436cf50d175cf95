// src/client/mod.rs
//! Multiplexing client.
//!
//! This module contains the [`MuxClient`] type which sends command messages
//! over a transport, correlates responses with the requests that caused them,
//! and broadcasts every decoded inbound event to subscribers.
//!
//! # Architecture
//!
//! The client subscribes to the transport's event inbox and runs a background
//! receive loop (see `inbound`). Each request is serialized through the
//! serializer registry (see `outbound`), sent, and registered in the pending
//! map under the frame identifier the transport returned. When a frame with
//! that identifier arrives, the receive loop completes the request.
//!
//! # Concurrency
//!
//! Any number of tasks may send concurrently with the receive loop. The
//! pending map is protected by a mutex, and a send gate keeps the receive
//! loop from missing a response that arrives before its request finished
//! registering.

mod inbound;
mod outbound;
mod send_gate;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::{
    // ---
    ClientConfig,
    CommandToken,
    FrameId,
    Message,
    PendingRequests,
    ResponseHandle,
    Result,
    SerializerPtr,
    SerializerRegistry,
    TransportPtr,
};

pub use inbound::FrameDiagnostic;

use inbound::InboundRouter;
use send_gate::SendGate;

/// Acquire a mutex guard, intentionally ignoring poisoning.
///
/// The only value behind it is the receive loop's join handle.
fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Running client instance.
///
/// Cheap to clone (internally `Arc`-backed). The receive loop stops and all
/// pending requests fail with `ConnectionClosed` when the last clone is
/// dropped or [`disconnect`](Self::disconnect) is called.
#[derive(Clone)]
pub struct MuxClient {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    transport: TransportPtr,
    config: ClientConfig,
    registry: Arc<SerializerRegistry>,
    pending: Arc<PendingRequests>,
    events: broadcast::Sender<Arc<dyn Message>>,
    diagnostics: broadcast::Sender<FrameDiagnostic>,
    send_gate: Arc<SendGate>,
    rx_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // ---
        if let Some(task) = lock_ignore_poison(&self.rx_task).take() {
            task.abort();
        }
        self.pending.teardown();
    }
}

impl MuxClient {
    // ---
    /// Create a client over `transport` with an empty serializer registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport refuses the subscription.
    pub async fn with_transport(transport: TransportPtr, config: ClientConfig) -> Result<Self> {
        // ---
        Self::with_registry(transport, config, SerializerRegistry::new()).await
    }

    /// Create a client over `transport` with a prepared serializer registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport refuses the subscription.
    pub async fn with_registry(
        transport: TransportPtr,
        config: ClientConfig,
        registry: SerializerRegistry,
    ) -> Result<Self> {
        // ---
        let handle = transport.subscribe().await?;

        let registry = Arc::new(registry);
        let pending = PendingRequests::new();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (diagnostics, _) = broadcast::channel(config.diagnostics_capacity.max(1));
        let send_gate = Arc::new(SendGate::new());

        let router = InboundRouter {
            client_id: config.client_id.clone(),
            registry: registry.clone(),
            pending: pending.clone(),
            events: events.clone(),
            diagnostics: diagnostics.clone(),
            send_gate: send_gate.clone(),
            throw_on_unknown_command: config.throw_on_unknown_command,
        };
        let rx_task = router.spawn(handle);

        crate::log_info!(
            "client {} attached to transport {}",
            config.client_id,
            transport.transport_id()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                config,
                registry,
                pending,
                events,
                diagnostics,
                send_gate,
                rx_task: Mutex::new(Some(rx_task)),
            }),
        })
    }

    /// Send a request and return a handle on its response.
    ///
    /// Uses the configured `request_timeout`.
    ///
    /// # Errors
    ///
    /// - `RpcError::UnknownCommand` if no serializer is bound and the client
    ///   is configured to throw on unknown commands
    /// - `RpcError::Serialization` if the serializer fails
    /// - any error returned by the transport
    pub async fn send<T>(&self, message: &dyn Message) -> Result<ResponseHandle<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        // ---
        self.send_with_timeout(message, self.inner.config.request_timeout)
            .await
    }

    /// Send a request with a custom response timeout.
    ///
    /// `None` waits until the response, a cancel, or connection teardown.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_with_timeout<T>(
        &self,
        message: &dyn Message,
        timeout: Option<Duration>,
    ) -> Result<ResponseHandle<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        // ---
        let _gate = self.inner.send_gate.enter().await;

        let frame_id = self.dispatch(message).await?;
        Ok(self.inner.pending.register::<T>(frame_id, timeout))
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// Any error from [`send`](Self::send) or from
    /// [`ResponseHandle::wait`].
    pub async fn request<T>(&self, message: &dyn Message) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        // ---
        self.send::<T>(message).await?.wait().await
    }

    /// Send a message without waiting for any response.
    ///
    /// Returns the frame identifier the transport assigned.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn emit(&self, message: &dyn Message) -> Result<FrameId> {
        // ---
        self.dispatch(message).await
    }

    async fn dispatch(&self, message: &dyn Message) -> Result<FrameId> {
        // ---
        outbound::dispatch(
            &self.inner.transport,
            &self.inner.registry,
            self.inner.config.throw_on_unknown_command,
            message,
        )
        .await
    }

    /// Bind a serializer to a command, replacing any previous binding.
    pub fn register_serializer(&self, token: impl Into<CommandToken>, strategy: SerializerPtr) {
        // ---
        self.inner.registry.register(token, strategy);
    }

    /// Serializer registry shared with the receive loop.
    pub fn registry(&self) -> &SerializerRegistry {
        &self.inner.registry
    }

    /// Subscribe to every decoded inbound event.
    ///
    /// Messages are delivered in arrival order. A correlated response that
    /// is also an event frame shows up here as well.
    pub fn subscribe_messages(&self) -> broadcast::Receiver<Arc<dyn Message>> {
        self.inner.events.subscribe()
    }

    /// Subscribe to reports of inbound frames that could not be processed.
    pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<FrameDiagnostic> {
        self.inner.diagnostics.subscribe()
    }

    pub fn client_id(&self) -> &str {
        &self.inner.config.client_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn throw_on_unknown_command(&self) -> bool {
        self.inner.config.throw_on_unknown_command
    }

    /// Number of requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Close the transport and fail every pending request with
    /// `ConnectionClosed`.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error, after pending requests have
    /// been failed.
    pub async fn disconnect(&self) -> Result<()> {
        // ---
        let closed = self.inner.transport.close().await;
        let failed = self.inner.pending.teardown();
        crate::log_info!(
            "client {} disconnected, {failed} pending requests closed",
            self.inner.config.client_id
        );
        closed
    }
}
