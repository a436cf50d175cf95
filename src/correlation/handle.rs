// src/correlation/handle.rs

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::{FrameId, Result, RpcError};

use super::PendingRequests;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Caller-side handle on one pending request.
///
/// Awaiting the handle (or calling [`wait`](Self::wait)) yields the decoded
/// response or the request's terminal error. Dropping the handle removes the
/// request from the engine.
///
/// ```no_run
/// # use muxwire::{GenericMessage, MuxClient};
/// # use serde_json::{json, Value};
/// # async fn example(client: MuxClient) -> muxwire::Result<()> {
/// let handle = client
///     .send::<Value>(&GenericMessage::new("group profile", json!({ "id": 18 })))
///     .await?;
/// let profile = handle.await?;
/// # Ok(())
/// # }
/// ```
#[must_use = "a response handle does nothing unless awaited"]
pub struct ResponseHandle<T> {
    // ---
    frame_id: FrameId,
    ticket: u64,
    timeout: Option<Duration>,
    rx: oneshot::Receiver<Result<T>>,
    pending: Arc<PendingRequests>,
}

impl<T> ResponseHandle<T> {
    // ---
    pub(super) fn new(
        frame_id: FrameId,
        ticket: u64,
        timeout: Option<Duration>,
        rx: oneshot::Receiver<Result<T>>,
        pending: Arc<PendingRequests>,
    ) -> Self {
        // ---
        Self {
            frame_id,
            ticket,
            timeout,
            rx,
            pending,
        }
    }

    /// Identifier of the outbound frame this handle waits on.
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Deadline the request was registered with, counted from registration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Cancel the request.
    ///
    /// Returns false if the request already reached a terminal state; a
    /// response that reached the engine first still wins.
    pub fn cancel(&self) -> bool {
        // ---
        self.pending.cancel_ticket(self.frame_id, self.ticket)
    }

    /// Wait for the request's outcome.
    ///
    /// The deadline is not restarted here: a handle awaited after its
    /// request already expired returns [`RpcError::Timeout`] at once.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Timeout`] if the deadline passes first
    /// - [`RpcError::Cancelled`] if the request was cancelled
    /// - [`RpcError::ConnectionClosed`] if the connection went away
    /// - [`RpcError::InvalidResponse`] if the response does not decode as `T`
    pub async fn wait(mut self) -> Result<T> {
        // ---
        (&mut self.rx)
            .await
            .unwrap_or(Err(RpcError::ConnectionClosed))
    }
}

impl<T> std::fmt::Debug for ResponseHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("frame_id", &self.frame_id)
            .field("ticket", &self.ticket)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for ResponseHandle<T> {
    fn drop(&mut self) {
        self.pending.discard_ticket(self.frame_id, self.ticket);
    }
}

impl<T> IntoFuture for ResponseHandle<T>
where
    T: Send + 'static,
{
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
