use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time;

use crate::{FrameId, InboundFrame, Result, RpcError};

use super::handle::ResponseHandle;
use super::response;

/// Completes one pending request with either a raw response payload or a
/// terminal error. Decoding into the caller's type happens inside.
type Completer = Box<dyn FnOnce(Result<Value>) + Send>;

struct Entry {
    ticket: u64,
    completer: Completer,

    /// Deadline task; aborted when the entry leaves the map by other means.
    timer: Option<AbortHandle>,
}

struct State {
    requests: HashMap<FrameId, Entry>,
    next_ticket: u64,
    closed: bool,
}

/// Tracks pending requests waiting for responses
///
/// Maps frame identifiers to type-erased completers wrapping oneshot
/// channels. Every transition out of the pending state removes the entry
/// under the lock first, so whichever of resolve / cancel / expire / close
/// gets there first is the only one that completes the request. Completers
/// run after the lock is released.
pub struct PendingRequests {
    // ---
    state: Mutex<State>,
}

/// Acquire the state lock, ignoring poisoning.
///
/// Completers never run under the lock, so a panic while it is held can only
/// come from a map operation and leaves no half-updated invariant behind.
fn lock_ignore_poison(m: &Mutex<State>) -> MutexGuard<'_, State> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl PendingRequests {
    // ---

    /// Create a new empty pending requests tracker
    pub fn new() -> Arc<Self> {
        // ---
        Arc::new(Self {
            state: Mutex::new(State {
                requests: HashMap::new(),
                next_ticket: 0,
                closed: false,
            }),
        })
    }

    /// Register a new pending request
    ///
    /// Returns a handle that resolves to the response decoded as `T`. If
    /// the engine has been torn down the handle is already completed with
    /// [`RpcError::ConnectionClosed`].
    ///
    /// With a `timeout`, the deadline runs from registration on its own
    /// task: the entry expires with [`RpcError::Timeout`] whether or not
    /// anyone is awaiting the handle. Must be called within a tokio runtime
    /// when `timeout` is set.
    pub fn register<T>(self: &Arc<Self>, frame_id: FrameId, timeout: Option<Duration>) -> ResponseHandle<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        // ---
        let (tx, rx) = oneshot::channel::<Result<T>>();

        let completer: Completer = Box::new(move |outcome: Result<Value>| {
            let typed = outcome.and_then(|payload| response::decode::<T>(frame_id, payload));
            // Receiver gone means the caller dropped its handle.
            let _ = tx.send(typed);
        });

        let (ticket, displaced) = {
            let mut state = lock_ignore_poison(&self.state);
            state.next_ticket += 1;
            let ticket = state.next_ticket;

            if state.closed {
                drop(state);
                completer(Err(RpcError::ConnectionClosed));
                return ResponseHandle::new(frame_id, ticket, timeout, rx, self.clone());
            }

            let timer = timeout.map(|limit| self.spawn_timer(frame_id, ticket, limit));
            let displaced = state.requests.insert(
                frame_id,
                Entry {
                    ticket,
                    completer,
                    timer,
                },
            );
            (ticket, displaced)
        };

        if let Some(previous) = displaced {
            crate::log_warn!("frame id {frame_id} reused while a request was still pending");
            if let Some(timer) = previous.timer {
                timer.abort();
            }
            (previous.completer)(Err(RpcError::Transport(format!(
                "frame id {frame_id} reused before a response arrived"
            ))));
        }

        ResponseHandle::new(frame_id, ticket, timeout, rx, self.clone())
    }

    fn spawn_timer(self: &Arc<Self>, frame_id: FrameId, ticket: u64, limit: Duration) -> AbortHandle {
        // ---
        let pending = Arc::downgrade(self);

        tokio::spawn(async move {
            time::sleep(limit).await;

            // Whoever removed the entry first has already completed it.
            let Some(pending) = pending.upgrade() else {
                return;
            };
            if pending.expire_ticket(frame_id, ticket) {
                crate::log_debug!("request {frame_id} timed out after {limit:?}");
            }
        })
        .abort_handle()
    }

    /// Resolve the request matching `frame.correlation_id`, if any
    ///
    /// Returns true if a pending request was found and completed. Frames
    /// without an identifier, or with one nobody is waiting for (including
    /// duplicates of an already resolved response), return false and leave
    /// the engine untouched.
    pub fn try_resolve(&self, frame: &InboundFrame) -> bool {
        // ---
        let Some(frame_id) = frame.correlation_id else {
            return false;
        };

        let Some(completer) = self.take(frame_id, None) else {
            return false;
        };

        completer(Ok(frame.payload.clone()));
        true
    }

    /// Cancel a pending request
    ///
    /// Returns false if the request had already reached a terminal state.
    pub fn cancel(&self, frame_id: FrameId) -> bool {
        // ---
        self.complete_with(frame_id, None, RpcError::Cancelled)
    }

    /// Time out a pending request
    ///
    /// Returns false if the request had already reached a terminal state,
    /// in which case the earlier outcome stands.
    pub fn expire(&self, frame_id: FrameId) -> bool {
        // ---
        self.complete_with(frame_id, None, RpcError::Timeout)
    }

    /// Remove a pending request without delivering anything
    pub fn discard(&self, frame_id: FrameId) -> bool {
        // ---
        self.take(frame_id, None).is_some()
    }

    // Handle-side variants: only touch the entry the handle was issued for,
    // never a later registration that reused the same frame id.

    pub(super) fn cancel_ticket(&self, frame_id: FrameId, ticket: u64) -> bool {
        self.complete_with(frame_id, Some(ticket), RpcError::Cancelled)
    }

    pub(super) fn expire_ticket(&self, frame_id: FrameId, ticket: u64) -> bool {
        self.complete_with(frame_id, Some(ticket), RpcError::Timeout)
    }

    pub(super) fn discard_ticket(&self, frame_id: FrameId, ticket: u64) -> bool {
        self.take(frame_id, Some(ticket)).is_some()
    }

    /// Fail every pending request with [`RpcError::ConnectionClosed`]
    ///
    /// Returns the number of requests failed. New registrations are still
    /// accepted afterwards.
    pub fn fail_all(&self) -> usize {
        // ---
        let drained: Vec<Completer> = {
            let mut state = lock_ignore_poison(&self.state);
            state
                .requests
                .drain()
                .map(|(_, entry)| {
                    if let Some(timer) = entry.timer {
                        timer.abort();
                    }
                    entry.completer
                })
                .collect()
        };

        let count = drained.len();
        for completer in drained {
            completer(Err(RpcError::ConnectionClosed));
        }
        count
    }

    /// Fail every pending request and refuse new ones
    pub fn teardown(&self) -> usize {
        // ---
        lock_ignore_poison(&self.state).closed = true;
        self.fail_all()
    }

    pub fn is_closed(&self) -> bool {
        lock_ignore_poison(&self.state).closed
    }

    pub fn contains(&self, frame_id: FrameId) -> bool {
        lock_ignore_poison(&self.state).requests.contains_key(&frame_id)
    }

    /// Get the number of pending requests
    pub fn len(&self) -> usize {
        // ---
        lock_ignore_poison(&self.state).requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, frame_id: FrameId, ticket: Option<u64>) -> Option<Completer> {
        // ---
        let mut state = lock_ignore_poison(&self.state);
        match (state.requests.get(&frame_id), ticket) {
            (None, _) => return None,
            (Some(entry), Some(ticket)) if entry.ticket != ticket => return None,
            _ => {}
        }
        let entry = state.requests.remove(&frame_id)?;
        if let Some(timer) = entry.timer {
            timer.abort();
        }
        Some(entry.completer)
    }

    fn complete_with(&self, frame_id: FrameId, ticket: Option<u64>, error: RpcError) -> bool {
        // ---
        match self.take(frame_id, ticket) {
            Some(completer) => {
                completer(Err(error));
                true
            }
            None => false,
        }
    }
}
