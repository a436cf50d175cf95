// src/client/send_gate.rs

//! Ordering between sends and the receive loop.
//!
//! A send holds a [`SendGuard`] from before the frame goes out until its
//! response entry is registered. The receive loop, holding a correlated
//! frame nobody claimed, calls [`SendGate::drain`] before looking again:
//! if the frame's request was still registering, the second look finds it.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{RwLock, RwLockReadGuard};

pub(crate) struct SendGate {
    // ---
    lock: RwLock<()>,
    in_flight: AtomicUsize,
}

pub(crate) struct SendGuard<'a> {
    // ---
    gate: &'a SendGate,
    _read: RwLockReadGuard<'a, ()>,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SendGate {
    // ---
    pub(crate) fn new() -> Self {
        // ---
        Self {
            lock: RwLock::new(()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Mark a send as in flight until the guard drops.
    pub(crate) async fn enter(&self) -> SendGuard<'_> {
        // ---
        // Counted before the frame can reach the wire.
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let read = self.lock.read().await;

        SendGuard {
            gate: self,
            _read: read,
        }
    }

    /// Wait until every send that was in flight has finished registering.
    ///
    /// Returns at once when nothing is in flight, so unclaimed acks for
    /// emitted or expired frames do not stall the receive loop.
    pub(crate) async fn drain(&self) {
        // ---
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            return;
        }
        let _write = self.lock.write().await;
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}
