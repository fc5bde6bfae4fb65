//! Cooperative cancellation shared by the supervisor and its listeners.
//!
//! Cancelling the token:
//! 1. sets the flag every listener checks between messages,
//! 2. wakes any listener sleeping out a reconnect backoff,
//! 3. fires the [`Interrupter`] of every registered subscription so a
//!    blocked `recv()` returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::app::ports::Interrupter;

#[derive(Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    sleep_lock: Mutex<()>,
    wake: Condvar,
    interrupters: Mutex<HashMap<u64, Interrupter>>,
    next_id: AtomicU64,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request shutdown.  Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let _guard = self.inner.sleep_lock.lock();
            self.inner.wake.notify_all();
        }
        let interrupters: Vec<Interrupter> =
            self.inner.interrupters.lock().values().cloned().collect();
        for i in interrupters {
            i.interrupt();
        }
    }

    /// Register a subscription's interrupter for as long as the returned
    /// guard lives.  Fires immediately if shutdown was already requested.
    pub fn register(&self, interrupter: Interrupter) -> Registration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.interrupters.lock().insert(id, interrupter.clone());
        if self.is_cancelled() {
            interrupter.interrupt();
        }
        Registration {
            token: self.clone(),
            id,
        }
    }

    /// Sleep for `duration` or until cancelled.  Returns `true` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.inner.sleep_lock.lock();
        while !self.is_cancelled() {
            if self.inner.wake.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.is_cancelled()
    }
}

/// Unregisters an interrupter on drop.
pub struct Registration {
    token: ShutdownToken,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.token.inner.interrupters.lock().remove(&self.id);
    }
}
