//! Cooperative cancellation with stop callbacks
//!
//! A `StopSource` is held by whoever decides to cancel. Any number of
//! `StopToken`s observe it. Callbacks registered with `on_stop` run exactly
//! once: immediately if the source already fired, otherwise on the thread
//! that calls `request_stop`.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

type Callback = Box<dyn FnOnce() + Send>;

struct StopState {
    stopped: AtomicBool,
    next_id: AtomicU64,
    /// Callbacks waiting for the stop. Never held while a callback runs.
    callbacks: Mutex<Vec<(u64, Callback)>>,
}

impl StopState {
    fn new() -> Self {
        Self {
            stopped: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    fn callbacks(&self) -> MutexGuard<'_, Vec<(u64, Callback)>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_requested(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn request_stop(&self) -> bool {
        let pending = {
            let mut callbacks = self.callbacks();
            if self.stopped.swap(true, Ordering::AcqRel) {
                return false;
            }
            std::mem::take(&mut *callbacks)
        };
        for (_, callback) in pending {
            callback();
        }
        true
    }
}

impl fmt::Debug for StopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopState")
            .field("stopped", &self.stop_requested())
            .field("callbacks", &self.callbacks().len())
            .finish()
    }
}

/// The triggering side of a cooperative cancellation pair.
///
/// Clones share the same state; stopping one stops them all.
#[derive(Debug, Clone)]
pub struct StopSource {
    state: Arc<StopState>,
}

impl StopSource {
    pub fn new() -> Self {
        Self {
            state: Arc::new(StopState::new()),
        }
    }

    /// A token observing this source.
    pub fn token(&self) -> StopToken {
        StopToken {
            state: Some(self.state.clone()),
        }
    }

    /// Trigger the source.
    ///
    /// Returns `true` only for the call that actually flipped the source.
    /// Registered callbacks run on the calling thread before this returns.
    pub fn request_stop(&self) -> bool {
        self.state.request_stop()
    }

    pub fn stop_requested(&self) -> bool {
        self.state.stop_requested()
    }

    /// Trigger the source once `delay` has elapsed.
    ///
    /// Aborting the returned handle before the delay disarms the timer.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn request_stop_after(&self, delay: Duration) -> JoinHandle<()> {
        let source = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if source.request_stop() {
                tracing::debug!(?delay, "stop requested by timer");
            }
        })
    }
}

impl Default for StopSource {
    fn default() -> Self {
        Self::new()
    }
}

/// The observing side of a cooperative cancellation pair.
#[derive(Debug, Clone)]
pub struct StopToken {
    /// `None` for a token that can never be stopped.
    state: Option<Arc<StopState>>,
}

impl StopToken {
    /// A token with no source; it never reports a stop.
    pub fn never() -> Self {
        Self { state: None }
    }

    pub fn stop_requested(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.stop_requested())
    }

    /// Run `callback` once when the source is stopped.
    ///
    /// If the source is already stopped, the callback runs synchronously
    /// before this returns. Dropping the returned guard deregisters the
    /// callback, but a `request_stop` racing on another thread may already
    /// have claimed it and will still run it.
    pub fn on_stop<F>(&self, callback: F) -> StopCallback
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(state) = &self.state else {
            return StopCallback::inert();
        };
        {
            let mut callbacks = state.callbacks();
            if !state.stop_requested() {
                let id = state.next_id.fetch_add(1, Ordering::Relaxed);
                callbacks.push((id, Box::new(callback)));
                return StopCallback {
                    state: Arc::downgrade(state),
                    id: Some(id),
                };
            }
        }
        callback();
        StopCallback::inert()
    }

    /// Resolve once the source is stopped. Never resolves for `never()`.
    pub async fn stopped(&self) {
        if self.state.is_none() {
            std::future::pending::<()>().await;
        }
        let (tx, rx) = oneshot::channel::<()>();
        let _callback = self.on_stop(move || {
            let _ = tx.send(());
        });
        let _ = rx.await;
    }
}

impl Default for StopToken {
    fn default() -> Self {
        Self::never()
    }
}

/// Registration guard for an `on_stop` callback.
#[derive(Debug)]
#[must_use = "dropping the guard deregisters the callback"]
pub struct StopCallback {
    state: Weak<StopState>,
    id: Option<u64>,
}

impl StopCallback {
    fn inert() -> Self {
        Self {
            state: Weak::new(),
            id: None,
        }
    }
}

impl Drop for StopCallback {
    fn drop(&mut self) {
        let (Some(id), Some(state)) = (self.id, self.state.upgrade()) else {
            return;
        };
        state.callbacks().retain(|(registered, _)| *registered != id);
    }
}
