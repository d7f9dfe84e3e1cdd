//! EventBridge: turns a callback-driven source into awaitable events
//!
//! The bridge registers with its adapter once at construction and hands out
//! `Next` futures, each resolving to the next event or `Cancelled`. Only one
//! `Next` may be pending at a time; events arriving while none is pending are
//! discarded.

use super::emitter::{Emitter, Shared};
use super::error::{abort_on_fault, usage_violation, Cancelled, NextResult};
use super::pending::{Outcome, PendingWait};
use super::traits::Adapter;
use crate::stop::{StopCallback, StopToken};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::sync::oneshot;

/// Owns one adapter registration and the single pending-wait slot.
pub struct EventBridge<E, A>
where
    E: Send + 'static,
    A: Adapter<E>,
{
    shared: Arc<Shared<E>>,
    token: StopToken,
    adapter: A,
    /// `None` once `destroy()` has run.
    registration: Option<A::Registration>,
    _on_stop: StopCallback,
}

impl<E, A> EventBridge<E, A>
where
    E: Send + 'static,
    A: Adapter<E>,
{
    /// Register with `adapter` and observe `token` for bridge-wide stop.
    ///
    /// When `token` fires, the pending wait (if any) completes as
    /// `Cancelled` and every later `next()` is cancelled immediately. The
    /// registration stays in place until `destroy()`.
    pub fn new(token: StopToken, mut adapter: A) -> Self {
        let shared = Arc::new(Shared::new());
        let registration = match adapter.register(Emitter::new(shared.clone())) {
            Ok(registration) => registration,
            Err(fault) => abort_on_fault(adapter.id(), &fault),
        };
        tracing::debug!(adapter = adapter.id(), "event source registered");

        let on_stop = token.on_stop({
            let shared = shared.clone();
            move || {
                if shared.stop_pending() {
                    tracing::debug!("pending wait cancelled by bridge stop");
                }
            }
        });

        Self {
            shared,
            token,
            adapter,
            registration: Some(registration),
            _on_stop: on_stop,
        }
    }

    /// Wait for the next event.
    pub fn next(&self) -> Next<E> {
        self.next_with(StopToken::never())
    }

    /// Wait for the next event, also giving up when `token` fires.
    ///
    /// `token` only affects this wait; the bridge keeps running.
    pub fn next_with(&self, token: StopToken) -> Next<E> {
        Next {
            shared: self.shared.clone(),
            bridge_token: self.token.clone(),
            op_token: token,
            state: State::Idle,
        }
    }

    /// The lazy, unbounded sequence of `next()` operations.
    pub fn events(&self) -> Events<E> {
        Events {
            shared: self.shared.clone(),
            token: self.token.clone(),
        }
    }

    /// Unregister from the adapter and cancel any pending wait.
    ///
    /// Only the first call does anything. Dropping this future before it
    /// finishes leaves the registration in the adapter's hands. A bridge
    /// dropped without `destroy()` unregisters through
    /// `Adapter::unregister_now`.
    pub async fn destroy(&mut self) {
        let Some(registration) = self.registration.take() else {
            return;
        };
        if let Err(fault) = self.adapter.unregister(registration).await {
            abort_on_fault(self.adapter.id(), &fault);
        }
        self.shared.close();
        let cancelled = self.shared.stop_pending();
        tracing::debug!(
            adapter = self.adapter.id(),
            cancelled_wait = cancelled,
            "event source unregistered"
        );
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// True while a `next()` is waiting for an event.
    pub fn has_pending(&self) -> bool {
        self.shared.mailbox.is_occupied()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }
}

impl<E, A> Drop for EventBridge<E, A>
where
    E: Send + 'static,
    A: Adapter<E>,
{
    fn drop(&mut self) {
        self.shared.close();
        self.shared.stop_pending();
        let Some(registration) = self.registration.take() else {
            return;
        };
        tracing::warn!(
            adapter = self.adapter.id(),
            "event bridge dropped without destroy(), unregistering synchronously"
        );
        if let Err(fault) = self.adapter.unregister_now(registration) {
            abort_on_fault(self.adapter.id(), &fault);
        }
    }
}

impl<E, A> fmt::Debug for EventBridge<E, A>
where
    E: Send + 'static,
    A: Adapter<E>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("adapter", &self.adapter.id())
            .field("registered", &self.is_registered())
            .field("pending", &self.has_pending())
            .field("stopped", &self.token.stop_requested())
            .finish()
    }
}

enum State<E> {
    /// Not polled yet. Nothing is published until the first poll.
    Idle,
    Waiting {
        wait: Arc<PendingWait<E>>,
        rx: oneshot::Receiver<Outcome<E>>,
        _on_stop: StopCallback,
    },
    Done,
}

/// One deferred "await the next event" operation.
///
/// Resolves to `Ok(event)` when a producer emits, or `Err(Cancelled)` when a
/// stop token fires or the bridge is destroyed. Dropping a pending `Next`
/// withdraws it, so a new one may be started afterwards.
///
/// # Panics
///
/// Polling a `Next` while another `Next` of the same bridge is pending
/// panics: a bridge serves a single sequential consumer.
#[must_use = "futures do nothing unless polled"]
pub struct Next<E> {
    shared: Arc<Shared<E>>,
    bridge_token: StopToken,
    op_token: StopToken,
    state: State<E>,
}

impl<E: Send + 'static> Next<E> {
    fn start(&self) -> State<E> {
        let (wait, rx) = PendingWait::new();
        if let Err(violation) = self.shared.mailbox.publish(wait.clone()) {
            usage_violation(violation);
        }

        let on_stop = self.op_token.on_stop({
            let shared = self.shared.clone();
            let wait = wait.clone();
            move || {
                shared.cancel(&wait);
            }
        });
        // A bridge stop or destroy() may have run between the caller's check
        // and the publish above, finding an empty slot.
        if self.bridge_token.stop_requested() || self.shared.is_closed() {
            self.shared.cancel(&wait);
        }

        State::Waiting {
            wait,
            rx,
            _on_stop: on_stop,
        }
    }
}

impl<E: Send + 'static> Future for Next<E> {
    type Output = NextResult<E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if matches!(this.state, State::Idle) {
            if this.bridge_token.stop_requested()
                || this.op_token.stop_requested()
                || this.shared.is_closed()
            {
                this.state = State::Done;
                return Poll::Ready(Err(Cancelled));
            }
            this.state = this.start();
        }

        let State::Waiting { rx, .. } = &mut this.state else {
            panic!("`Next` polled after completion");
        };
        let outcome = ready!(Pin::new(rx).poll(cx));
        this.state = State::Done;

        Poll::Ready(match outcome {
            Ok(Some(event)) => Ok(event),
            Ok(None) | Err(_) => Err(Cancelled),
        })
    }
}

impl<E> Drop for Next<E> {
    fn drop(&mut self) {
        if let State::Waiting { wait, .. } = &self.state {
            self.shared.withdraw(wait);
        }
    }
}

impl<E> fmt::Debug for Next<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Idle => "idle",
            State::Waiting { .. } => "waiting",
            State::Done => "done",
        };
        f.debug_struct("Next").field("state", &state).finish()
    }
}

/// Lazy, unbounded sequence of `Next` operations from one bridge.
///
/// Each item must be awaited to completion (or dropped) before the next one
/// is polled.
pub struct Events<E> {
    shared: Arc<Shared<E>>,
    token: StopToken,
}

impl<E> Iterator for Events<E> {
    type Item = Next<E>;

    fn next(&mut self) -> Option<Next<E>> {
        Some(Next {
            shared: self.shared.clone(),
            bridge_token: self.token.clone(),
            op_token: StopToken::never(),
            state: State::Idle,
        })
    }
}

impl<E> fmt::Debug for Events<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("stopped", &self.token.stop_requested())
            .finish_non_exhaustive()
    }
}
