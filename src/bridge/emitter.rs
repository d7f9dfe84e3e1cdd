//! Producer-side dispatch and the emitter capability

use super::mailbox::Mailbox;
use super::pending::PendingWait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State shared between the bridge, its `Next` futures and the emitter.
pub(crate) struct Shared<E> {
    pub(crate) mailbox: Mailbox<E>,
    /// Set once the source is unregistered; later events are dropped.
    closed: AtomicBool,
}

impl<E> Shared<E> {
    pub(crate) fn new() -> Self {
        Self {
            mailbox: Mailbox::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Hand `event` to the pending wait, or drop it if there is none.
    pub(crate) fn dispatch(&self, event: E) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.mailbox.take() {
            Some(wait) => wait.complete(Some(event)),
            None => {
                tracing::trace!("no pending wait, event dropped");
                false
            }
        }
    }

    /// Complete whatever wait is pending as cancelled.
    pub(crate) fn stop_pending(&self) -> bool {
        self.mailbox
            .take()
            .is_some_and(|wait| wait.complete(None))
    }

    /// Cancel one specific wait, leaving a newer one alone.
    ///
    /// The slot is cleared before completing so the woken consumer can start
    /// its next wait immediately.
    pub(crate) fn cancel(&self, wait: &Arc<PendingWait<E>>) -> bool {
        self.mailbox.withdraw(wait);
        wait.complete(None)
    }

    /// Retract a wait whose consumer went away.
    pub(crate) fn withdraw(&self, wait: &Arc<PendingWait<E>>) {
        self.mailbox.withdraw(wait);
        wait.disarm();
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// The capability an adapter uses to push events into a bridge.
///
/// Cheap to clone and safe to call from any thread. `emit` never blocks and
/// never panics, so it can run inside an OS hook callback.
pub struct Emitter<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Emitter<E> {
    pub(crate) fn new(shared: Arc<Shared<E>>) -> Self {
        Self { shared }
    }

    /// Deliver `event` to the pending wait.
    ///
    /// Returns `true` if a consumer received it. With no pending wait, or
    /// after the bridge has been destroyed, the event is discarded.
    pub fn emit(&self, event: E) -> bool {
        self.shared.dispatch(event)
    }
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("closed", &self.shared.is_closed())
            .field("pending", &self.shared.mailbox.is_occupied())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_wait_is_dropped() {
        let emitter = Emitter::new(Arc::new(Shared::<u32>::new()));
        assert!(!emitter.emit(1));
    }

    #[test]
    fn emit_completes_pending_wait() {
        let shared = Arc::new(Shared::<u32>::new());
        let (wait, mut rx) = PendingWait::new();
        shared.mailbox.publish(wait).unwrap();

        let emitter = Emitter::new(shared.clone());
        assert!(emitter.emit(9));
        assert_eq!(rx.try_recv().unwrap(), Some(9));
        assert!(!shared.mailbox.is_occupied());
    }

    #[test]
    fn closed_bridge_drops_events() {
        let shared = Arc::new(Shared::<u32>::new());
        let (wait, mut rx) = PendingWait::new();
        shared.mailbox.publish(wait).unwrap();
        shared.close();

        assert!(!Emitter::new(shared.clone()).emit(1));
        assert!(rx.try_recv().is_err());
        assert!(shared.stop_pending());
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn cancel_leaves_newer_wait_installed() {
        let shared = Shared::<u32>::new();
        let (old, _old_rx) = PendingWait::new();
        let (current, _rx) = PendingWait::new();
        shared.mailbox.publish(current.clone()).unwrap();

        assert!(shared.cancel(&old));
        assert!(shared.mailbox.is_occupied());
        assert!(current.is_armed());
    }
}
