//! The single outstanding consumer wait
//!
//! A `PendingWait` can be completed from two independent paths: a producer
//! dispatching an event, or a stop callback cancelling the wait. Both may hold
//! the same `Arc`. The `armed` flag is exchanged from `true` to `false` and
//! only the winner of that exchange touches the continuation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// `Some(event)` completes with a value, `None` completes as cancelled.
pub(crate) type Outcome<E> = Option<E>;

pub(crate) struct PendingWait<E> {
    armed: AtomicBool,
    /// Only locked by the winner of the `armed` exchange, so never contended.
    continuation: Mutex<Option<oneshot::Sender<Outcome<E>>>>,
}

impl<E> PendingWait<E> {
    /// An armed wait plus the receiving end of its continuation.
    pub(crate) fn new() -> (Arc<Self>, oneshot::Receiver<Outcome<E>>) {
        let (tx, rx) = oneshot::channel();
        let wait = Arc::new(Self {
            armed: AtomicBool::new(true),
            continuation: Mutex::new(Some(tx)),
        });
        (wait, rx)
    }

    /// Fire the continuation with `outcome`.
    ///
    /// Returns `true` if this call won the exchange and the consumer was
    /// still listening. Every later call is a no-op returning `false`.
    pub(crate) fn complete(&self, outcome: Outcome<E>) -> bool {
        if !self.armed.swap(false, Ordering::AcqRel) {
            return false;
        }
        let continuation = self
            .continuation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match continuation {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Consume the wait without firing it. Returns `true` if it was armed.
    pub(crate) fn disarm(&self) -> bool {
        self.armed.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

impl<E> fmt::Debug for PendingWait<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWait")
            .field("armed", &self.is_armed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn completes_with_value() {
        let (wait, mut rx) = PendingWait::new();
        assert!(wait.complete(Some(7u32)));
        assert_eq!(rx.try_recv().unwrap(), Some(7));
        assert!(!wait.is_armed());
    }

    #[test]
    fn second_completion_is_ignored() {
        let (wait, mut rx) = PendingWait::new();
        assert!(wait.complete(None));
        assert!(!wait.complete(Some(1u32)));
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn disarmed_wait_never_fires() {
        let (wait, mut rx) = PendingWait::<u32>::new();
        assert!(wait.disarm());
        assert!(!wait.complete(Some(3)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_reports_undelivered() {
        let (wait, rx) = PendingWait::new();
        drop(rx);
        assert!(!wait.complete(Some(5u32)));
    }

    #[test]
    fn racing_completions_have_one_winner() {
        for _ in 0..200 {
            let (wait, mut rx) = PendingWait::new();
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = [Some(1u32), None]
                .into_iter()
                .map(|outcome| {
                    let wait = wait.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        wait.complete(outcome)
                    })
                })
                .collect();

            let wins = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(wins, 1);
            assert!(rx.try_recv().is_ok());
        }
    }
}
