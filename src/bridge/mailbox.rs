//! Single-slot holder for the pending wait
//!
//! The slot is an atomically swapped `Option<Arc<PendingWait>>`. Publishing
//! is a compare-and-swap from empty, so a second concurrent wait is detected
//! instead of queued.

use super::error::ContractViolation;
use super::pending::PendingWait;
use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::Arc;

pub(crate) struct Mailbox<E> {
    slot: ArcSwapOption<PendingWait<E>>,
}

impl<E> Mailbox<E> {
    pub(crate) fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// Install `wait` as the only pending entry.
    pub(crate) fn publish(&self, wait: Arc<PendingWait<E>>) -> Result<(), ContractViolation> {
        let empty: Option<Arc<PendingWait<E>>> = None;
        let previous = self.slot.compare_and_swap(&empty, Some(wait));
        if previous.is_some() {
            return Err(ContractViolation::ConcurrentWait);
        }
        Ok(())
    }

    /// Remove and return whatever wait is installed.
    pub(crate) fn take(&self) -> Option<Arc<PendingWait<E>>> {
        self.slot.swap(None)
    }

    /// Remove `wait` only if it is still the installed entry.
    pub(crate) fn withdraw(&self, wait: &Arc<PendingWait<E>>) -> bool {
        let current = Some(Arc::clone(wait));
        let previous = self
            .slot
            .compare_and_swap(&current, None::<Arc<PendingWait<E>>>);
        matches!(&*previous, Some(p) if Arc::ptr_eq(p, wait))
    }

    pub(crate) fn is_occupied(&self) -> bool {
        self.slot.load().is_some()
    }
}

impl<E> fmt::Debug for Mailbox<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("occupied", &self.is_occupied())
            .finish()
    }
}
