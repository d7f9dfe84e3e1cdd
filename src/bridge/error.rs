//! Bridge outcomes and contract violations

use thiserror::Error;

/// The wait ended without an event: a stop token fired or the bridge was
/// torn down. An expected outcome, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Result of awaiting one `next()` operation.
pub type NextResult<E> = Result<E, Cancelled>;

/// A failure reported by an adapter's register or unregister call.
///
/// The bridge cannot recover from either: the external registration is left
/// in an unknown state.
#[derive(Debug, Error)]
pub enum AdapterFault {
    #[error("register failed: {0}")]
    Register(String),
    #[error("unregister failed: {0}")]
    Unregister(String),
}

/// Misuse of the bridge by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// A `next()` was started while another one was still pending.
    #[error("next() started while another wait is still pending")]
    ConcurrentWait,
}

/// Report an adapter fault and abort the process.
pub(crate) fn abort_on_fault(adapter: &str, fault: &AdapterFault) -> ! {
    tracing::error!(adapter, error = %fault, "adapter fault, aborting");
    std::process::abort()
}

/// Report a usage violation and panic on the calling (consumer) task.
pub(crate) fn usage_violation(violation: ContractViolation) -> ! {
    tracing::error!(error = %violation, "event bridge contract violated");
    panic!("{}", violation)
}
