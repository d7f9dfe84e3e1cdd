//! Adapter trait: the contract event sources implement
//!
//! An adapter connects an external, callback-driven source to a bridge. It is
//! handed an `Emitter` once at registration and may call it from any thread
//! until it is unregistered.

use super::emitter::Emitter;
use super::error::AdapterFault;
use async_trait::async_trait;

/// The register/unregister capability pair of an external event source.
#[async_trait]
pub trait Adapter<E: Send + 'static>: Send {
    /// Opaque handle returned by `register` and consumed by `unregister`.
    type Registration: Send;

    /// Identifier used in logs
    fn id(&self) -> &str;

    /// Arrange for the source to call `emitter.emit(event)` per event.
    ///
    /// Called exactly once, synchronously, when the bridge is built. An `Err`
    /// is fatal: the bridge aborts the process.
    fn register(&mut self, emitter: Emitter<E>) -> Result<Self::Registration, AdapterFault>;

    /// Detach from the source.
    ///
    /// Called exactly once. No emitter call may happen after this returns.
    /// An `Err` is fatal.
    async fn unregister(&mut self, registration: Self::Registration) -> Result<(), AdapterFault>;

    /// Detach from the source without awaiting.
    ///
    /// Called instead of `unregister` when a bridge is dropped without
    /// `destroy()`. The bridge closes its emitter first, so an emission
    /// racing this call is discarded. An `Err` is fatal.
    fn unregister_now(&mut self, registration: Self::Registration) -> Result<(), AdapterFault>;
}
