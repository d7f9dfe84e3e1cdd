//! Asynchronous event bridge
//!
//! Converts an externally driven, callback-based event source into a lazily
//! pulled sequence of awaitable events. The producer side (`Emitter`) never
//! blocks; the consumer side awaits one `Next` at a time.

mod emitter;
mod engine;
mod error;
mod mailbox;
mod pending;
mod traits;

pub use emitter::Emitter;
pub use engine::{EventBridge, Events, Next};
pub use error::{AdapterFault, Cancelled, ContractViolation, NextResult};
pub use traits::Adapter;
