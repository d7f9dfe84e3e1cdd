//! Clickety: keyboard clicks over an asynchronous event bridge
//!
//! Turns keypresses delivered by a hook callback into awaitable events and
//! plays a click for each one until the process is interrupted.
//!
//! # Core Concepts
//!
//! - **Event bridge**: converts a callback-driven source into a lazy sequence
//!   of `Next` futures, one pending at a time
//! - **Adapters**: register/unregister pairs that hand an `Emitter` to an
//!   external source (keyboard hook, Ctrl-C)
//! - **Stop tokens**: cooperative cancellation for the whole bridge or a
//!   single wait
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use clickety::{Cancelled, EventBridge, HookTable, KeyboardHook, StopSource};
//!
//! # tokio_test::block_on(async {
//! let stop = StopSource::new();
//! let table = Arc::new(HookTable::new());
//! let mut keyboard = EventBridge::new(stop.token(), KeyboardHook::new(table.clone()));
//! assert_eq!(table.len(), 1);
//!
//! stop.request_stop();
//! assert_eq!(keyboard.next().await, Err(Cancelled));
//!
//! keyboard.destroy().await;
//! assert!(table.is_empty());
//! # });
//! ```

pub mod adapter;
pub mod bridge;
pub mod config;
mod consumer;
pub mod player;
pub mod stop;

pub use adapter::{ctrl_c, HookId, HookTable, KeyPress, KeyboardHook, Signal, TaskAdapter};
pub use bridge::{
    Adapter, AdapterFault, Cancelled, ContractViolation, Emitter, EventBridge, Events, Next,
    NextResult,
};
pub use config::{Config, ConfigError};
pub use consumer::{clickety, run_until_cancelled};
pub use player::{Player, PlayerError};
pub use stop::{StopCallback, StopSource, StopToken};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
