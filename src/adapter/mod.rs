//! Event sources that feed bridges
//!
//! Each source implements `bridge::Adapter`: it is handed an emitter at
//! registration and releases it at unregistration.

pub mod keyboard;
mod signal;
mod task;

pub use keyboard::{spawn_input_thread, HookId, HookTable, KeyPress, KeyboardHook};
pub use signal::{ctrl_c, Signal};
pub use task::TaskAdapter;
