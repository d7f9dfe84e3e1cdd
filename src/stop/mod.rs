//! Stop sources and tokens

mod source;

pub use source::{StopCallback, StopSource, StopToken};
