//! Termination signal source

use super::task::TaskAdapter;
use crate::bridge::Emitter;
use crate::stop::StopSource;
use std::future::Future;
use std::io;

/// A process-level termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
}

/// Adapter that requests `exit` and emits `Signal::Interrupt` on every Ctrl-C.
///
/// The stop request does not depend on anyone awaiting the bridge, so an
/// interrupt arriving before the first `next()` is not lost.
///
/// Must be registered from inside a tokio runtime.
pub fn ctrl_c(exit: StopSource) -> TaskAdapter<Signal> {
    interrupt_on("ctrl-c", exit, tokio::signal::ctrl_c)
}

fn interrupt_on<F, Fut>(id: &str, exit: StopSource, signal: F) -> TaskAdapter<Signal>
where
    F: Fn() -> Fut + Clone + Send + 'static,
    Fut: Future<Output = io::Result<()>> + Send + 'static,
{
    TaskAdapter::new(id, move |emitter: Emitter<Signal>| {
        let exit = exit.clone();
        let signal = signal.clone();
        async move {
            loop {
                if let Err(e) = signal().await {
                    tracing::warn!(error = %e, "cannot listen for interrupts");
                    return;
                }
                exit.request_stop();
                let delivered = emitter.emit(Signal::Interrupt);
                tracing::info!(delivered, "interrupt received");
            }
        }
    })
}
