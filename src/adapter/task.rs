//! Adapter backed by a spawned listener task
//!
//! `register` spawns the listener on the current tokio runtime and
//! `unregister` aborts it and waits for it to finish, so no emission can
//! follow unregistration. `unregister_now` only aborts.

use crate::bridge::{Adapter, AdapterFault, Emitter};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Listener<E> =
    Box<dyn FnMut(Emitter<E>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Runs an async listener for as long as the bridge is registered.
pub struct TaskAdapter<E> {
    id: String,
    listen: Listener<E>,
}

impl<E: Send + 'static> TaskAdapter<E> {
    /// `listen` receives the emitter and returns the listening future.
    pub fn new<F, Fut>(id: impl Into<String>, mut listen: F) -> Self
    where
        F: FnMut(Emitter<E>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id: id.into(),
            listen: Box::new(move |emitter| Box::pin(listen(emitter))),
        }
    }
}

impl<E> fmt::Debug for TaskAdapter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskAdapter")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: Send + 'static> Adapter<E> for TaskAdapter<E> {
    type Registration = JoinHandle<()>;

    fn id(&self) -> &str {
        &self.id
    }

    fn register(&mut self, emitter: Emitter<E>) -> Result<JoinHandle<()>, AdapterFault> {
        let runtime = Handle::try_current().map_err(|e| AdapterFault::Register(e.to_string()))?;
        Ok(runtime.spawn((self.listen)(emitter)))
    }

    async fn unregister(&mut self, listener: JoinHandle<()>) -> Result<(), AdapterFault> {
        listener.abort();
        match listener.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(AdapterFault::Unregister(e.to_string())),
        }
    }

    /// Aborts without joining; the listener stops at its next await point.
    fn unregister_now(&mut self, listener: JoinHandle<()>) -> Result<(), AdapterFault> {
        listener.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Cancelled, EventBridge};
    use crate::stop::StopSource;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Adapter forwarding everything sent on the returned channel.
    fn channel_adapter() -> (TaskAdapter<u32>, mpsc::UnboundedSender<u32>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut rx = Some(rx);
        let adapter = TaskAdapter::new("channel", move |emitter: Emitter<u32>| {
            let mut rx = rx.take().expect("registered twice");
            async move {
                while let Some(value) = rx.recv().await {
                    emitter.emit(value);
                }
            }
        });
        (adapter, tx)
    }

    #[tokio::test]
    async fn listener_emits_into_bridge() {
        let (adapter, tx) = channel_adapter();
        let mut bridge = EventBridge::new(StopSource::new().token(), adapter);

        let next = bridge.next();
        let waiter = tokio::spawn(next);
        // Keep sending until the waiter has published and picked one up.
        while !waiter.is_finished() {
            tx.send(11).unwrap();
            tokio::task::yield_now().await;
        }
        assert_eq!(waiter.await.unwrap(), Ok(11));

        bridge.destroy().await;
    }

    struct ClearOnDrop(Arc<AtomicBool>);

    impl Drop for ClearOnDrop {
        fn drop(&mut self) {
            self.0.store(false, Ordering::SeqCst);
        }
    }

    /// Adapter whose listener never finishes and clears `alive` when dropped.
    fn sleeper(alive: &Arc<AtomicBool>) -> TaskAdapter<u32> {
        let flag = alive.clone();
        TaskAdapter::new("sleeper", move |_emitter| {
            // Owned by the future, so dropped even if the task never ran.
            let guard = ClearOnDrop(flag.clone());
            async move {
                let _guard = guard;
                std::future::pending::<()>().await;
            }
        })
    }

    #[tokio::test]
    async fn unregister_stops_listener() {
        let alive = Arc::new(AtomicBool::new(true));
        let mut bridge = EventBridge::new(StopSource::new().token(), sleeper(&alive));
        let pending = bridge.next();
        bridge.destroy().await;

        assert!(!alive.load(Ordering::SeqCst));
        assert_eq!(pending.await, Err(Cancelled));
    }

    #[tokio::test]
    async fn dropped_bridge_aborts_listener() {
        let alive = Arc::new(AtomicBool::new(true));
        let bridge = EventBridge::new(StopSource::new().token(), sleeper(&alive));
        drop(bridge);

        let stopped = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while alive.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(stopped.is_ok(), "listener still running after drop");
    }
}
