//! Keyboard hook stand-in
//!
//! Installed hooks live in a `HookTable` keyed by handle, so any number of
//! bridges can hook the same input at once. A dedicated input thread plays the
//! role of the OS hook chain: it reads raw bytes and delivers one `KeyPress`
//! per byte to every installed hook.

use crate::bridge::{Adapter, AdapterFault, Emitter};
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::io::{BufReader, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Handle of an installed hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

/// A key-down event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub code: u8,
}

impl KeyPress {
    pub fn new(code: u8) -> Self {
        Self { code }
    }
}

impl fmt::Display for KeyPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code.is_ascii_graphic() {
            write!(f, "'{}'", self.code as char)
        } else {
            write!(f, "0x{:02x}", self.code)
        }
    }
}

/// Concurrent table of installed hooks.
///
/// Delivery holds a shard read guard while calling an emitter, and `remove`
/// needs the write guard, so once `remove` returns no delivery to that hook
/// is in flight.
pub struct HookTable<E> {
    hooks: DashMap<HookId, Emitter<E>>,
    next_id: AtomicU64,
}

impl<E> HookTable<E> {
    pub fn new() -> Self {
        Self {
            hooks: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn install(&self, emitter: Emitter<E>) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.hooks.insert(id, emitter);
        id
    }

    /// Remove a hook. Returns `false` if it was not installed.
    pub fn remove(&self, id: HookId) -> bool {
        self.hooks.remove(&id).is_some()
    }

    /// Deliver to a single hook, as an OS would through a per-hook context.
    pub fn deliver_to(&self, id: HookId, event: E) -> bool {
        self.hooks
            .get(&id)
            .is_some_and(|emitter| emitter.emit(event))
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl<E: Clone> HookTable<E> {
    /// Deliver to every installed hook. Returns how many consumers received it.
    pub fn deliver(&self, event: E) -> usize {
        self.hooks
            .iter()
            .filter(|hook| hook.value().emit(event.clone()))
            .count()
    }
}

impl<E> Default for HookTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for HookTable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookTable")
            .field("installed", &self.len())
            .finish()
    }
}

/// Adapter that installs a bridge's emitter into a shared hook table.
#[derive(Debug, Clone)]
pub struct KeyboardHook {
    table: Arc<HookTable<KeyPress>>,
}

impl KeyboardHook {
    pub fn new(table: Arc<HookTable<KeyPress>>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<HookTable<KeyPress>> {
        &self.table
    }
}

#[async_trait]
impl Adapter<KeyPress> for KeyboardHook {
    type Registration = HookId;

    fn id(&self) -> &str {
        "keyboard"
    }

    fn register(&mut self, emitter: Emitter<KeyPress>) -> Result<HookId, AdapterFault> {
        let id = self.table.install(emitter);
        tracing::info!(%id, "keyboard hook set");
        Ok(id)
    }

    async fn unregister(&mut self, id: HookId) -> Result<(), AdapterFault> {
        self.unregister_now(id)
    }

    fn unregister_now(&mut self, id: HookId) -> Result<(), AdapterFault> {
        if !self.table.remove(id) {
            return Err(AdapterFault::Unregister(format!("{id} is not installed")));
        }
        tracing::info!(%id, "keyboard hook removed");
        Ok(())
    }
}

/// Spawn the producer thread feeding `table` from `input`.
///
/// Every byte except line breaks becomes one `KeyPress`. When `input` ends
/// or fails, `on_end` runs on the input thread and the thread exits with the
/// number of keys read.
pub fn spawn_input_thread<R, F>(
    table: Arc<HookTable<KeyPress>>,
    input: R,
    on_end: F,
) -> std::io::Result<JoinHandle<u64>>
where
    R: Read + Send + 'static,
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name("keyboard-input".to_string())
        .spawn(move || {
            let mut keys = 0u64;
            for byte in BufReader::new(input).bytes() {
                let code = match byte {
                    Ok(code) => code,
                    Err(e) => {
                        tracing::warn!(error = %e, "keyboard input failed");
                        break;
                    }
                };
                if code == b'\n' || code == b'\r' {
                    continue;
                }
                keys += 1;
                let delivered = table.deliver(KeyPress::new(code));
                tracing::trace!(key = %KeyPress::new(code), delivered, "key pressed");
            }
            tracing::debug!(keys, "keyboard input ended");
            on_end();
            keys
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Cancelled, EventBridge};
    use crate::stop::StopSource;
    use std::io::Cursor;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready_eq};

    #[test]
    fn key_press_display() {
        assert_eq!(KeyPress::new(b'a').to_string(), "'a'");
        assert_eq!(KeyPress::new(0x1b).to_string(), "0x1b");
    }

    #[test]
    fn register_installs_hook() {
        let table = Arc::new(HookTable::new());
        let bridge = EventBridge::new(StopSource::new().token(), KeyboardHook::new(table.clone()));
        assert_eq!(table.len(), 1);
        assert!(bridge.is_registered());
    }

    #[test]
    fn delivery_reaches_pending_wait() {
        let table = Arc::new(HookTable::new());
        let bridge = EventBridge::new(StopSource::new().token(), KeyboardHook::new(table.clone()));

        assert_eq!(table.deliver(KeyPress::new(b'x')), 0);
        let mut next = task::spawn(bridge.next());
        assert_pending!(next.poll());
        assert_eq!(table.deliver(KeyPress::new(b'y')), 1);
        assert_ready_eq!(next.poll(), Ok(KeyPress::new(b'y')));
    }

    #[test]
    fn hooks_are_independent() {
        let table = Arc::new(HookTable::new());
        let first = EventBridge::new(StopSource::new().token(), KeyboardHook::new(table.clone()));
        let second = EventBridge::new(StopSource::new().token(), KeyboardHook::new(table.clone()));
        assert_eq!(table.len(), 2);

        let mut a = task::spawn(first.next());
        let mut b = task::spawn(second.next());
        assert_pending!(a.poll());
        assert_pending!(b.poll());

        assert_eq!(table.deliver(KeyPress::new(b'k')), 2);
        assert_ready_eq!(a.poll(), Ok(KeyPress::new(b'k')));
        assert_ready_eq!(b.poll(), Ok(KeyPress::new(b'k')));
    }

    #[test]
    fn deliver_to_unknown_hook_is_ignored() {
        let table = HookTable::<KeyPress>::new();
        assert!(!table.deliver_to(HookId(99), KeyPress::new(b'a')));
        assert!(!table.remove(HookId(99)));
    }

    #[tokio::test]
    async fn destroy_removes_hook() {
        let table = Arc::new(HookTable::new());
        let mut bridge = EventBridge::new(StopSource::new().token(), KeyboardHook::new(table.clone()));
        let mut next = task::spawn(bridge.next());
        assert_pending!(next.poll());

        bridge.destroy().await;
        assert!(table.is_empty());
        assert_ready_eq!(next.poll(), Err(Cancelled));
        assert_eq!(table.deliver(KeyPress::new(b'z')), 0);
    }

    #[test]
    fn dropped_bridges_remove_their_hooks() {
        let table = Arc::new(HookTable::new());
        let bridges: Vec<_> = (0..3)
            .map(|_| EventBridge::new(StopSource::new().token(), KeyboardHook::new(table.clone())))
            .collect();
        assert_eq!(table.len(), 3);

        drop(bridges);
        assert!(table.is_empty());
        assert_eq!(table.deliver(KeyPress::new(b'z')), 0);
    }

    #[test]
    fn input_thread_skips_line_breaks_and_signals_end() {
        let table = Arc::new(HookTable::new());
        let done = StopSource::new();
        let on_end = {
            let done = done.clone();
            move || {
                done.request_stop();
            }
        };

        let handle =
            spawn_input_thread(table, Cursor::new(b"ab\r\nc\n".to_vec()), on_end).unwrap();
        assert_eq!(handle.join().unwrap(), 3);
        assert!(done.stop_requested());
    }
}
