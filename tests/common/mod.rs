//! Shared fixtures for bridge integration tests

use async_trait::async_trait;
use clickety::{Adapter, AdapterFault, Emitter, EventBridge, StopToken};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Observes adapter calls and exposes the emitter to the test.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    registered: Arc<AtomicUsize>,
    unregistered: Arc<AtomicUsize>,
    emitter: Arc<Mutex<Option<Emitter<u32>>>>,
}

impl Recorder {
    /// Emit as the external source would. `false` if nobody was waiting.
    pub fn emit(&self, event: u32) -> bool {
        self.emitter().emit(event)
    }

    pub fn emitter(&self) -> Emitter<u32> {
        self.emitter
            .lock()
            .unwrap()
            .clone()
            .expect("adapter not registered")
    }

    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn unregistered(&self) -> usize {
        self.unregistered.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct RecordingAdapter(pub Recorder);

#[async_trait]
impl Adapter<u32> for RecordingAdapter {
    type Registration = ();

    fn id(&self) -> &str {
        "recorder"
    }

    fn register(&mut self, emitter: Emitter<u32>) -> Result<(), AdapterFault> {
        self.0.registered.fetch_add(1, Ordering::SeqCst);
        *self.0.emitter.lock().unwrap() = Some(emitter);
        Ok(())
    }

    async fn unregister(&mut self, _registration: ()) -> Result<(), AdapterFault> {
        self.0.unregistered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unregister_now(&mut self, _registration: ()) -> Result<(), AdapterFault> {
        self.0.unregistered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn recording_bridge(token: StopToken) -> (EventBridge<u32, RecordingAdapter>, Recorder) {
    let recorder = Recorder::default();
    let bridge = EventBridge::new(token, RecordingAdapter(recorder.clone()));
    (bridge, recorder)
}
