//! Backend adapters, one per native engine.

mod streaming;
mod system;

pub use streaming::StreamingBackend;
pub use system::SystemBackend;

use crate::backend::{AdapterEvent, AdapterEventSender};
use parking_lot::Mutex;

/// Event sender slot shared by an adapter and its native observer closure.
///
/// Empty before `attach` and after `detach`; sends into an empty slot are
/// dropped.
#[derive(Default)]
pub(crate) struct EventSlot {
    sender: Mutex<Option<AdapterEventSender>>,
}

impl EventSlot {
    pub(crate) fn set(&self, sender: AdapterEventSender) {
        *self.sender.lock() = Some(sender);
    }

    pub(crate) fn clear(&self) {
        self.sender.lock().take();
    }

    pub(crate) fn send(&self, event: AdapterEvent) {
        let sender = self.sender.lock().clone();
        if let Some(sender) = sender {
            if sender.send(event).is_err() {
                tracing::debug!("Adapter event dropped; orchestrator pump is gone");
            }
        }
    }
}

/// Engine seconds to `Duration`; negative, NaN and infinite values map to zero.
pub(crate) fn seconds(value: f64) -> std::time::Duration {
    std::time::Duration::try_from_secs_f64(value.max(0.0)).unwrap_or_default()
}

/// Engine milliseconds to `Duration`; negative values map to zero.
pub(crate) fn millis(value: i64) -> std::time::Duration {
    std::time::Duration::from_millis(value.max(0) as u64)
}
