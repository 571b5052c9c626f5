//! Cancel-and-replace timer slot.
//!
//! Arming a [`TimerSlot`] aborts whatever it was previously armed with, so a
//! slot never has more than one live timer. Abort cannot stop a timer whose
//! task already woke and is waiting on a lock; consumers therefore also tag
//! each arm with an epoch kept under their own lock and ignore a stale fire.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub struct TimerSlot {
    runtime: Handle,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TimerSlot {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            task: Mutex::new(None),
        }
    }

    /// Run `action` after `after`, replacing any previously armed timer.
    pub fn arm<F>(&self, after: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            action();
        });

        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.task.lock().take() {
            previous.abort();
        }
    }

    /// Whether an armed timer has not fired (or been cancelled) yet.
    pub fn is_armed(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
