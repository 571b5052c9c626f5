//! # Seek Coalescer
//!
//! Collapses bursts of seek requests against an engine whose native seek is
//! asynchronous and expensive.
//!
//! ```text
//!   Idle ──request──> Seeking(t)
//!   Seeking(t) ──request(u)──> Seeking(t) + Pending(u)      (replaces any older pending)
//!   Seeking(t) + Pending(u) ──native done──> Seeking(u)     (t's completer dropped)
//!   Seeking(t) ──native done──> Idle                        (t's completer invoked)
//! ```
//!
//! The coalescer does no I/O. Methods return the target the caller must hand
//! to the native engine, if any, so the engine is never called while the
//! coalescer's lock is held.
//!
//! Every native seek is tagged with the coalescer's [`epoch`](SeekCoalescer::epoch).
//! [`reset`](SeekCoalescer::reset) starts a new epoch, so completions of seeks
//! issued for a previous item are ignored instead of settling the new one.

use crate::backend::SeekCompleter;
use std::time::Duration;

struct SeekRequest {
    target: Duration,
    completer: Option<SeekCompleter>,
}

enum SeekState {
    Idle,
    Seeking {
        in_flight: SeekRequest,
        pending: Option<SeekRequest>,
    },
}

/// Sans-IO seek coalescing state machine.
pub struct SeekCoalescer {
    state: SeekState,
    issued: u64,
    epoch: u64,
}

impl Default for SeekCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl SeekCoalescer {
    pub fn new() -> Self {
        Self {
            state: SeekState::Idle,
            issued: 0,
            epoch: 0,
        }
    }

    /// Record a new request.
    ///
    /// Returns `Some(target)` when the caller must start a native seek now.
    /// Otherwise the request is parked as pending and any previously pending
    /// request is dropped, which resolves its handle as superseded.
    pub fn request(&mut self, target: Duration, completer: SeekCompleter) -> Option<Duration> {
        let request = SeekRequest {
            target,
            completer: Some(completer),
        };

        match &mut self.state {
            SeekState::Idle => {
                self.state = SeekState::Seeking {
                    in_flight: request,
                    pending: None,
                };
                self.issued += 1;
                Some(target)
            }
            SeekState::Seeking { pending, .. } => {
                *pending = Some(request);
                None
            }
        }
    }

    /// Handle the native completion of the in-flight seek issued in `epoch`.
    ///
    /// Returns `Some(target)` when a pending request must now be issued. The
    /// finished request's completer is invoked only if nothing superseded it.
    /// Completions from an earlier epoch change nothing.
    pub fn complete(&mut self, epoch: u64, success: bool) -> Option<Duration> {
        if epoch != self.epoch {
            return None;
        }
        match std::mem::replace(&mut self.state, SeekState::Idle) {
            SeekState::Idle => None,
            SeekState::Seeking {
                mut in_flight,
                pending: None,
            } => {
                if let Some(completer) = in_flight.completer.take() {
                    // The caller may have dropped its handle; nothing to report then.
                    let _ = completer.send(success);
                }
                None
            }
            SeekState::Seeking {
                in_flight: _superseded,
                pending: Some(next),
            } => {
                let target = next.target;
                self.state = SeekState::Seeking {
                    in_flight: next,
                    pending: None,
                };
                self.issued += 1;
                Some(target)
            }
        }
    }

    /// Abandon everything; all outstanding handles resolve as superseded.
    pub fn reset(&mut self) {
        self.state = SeekState::Idle;
        self.epoch += 1;
    }

    /// Tag for native seeks issued from the current state.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SeekState::Idle)
    }

    pub fn in_flight(&self) -> Option<Duration> {
        match &self.state {
            SeekState::Seeking { in_flight, .. } => Some(in_flight.target),
            SeekState::Idle => None,
        }
    }

    pub fn pending(&self) -> Option<Duration> {
        match &self.state {
            SeekState::Seeking {
                pending: Some(pending),
                ..
            } => Some(pending.target),
            _ => None,
        }
    }

    /// Number of native seeks issued so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SeekHandle, SeekOutcome};

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn request(coalescer: &mut SeekCoalescer, target: Duration) -> (Option<Duration>, SeekHandle) {
        let (completer, handle) = SeekHandle::channel();
        (coalescer.request(target, completer), handle)
    }

    #[tokio::test]
    async fn test_single_seek_settles() {
        let mut coalescer = SeekCoalescer::new();

        let (issue, handle) = request(&mut coalescer, secs(30));
        assert_eq!(issue, Some(secs(30)));
        assert_eq!(coalescer.in_flight(), Some(secs(30)));

        assert_eq!(coalescer.complete(0, true), None);
        assert!(coalescer.is_idle());
        assert_eq!(handle.await, SeekOutcome::Settled { success: true });
    }

    #[tokio::test]
    async fn test_burst_keeps_one_in_flight_and_honors_last_target() {
        let mut coalescer = SeekCoalescer::new();

        let (issue, first) = request(&mut coalescer, secs(1));
        assert_eq!(issue, Some(secs(1)));

        let mut handles = Vec::new();
        for t in 2..=20 {
            let (issue, handle) = request(&mut coalescer, secs(t));
            assert_eq!(issue, None, "only one native seek may be in flight");
            assert_eq!(coalescer.in_flight(), Some(secs(1)));
            assert_eq!(coalescer.pending(), Some(secs(t)));
            handles.push(handle);
        }

        // First native seek finishes: the latest pending target goes out next.
        assert_eq!(coalescer.complete(0, true), Some(secs(20)));
        assert_eq!(coalescer.in_flight(), Some(secs(20)));
        assert_eq!(coalescer.pending(), None);

        assert_eq!(coalescer.complete(0, false), None);
        assert!(coalescer.is_idle());
        assert_eq!(coalescer.issued(), 2);

        assert_eq!(first.await, SeekOutcome::Superseded);
        let last = handles.pop().unwrap();
        for handle in handles {
            assert_eq!(handle.await, SeekOutcome::Superseded);
        }
        assert_eq!(last.await, SeekOutcome::Settled { success: false });
    }

    #[tokio::test]
    async fn test_request_after_settle_starts_fresh() {
        let mut coalescer = SeekCoalescer::new();

        let (_, a) = request(&mut coalescer, secs(5));
        coalescer.complete(0, true);
        let (issue, b) = request(&mut coalescer, secs(6));

        assert_eq!(issue, Some(secs(6)));
        assert_eq!(a.await, SeekOutcome::Settled { success: true });
        coalescer.complete(0, true);
        assert_eq!(b.await, SeekOutcome::Settled { success: true });
    }

    #[tokio::test]
    async fn test_reset_supersedes_everything() {
        let mut coalescer = SeekCoalescer::new();

        let (_, a) = request(&mut coalescer, secs(5));
        let (_, b) = request(&mut coalescer, secs(9));
        coalescer.reset();

        assert!(coalescer.is_idle());
        assert_eq!(a.await, SeekOutcome::Superseded);
        assert_eq!(b.await, SeekOutcome::Superseded);

        // A late native completion after reset is ignored.
        assert_eq!(coalescer.complete(0, true), None);
        assert_eq!(coalescer.epoch(), 1);
    }

    #[tokio::test]
    async fn test_completion_from_previous_epoch_is_ignored() {
        let mut coalescer = SeekCoalescer::new();

        let (_, old) = request(&mut coalescer, secs(10));
        let stale = coalescer.epoch();
        coalescer.reset();

        let (issue, resume) = request(&mut coalescer, secs(30));
        assert_eq!(issue, Some(secs(30)));
        let (issue, latest) = request(&mut coalescer, secs(50));
        assert_eq!(issue, None);

        // The old item's native seek finishes while the new one is in flight.
        assert_eq!(coalescer.complete(stale, false), None);
        assert_eq!(coalescer.in_flight(), Some(secs(30)));
        assert_eq!(coalescer.pending(), Some(secs(50)));

        let current = coalescer.epoch();
        assert_eq!(coalescer.complete(current, true), Some(secs(50)));
        assert_eq!(coalescer.complete(current, true), None);

        assert_eq!(old.await, SeekOutcome::Superseded);
        assert_eq!(resume.await, SeekOutcome::Superseded);
        assert_eq!(latest.await, SeekOutcome::Settled { success: true });
    }
}
