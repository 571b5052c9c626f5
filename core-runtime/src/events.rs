//! # Event Bus System
//!
//! Discrete player events broadcast over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The player publishes continuously changing values (position, buffering,
//! track lists) through a snapshot channel owned by the orchestrator. Things
//! that *happen* (media became ready, a seek settled, the backend was swapped,
//! a cast session ended) are published here as typed [`CoreEvent`]s, so a UI
//! layer can react to them without diffing snapshots.
//!
//! ```text
//! ┌──────────────┐   emit    ┌───────────┐  subscribe  ┌────────────┐
//! │ Orchestrator ├──────────>│           ├────────────>│ UI layer   │
//! └──────────────┘           │ EventBus  │             └────────────┘
//! ┌──────────────┐   emit    │           │  subscribe  ┌────────────┐
//! │ Cast coord.  ├──────────>│           ├────────────>│ Analytics  │
//! └──────────────┘           └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut stream =
//!     EventStream::new(bus.subscribe()).filter(|e| matches!(e, CoreEvent::Playback(_)));
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Stopped)).ok();
//! assert_eq!(
//!     stream.recv().await.unwrap(),
//!     CoreEvent::Playback(PlaybackEvent::Stopped)
//! );
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: every sender is gone; treat it as shutdown.
//!
//! `emit` fails only when nobody is subscribed. Publishers ignore that error.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 128;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Backend(BackendEvent),
    Ui(UiEvent),
    Cast(CastEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Backend(e) => e.description(),
            CoreEvent::Ui(e) => e.description(),
            CoreEvent::Cast(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::LoadFailed { .. }) => EventSeverity::Error,
            CoreEvent::Backend(BackendEvent::SetupFailed { .. }) => EventSeverity::Error,
            CoreEvent::Cast(CastEvent::SessionFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::LoadRetrying { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Ready { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::Ended { .. }) => EventSeverity::Info,
            CoreEvent::Backend(BackendEvent::Attached { .. }) => EventSeverity::Info,
            CoreEvent::Cast(CastEvent::SessionStarted) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Media lifecycle and transport events.
///
/// Positions are whole milliseconds and speeds are percent so the payloads
/// stay `Eq` and serialize without float noise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    Loading {
        title: String,
        attempt: u32,
    },
    Ready {
        title: String,
        duration_ms: Option<u64>,
    },
    LoadRetrying {
        title: String,
        attempt: u32,
        delay_ms: u64,
    },
    LoadFailed {
        title: String,
        attempts: u32,
        reason: String,
    },
    Started {
        position_ms: u64,
    },
    Paused {
        position_ms: u64,
    },
    Stopped,
    SeekSettled {
        target_ms: u64,
        success: bool,
    },
    SpeedChanged {
        speed_percent: u32,
    },
    TrackSelected {
        /// `audio` or `subtitle`
        group: String,
        track_id: Option<String>,
    },
    PictureInPictureChanged {
        active: bool,
    },
    Interrupted {
        position_ms: u64,
    },
    /// Current item played to its end.
    Ended {
        title: String,
    },
    AdvancedToNext {
        title: String,
        remaining: u32,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Loading media",
            PlaybackEvent::Ready { .. } => "Media ready",
            PlaybackEvent::LoadRetrying { .. } => "Retrying media load",
            PlaybackEvent::LoadFailed { .. } => "Media failed to load",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Stopped => "Playback stopped",
            PlaybackEvent::SeekSettled { .. } => "Seek settled",
            PlaybackEvent::SpeedChanged { .. } => "Playback speed changed",
            PlaybackEvent::TrackSelected { .. } => "Track selection changed",
            PlaybackEvent::PictureInPictureChanged { .. } => "Picture-in-picture changed",
            PlaybackEvent::Interrupted { .. } => "Playback interrupted",
            PlaybackEvent::Ended { .. } => "Media ended",
            PlaybackEvent::AdvancedToNext { .. } => "Advanced to next queued item",
        }
    }
}

// ============================================================================
// Backend Events
// ============================================================================

/// Backend lifecycle events. `kind` is the backend tag (`system`/`streaming`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BackendEvent {
    Attached {
        kind: String,
    },
    Detached {
        kind: String,
    },
    SetupFailed {
        kind: String,
        message: String,
    },
    SwitchStarted {
        from: Option<String>,
        to: String,
        position_ms: u64,
    },
    SwitchCompleted {
        kind: String,
        position_ms: u64,
    },
}

impl BackendEvent {
    fn description(&self) -> &str {
        match self {
            BackendEvent::Attached { .. } => "Backend attached",
            BackendEvent::Detached { .. } => "Backend detached",
            BackendEvent::SetupFailed { .. } => "Backend setup failed",
            BackendEvent::SwitchStarted { .. } => "Backend switch started",
            BackendEvent::SwitchCompleted { .. } => "Backend switch completed",
        }
    }
}

// ============================================================================
// UI Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UiEvent {
    ControlsShown,
    ControlsHidden,
    ControlsLockChanged { locked: bool },
    Feedback { text: String },
    ScaleModeChanged { mode: String },
}

impl UiEvent {
    fn description(&self) -> &str {
        match self {
            UiEvent::ControlsShown => "Controls shown",
            UiEvent::ControlsHidden => "Controls hidden",
            UiEvent::ControlsLockChanged { .. } => "Controls lock changed",
            UiEvent::Feedback { .. } => "Feedback displayed",
            UiEvent::ScaleModeChanged { .. } => "Video scale mode changed",
        }
    }
}

// ============================================================================
// Cast Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CastEvent {
    SessionStarted,
    SessionResumed,
    SessionEnded,
    SessionFailed { message: String },
    MediaPushed { title: String, position_ms: u64 },
}

impl CastEvent {
    fn description(&self) -> &str {
        match self {
            CastEvent::SessionStarted => "Cast session started",
            CastEvent::SessionResumed => "Cast session resumed",
            CastEvent::SessionEnded => "Cast session ended",
            CastEvent::SessionFailed { .. } => "Cast session failed",
            CastEvent::MediaPushed { .. } => "Media pushed to cast device",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast hub for [`CoreEvent`]s. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers that received the event.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver wrapper that skips events rejected by an optional predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive; `None` when no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(CoreEvent::Playback(PlaybackEvent::Stopped)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Backend(BackendEvent::Attached {
            kind: "streaming".to_string(),
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|e| matches!(e, CoreEvent::Cast(_)));

        bus.emit(CoreEvent::Ui(UiEvent::ControlsShown)).unwrap();
        bus.emit(CoreEvent::Playback(PlaybackEvent::Started { position_ms: 0 }))
            .unwrap();
        bus.emit(CoreEvent::Cast(CastEvent::SessionEnded)).unwrap();

        assert_eq!(
            stream.recv().await.unwrap(),
            CoreEvent::Cast(CastEvent::SessionEnded)
        );
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for position_ms in 0..5 {
            bus.emit(CoreEvent::Playback(PlaybackEvent::Paused { position_ms }))
                .unwrap();
        }

        assert!(matches!(stream.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(
            stream.recv().await.unwrap(),
            CoreEvent::Playback(PlaybackEvent::Paused { position_ms: 3 })
        );
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Playback(PlaybackEvent::LoadFailed {
            title: "Trailer".to_string(),
            attempts: 3,
            reason: "timed out".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let cast_failed = CoreEvent::Cast(CastEvent::SessionFailed {
            message: "device lost".to_string(),
        });
        assert_eq!(cast_failed.severity(), EventSeverity::Warning);

        let ready = CoreEvent::Playback(PlaybackEvent::Ready {
            title: "Trailer".to_string(),
            duration_ms: Some(120_000),
        });
        assert_eq!(ready.severity(), EventSeverity::Info);

        assert_eq!(
            CoreEvent::Ui(UiEvent::ControlsHidden).severity(),
            EventSeverity::Debug
        );
        assert!(EventSeverity::Error > EventSeverity::Warning);
    }

    #[test]
    fn test_event_description() {
        let event = CoreEvent::Backend(BackendEvent::SwitchCompleted {
            kind: "system".to_string(),
            position_ms: 42_000,
        });
        assert_eq!(event.description(), "Backend switch completed");
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = Arc::new(EventBus::new(64));
        let mut stream = EventStream::new(bus.subscribe());

        let mut handles = Vec::new();
        for i in 0..4u64 {
            let bus = Arc::clone(&bus);
            handles.push(tokio::spawn(async move {
                bus.emit(CoreEvent::Playback(PlaybackEvent::Started { position_ms: i }))
                    .ok();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut received = 0;
        while let Some(Ok(_)) = stream.try_recv() {
            received += 1;
        }
        assert_eq!(received, 4);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Playback(PlaybackEvent::SeekSettled {
            target_ms: 30_000,
            success: true,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Playback\""));
        assert!(json.contains("\"event\":\"SeekSettled\""));

        let decoded: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
