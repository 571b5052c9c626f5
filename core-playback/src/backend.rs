//! # Backend Contract
//!
//! The capability set every backend adapter implements, plus the types used to
//! report back to the orchestrator.
//!
//! ## Event delivery
//!
//! Adapters translate native notifications into [`AdapterEvent`]s and push
//! them into the channel handed over in [`PlayerBackend::attach`]. Native
//! callbacks can fire on any thread; the channel moves them onto the
//! orchestrator's event pump, which is the only place that applies them to
//! shared state.
//!
//! ## Teardown
//!
//! The orchestrator retires a backend in a fixed order: it stops polling,
//! calls [`PlayerBackend::detach`] (native observers removed, event sender
//! dropped), then [`PlayerBackend::release`] (native item cleared), and only
//! then drops its last reference.

use crate::adapters::{StreamingBackend, SystemBackend};
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::types::{
    BackendStatus, MediaItem, StreamingInfo, TrackDescriptor, TrackKind, VideoScaleMode,
};
use async_trait::async_trait;
use bridge_traits::{BackendKind, NativeEngineProvider, NativeImage, RenderSurface};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Notification raised by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// The media passed to `load` can play; autoplay and resume have been issued.
    Ready,
    /// The media could not be opened.
    LoadFailed { reason: String },
    /// Playback failed after the media had become ready.
    PlaybackFailed { reason: String },
    /// The current item played to its end.
    DidPlayToEnd,
    PictureInPictureChanged { active: bool },
}

pub type AdapterEventSender = mpsc::UnboundedSender<AdapterEvent>;

// ============================================================================
// Seek Handle
// ============================================================================

/// Final result of a seek request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The seek reached the engine and settled. `success` is the native flag.
    Settled { success: bool },
    /// A newer seek replaced this one before it settled.
    Superseded,
}

/// Completion side of a seek; dropping it without sending means "superseded".
pub type SeekCompleter = oneshot::Sender<bool>;

/// Future resolving to the [`SeekOutcome`] of one seek request.
#[derive(Debug)]
pub struct SeekHandle {
    receiver: oneshot::Receiver<bool>,
}

impl SeekHandle {
    /// A linked completer/handle pair.
    pub fn channel() -> (SeekCompleter, SeekHandle) {
        let (tx, rx) = oneshot::channel();
        (tx, SeekHandle { receiver: rx })
    }

    /// A handle that has already settled.
    pub fn settled(success: bool) -> Self {
        let (tx, handle) = Self::channel();
        let _ = tx.send(success);
        handle
    }

    /// A handle for a request that was ignored (no backend, nothing loaded).
    pub fn rejected() -> Self {
        Self::settled(false)
    }
}

impl Future for SeekHandle {
    type Output = SeekOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|result| match result {
            Ok(success) => SeekOutcome::Settled { success },
            Err(_) => SeekOutcome::Superseded,
        })
    }
}

// ============================================================================
// Backend Trait
// ============================================================================

/// Shared capability set of both backend adapters.
///
/// Control methods return immediately. Operations addressed at an unknown
/// track id or an empty player are silent no-ops.
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Register native observers and start forwarding events to `events`.
    fn attach(&self, events: AdapterEventSender);

    /// Remove native observers and drop the event sender.
    fn detach(&self);

    /// Clear the native item and abandon outstanding seeks.
    fn release(&self);

    /// Replace the current media. Autoplays once the engine reports ready,
    /// starting at `resume_at` when given.
    fn load(&self, item: &MediaItem, resume_at: Option<Duration>);

    fn play(&self);
    fn pause(&self);

    /// Pause and return to the start.
    fn stop(&self);

    fn seek(&self, to: Duration) -> SeekHandle;

    /// The seek the adapter issued by itself when the media became ready,
    /// if any. Handed out once.
    fn take_resume_seek(&self) -> Option<(Duration, SeekHandle)> {
        None
    }

    fn set_playback_speed(&self, speed: f32);

    /// Transport state for the polling loop.
    fn status(&self) -> BackendStatus;

    fn tracks(&self, kind: TrackKind) -> Vec<TrackDescriptor>;

    fn selected_track(&self, kind: TrackKind) -> Option<String>;

    /// Select an audio track. Returns `false` (and changes nothing) for an
    /// unknown id.
    fn select_audio_track(&self, id: &str) -> bool;

    /// Select a subtitle track, or disable subtitles with `None`.
    fn select_subtitle(&self, id: Option<&str>) -> bool;

    /// Long-lived render target, created on first use.
    fn render_target(&self) -> Result<RenderSurface>;

    fn supports_picture_in_picture(&self) -> bool;

    /// `Ok(false)` when PiP is supported but not possible right now.
    fn start_picture_in_picture(&self) -> Result<bool>;

    fn stop_picture_in_picture(&self) -> Result<()>;

    fn set_scale_mode(&self, mode: VideoScaleMode);

    /// Best-effort diagnostics; placeholder values when nothing is playing.
    fn streaming_info(&self) -> StreamingInfo;

    async fn generate_thumbnail(&self, at: Duration) -> Result<NativeImage>;
}

pub(crate) fn unsupported_pip(backend: BackendKind) -> PlaybackError {
    PlaybackError::Unsupported {
        capability: "Picture-in-picture",
        backend,
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Creates a fresh adapter for every backend activation.
pub trait BackendFactory: Send + Sync {
    fn create(&self, kind: BackendKind) -> Result<Arc<dyn PlayerBackend>>;
}

/// Default factory wrapping the host's [`NativeEngineProvider`].
pub struct EngineBackendFactory {
    engines: Arc<dyn NativeEngineProvider>,
    seek_tolerance: Duration,
}

impl EngineBackendFactory {
    pub fn new(engines: Arc<dyn NativeEngineProvider>, config: &PlayerConfig) -> Self {
        Self {
            engines,
            seek_tolerance: config.seek_tolerance,
        }
    }
}

impl BackendFactory for EngineBackendFactory {
    fn create(&self, kind: BackendKind) -> Result<Arc<dyn PlayerBackend>> {
        let setup_error = |e: bridge_traits::BridgeError| PlaybackError::BackendSetup {
            kind,
            message: e.to_string(),
        };

        let backend: Arc<dyn PlayerBackend> = match kind {
            BackendKind::System => {
                let engine = self.engines.system_engine().map_err(setup_error)?;
                Arc::new(SystemBackend::new(engine, self.seek_tolerance))
            }
            BackendKind::Streaming => {
                let engine = self.engines.streaming_engine().map_err(setup_error)?;
                Arc::new(StreamingBackend::new(engine))
            }
        };

        Ok(backend)
    }
}
