//! Native playback engine bridges.
//!
//! The core never talks to a media framework directly. Hosts hand it two
//! engine objects that wrap whatever the platform provides:
//!
//! - [`SystemEngine`]: the platform's own media framework. Seeks complete
//!   asynchronously through a callback, tracks are exposed as media selection
//!   groups, and lifecycle is reported through item status notifications.
//! - [`StreamingEngine`]: a third-party streaming engine. Positions are integer
//!   milliseconds, seeks are fire-and-forget, tracks are indexed lists, and
//!   lifecycle is reported through state/time change notifications.
//!
//! Both engines deliver notifications through explicit observer registration.
//! Every [`ObserverToken`] handed out by `add_observer` must be returned through
//! `remove_observer` before the engine is released.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Shared Types
// ============================================================================

/// Tag selecting one of the two native engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Platform media framework.
    System,
    /// Third-party streaming engine.
    Streaming,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::System => "system",
            BackendKind::Streaming => "streaming",
        }
    }

    /// The other engine, used by "toggle backend" affordances.
    pub fn other(&self) -> Self {
        match self {
            BackendKind::System => BackendKind::Streaming,
            BackendKind::Streaming => BackendKind::System,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(BackendKind::System),
            "streaming" => Ok(BackendKind::Streaming),
            other => Err(format!("unknown backend kind: {}", other)),
        }
    }
}

/// Handle returned by observer registration; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(pub u64);

/// Still image produced by a native thumbnail generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeImage {
    pub width: u32,
    pub height: u32,
    /// Encoded image bytes (PNG/JPEG, host decides).
    pub data: Bytes,
}

/// Long-lived native render target (a layer or drawable the host embeds).
///
/// Recreating one tears down native rendering state, so adapters create it
/// once per engine and hand out the same surface afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSurface {
    pub id: Uuid,
    pub backend: BackendKind,
}

impl RenderSurface {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend,
        }
    }
}

// ============================================================================
// System Engine
// ============================================================================

/// Readiness of the current item in the system framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemItemStatus {
    Unknown,
    ReadyToPlay,
    Failed,
}

/// Whether the system player is actually advancing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControlStatus {
    Paused,
    WaitingToPlay,
    Playing,
}

/// Media selection group identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCharacteristic {
    /// Audio alternatives.
    Audible,
    /// Subtitles and captions.
    Legible,
}

/// One alternative inside a media selection group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaSelectionOption {
    pub display_name: String,
    /// BCP-47 tag, e.g. `en-US`.
    pub extended_language_tag: Option<String>,
    /// Locale identifier, e.g. `en_US`.
    pub locale_identifier: Option<String>,
}

/// Latest access-log entry of the system framework.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccessLogSnapshot {
    pub uri: Option<String>,
    pub server_address: Option<String>,
    pub indicated_bitrate: f64,
    pub observed_bitrate: f64,
    pub stall_count: i64,
    pub dropped_video_frames: i64,
    pub presentation_width: u32,
    pub presentation_height: u32,
}

/// Notifications raised by the system framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEngineEvent {
    ItemStatusChanged(SystemItemStatus),
    ItemDidPlayToEnd,
    ItemFailedToPlayToEnd { message: String },
    PictureInPictureChanged { active: bool },
}

pub type SystemObserver = Arc<dyn Fn(SystemEngineEvent) + Send + Sync>;

/// Completion invoked by the system framework once a seek settles.
/// `true` when the seek finished, `false` when the framework interrupted it.
pub type SeekCallback = Box<dyn FnOnce(bool) + Send>;

/// Platform media framework wrapper.
///
/// Control methods are expected to return immediately; anything slow is
/// reported later through observers or callbacks. Callbacks may fire on any
/// thread.
#[async_trait]
pub trait SystemEngine: Send + Sync {
    /// Replace the current item. Readiness is reported via
    /// [`SystemEngineEvent::ItemStatusChanged`].
    fn replace_current_item(&self, url: &str);

    /// Drop the current item and its native resources.
    fn clear_current_item(&self);

    fn play(&self);
    fn pause(&self);
    fn set_rate(&self, rate: f32);

    /// Current position in seconds.
    fn current_time(&self) -> f64;

    /// Item duration in seconds; `None` while unknown or indefinite (live).
    fn duration(&self) -> Option<f64>;

    /// End of the furthest loaded time range, in seconds.
    fn loaded_time_end(&self) -> Option<f64>;

    fn time_control_status(&self) -> TimeControlStatus;

    /// Start a native seek. `completion` is invoked exactly once.
    fn seek(&self, to_seconds: f64, tolerance_seconds: f64, completion: SeekCallback);

    fn media_selection_options(&self, characteristic: MediaCharacteristic)
        -> Vec<MediaSelectionOption>;

    /// Select an option by its index in the group; `None` clears the selection.
    fn select_media_option(&self, characteristic: MediaCharacteristic, index: Option<usize>);

    fn selected_media_option(&self, characteristic: MediaCharacteristic) -> Option<usize>;

    /// Switch between aspect-fit (`false`) and aspect-fill (`true`).
    fn set_video_gravity_fill(&self, fill: bool);

    fn create_render_surface(&self) -> Result<RenderSurface>;

    fn is_picture_in_picture_possible(&self) -> bool;
    fn start_picture_in_picture(&self);
    fn stop_picture_in_picture(&self);

    fn access_log(&self) -> Option<AccessLogSnapshot>;

    fn add_observer(&self, observer: SystemObserver) -> ObserverToken;
    fn remove_observer(&self, token: ObserverToken);

    /// Generate a still frame at the given position (seconds).
    async fn generate_image(&self, at_seconds: f64) -> Result<NativeImage>;
}

// ============================================================================
// Streaming Engine
// ============================================================================

/// Player state reported by the streaming engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingEngineState {
    Opening,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error,
}

/// Notifications raised by the streaming engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamingEngineEvent {
    StateChanged(StreamingEngineState),
    TimeChanged { time_ms: i64 },
}

pub type StreamingObserver = Arc<dyn Fn(StreamingEngineEvent) + Send + Sync>;

/// Track entry as listed by the streaming engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingTrack {
    /// Engine-side track index; `-1` is reserved for "disabled".
    pub index: i32,
    pub name: String,
    /// ISO 639 language code when the container declares one.
    pub language: Option<String>,
}

/// Input/decoder statistics of the streaming engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaStatistics {
    pub input_bitrate_kbps: f64,
    pub demux_bitrate_kbps: f64,
    pub read_bytes: i64,
    pub decoded_video_blocks: i64,
    pub displayed_pictures: i64,
    pub lost_pictures: i64,
    pub video_width: u32,
    pub video_height: u32,
}

/// Third-party streaming engine wrapper.
#[async_trait]
pub trait StreamingEngine: Send + Sync {
    /// Set the media to play; `start_time_ms` is passed as an open option.
    fn set_media(&self, url: &str, start_time_ms: Option<i64>);

    fn clear_media(&self);

    fn play(&self);
    fn pause(&self);
    fn stop(&self);

    fn is_playing(&self) -> bool;
    fn state(&self) -> StreamingEngineState;

    fn time_ms(&self) -> i64;

    /// Media length in milliseconds; `<= 0` while unknown.
    fn length_ms(&self) -> i64;

    /// Jump to a position. Fire-and-forget: there is no completion signal.
    fn set_time_ms(&self, time_ms: i64);

    fn set_rate(&self, rate: f32);

    fn audio_tracks(&self) -> Vec<StreamingTrack>;
    fn current_audio_track(&self) -> i32;
    fn set_audio_track(&self, index: i32);

    fn subtitle_tracks(&self) -> Vec<StreamingTrack>;
    fn current_subtitle_track(&self) -> i32;
    /// `-1` disables subtitles.
    fn set_subtitle_track(&self, index: i32);

    /// Crop the picture to fill the render surface (`true`) or letterbox it
    /// (`false`).
    fn set_aspect_fill(&self, fill: bool);

    fn create_render_surface(&self) -> Result<RenderSurface>;

    fn media_statistics(&self) -> Option<MediaStatistics>;

    fn add_observer(&self, observer: StreamingObserver) -> ObserverToken;
    fn remove_observer(&self, token: ObserverToken);

    async fn generate_thumbnail(&self, at_ms: i64) -> Result<NativeImage>;
}

// ============================================================================
// Provider
// ============================================================================

/// Factory for fresh native engine instances.
///
/// Called once per backend activation; the returned engine is owned by a single
/// adapter and released when that adapter is torn down.
pub trait NativeEngineProvider: Send + Sync {
    fn system_engine(&self) -> Result<Arc<dyn SystemEngine>>;
    fn streaming_engine(&self) -> Result<Arc<dyn StreamingEngine>>;
}
