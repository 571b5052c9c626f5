//! Player data model: media items, playback state, tracks and the published
//! snapshot.

use bridge_traits::{BackendKind, NativeImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Media
// ============================================================================

/// A piece of media handed to the player.
///
/// Immutable once constructed; the orchestrator produces updated copies with
/// [`MediaItem::with_last_known_position`] when it records a resume point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub title: String,
    pub description: Option<String>,
    pub source_url: String,
    pub last_known_position: Option<Duration>,
}

impl MediaItem {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            source_url: source_url.into(),
            last_known_position: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_last_known_position(mut self, position: Duration) -> Self {
        self.last_known_position = Some(position);
        self
    }
}

// ============================================================================
// Playback State
// ============================================================================

/// Normalized playback state, identical for both backends.
///
/// `current_time <= duration` whenever the duration is known, and
/// `pending_seek_time` is only set while a seek is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_time: Duration,
    pub duration: Option<Duration>,
    pub buffered_duration: Duration,
    pub is_buffering: bool,
    pub is_seeking: bool,
    pub pending_seek_time: Option<Duration>,
    pub playback_speed: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: Duration::ZERO,
            duration: None,
            buffered_duration: Duration::ZERO,
            is_buffering: false,
            is_seeking: false,
            pending_seek_time: None,
            playback_speed: 1.0,
        }
    }
}

impl PlaybackState {
    /// Clamp a position into `[0, duration]` (upper bound only when known).
    pub fn clamp_position(&self, position: Duration) -> Duration {
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

/// One sample of a backend's transport state, taken by the polling loop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BackendStatus {
    pub is_playing: bool,
    pub is_buffering: bool,
    pub current_time: Duration,
    pub duration: Option<Duration>,
    pub buffered_duration: Duration,
}

// ============================================================================
// Tracks
// ============================================================================

/// Track group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Subtitle,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Subtitle => "subtitle",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-independent track entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Unique within its group for the current media item.
    pub id: String,
    pub display_name: String,
    /// Primary language subtag (`en`, `pt`), when the engine declares one.
    pub language_code: Option<String>,
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Best-effort streaming diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingInfo {
    pub backend: Option<BackendKind>,
    pub source: String,
    pub server: String,
    pub indicated_bitrate_kbps: f64,
    pub observed_bitrate_kbps: f64,
    pub video_width: u32,
    pub video_height: u32,
    pub dropped_frames: i64,
    pub stall_count: i64,
}

impl StreamingInfo {
    /// Placeholder record returned when no diagnostics are available.
    pub fn unknown(backend: Option<BackendKind>) -> Self {
        Self {
            backend,
            source: "Unknown".to_string(),
            server: "Unknown".to_string(),
            indicated_bitrate_kbps: 0.0,
            observed_bitrate_kbps: 0.0,
            video_width: 0,
            video_height: 0,
            dropped_frames: 0,
            stall_count: 0,
        }
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        (self.video_width > 0 && self.video_height > 0).then_some((self.video_width, self.video_height))
    }
}

// ============================================================================
// Thumbnails
// ============================================================================

/// Quantized thumbnail position: index of the `thumbnail_quantum` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThumbnailKey(pub u64);

impl ThumbnailKey {
    pub fn from_time(time: Duration, quantum: Duration) -> Self {
        let quantum_ms = quantum.as_millis().max(1);
        ThumbnailKey((time.as_millis() / quantum_ms) as u64)
    }

    /// Start of the bucket; the position actually rendered.
    pub fn time(&self, quantum: Duration) -> Duration {
        quantum.saturating_mul(self.0.min(u32::MAX as u64) as u32)
    }
}

/// Preview image for a scrub position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub key: ThumbnailKey,
    pub time: Duration,
    pub image: NativeImage,
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Backend lifecycle as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendLifecycle {
    NoBackend,
    SettingUp(BackendKind),
    Ready(BackendKind),
    TornDown,
}

/// Load progress of the current media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadStatus {
    Idle,
    Loading { attempt: u32 },
    Ready,
    Failed { attempts: u32, reason: String },
}

// ============================================================================
// UI State
// ============================================================================

/// Aspect handling of the rendered picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoScaleMode {
    #[default]
    Fit,
    Fill,
}

impl VideoScaleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoScaleMode::Fit => "fit",
            VideoScaleMode::Fill => "fill",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackIcon {
    Play,
    Pause,
    SeekForward,
    SeekBackward,
    Volume,
    Brightness,
    Speed,
    Zoom,
    Subtitles,
}

/// Transient text/icon overlay, cleared after `feedback_duration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub text: String,
    pub icon: FeedbackIcon,
}

impl Feedback {
    pub fn new(text: impl Into<String>, icon: FeedbackIcon) -> Self {
        Self {
            text: text.into(),
            icon,
        }
    }
}

/// Derived UI state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    pub controls_visible: bool,
    pub controls_locked: bool,
    pub picture_in_picture_active: bool,
    pub casting_active: bool,
    pub scale_mode: VideoScaleMode,
    pub feedback: Option<Feedback>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            controls_visible: true,
            controls_locked: false,
            picture_in_picture_active: false,
            casting_active: false,
            scale_mode: VideoScaleMode::Fit,
            feedback: None,
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Everything a UI layer renders, published as one consistent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub backend: Option<BackendKind>,
    pub lifecycle: BackendLifecycle,
    pub playback: PlaybackState,
    pub load_status: LoadStatus,
    pub media: Option<MediaItem>,
    pub queue_len: usize,
    pub audio_tracks: Vec<TrackDescriptor>,
    pub subtitle_tracks: Vec<TrackDescriptor>,
    pub selected_audio_track: Option<String>,
    pub selected_subtitle: Option<String>,
    pub ui: UiState,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            backend: None,
            lifecycle: BackendLifecycle::NoBackend,
            playback: PlaybackState::default(),
            load_status: LoadStatus::Idle,
            media: None,
            queue_len: 0,
            audio_tracks: Vec::new(),
            subtitle_tracks: Vec::new(),
            selected_audio_track: None,
            selected_subtitle: None,
            ui: UiState::default(),
        }
    }
}

/// Whole milliseconds, saturating; used for event payloads.
pub(crate) fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
