//! # Playback Error Types
//!
//! Error types for player orchestration.
//!
//! Native engine failures never reach callers verbatim: adapters log them and
//! translate what matters into [`PlaybackError`] or an explicit state signal
//! (see `LoadStatus` in the published snapshot).

use bridge_traits::{BackendKind, BridgeError};
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// No backend is attached.
    #[error("No playback backend attached")]
    NoBackend,

    /// The backend could not be constructed.
    #[error("Failed to set up {kind} backend: {message}")]
    BackendSetup { kind: BackendKind, message: String },

    /// The active backend does not offer this capability.
    #[error("{capability} is not supported by the {backend} backend")]
    Unsupported {
        capability: &'static str,
        backend: BackendKind,
    },

    // ========================================================================
    // Media Errors
    // ========================================================================
    /// Attempted operation when no media is loaded.
    #[error("No media loaded")]
    NoMediaLoaded,

    /// Media never became ready after all load attempts.
    #[error("Media failed to load after {attempts} attempt(s): {reason}")]
    LoadFailed { attempts: u32, reason: String },

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// Requested playback speed is outside the configured range.
    #[error("Invalid playback speed {speed} (must be between {min} and {max})")]
    InvalidPlaybackSpeed { speed: f32, min: f32, max: f32 },

    // ========================================================================
    // Thumbnail Errors
    // ========================================================================
    /// Backend could not produce a preview image.
    #[error("Thumbnail unavailable: {0}")]
    ThumbnailUnavailable(String),

    // ========================================================================
    // Preference Errors
    // ========================================================================
    /// Preference value could not be encoded.
    #[error("Preference error: {0}")]
    Preferences(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Host bridge error.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed { .. }
                | PlaybackError::ThumbnailUnavailable(_)
                | PlaybackError::Bridge(BridgeError::Engine(_))
        )
    }

    /// Returns `true` if the UI should surface this error to the viewer.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed { .. }
                | PlaybackError::Unsupported { .. }
                | PlaybackError::InvalidPlaybackSpeed { .. }
                | PlaybackError::BackendSetup { .. }
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
