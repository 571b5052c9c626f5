//! # Player Configuration
//!
//! Tunables for polling, timers, seeking, thumbnails and load retries.

use bridge_traits::BackendKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Player orchestration configuration.
///
/// Every field has a serde default, so a partial JSON document (or `{}`)
/// deserializes into a usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// How often the active backend is sampled into the published state.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Inactivity period after which transient controls are hidden.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_controls_auto_hide")]
    pub controls_auto_hide: Duration,

    /// Window in which a second tap turns a single tap into a seek gesture.
    ///
    /// Default: 300 ms.
    #[serde(default = "default_tap_delay")]
    pub tap_delay: Duration,

    /// Idle period that ends a multi-tap seek sequence.
    ///
    /// Default: 1 second.
    #[serde(default = "default_seek_accumulation_reset")]
    pub seek_accumulation_reset: Duration,

    /// Seek offset added per tap in a multi-tap sequence.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_double_tap_seek_step")]
    pub double_tap_seek_step: Duration,

    /// Thumbnail requests are bucketed to multiples of this value.
    ///
    /// Default: 1 second.
    #[serde(default = "default_thumbnail_quantum")]
    pub thumbnail_quantum: Duration,

    /// Maximum number of cached thumbnails.
    ///
    /// Default: 256.
    #[serde(default = "default_thumbnail_cache_capacity")]
    pub thumbnail_cache_capacity: usize,

    /// Tolerance handed to native seeks that support it.
    ///
    /// Default: 0.5 seconds.
    #[serde(default = "default_seek_tolerance")]
    pub seek_tolerance: Duration,

    /// Time a load may take to report ready before it counts as failed.
    ///
    /// Default: 20 seconds.
    #[serde(default = "default_load_timeout")]
    pub load_timeout: Duration,

    /// Total load attempts, including the first one.
    ///
    /// Default: 3.
    #[serde(default = "default_load_max_attempts")]
    pub load_max_attempts: u32,

    /// Delay before the first retry; doubles for each further retry.
    ///
    /// Default: 1 second.
    #[serde(default = "default_load_retry_base_delay")]
    pub load_retry_base_delay: Duration,

    /// How long gesture/intent feedback stays visible.
    ///
    /// Default: 1 second.
    #[serde(default = "default_feedback_duration")]
    pub feedback_duration: Duration,

    /// Backend used when no preference has been persisted yet.
    ///
    /// Default: [`BackendKind::System`].
    #[serde(default = "default_backend")]
    pub default_backend: BackendKind,

    /// Lowest accepted playback speed.
    ///
    /// Default: 0.25.
    #[serde(default = "default_min_playback_speed")]
    pub min_playback_speed: f32,

    /// Highest accepted playback speed.
    ///
    /// Default: 4.0.
    #[serde(default = "default_max_playback_speed")]
    pub max_playback_speed: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            controls_auto_hide: default_controls_auto_hide(),
            tap_delay: default_tap_delay(),
            seek_accumulation_reset: default_seek_accumulation_reset(),
            double_tap_seek_step: default_double_tap_seek_step(),
            thumbnail_quantum: default_thumbnail_quantum(),
            thumbnail_cache_capacity: default_thumbnail_cache_capacity(),
            seek_tolerance: default_seek_tolerance(),
            load_timeout: default_load_timeout(),
            load_max_attempts: default_load_max_attempts(),
            load_retry_base_delay: default_load_retry_base_delay(),
            feedback_duration: default_feedback_duration(),
            default_backend: default_backend(),
            min_playback_speed: default_min_playback_speed(),
            max_playback_speed: default_max_playback_speed(),
        }
    }
}

impl PlayerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval.is_zero() {
            return Err("poll_interval must be > 0".to_string());
        }

        if self.tap_delay.is_zero() {
            return Err("tap_delay must be > 0".to_string());
        }

        if self.seek_accumulation_reset < self.tap_delay {
            return Err("seek_accumulation_reset cannot be shorter than tap_delay".to_string());
        }

        if self.double_tap_seek_step.is_zero() {
            return Err("double_tap_seek_step must be > 0".to_string());
        }

        if self.thumbnail_quantum.is_zero() {
            return Err("thumbnail_quantum must be > 0".to_string());
        }

        if self.thumbnail_cache_capacity == 0 {
            return Err("thumbnail_cache_capacity must be > 0".to_string());
        }

        if self.load_max_attempts == 0 {
            return Err("load_max_attempts must be >= 1".to_string());
        }

        if self.load_timeout.is_zero() {
            return Err("load_timeout must be > 0".to_string());
        }

        if !(self.min_playback_speed > 0.0 && self.min_playback_speed <= 1.0) {
            return Err("min_playback_speed must be in (0.0, 1.0]".to_string());
        }

        if self.max_playback_speed < 1.0 {
            return Err("max_playback_speed must be >= 1.0".to_string());
        }

        Ok(())
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`.
    pub fn retry_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.load_retry_base_delay
            .saturating_mul(1u32 << exponent)
    }

    /// Whether `speed` falls inside the accepted range.
    pub fn accepts_speed(&self, speed: f32) -> bool {
        speed.is_finite() && speed >= self.min_playback_speed && speed <= self.max_playback_speed
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_controls_auto_hide() -> Duration {
    Duration::from_secs(10)
}

fn default_tap_delay() -> Duration {
    Duration::from_millis(300)
}

fn default_seek_accumulation_reset() -> Duration {
    Duration::from_secs(1)
}

fn default_double_tap_seek_step() -> Duration {
    Duration::from_secs(10)
}

fn default_thumbnail_quantum() -> Duration {
    Duration::from_secs(1)
}

fn default_thumbnail_cache_capacity() -> usize {
    256
}

fn default_seek_tolerance() -> Duration {
    Duration::from_millis(500)
}

fn default_load_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_load_max_attempts() -> u32 {
    3
}

fn default_load_retry_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_feedback_duration() -> Duration {
    Duration::from_secs(1)
}

fn default_backend() -> BackendKind {
    BackendKind::System
}

fn default_min_playback_speed() -> f32 {
    0.25
}

fn default_max_playback_speed() -> f32 {
    4.0
}
