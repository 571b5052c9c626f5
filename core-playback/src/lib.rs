//! # Playback Core
//!
//! Unified playback over two native engines: the platform media framework
//! and a third-party streaming engine.
//!
//! ## Overview
//!
//! This crate handles:
//! - Backend adapters translating each engine into one [`PlayerBackend`] contract
//! - Seek coalescing for the engine whose seeks complete asynchronously
//! - Track resolution into stable-enough identifiers
//! - The [`PlayerOrchestrator`]: published state, hot-swap, polling, timers,
//!   load retries, end-of-media handling and an up-next queue
//! - Scrub thumbnails, tap/drag/pinch gestures, casting hand-over and
//!   persisted preferences
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{EngineBackendFactory, MediaItem, PlayerConfig, PlayerOrchestrator};
//!
//! let config = PlayerConfig::default();
//! let factory = Arc::new(EngineBackendFactory::new(engines, &config));
//! let player = PlayerOrchestrator::new(config, factory, Some(prefs), events, Handle::current())?;
//!
//! player.bootstrap().await?;
//! player.load(MediaItem::new("Trailer", "https://cdn.example.com/trailer.m3u8"))?;
//! let mut snapshots = player.subscribe();
//! ```

pub mod adapters;
pub mod backend;
pub mod cast;
pub mod config;
pub mod error;
pub mod gestures;
pub mod orchestrator;
pub mod preferences;
pub mod seek;
pub mod thumbnails;
pub mod timer;
pub mod tracks;
pub mod types;

pub use adapters::{StreamingBackend, SystemBackend};
pub use backend::{
    AdapterEvent, AdapterEventSender, BackendFactory, EngineBackendFactory, PlayerBackend,
    SeekHandle, SeekOutcome,
};
pub use cast::CastCoordinator;
pub use config::PlayerConfig;
pub use error::{PlaybackError, Result};
pub use gestures::{GestureCommand, GestureContext, GestureRecognizer, GestureTranslator};
pub use orchestrator::{Interruption, PlayerOrchestrator};
pub use preferences::{PlayerPreferences, SettingKey};
pub use seek::SeekCoalescer;
pub use thumbnails::ThumbnailCache;
pub use tracks::{RawTrack, TrackGroup};
pub use types::{
    BackendLifecycle, BackendStatus, Feedback, FeedbackIcon, LoadStatus, MediaItem,
    PlaybackState, PlayerSnapshot, StreamingInfo, Thumbnail, ThumbnailKey, TrackDescriptor,
    TrackKind, UiState, VideoScaleMode,
};

pub use bridge_traits::BackendKind;
