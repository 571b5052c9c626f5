//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the player core and the native
//! world it orchestrates. The core owns state, lifecycle and coordination; the
//! host owns the actual media frameworks, casting SDK, preference storage and
//! log routing.
//!
//! ## Traits
//!
//! ### Playback Engines
//! - [`SystemEngine`](engine::SystemEngine) - Platform media framework (async seek callbacks, media selection groups)
//! - [`StreamingEngine`](engine::StreamingEngine) - Third-party streaming engine (millisecond clock, indexed tracks)
//! - [`NativeEngineProvider`](engine::NativeEngineProvider) - Creates a fresh engine per backend activation
//!
//! ### Remote Display
//! - [`CastSession`](cast::CastSession) - One-way media push plus session lifecycle callbacks
//!
//! ### Storage & Logging
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Engines | Settings |
//! |----------|---------|----------|
//! | Desktop  | host supplied | `bridge-desktop` (SQLite) |
//! | iOS      | host supplied | host supplied (UserDefaults) |
//!
//! ## Observer Lifetime
//!
//! Engines and cast sessions deliver notifications through closures registered
//! with `add_observer`. The core always removes its observers before it
//! releases an engine, so implementations may assume no callback outlives the
//! matching `remove_observer` call.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. The core
//! logs engine errors and absorbs them at the adapter boundary; hosts should
//! still provide actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. Callbacks may be invoked from any
//! thread; the core marshals them onto its own sequencer before touching state.

pub mod cast;
pub mod engine;
pub mod error;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use cast::{CastMediaRequest, CastObserver, CastSession, CastSessionEvent};
pub use engine::{
    AccessLogSnapshot, BackendKind, MediaCharacteristic, MediaSelectionOption, MediaStatistics,
    NativeEngineProvider, NativeImage, ObserverToken, RenderSurface, SeekCallback,
    StreamingEngine, StreamingEngineEvent, StreamingEngineState, StreamingObserver,
    StreamingTrack, SystemEngine, SystemEngineEvent, SystemItemStatus, SystemObserver,
    TimeControlStatus,
};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::SettingsStore;
