//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the video player core:
//! - Logging and tracing infrastructure
//! - Configuration management (bridge wiring with fail-fast validation)
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the playback core and the
//! service facade depend on. It establishes the logging conventions and the
//! event broadcasting mechanism used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
