//! # Core Configuration Module
//!
//! Provides bridge wiring for the video player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds every host bridge the core needs. It enforces fail-fast
//! validation so a missing capability surfaces at startup instead of as a
//! silent no-op in the middle of playback.
//!
//! ## Required Dependencies
//!
//! - `NativeEngineProvider` - Creates the system and streaming engines
//! - `SettingsStore` - Persists the last backend and track preferences
//!
//! ## Optional Dependencies
//!
//! - `CastSession` - Remote display surface
//!
//! When the `desktop-shims` feature is enabled, a SQLite-backed
//! `SettingsStore` is created from `settings_path` if none is injected.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .engines(Arc::new(MyEngines::new()))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .cast_session(Arc::new(MyCastSession))
//!     .settings_namespace("com.example.player")
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{CastSession, NativeEngineProvider, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Namespace prepended to every persisted preference key.
pub const DEFAULT_SETTINGS_NAMESPACE: &str = "vpc.player";

/// Core configuration for the video player core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Native engine factory (required)
    pub engines: Arc<dyn NativeEngineProvider>,

    /// Preference storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Casting session (optional)
    pub cast_session: Option<Arc<dyn CastSession>>,

    /// Prefix for persisted preference keys
    pub settings_namespace: String,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("engines", &"NativeEngineProvider { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "cast_session",
                &self.cast_session.as_ref().map(|_| "CastSession { ... }"),
            )
            .field("settings_namespace", &self.settings_namespace)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.settings_namespace.trim().is_empty() {
            return Err(Error::Config(
                "Settings namespace cannot be empty".to_string(),
            ));
        }

        if self.settings_namespace.ends_with('.') {
            return Err(Error::Config(
                "Settings namespace must not end with '.'".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn engines_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "NativeEngineProvider".to_string(),
        message: "A NativeEngineProvider is required to create playback engines. \
                 Inject the host's wrappers around the platform media framework \
                 and the streaming engine."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for player preferences. \
                 Desktop: enable the 'desktop-shims' feature and set settings_path. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(settings_path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Handle, Runtime};

    let path = settings_path.ok_or_else(|| Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "No SettingsStore injected and no settings_path set for the \
                 default SQLite store."
            .to_string(),
    })?;

    let init_store = |path: PathBuf| -> Result<_> {
        let runtime = Runtime::new().map_err(|e| {
            Error::Internal(format!(
                "Failed to create Tokio runtime for default settings store: {}",
                e
            ))
        })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    // block_on panics inside an existing runtime, so hop to a plain thread.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(path)?,
    };

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_settings_path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    engines: Option<Arc<dyn NativeEngineProvider>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    settings_path: Option<PathBuf>,
    cast_session: Option<Arc<dyn CastSession>>,
    settings_namespace: Option<String>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the native engine provider.
    pub fn engines(mut self, engines: Arc<dyn NativeEngineProvider>) -> Self {
        self.engines = Some(engines);
        self
    }

    /// Sets the settings store.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the database path for the default desktop settings store.
    ///
    /// Ignored when a settings store is injected explicitly.
    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Sets the casting session.
    pub fn cast_session(mut self, session: Arc<dyn CastSession>) -> Self {
        self.cast_session = Some(session);
        self
    }

    /// Sets the preference key namespace.
    ///
    /// Default: `vpc.player`
    pub fn settings_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.settings_namespace = Some(namespace.into());
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no engine provider is set, or no
    ///   settings store is injected and no default can be provided.
    /// - [`Error::Config`] when validation fails.
    pub fn build(self) -> Result<CoreConfig> {
        let engines = self.engines.ok_or_else(engines_missing_error)?;

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.settings_path)?,
        };

        let config = CoreConfig {
            engines,
            settings_store,
            cast_session: self.cast_session,
            settings_namespace: self
                .settings_namespace
                .unwrap_or_else(|| DEFAULT_SETTINGS_NAMESPACE.to_string()),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
