//! # Desktop Bridge Implementations
//!
//! Default bridge implementations for desktop hosts (macOS, Windows, Linux).
//!
//! Native playback engines are always supplied by the host application; the
//! only bridge with a sensible desktop default is preference storage:
//!
//! - [`SqliteSettingsStore`]: `SettingsStore` backed by a single SQLite file
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::SqliteSettingsStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = SqliteSettingsStore::new("./player/settings.db".into())
//!         .await
//!         .expect("open settings");
//!
//!     let config = core_runtime::config::CoreConfig::builder()
//!         .engines(Arc::new(HostEngines::new()))
//!         .settings_store(Arc::new(store))
//!         .build();
//! }
//! ```

mod settings;

pub use settings::SqliteSettingsStore;
