//! Typed, namespaced player preferences over a host [`SettingsStore`].
//!
//! Values are stored as JSON strings under `<namespace>.<key>`. A value that
//! no longer decodes (older format, manual edits) reads as unset.

use crate::error::{PlaybackError, Result};
use bridge_traits::{BackendKind, SettingsStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key of a preference holding a `T`.
pub struct SettingKey<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> SettingKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for SettingKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SettingKey<T> {}

impl<T> fmt::Debug for SettingKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SettingKey({})", self.name)
    }
}

/// Backend used on the last run.
pub const BACKEND_KIND: SettingKey<BackendKind> = SettingKey::new("backend.kind");

/// Primary language code of the last chosen audio track.
pub const AUDIO_LANGUAGE: SettingKey<String> = SettingKey::new("audio.language");

/// Primary language code of the last chosen subtitle; `None` means "off".
pub const SUBTITLE_LANGUAGE: SettingKey<Option<String>> = SettingKey::new("subtitle.language");

#[derive(Clone)]
pub struct PlayerPreferences {
    store: Arc<dyn SettingsStore>,
    namespace: String,
}

impl fmt::Debug for PlayerPreferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerPreferences")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl PlayerPreferences {
    pub fn new(store: Arc<dyn SettingsStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn storage_key<T>(&self, key: &SettingKey<T>) -> String {
        format!("{}.{}", self.namespace, key.name)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &SettingKey<T>) -> Result<Option<T>> {
        let storage_key = self.storage_key(key);
        let Some(raw) = self.store.get_string(&storage_key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = %storage_key, error = %e, "Ignoring undecodable preference");
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &SettingKey<T>, value: &T) -> Result<()> {
        let storage_key = self.storage_key(key);
        let raw = serde_json::to_string(value)
            .map_err(|e| PlaybackError::Preferences(format!("{}: {}", storage_key, e)))?;

        self.store.set_string(&storage_key, &raw).await?;
        debug!(key = %storage_key, "Preference saved");
        Ok(())
    }

    pub async fn remove<T>(&self, key: &SettingKey<T>) -> Result<()> {
        self.store.delete(&self.storage_key(key)).await?;
        Ok(())
    }
}
