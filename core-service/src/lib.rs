//! Core service façade and bootstrap helpers.
//!
//! [`PlayerService`] is the composition root: it is built once from the host's
//! [`CoreConfig`] and owns the event bus, persisted preferences, the player
//! orchestrator (with its gesture translator and thumbnail cache) and, when the
//! host provides a cast session, the cast coordinator. Hosts keep one service
//! per player surface and hand out clones of [`PlayerService::player`].
//!
//! Desktop apps typically enable the `desktop-shims` feature, which lets
//! [`bootstrap_desktop`] fall back to a SQLite-backed settings store.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::BackendKind;
use core_playback::{
    CastCoordinator, EngineBackendFactory, MediaItem, PlayerConfig, PlayerOrchestrator,
    PlayerPreferences,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use tokio::runtime::Handle;
use tracing::{info, instrument};

#[cfg(feature = "desktop-shims")]
use bridge_traits::NativeEngineProvider;
#[cfg(feature = "desktop-shims")]
use std::path::PathBuf;

/// Primary façade exposed to host applications.
pub struct PlayerService {
    player: PlayerOrchestrator,
    preferences: PlayerPreferences,
    events: EventBus,
    cast: Option<CastCoordinator>,
}

impl PlayerService {
    /// Build the service on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`CoreError::InitializationFailed`] when called outside a runtime, or
    /// the playback configuration is invalid.
    pub fn new(core: CoreConfig, player_config: PlayerConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            CoreError::InitializationFailed(format!("No Tokio runtime available: {}", e))
        })?;
        Self::with_runtime(core, player_config, runtime)
    }

    /// Build the service, spawning timers and event pumps on `runtime`.
    pub fn with_runtime(
        core: CoreConfig,
        player_config: PlayerConfig,
        runtime: Handle,
    ) -> Result<Self> {
        core.validate()?;
        player_config
            .validate()
            .map_err(CoreError::InitializationFailed)?;

        let events = EventBus::new(core.event_buffer_size);
        let preferences =
            PlayerPreferences::new(Arc::clone(&core.settings_store), core.settings_namespace.clone());
        let factory = Arc::new(EngineBackendFactory::new(
            Arc::clone(&core.engines),
            &player_config,
        ));

        let player = PlayerOrchestrator::new(
            player_config,
            factory,
            Some(preferences.clone()),
            events.clone(),
            runtime.clone(),
        )?;

        let cast = core.cast_session.as_ref().map(|session| {
            CastCoordinator::attach(
                Arc::clone(session),
                player.clone(),
                events.clone(),
                runtime.clone(),
            )
        });

        info!(
            namespace = %core.settings_namespace,
            casting = cast.is_some(),
            "Player service created"
        );

        Ok(Self {
            player,
            preferences,
            events,
            cast,
        })
    }

    /// Activate the persisted (or default) backend.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<BackendKind> {
        let kind = self.player.bootstrap().await?;
        info!(backend = %kind, "Player service ready");
        Ok(kind)
    }

    pub fn player(&self) -> &PlayerOrchestrator {
        &self.player
    }

    pub fn preferences(&self) -> &PlayerPreferences {
        &self.preferences
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// A fresh subscription to the core event bus.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn cast(&self) -> Option<&CastCoordinator> {
        self.cast.as_ref()
    }

    /// Hand the current item to the connected cast device.
    ///
    /// # Errors
    ///
    /// [`CoreError::CapabilityMissing`] when the host did not provide a
    /// `CastSession`.
    pub async fn start_casting(&self) -> Result<bool> {
        let cast = self.cast.as_ref().ok_or_else(|| CoreError::CapabilityMissing {
            capability: "CastSession".to_string(),
            message: "Casting requires a CastSession in CoreConfig".to_string(),
        })?;
        Ok(cast.start_casting().await?)
    }

    /// Stop listening to the cast session and tear the player down.
    ///
    /// Returns the current item with its resume position recorded.
    pub fn shutdown(&self) -> Option<MediaItem> {
        if let Some(cast) = &self.cast {
            cast.detach();
        }
        self.player.shutdown()
    }
}

impl std::fmt::Debug for PlayerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerService")
            .field("player", &self.player)
            .field("preferences", &self.preferences)
            .field("casting", &self.cast.is_some())
            .finish()
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Preferences live in a SQLite file at `settings_path`.
///
/// ```ignore
/// use core_service::bootstrap_desktop;
///
/// let service = bootstrap_desktop(
///     Arc::new(HostEngines::new()),
///     "./player/settings.db".into(),
///     PlayerConfig::default(),
/// )
/// .await?;
/// service.player().load(MediaItem::new("Trailer", url))?;
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    engines: Arc<dyn NativeEngineProvider>,
    settings_path: PathBuf,
    player_config: PlayerConfig,
) -> Result<PlayerService> {
    let core = CoreConfig::builder()
        .engines(engines)
        .settings_path(settings_path)
        .build()?;

    let service = PlayerService::new(core, player_config)?;
    service.bootstrap().await?;
    Ok(service)
}
