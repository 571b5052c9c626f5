//! Casting coordinator.
//!
//! Tracks the host cast session and hands the current media over when a
//! session starts. Device discovery and the casting protocol stay in the
//! host; this side only issues "play this at that position" commands.

use crate::error::Result;
use crate::orchestrator::PlayerOrchestrator;
use crate::types::millis;
use bridge_traits::{CastMediaRequest, CastObserver, CastSession, CastSessionEvent, ObserverToken};
use core_runtime::events::{CastEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};

struct CastShared {
    session: Arc<dyn CastSession>,
    player: PlayerOrchestrator,
    events: EventBus,
    runtime: Handle,
}

impl CastShared {
    fn emit(&self, event: CastEvent) {
        if self.events.emit(CoreEvent::Cast(event)).is_err() {
            trace!("No event subscribers");
        }
    }

    fn on_session_event(self: &Arc<Self>, event: CastSessionEvent) {
        match event {
            CastSessionEvent::Started => {
                info!("Cast session started");
                self.player.set_casting_active(true);
                self.emit(CastEvent::SessionStarted);

                let shared = Arc::clone(self);
                self.runtime.spawn(async move {
                    if let Err(e) = shared.push_now_playing().await {
                        warn!(error = %e, "Could not hand media to cast device");
                    }
                });
            }
            CastSessionEvent::Resumed => {
                info!("Cast session resumed");
                self.player.set_casting_active(true);
                self.emit(CastEvent::SessionResumed);
            }
            CastSessionEvent::Ended => {
                info!("Cast session ended");
                self.player.set_casting_active(false);
                self.emit(CastEvent::SessionEnded);
            }
            CastSessionEvent::Failed { message } => {
                warn!(error = %message, "Cast session failed");
                self.player.set_casting_active(false);
                self.emit(CastEvent::SessionFailed { message });
            }
        }
    }

    /// Push the current item to the remote surface and pause locally.
    async fn push_now_playing(&self) -> Result<bool> {
        let Some((media, position)) = self.player.now_playing() else {
            debug!("Nothing loaded; nothing to cast");
            return Ok(false);
        };

        let request = CastMediaRequest {
            url: media.source_url.clone(),
            title: media.title.clone(),
            description: media.description.clone(),
            start_position: position,
        };

        info!(
            url = %redact_url(&media.source_url),
            position_ms = millis(position),
            "Handing media to cast device"
        );
        self.player.pause();
        self.session.load_media(request).await?;

        self.emit(CastEvent::MediaPushed {
            title: media.title,
            position_ms: millis(position),
        });
        Ok(true)
    }
}

/// Owns the observer registration on a [`CastSession`]; removed on drop.
pub struct CastCoordinator {
    shared: Arc<CastShared>,
    token: Mutex<Option<ObserverToken>>,
}

impl CastCoordinator {
    pub fn attach(
        session: Arc<dyn CastSession>,
        player: PlayerOrchestrator,
        events: EventBus,
        runtime: Handle,
    ) -> Self {
        let shared = Arc::new(CastShared {
            session,
            player,
            events,
            runtime,
        });

        let weak = Arc::downgrade(&shared);
        let observer: CastObserver = Arc::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.on_session_event(event);
            }
        });
        let token = shared.session.add_observer(observer);

        Self {
            shared,
            token: Mutex::new(Some(token)),
        }
    }

    /// Send the current item to the connected surface.
    ///
    /// `Ok(false)` when nothing is loaded.
    pub async fn start_casting(&self) -> Result<bool> {
        self.shared.push_now_playing().await
    }

    pub fn is_attached(&self) -> bool {
        self.token.lock().is_some()
    }

    pub fn detach(&self) {
        if let Some(token) = self.token.lock().take() {
            self.shared.session.remove_observer(token);
            debug!("Cast observer removed");
        }
    }
}

impl Drop for CastCoordinator {
    fn drop(&mut self) {
        self.detach();
    }
}
