//! Remote display / casting bridge.
//!
//! The core only issues one-way "play this media at this position" commands
//! and listens for session lifecycle callbacks. Device discovery, pairing and
//! the casting SDK itself stay on the host side.

use crate::engine::ObserverToken;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Session lifecycle callbacks raised by the casting SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastSessionEvent {
    Started,
    Resumed,
    Ended,
    Failed { message: String },
}

pub type CastObserver = Arc<dyn Fn(CastSessionEvent) + Send + Sync>;

/// Media pushed to the remote surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastMediaRequest {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub start_position: Duration,
}

/// Host casting session.
#[async_trait]
pub trait CastSession: Send + Sync {
    /// Start playing `request` on the connected remote surface.
    async fn load_media(&self, request: CastMediaRequest) -> Result<()>;

    fn add_observer(&self, observer: CastObserver) -> ObserverToken;
    fn remove_observer(&self, token: ObserverToken);
}
