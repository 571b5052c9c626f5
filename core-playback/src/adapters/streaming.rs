//! Adapter over the third-party streaming engine.
//!
//! The engine has no seek completion signal, so seeks settle as soon as the
//! position has been handed over. Tracks are plain indexed lists where `-1`
//! means "disabled".

use super::{millis, EventSlot};
use crate::backend::{unsupported_pip, AdapterEvent, AdapterEventSender, PlayerBackend, SeekHandle};
use crate::error::{PlaybackError, Result};
use crate::tracks::{RawTrack, TrackGroup};
use crate::types::{
    BackendStatus, MediaItem, StreamingInfo, TrackDescriptor, TrackKind, VideoScaleMode,
};
use async_trait::async_trait;
use bridge_traits::{
    BackendKind, NativeImage, ObserverToken, RenderSurface, StreamingEngine, StreamingEngineEvent,
    StreamingEngineState, StreamingObserver, StreamingTrack,
};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct LoadSession {
    loaded: bool,
    ready: bool,
    source: Option<String>,
}

#[derive(Default)]
struct StreamingShared {
    events: EventSlot,
    session: Mutex<LoadSession>,
    tracks: Mutex<Option<(TrackGroup, TrackGroup)>>,
    surface: Mutex<Option<RenderSurface>>,
    observer: Mutex<Option<ObserverToken>>,
}

pub struct StreamingBackend {
    engine: Arc<dyn StreamingEngine>,
    shared: Arc<StreamingShared>,
}

impl StreamingShared {
    fn handle_engine_event(&self, event: StreamingEngineEvent) {
        let StreamingEngineEvent::StateChanged(state) = event else {
            return;
        };

        match state {
            StreamingEngineState::Playing => {
                {
                    let mut session = self.session.lock();
                    if !session.loaded || session.ready {
                        return;
                    }
                    session.ready = true;
                }
                self.tracks.lock().take();
                info!("Streaming media ready");
                self.events.send(AdapterEvent::Ready);
            }
            StreamingEngineState::Error => {
                let ready = {
                    let session = self.session.lock();
                    if !session.loaded {
                        return;
                    }
                    session.ready
                };
                warn!(ready, "Streaming engine reported an error");
                self.events.send(if ready {
                    AdapterEvent::PlaybackFailed {
                        reason: "stream playback error".to_string(),
                    }
                } else {
                    AdapterEvent::LoadFailed {
                        reason: "stream could not be opened".to_string(),
                    }
                });
            }
            StreamingEngineState::Ended => {
                if self.session.lock().loaded {
                    self.events.send(AdapterEvent::DidPlayToEnd);
                }
            }
            StreamingEngineState::Opening
            | StreamingEngineState::Buffering
            | StreamingEngineState::Paused
            | StreamingEngineState::Stopped => {}
        }
    }
}

fn to_raw(track: StreamingTrack) -> RawTrack {
    RawTrack {
        native_index: track.index,
        display_name: track.name,
        language_tag: track.language,
        locale: None,
    }
}

impl StreamingBackend {
    pub fn new(engine: Arc<dyn StreamingEngine>) -> Self {
        Self {
            engine,
            shared: Arc::new(StreamingShared::default()),
        }
    }

    fn groups(&self) -> (TrackGroup, TrackGroup) {
        if let Some(groups) = self.shared.tracks.lock().as_ref() {
            return groups.clone();
        }

        // Index -1 is the engine's "disable" entry, not a real track.
        let audio = TrackGroup::resolve(
            TrackKind::Audio,
            self.engine
                .audio_tracks()
                .into_iter()
                .filter(|t| t.index >= 0)
                .map(to_raw),
        );
        let subtitles = TrackGroup::resolve(
            TrackKind::Subtitle,
            self.engine
                .subtitle_tracks()
                .into_iter()
                .filter(|t| t.index >= 0)
                .map(to_raw),
        );
        if audio.is_empty() && subtitles.is_empty() {
            return (audio, subtitles);
        }

        self.shared
            .tracks
            .lock()
            .get_or_insert((audio, subtitles))
            .clone()
    }

    fn group(&self, kind: TrackKind) -> TrackGroup {
        let (audio, subtitles) = self.groups();
        match kind {
            TrackKind::Audio => audio,
            TrackKind::Subtitle => subtitles,
        }
    }
}

#[async_trait]
impl PlayerBackend for StreamingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Streaming
    }

    fn attach(&self, events: AdapterEventSender) {
        self.detach();
        self.shared.events.set(events);

        let weak_shared = Arc::downgrade(&self.shared);
        let observer: StreamingObserver = Arc::new(move |event| {
            if let Some(shared) = weak_shared.upgrade() {
                shared.handle_engine_event(event);
            }
        });

        let token = self.engine.add_observer(observer);
        *self.shared.observer.lock() = Some(token);
    }

    fn detach(&self) {
        if let Some(token) = self.shared.observer.lock().take() {
            self.engine.remove_observer(token);
        }
        self.shared.events.clear();
    }

    fn release(&self) {
        *self.shared.session.lock() = LoadSession::default();
        self.shared.tracks.lock().take();
        self.engine.stop();
        self.engine.clear_media();
    }

    fn load(&self, item: &MediaItem, resume_at: Option<Duration>) {
        *self.shared.session.lock() = LoadSession {
            loaded: true,
            ready: false,
            source: Some(item.source_url.clone()),
        };
        self.shared.tracks.lock().take();

        let start_time_ms = resume_at
            .filter(|p| !p.is_zero())
            .map(|p| p.as_millis().min(i64::MAX as u128) as i64);

        info!(
            url = %redact_url(&item.source_url),
            start_time_ms = start_time_ms.unwrap_or_default(),
            "Opening streaming media"
        );
        self.engine.set_media(&item.source_url, start_time_ms);
        self.engine.play();
    }

    fn play(&self) {
        self.engine.play();
    }

    fn pause(&self) {
        self.engine.pause();
    }

    fn stop(&self) {
        self.engine.stop();
    }

    fn seek(&self, to: Duration) -> SeekHandle {
        let target_ms = to.as_millis().min(i64::MAX as u128) as i64;
        debug!(target_ms, "Streaming seek");
        self.engine.set_time_ms(target_ms);
        SeekHandle::settled(true)
    }

    fn set_playback_speed(&self, speed: f32) {
        self.engine.set_rate(speed);
    }

    fn status(&self) -> BackendStatus {
        if !self.shared.session.lock().loaded {
            return BackendStatus::default();
        }

        let current_time = millis(self.engine.time_ms());
        let length = self.engine.length_ms();
        BackendStatus {
            is_playing: self.engine.is_playing(),
            is_buffering: matches!(
                self.engine.state(),
                StreamingEngineState::Opening | StreamingEngineState::Buffering
            ),
            current_time,
            duration: (length > 0).then(|| millis(length)),
            // The engine does not report buffer ranges.
            buffered_duration: current_time,
        }
    }

    fn tracks(&self, kind: TrackKind) -> Vec<TrackDescriptor> {
        self.group(kind).descriptors()
    }

    fn selected_track(&self, kind: TrackKind) -> Option<String> {
        let index = match kind {
            TrackKind::Audio => self.engine.current_audio_track(),
            TrackKind::Subtitle => self.engine.current_subtitle_track(),
        };
        if index < 0 {
            return None;
        }
        self.group(kind)
            .by_native_index(index)
            .map(|track| track.descriptor.id.clone())
    }

    fn select_audio_track(&self, id: &str) -> bool {
        let group = self.group(TrackKind::Audio);
        let Some(track) = group.find(id) else {
            debug!(track_id = id, "Unknown audio track; ignoring");
            return false;
        };
        self.engine.set_audio_track(track.native_index);
        true
    }

    fn select_subtitle(&self, id: Option<&str>) -> bool {
        let Some(id) = id else {
            self.engine.set_subtitle_track(-1);
            return true;
        };

        let group = self.group(TrackKind::Subtitle);
        let Some(track) = group.find(id) else {
            debug!(track_id = id, "Unknown subtitle track; ignoring");
            return false;
        };
        self.engine.set_subtitle_track(track.native_index);
        true
    }

    fn render_target(&self) -> Result<RenderSurface> {
        let mut surface = self.shared.surface.lock();
        if let Some(existing) = surface.as_ref() {
            return Ok(existing.clone());
        }
        let created = self.engine.create_render_surface()?;
        *surface = Some(created.clone());
        Ok(created)
    }

    fn supports_picture_in_picture(&self) -> bool {
        false
    }

    fn start_picture_in_picture(&self) -> Result<bool> {
        Err(unsupported_pip(BackendKind::Streaming))
    }

    fn stop_picture_in_picture(&self) -> Result<()> {
        Err(unsupported_pip(BackendKind::Streaming))
    }

    fn set_scale_mode(&self, mode: VideoScaleMode) {
        self.engine.set_aspect_fill(mode == VideoScaleMode::Fill);
    }

    fn streaming_info(&self) -> StreamingInfo {
        let unknown = StreamingInfo::unknown(Some(BackendKind::Streaming));
        let source = {
            let session = self.shared.session.lock();
            if !session.loaded {
                return unknown;
            }
            session.source.clone()
        };
        let Some(stats) = self.engine.media_statistics() else {
            return unknown;
        };

        StreamingInfo {
            source: source.as_deref().map(redact_url).unwrap_or(unknown.source),
            server: unknown.server,
            indicated_bitrate_kbps: stats.input_bitrate_kbps.max(0.0),
            observed_bitrate_kbps: stats.demux_bitrate_kbps.max(0.0),
            video_width: stats.video_width,
            video_height: stats.video_height,
            dropped_frames: stats.lost_pictures.max(0),
            stall_count: 0,
            backend: Some(BackendKind::Streaming),
        }
    }

    async fn generate_thumbnail(&self, at: Duration) -> Result<NativeImage> {
        let at_ms = at.as_millis().min(i64::MAX as u128) as i64;
        self.engine.generate_thumbnail(at_ms).await.map_err(|e| {
            warn!(error = %e, at_ms, "Streaming thumbnail generation failed");
            PlaybackError::ThumbnailUnavailable(format!("no frame at {:.1}s", at.as_secs_f64()))
        })
    }
}

impl Drop for StreamingBackend {
    fn drop(&mut self) {
        self.detach();
    }
}
