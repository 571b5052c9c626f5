//! Adapter over the platform media framework.
//!
//! Native seeks complete asynchronously, so every seek goes through a
//! [`SeekCoalescer`]: at most one native seek is outstanding and bursts
//! collapse to the most recent target.

use super::{seconds, EventSlot};
use crate::backend::{AdapterEvent, AdapterEventSender, PlayerBackend, SeekCompleter, SeekHandle};
use crate::error::{PlaybackError, Result};
use crate::seek::SeekCoalescer;
use crate::tracks::{RawTrack, TrackGroup};
use crate::types::{
    BackendStatus, MediaItem, StreamingInfo, TrackDescriptor, TrackKind, VideoScaleMode,
};
use async_trait::async_trait;
use bridge_traits::{
    BackendKind, MediaCharacteristic, NativeImage, ObserverToken, RenderSurface, SystemEngine,
    SystemEngineEvent, SystemItemStatus, SystemObserver, TimeControlStatus,
};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Default)]
struct LoadSession {
    loaded: bool,
    ready: bool,
    resume_at: Option<Duration>,
}

struct SystemShared {
    events: EventSlot,
    coalescer: Mutex<SeekCoalescer>,
    session: Mutex<LoadSession>,
    tracks: Mutex<Option<(TrackGroup, TrackGroup)>>,
    /// Resume seek issued on readiness, until the orchestrator claims it.
    resume_seek: Mutex<Option<(Duration, SeekHandle)>>,
    surface: Mutex<Option<RenderSurface>>,
    observer: Mutex<Option<ObserverToken>>,
    rate: Mutex<f32>,
}

pub struct SystemBackend {
    engine: Arc<dyn SystemEngine>,
    shared: Arc<SystemShared>,
    tolerance: f64,
}

fn characteristic(kind: TrackKind) -> MediaCharacteristic {
    match kind {
        TrackKind::Audio => MediaCharacteristic::Audible,
        TrackKind::Subtitle => MediaCharacteristic::Legible,
    }
}

fn request_seek(
    engine: &Arc<dyn SystemEngine>,
    shared: &Arc<SystemShared>,
    target: Duration,
    tolerance: f64,
    completer: SeekCompleter,
) {
    let (issue, epoch) = {
        let mut coalescer = shared.coalescer.lock();
        (coalescer.request(target, completer), coalescer.epoch())
    };
    match issue {
        Some(target) => start_native_seek(engine, shared, target, tolerance, epoch),
        None => trace!(target_ms = target.as_millis() as u64, "Seek parked behind in-flight seek"),
    }
}

fn start_native_seek(
    engine: &Arc<dyn SystemEngine>,
    shared: &Arc<SystemShared>,
    target: Duration,
    tolerance: f64,
    epoch: u64,
) {
    debug!(target_ms = target.as_millis() as u64, epoch, "Issuing native seek");

    let weak_engine: Weak<dyn SystemEngine> = Arc::downgrade(engine);
    let weak_shared = Arc::downgrade(shared);

    engine.seek(
        target.as_secs_f64(),
        tolerance,
        Box::new(move |finished| {
            let Some(shared) = weak_shared.upgrade() else {
                return;
            };
            let next = shared.coalescer.lock().complete(epoch, finished);
            if let (Some(next), Some(engine)) = (next, weak_engine.upgrade()) {
                start_native_seek(&engine, &shared, next, tolerance, epoch);
            }
        }),
    );
}

impl SystemShared {
    fn handle_engine_event(
        self: &Arc<Self>,
        engine: &Arc<dyn SystemEngine>,
        event: SystemEngineEvent,
        tolerance: f64,
    ) {
        match event {
            SystemEngineEvent::ItemStatusChanged(SystemItemStatus::ReadyToPlay) => {
                let resume_at = {
                    let mut session = self.session.lock();
                    if !session.loaded || session.ready {
                        return;
                    }
                    session.ready = true;
                    session.resume_at.take()
                };
                self.tracks.lock().take();

                if let Some(position) = resume_at.filter(|p| !p.is_zero()) {
                    let (completer, handle) = SeekHandle::channel();
                    request_seek(engine, self, position, tolerance, completer);
                    *self.resume_seek.lock() = Some((position, handle));
                }

                engine.play();
                let rate = *self.rate.lock();
                if rate != 1.0 {
                    engine.set_rate(rate);
                }

                info!("System item ready");
                self.events.send(AdapterEvent::Ready);
            }
            SystemEngineEvent::ItemStatusChanged(SystemItemStatus::Failed) => {
                let ready = {
                    let session = self.session.lock();
                    if !session.loaded {
                        return;
                    }
                    session.ready
                };
                warn!(ready, "System item failed");
                self.events.send(if ready {
                    AdapterEvent::PlaybackFailed {
                        reason: "media item failed".to_string(),
                    }
                } else {
                    AdapterEvent::LoadFailed {
                        reason: "media could not be opened".to_string(),
                    }
                });
            }
            SystemEngineEvent::ItemStatusChanged(SystemItemStatus::Unknown) => {}
            SystemEngineEvent::ItemDidPlayToEnd => {
                self.events.send(AdapterEvent::DidPlayToEnd);
            }
            SystemEngineEvent::ItemFailedToPlayToEnd { message } => {
                warn!(error = %message, "System item failed to play to end");
                self.events.send(AdapterEvent::PlaybackFailed {
                    reason: "playback stopped before the end".to_string(),
                });
            }
            SystemEngineEvent::PictureInPictureChanged { active } => {
                self.events
                    .send(AdapterEvent::PictureInPictureChanged { active });
            }
        }
    }
}

impl SystemBackend {
    pub fn new(engine: Arc<dyn SystemEngine>, seek_tolerance: Duration) -> Self {
        Self {
            engine,
            shared: Arc::new(SystemShared {
                events: EventSlot::default(),
                coalescer: Mutex::new(SeekCoalescer::new()),
                session: Mutex::new(LoadSession::default()),
                tracks: Mutex::new(None),
                resume_seek: Mutex::new(None),
                surface: Mutex::new(None),
                observer: Mutex::new(None),
                rate: Mutex::new(1.0),
            }),
            tolerance: seek_tolerance.as_secs_f64(),
        }
    }

    fn resolve_group(&self, kind: TrackKind) -> TrackGroup {
        let options = self.engine.media_selection_options(characteristic(kind));
        TrackGroup::resolve(
            kind,
            options.into_iter().enumerate().map(|(index, option)| RawTrack {
                native_index: index as i32,
                display_name: option.display_name,
                language_tag: option.extended_language_tag,
                locale: option.locale_identifier,
            }),
        )
    }

    /// Track groups for the current item; cached once the engine lists any.
    fn groups(&self) -> (TrackGroup, TrackGroup) {
        if let Some(groups) = self.shared.tracks.lock().as_ref() {
            return groups.clone();
        }

        let audio = self.resolve_group(TrackKind::Audio);
        let subtitles = self.resolve_group(TrackKind::Subtitle);
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
impl PlayerBackend for SystemBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::System
    }

    fn attach(&self, events: AdapterEventSender) {
        self.detach();
        self.shared.events.set(events);

        let weak_shared = Arc::downgrade(&self.shared);
        let weak_engine: Weak<dyn SystemEngine> = Arc::downgrade(&self.engine);
        let tolerance = self.tolerance;
        let observer: SystemObserver = Arc::new(move |event| {
            let (Some(shared), Some(engine)) = (weak_shared.upgrade(), weak_engine.upgrade())
            else {
                return;
            };
            shared.handle_engine_event(&engine, event, tolerance);
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
        self.shared.coalescer.lock().reset();
        *self.shared.session.lock() = LoadSession::default();
        self.shared.tracks.lock().take();
        self.shared.resume_seek.lock().take();
        self.engine.pause();
        self.engine.clear_current_item();
    }

    fn load(&self, item: &MediaItem, resume_at: Option<Duration>) {
        *self.shared.session.lock() = LoadSession {
            loaded: true,
            ready: false,
            resume_at,
        };
        self.shared.tracks.lock().take();
        self.shared.resume_seek.lock().take();
        self.shared.coalescer.lock().reset();

        info!(url = %redact_url(&item.source_url), "Replacing system item");
        self.engine.replace_current_item(&item.source_url);
    }

    fn play(&self) {
        self.engine.play();
        let rate = *self.shared.rate.lock();
        if rate != 1.0 {
            self.engine.set_rate(rate);
        }
    }

    fn pause(&self) {
        self.engine.pause();
    }

    fn stop(&self) {
        self.engine.pause();
        let (completer, _handle) = SeekHandle::channel();
        request_seek(
            &self.engine,
            &self.shared,
            Duration::ZERO,
            self.tolerance,
            completer,
        );
    }

    fn seek(&self, to: Duration) -> SeekHandle {
        let (completer, handle) = SeekHandle::channel();
        request_seek(&self.engine, &self.shared, to, self.tolerance, completer);
        handle
    }

    fn take_resume_seek(&self) -> Option<(Duration, SeekHandle)> {
        self.shared.resume_seek.lock().take()
    }

    fn set_playback_speed(&self, speed: f32) {
        *self.shared.rate.lock() = speed;
        // A non-zero rate starts the system player; only apply it while playing.
        if self.engine.time_control_status() != TimeControlStatus::Paused {
            self.engine.set_rate(speed);
        }
    }

    fn status(&self) -> BackendStatus {
        let (loaded, ready) = {
            let session = self.shared.session.lock();
            (session.loaded, session.ready)
        };
        if !loaded {
            return BackendStatus::default();
        }

        let time_control = self.engine.time_control_status();
        BackendStatus {
            is_playing: time_control == TimeControlStatus::Playing,
            is_buffering: !ready || time_control == TimeControlStatus::WaitingToPlay,
            current_time: seconds(self.engine.current_time()),
            duration: self
                .engine
                .duration()
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(seconds),
            buffered_duration: self.engine.loaded_time_end().map(seconds).unwrap_or_default(),
        }
    }

    fn tracks(&self, kind: TrackKind) -> Vec<TrackDescriptor> {
        self.group(kind).descriptors()
    }

    fn selected_track(&self, kind: TrackKind) -> Option<String> {
        let index = self.engine.selected_media_option(characteristic(kind))?;
        self.group(kind)
            .by_native_index(index as i32)
            .map(|track| track.descriptor.id.clone())
    }

    fn select_audio_track(&self, id: &str) -> bool {
        let group = self.group(TrackKind::Audio);
        let Some(track) = group.find(id) else {
            debug!(track_id = id, "Unknown audio track; ignoring");
            return false;
        };
        self.engine
            .select_media_option(MediaCharacteristic::Audible, Some(track.native_index as usize));
        true
    }

    fn select_subtitle(&self, id: Option<&str>) -> bool {
        let Some(id) = id else {
            self.engine
                .select_media_option(MediaCharacteristic::Legible, None);
            return true;
        };

        let group = self.group(TrackKind::Subtitle);
        let Some(track) = group.find(id) else {
            debug!(track_id = id, "Unknown subtitle track; ignoring");
            return false;
        };
        self.engine
            .select_media_option(MediaCharacteristic::Legible, Some(track.native_index as usize));
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
        true
    }

    fn start_picture_in_picture(&self) -> Result<bool> {
        if !self.engine.is_picture_in_picture_possible() {
            debug!("Picture-in-picture not possible right now");
            return Ok(false);
        }
        self.engine.start_picture_in_picture();
        Ok(true)
    }

    fn stop_picture_in_picture(&self) -> Result<()> {
        self.engine.stop_picture_in_picture();
        Ok(())
    }

    fn set_scale_mode(&self, mode: VideoScaleMode) {
        self.engine
            .set_video_gravity_fill(mode == VideoScaleMode::Fill);
    }

    fn streaming_info(&self) -> StreamingInfo {
        let unknown = StreamingInfo::unknown(Some(BackendKind::System));
        if !self.shared.session.lock().loaded {
            return unknown;
        }
        let Some(log) = self.engine.access_log() else {
            return unknown;
        };

        StreamingInfo {
            source: log.uri.as_deref().map(redact_url).unwrap_or(unknown.source),
            server: log.server_address.unwrap_or(unknown.server),
            indicated_bitrate_kbps: log.indicated_bitrate.max(0.0) / 1000.0,
            observed_bitrate_kbps: log.observed_bitrate.max(0.0) / 1000.0,
            video_width: log.presentation_width,
            video_height: log.presentation_height,
            dropped_frames: log.dropped_video_frames.max(0),
            stall_count: log.stall_count.max(0),
            backend: Some(BackendKind::System),
        }
    }

    async fn generate_thumbnail(&self, at: Duration) -> Result<NativeImage> {
        self.engine
            .generate_image(at.as_secs_f64())
            .await
            .map_err(|e| {
                warn!(error = %e, at_ms = at.as_millis() as u64, "System thumbnail generation failed");
                PlaybackError::ThumbnailUnavailable(format!(
                    "no frame at {:.1}s",
                    at.as_secs_f64()
                ))
            })
    }
}

impl Drop for SystemBackend {
    fn drop(&mut self) {
        self.detach();
    }
}
