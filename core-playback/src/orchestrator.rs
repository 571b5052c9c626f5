//! # Player Orchestrator
//!
//! Single source of truth for playback state. Owns the active backend
//! adapter, performs hot-swaps, polls the adapter into the published
//! [`PlayerSnapshot`], and drives the derived UI state (controls visibility,
//! feedback, picture-in-picture, thumbnails).
//!
//! ## State flow
//!
//! Every mutation happens under one short `parking_lot` lock and is published
//! through a `watch` channel before the lock is released, so observers never
//! see snapshots out of order. Native notifications arrive on arbitrary
//! threads; adapters forward them through a channel to a per-backend event
//! pump which is the only place they are applied.
//!
//! ## Backend lifecycle
//!
//! ```text
//!   NoBackend ──set_backend──> SettingUp ──> Ready ──switch_backend──> SettingUp ──> Ready
//!                                                 └──shutdown──> TornDown
//! ```
//!
//! Retiring a backend always runs in this order: cancel its polling loop and
//! event pump, `detach` (observers removed), `release` (native item cleared),
//! drop. Every backend activation gets a new generation number; anything
//! tagged with an older generation is ignored.

use crate::backend::{AdapterEvent, BackendFactory, PlayerBackend, SeekHandle, SeekOutcome};
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::gestures::{self, GestureCommand, GestureContext, GestureTranslator};
use crate::preferences::{
    PlayerPreferences, SettingKey, AUDIO_LANGUAGE, BACKEND_KIND, SUBTITLE_LANGUAGE,
};
use crate::thumbnails::ThumbnailCache;
use crate::timer::TimerSlot;
use crate::tracks::find_by_language;
use crate::types::{
    millis, BackendLifecycle, Feedback, FeedbackIcon, LoadStatus, MediaItem, PlaybackState,
    PlayerSnapshot, StreamingInfo, Thumbnail, TrackDescriptor, TrackKind, UiState,
    VideoScaleMode,
};
use bridge_traits::{BackendKind, RenderSurface};
use core_runtime::events::{BackendEvent, CoreEvent, EventBus, PlaybackEvent, UiEvent};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

/// Audio session interruption reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Began,
    Ended { should_resume: bool },
}

struct ActiveBackend {
    kind: BackendKind,
    adapter: Arc<dyn PlayerBackend>,
    generation: u64,
    /// Cancels the polling loop and event pump of this activation.
    cancel: CancellationToken,
}

/// What a hot-swap restores once the reloaded media is ready.
#[derive(Debug, Clone)]
struct RestorePlan {
    position: Duration,
    audio_language: Option<String>,
    /// `Some(None)`: subtitles were off.
    subtitle_language: Option<Option<String>>,
    paused: bool,
}

struct PlayerState {
    active: Option<ActiveBackend>,
    lifecycle: BackendLifecycle,
    generation: u64,
    playback: PlaybackState,
    load_status: LoadStatus,
    media: Option<MediaItem>,
    queue: VecDeque<MediaItem>,
    audio_tracks: Vec<TrackDescriptor>,
    subtitle_tracks: Vec<TrackDescriptor>,
    selected_audio: Option<String>,
    selected_subtitle: Option<String>,
    ui: UiState,
    controls_epoch: u64,
    feedback_epoch: u64,
    load_epoch: u64,
    load_resume_at: Option<Duration>,
    seek_generation: u64,
    scrubbing: bool,
    /// Generation the polling loop currently runs for.
    polling: Option<u64>,
    restore: Option<RestorePlan>,
    preferred_audio: Option<String>,
    preferred_subtitle: Option<Option<String>>,
    wants_playing: bool,
    interrupted_while_playing: bool,
    ended_handled: bool,
}

impl PlayerState {
    fn new() -> Self {
        Self {
            active: None,
            lifecycle: BackendLifecycle::NoBackend,
            generation: 0,
            playback: PlaybackState::default(),
            load_status: LoadStatus::Idle,
            media: None,
            queue: VecDeque::new(),
            audio_tracks: Vec::new(),
            subtitle_tracks: Vec::new(),
            selected_audio: None,
            selected_subtitle: None,
            ui: UiState::default(),
            controls_epoch: 0,
            feedback_epoch: 0,
            load_epoch: 0,
            load_resume_at: None,
            seek_generation: 0,
            scrubbing: false,
            polling: None,
            restore: None,
            preferred_audio: None,
            preferred_subtitle: None,
            wants_playing: false,
            interrupted_while_playing: false,
            ended_handled: false,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    fn adapter(&self) -> Option<Arc<dyn PlayerBackend>> {
        self.active.as_ref().map(|active| Arc::clone(&active.adapter))
    }

    fn title(&self) -> String {
        self.media
            .as_ref()
            .map(|m| m.title.clone())
            .unwrap_or_default()
    }

    /// Forget everything tied to the current media item.
    fn reset_media(&mut self) {
        let speed = self.playback.playback_speed;
        self.playback = PlaybackState {
            playback_speed: speed,
            ..PlaybackState::default()
        };
        self.media = None;
        self.load_status = LoadStatus::Idle;
        self.load_epoch += 1;
        self.load_resume_at = None;
        self.seek_generation += 1;
        self.scrubbing = false;
        self.restore = None;
        self.clear_tracks();
        self.ui.picture_in_picture_active = false;
    }

    fn clear_tracks(&mut self) {
        self.audio_tracks.clear();
        self.subtitle_tracks.clear();
        self.selected_audio = None;
        self.selected_subtitle = None;
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            backend: self.active.as_ref().map(|active| active.kind),
            lifecycle: self.lifecycle,
            playback: self.playback.clone(),
            load_status: self.load_status.clone(),
            media: self.media.clone(),
            queue_len: self.queue.len(),
            audio_tracks: self.audio_tracks.clone(),
            subtitle_tracks: self.subtitle_tracks.clone(),
            selected_audio_track: self.selected_audio.clone(),
            selected_subtitle: self.selected_subtitle.clone(),
            ui: self.ui.clone(),
        }
    }
}

struct Inner {
    config: PlayerConfig,
    factory: Arc<dyn BackendFactory>,
    preferences: Option<PlayerPreferences>,
    events: EventBus,
    state: Mutex<PlayerState>,
    published: watch::Sender<PlayerSnapshot>,
    runtime: Handle,
    controls_timer: TimerSlot,
    feedback_timer: TimerSlot,
    load_timer: TimerSlot,
    thumbnails: ThumbnailCache,
    gestures: Arc<GestureTranslator>,
    /// Serializes backend activation.
    swap_lock: tokio::sync::Mutex<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(active) = self.state.get_mut().active.take() {
            active.cancel.cancel();
            active.adapter.detach();
            active.adapter.release();
        }
    }
}

/// Handle to the player. Cheap to clone; all clones drive the same player.
#[derive(Clone)]
pub struct PlayerOrchestrator {
    inner: Arc<Inner>,
}

fn language_of(tracks: &[TrackDescriptor], id: Option<&str>) -> Option<String> {
    let id = id?;
    tracks
        .iter()
        .find(|t| t.id == id)
        .and_then(|t| t.language_code.clone())
}

impl PlayerOrchestrator {
    pub fn new(
        config: PlayerConfig,
        factory: Arc<dyn BackendFactory>,
        preferences: Option<PlayerPreferences>,
        events: EventBus,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::Config)?;

        let (published, _) = watch::channel(PlayerSnapshot::default());
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let sink_target = weak.clone();
            let gestures = GestureTranslator::new(
                runtime.clone(),
                config.double_tap_seek_step,
                config.tap_delay,
                config.seek_accumulation_reset,
                Arc::new(move |command| {
                    if let Some(inner) = sink_target.upgrade() {
                        PlayerOrchestrator { inner }.apply_gesture(command);
                    }
                }),
            );

            Inner {
                thumbnails: ThumbnailCache::new(
                    config.thumbnail_quantum,
                    config.thumbnail_cache_capacity,
                ),
                controls_timer: TimerSlot::new(runtime.clone()),
                feedback_timer: TimerSlot::new(runtime.clone()),
                load_timer: TimerSlot::new(runtime.clone()),
                gestures,
                config,
                factory,
                preferences,
                events,
                state: Mutex::new(PlayerState::new()),
                published,
                runtime,
                swap_lock: tokio::sync::Mutex::new(()),
            }
        });

        Ok(Self { inner })
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn publish(&self, state: &PlayerState) {
        let snapshot = state.snapshot();
        self.inner.published.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn emit(&self, event: CoreEvent) {
        if self.inner.events.emit(event).is_err() {
            trace!("No event subscribers");
        }
    }

    fn persist<T>(&self, key: SettingKey<T>, value: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        let Some(preferences) = self.inner.preferences.clone() else {
            return;
        };
        self.inner.runtime.spawn(async move {
            if let Err(e) = preferences.set(&key, &value).await {
                warn!(key = key.name(), error = %e, "Failed to persist preference");
            }
        });
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.inner.published.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.inner.published.subscribe()
    }

    pub fn active_backend(&self) -> Option<BackendKind> {
        self.inner.state.lock().active.as_ref().map(|a| a.kind)
    }

    // ========================================================================
    // Backend Lifecycle
    // ========================================================================

    /// Activate the persisted backend (or the configured default) and load
    /// the persisted track language preferences.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<BackendKind> {
        let mut kind = self.inner.config.default_backend;

        if let Some(preferences) = &self.inner.preferences {
            match preferences.get(&BACKEND_KIND).await {
                Ok(Some(saved)) => kind = saved,
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Could not read saved backend; using default"),
            }

            let audio = preferences.get(&AUDIO_LANGUAGE).await.unwrap_or_else(|e| {
                warn!(error = %e, "Could not read audio language preference");
                None
            });
            let subtitle = preferences
                .get(&SUBTITLE_LANGUAGE)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Could not read subtitle language preference");
                    None
                });

            let mut state = self.inner.state.lock();
            state.preferred_audio = audio;
            state.preferred_subtitle = subtitle;
        }

        self.set_backend(kind).await?;
        Ok(kind)
    }

    /// Activate a fresh adapter of `kind`, retiring the current one.
    ///
    /// Any loaded media is dropped; use [`switch_backend`](Self::switch_backend)
    /// to carry it over.
    #[instrument(skip(self), fields(backend = %kind))]
    pub async fn set_backend(&self, kind: BackendKind) -> Result<()> {
        let _swap = self.inner.swap_lock.lock().await;
        self.install_backend(kind)?;
        self.persist(BACKEND_KIND, kind);
        Ok(())
    }

    fn install_backend(&self, kind: BackendKind) -> Result<Arc<dyn PlayerBackend>> {
        let previous = {
            let mut state = self.inner.state.lock();
            let previous = state.active.take();
            state.generation += 1;
            state.polling = None;
            state.lifecycle = BackendLifecycle::SettingUp(kind);
            state.reset_media();
            self.publish(&state);
            previous
        };

        self.inner.load_timer.cancel();
        self.inner.gestures.reset();
        if let Some(previous) = previous {
            self.teardown(previous);
        }
        self.inner.thumbnails.clear();

        let adapter = match self.inner.factory.create(kind) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(backend = %kind, error = %e, "Backend setup failed");
                {
                    let mut state = self.inner.state.lock();
                    state.lifecycle = BackendLifecycle::NoBackend;
                    self.publish(&state);
                }
                self.emit(CoreEvent::Backend(BackendEvent::SetupFailed {
                    kind: kind.to_string(),
                    message: e.to_string(),
                }));
                return Err(e);
            }
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        adapter.attach(events_tx);

        let cancel = CancellationToken::new();
        let (generation, scale_mode) = {
            let mut state = self.inner.state.lock();
            let generation = state.generation;
            state.active = Some(ActiveBackend {
                kind,
                adapter: Arc::clone(&adapter),
                generation,
                cancel: cancel.clone(),
            });
            state.lifecycle = BackendLifecycle::Ready(kind);
            self.publish(&state);
            (generation, state.ui.scale_mode)
        };
        adapter.set_scale_mode(scale_mode);

        self.spawn_event_pump(events_rx, generation, cancel);

        info!(backend = %kind, generation, "Backend attached");
        self.emit(CoreEvent::Backend(BackendEvent::Attached {
            kind: kind.to_string(),
        }));
        Ok(adapter)
    }

    fn teardown(&self, previous: ActiveBackend) {
        let ActiveBackend {
            kind,
            adapter,
            generation,
            cancel,
        } = previous;

        cancel.cancel();
        adapter.detach();
        adapter.release();
        drop(adapter);

        debug!(backend = %kind, generation, "Backend torn down");
        self.emit(CoreEvent::Backend(BackendEvent::Detached {
            kind: kind.to_string(),
        }));
    }

    /// Hot-swap to `kind`, carrying over media, position, speed, track
    /// languages and play/pause intent. Switching to the active kind is a
    /// no-op.
    #[instrument(skip(self), fields(backend = %kind))]
    pub async fn switch_backend(&self, kind: BackendKind) -> Result<()> {
        let _swap = self.inner.swap_lock.lock().await;

        let (from, adapter, media, known_position) = {
            let state = self.inner.state.lock();
            let from = state.active.as_ref().map(|a| a.kind);
            if from == Some(kind) {
                debug!("Backend already active");
                return Ok(());
            }
            // Before the item opens the engine reports 0; the resume point holds.
            let known_position = if state.playback.pending_seek_time.is_some() {
                state.playback.pending_seek_time
            } else if matches!(state.load_status, LoadStatus::Loading { .. }) {
                Some(state.load_resume_at.unwrap_or_default())
            } else {
                None
            };
            (from, state.adapter(), state.media.clone(), known_position)
        };

        let live_position = match (&adapter, known_position) {
            (_, Some(position)) => position,
            (Some(adapter), None) if media.is_some() => adapter.status().current_time,
            _ => Duration::ZERO,
        };

        let plan = {
            let state = self.inner.state.lock();
            let position = state.playback.clamp_position(live_position);
            let subtitle_language = if state.subtitle_tracks.is_empty() {
                None
            } else {
                Some(language_of(
                    &state.subtitle_tracks,
                    state.selected_subtitle.as_deref(),
                ))
            };
            RestorePlan {
                position,
                audio_language: language_of(&state.audio_tracks, state.selected_audio.as_deref()),
                subtitle_language,
                paused: !state.wants_playing,
            }
        };

        info!(
            from = from.map(|k| k.as_str()).unwrap_or("none"),
            position_ms = millis(plan.position),
            "Switching backend"
        );
        self.emit(CoreEvent::Backend(BackendEvent::SwitchStarted {
            from: from.map(|k| k.to_string()),
            to: kind.to_string(),
            position_ms: millis(plan.position),
        }));

        self.install_backend(kind)?;
        self.persist(BACKEND_KIND, kind);

        match media {
            Some(media) => {
                let position = plan.position;
                self.start_load(media, Some(position), Some(plan))?;
            }
            None => {
                self.emit(CoreEvent::Backend(BackendEvent::SwitchCompleted {
                    kind: kind.to_string(),
                    position_ms: 0,
                }));
            }
        }
        Ok(())
    }

    /// Record the resume position, retire the backend and return the
    /// current item (with `last_known_position` set) for a later resume.
    pub fn shutdown(&self) -> Option<MediaItem> {
        let (previous, media) = {
            let mut state = self.inner.state.lock();
            let position = state.playback.current_time;
            let media = state
                .media
                .take()
                .map(|m| m.with_last_known_position(position));
            let previous = state.active.take();
            state.generation += 1;
            state.polling = None;
            state.reset_media();
            state.lifecycle = BackendLifecycle::TornDown;
            self.publish(&state);
            (previous, media)
        };

        self.inner.controls_timer.cancel();
        self.inner.feedback_timer.cancel();
        self.inner.load_timer.cancel();
        self.inner.gestures.reset();
        if let Some(previous) = previous {
            self.teardown(previous);
        }
        self.inner.thumbnails.clear();

        info!(has_media = media.is_some(), "Player shut down");
        media
    }

    // ========================================================================
    // Event Pump
    // ========================================================================

    fn spawn_event_pump(
        &self,
        mut events: mpsc::UnboundedReceiver<AdapterEvent>,
        generation: u64,
        cancel: CancellationToken,
    ) {
        let weak = self.downgrade();
        self.inner.runtime.spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                let Some(this) = Self::upgrade(&weak) else {
                    break;
                };
                this.handle_adapter_event(generation, event);
            }
            trace!(generation, "Event pump stopped");
        });
    }

    fn handle_adapter_event(&self, generation: u64, event: AdapterEvent) {
        if !self.inner.state.lock().is_current(generation) {
            trace!(generation, ?event, "Dropping event from retired backend");
            return;
        }

        match event {
            AdapterEvent::Ready => self.on_ready(generation),
            AdapterEvent::LoadFailed { reason } => self.on_load_failure(generation, reason),
            AdapterEvent::PlaybackFailed { reason } => self.on_playback_failure(generation, reason),
            AdapterEvent::DidPlayToEnd => self.on_ended(generation),
            AdapterEvent::PictureInPictureChanged { active } => {
                {
                    let mut state = self.inner.state.lock();
                    state.ui.picture_in_picture_active = active;
                    self.publish(&state);
                }
                self.emit(CoreEvent::Playback(PlaybackEvent::PictureInPictureChanged {
                    active,
                }));
            }
        }
    }

    fn on_ready(&self, generation: u64) {
        let (adapter, plan, title, speed, preferred_audio, preferred_subtitle) = {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                return;
            }
            if !matches!(state.load_status, LoadStatus::Loading { .. }) {
                debug!("Ready outside of a load; ignoring");
                return;
            }
            let Some(adapter) = state.adapter() else {
                return;
            };
            state.load_status = LoadStatus::Ready;
            state.load_epoch += 1;
            (
                adapter,
                state.restore.take(),
                state.title(),
                state.playback.playback_speed,
                state.preferred_audio.clone(),
                state.preferred_subtitle.clone(),
            )
        };
        self.inner.load_timer.cancel();

        if speed != 1.0 {
            adapter.set_playback_speed(speed);
        }

        let audio_tracks = adapter.tracks(TrackKind::Audio);
        let subtitle_tracks = adapter.tracks(TrackKind::Subtitle);

        let (audio_language, subtitle_language, paused) = match &plan {
            Some(plan) => (
                plan.audio_language.clone(),
                plan.subtitle_language.clone(),
                plan.paused,
            ),
            None => (preferred_audio, preferred_subtitle, false),
        };

        if let Some(id) = audio_language
            .as_deref()
            .and_then(|code| find_by_language(&audio_tracks, code))
            .map(|t| t.id.clone())
        {
            adapter.select_audio_track(&id);
        }
        match subtitle_language {
            Some(None) if !subtitle_tracks.is_empty() => {
                adapter.select_subtitle(None);
            }
            Some(Some(code)) => {
                if let Some(track) = find_by_language(&subtitle_tracks, &code) {
                    adapter.select_subtitle(Some(&track.id));
                }
            }
            _ => {}
        }
        if paused {
            adapter.pause();
        }

        let status = adapter.status();
        let selected_audio = adapter.selected_track(TrackKind::Audio);
        let selected_subtitle = adapter.selected_track(TrackKind::Subtitle);
        let resume_seek = adapter.take_resume_seek();

        let (duration, resume_seek) = {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                return;
            }
            state.audio_tracks = audio_tracks;
            state.subtitle_tracks = subtitle_tracks;
            state.selected_audio = selected_audio;
            state.selected_subtitle = selected_subtitle;
            state.playback.duration = status.duration.or(state.playback.duration);
            state.playback.is_playing = !paused;
            state.playback.is_buffering = false;
            state.wants_playing = !paused;

            // Polling must not publish the engine's position until the
            // resume seek lands.
            let resume_seek = match resume_seek {
                Some((target, native)) if !state.playback.is_seeking => {
                    let target = state.playback.clamp_position(target);
                    state.seek_generation += 1;
                    state.playback.is_seeking = true;
                    state.playback.pending_seek_time = Some(target);
                    state.playback.current_time = target;
                    Some((target, native, state.seek_generation))
                }
                _ => None,
            };
            self.publish(&state);
            (state.playback.duration, resume_seek)
        };

        if let Some((target, native, seek_generation)) = resume_seek {
            trace!(target_ms = millis(target), seek_generation, "Tracking resume seek");
            let weak = self.downgrade();
            self.inner.runtime.spawn(async move {
                let outcome = native.await;
                if let Some(this) = Self::upgrade(&weak) {
                    this.finish_seek(seek_generation, target, outcome);
                }
            });
        }

        info!(title = %title, "Media ready");
        self.emit(CoreEvent::Playback(PlaybackEvent::Ready {
            title,
            duration_ms: duration.map(millis),
        }));
        if let Some(plan) = plan {
            self.emit(CoreEvent::Backend(BackendEvent::SwitchCompleted {
                kind: adapter.kind().to_string(),
                position_ms: millis(plan.position),
            }));
        }
        self.ensure_polling();
    }

    fn on_playback_failure(&self, generation: u64, reason: String) {
        let (title, attempts) = {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) || state.media.is_none() {
                return;
            }
            let attempts = match state.load_status {
                LoadStatus::Loading { attempt } => attempt,
                _ => 1,
            };
            state.load_status = LoadStatus::Failed {
                attempts,
                reason: reason.clone(),
            };
            state.load_epoch += 1;
            state.playback.is_playing = false;
            state.playback.is_buffering = false;
            state.wants_playing = false;
            self.publish(&state);
            (state.title(), attempts)
        };
        self.inner.load_timer.cancel();

        warn!(title = %title, reason = %reason, "Playback failed");
        self.emit(CoreEvent::Playback(PlaybackEvent::LoadFailed {
            title,
            attempts,
            reason,
        }));
    }

    fn on_ended(&self, generation: u64) {
        let (title, next, remaining, adapter) = {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) || state.ended_handled || state.media.is_none() {
                return;
            }
            state.ended_handled = true;
            let next = state.queue.pop_front();
            (
                state.title(),
                next,
                state.queue.len() as u32,
                state.adapter(),
            )
        };

        info!(title = %title, has_next = next.is_some(), "Media ended");
        self.emit(CoreEvent::Playback(PlaybackEvent::Ended { title }));

        match next {
            Some(item) => {
                self.emit(CoreEvent::Playback(PlaybackEvent::AdvancedToNext {
                    title: item.title.clone(),
                    remaining,
                }));
                let resume_at = item.last_known_position;
                if let Err(e) = self.start_load(item, resume_at, None) {
                    warn!(error = %e, "Could not advance to next item");
                }
            }
            None => {
                if let Some(adapter) = adapter {
                    adapter.stop();
                }
                {
                    let mut state = self.inner.state.lock();
                    state.playback.is_playing = false;
                    state.playback.current_time = Duration::ZERO;
                    state.wants_playing = false;
                    if let Some(media) = state.media.take() {
                        state.media = Some(MediaItem {
                            last_known_position: None,
                            ..media
                        });
                    }
                    self.publish(&state);
                }
                self.emit(CoreEvent::Playback(PlaybackEvent::Stopped));
                self.note_interaction();
            }
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load `item`, resuming at its `last_known_position` when set.
    pub fn load(&self, item: MediaItem) -> Result<()> {
        let resume_at = item.last_known_position;
        self.start_load(item, resume_at, None)
    }

    fn start_load(
        &self,
        item: MediaItem,
        resume_at: Option<Duration>,
        restore: Option<RestorePlan>,
    ) -> Result<()> {
        let (adapter, epoch) = {
            let mut state = self.inner.state.lock();
            let Some(adapter) = state.adapter() else {
                return Err(PlaybackError::NoBackend);
            };
            state.reset_media();
            state.playback.current_time = resume_at.unwrap_or_default();
            state.playback.is_buffering = true;
            state.media = Some(item.clone());
            state.load_status = LoadStatus::Loading { attempt: 1 };
            state.load_resume_at = resume_at;
            state.restore = restore;
            state.ended_handled = false;
            state.wants_playing = true;
            self.publish(&state);
            (adapter, state.load_epoch)
        };
        self.inner.thumbnails.clear();

        info!(
            title = %item.title,
            url = %redact_url(&item.source_url),
            resume_ms = resume_at.map(millis).unwrap_or_default(),
            "Loading media"
        );
        adapter.load(&item, resume_at);
        self.arm_load_timeout(epoch);
        self.ensure_polling();

        self.emit(CoreEvent::Playback(PlaybackEvent::Loading {
            title: item.title,
            attempt: 1,
        }));
        Ok(())
    }

    /// Append an item played after the current one ends.
    pub fn enqueue(&self, item: MediaItem) {
        let mut state = self.inner.state.lock();
        state.queue.push_back(item);
        self.publish(&state);
    }

    pub fn clear_queue(&self) {
        let mut state = self.inner.state.lock();
        state.queue.clear();
        self.publish(&state);
    }

    fn arm_load_timeout(&self, epoch: u64) {
        let weak = self.downgrade();
        self.inner
            .load_timer
            .arm(self.inner.config.load_timeout, move || {
                if let Some(this) = Self::upgrade(&weak) {
                    this.on_load_timeout(epoch);
                }
            });
    }

    fn on_load_timeout(&self, epoch: u64) {
        let generation = {
            let state = self.inner.state.lock();
            if state.load_epoch != epoch || !matches!(state.load_status, LoadStatus::Loading { .. })
            {
                return;
            }
            match &state.active {
                Some(active) => active.generation,
                None => return,
            }
        };
        warn!(
            timeout_ms = millis(self.inner.config.load_timeout),
            "Media did not become ready in time"
        );
        self.on_load_failure(generation, "timed out waiting for media".to_string());
    }

    fn on_load_failure(&self, generation: u64, reason: String) {
        let max_attempts = self.inner.config.load_max_attempts;

        let (title, attempt, epoch) = {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                return;
            }
            let LoadStatus::Loading { attempt } = state.load_status else {
                return;
            };
            state.load_epoch += 1;

            if attempt >= max_attempts {
                state.load_status = LoadStatus::Failed {
                    attempts: attempt,
                    reason: reason.clone(),
                };
                state.playback.is_playing = false;
                state.playback.is_buffering = false;
                state.wants_playing = false;
                self.publish(&state);
                let title = state.title();
                drop(state);

                self.inner.load_timer.cancel();
                warn!(title = %title, attempts = attempt, reason = %reason, "Giving up on media");
                self.emit(CoreEvent::Playback(PlaybackEvent::LoadFailed {
                    title,
                    attempts: attempt,
                    reason,
                }));
                return;
            }

            (state.title(), attempt, state.load_epoch)
        };

        let delay = self.inner.config.retry_delay(attempt);
        let next = attempt + 1;
        info!(
            title = %title,
            attempt = next,
            delay_ms = millis(delay),
            reason = %reason,
            "Retrying media load"
        );
        self.emit(CoreEvent::Playback(PlaybackEvent::LoadRetrying {
            title,
            attempt: next,
            delay_ms: millis(delay),
        }));

        let weak = self.downgrade();
        self.inner.load_timer.arm(delay, move || {
            if let Some(this) = Self::upgrade(&weak) {
                this.retry_load(epoch, next);
            }
        });
    }

    fn retry_load(&self, epoch: u64, attempt: u32) {
        let (adapter, media, resume_at, epoch) = {
            let mut state = self.inner.state.lock();
            if state.load_epoch != epoch {
                return;
            }
            let (Some(adapter), Some(media)) = (state.adapter(), state.media.clone()) else {
                return;
            };
            state.load_status = LoadStatus::Loading { attempt };
            state.load_epoch += 1;
            state.playback.is_buffering = true;
            self.publish(&state);
            (adapter, media, state.load_resume_at, state.load_epoch)
        };

        adapter.load(&media, resume_at);
        self.arm_load_timeout(epoch);
        self.emit(CoreEvent::Playback(PlaybackEvent::Loading {
            title: media.title,
            attempt,
        }));
    }

    // ========================================================================
    // Polling
    // ========================================================================

    fn ensure_polling(&self) {
        let (generation, cancel) = {
            let mut state = self.inner.state.lock();
            let Some(active) = state.active.as_ref() else {
                return;
            };
            let generation = active.generation;
            let cancel = active.cancel.clone();
            if state.polling == Some(generation) {
                return;
            }
            state.polling = Some(generation);
            (generation, cancel)
        };

        let weak = self.downgrade();
        let period = self.inner.config.poll_interval;
        self.inner.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let Some(this) = Self::upgrade(&weak) else {
                    break;
                };
                if !this.poll_once(generation) {
                    break;
                }
            }
            trace!(generation, "Polling stopped");
        });
    }

    /// Copy the adapter's transport state into the published state.
    fn poll_once(&self, generation: u64) -> bool {
        let adapter = {
            let state = self.inner.state.lock();
            if !state.is_current(generation) {
                return false;
            }
            if state.media.is_none() {
                return true;
            }
            match state.adapter() {
                Some(adapter) => adapter,
                None => return false,
            }
        };

        let status = adapter.status();

        let mut state = self.inner.state.lock();
        if !state.is_current(generation) {
            return false;
        }
        if state.media.is_none() {
            return true;
        }
        // The engine reports 0 until the item is open; keep the resume point.
        let loading = matches!(state.load_status, LoadStatus::Loading { .. });

        let playback = &mut state.playback;
        playback.is_playing = status.is_playing;
        playback.is_buffering = status.is_buffering;
        if status.duration.is_some() {
            playback.duration = status.duration;
        }
        playback.buffered_duration = playback.clamp_position(status.buffered_duration);
        if !playback.is_seeking && !loading {
            playback.current_time = playback.clamp_position(status.current_time);
        }
        self.publish(&state);
        true
    }

    // ========================================================================
    // Transport
    // ========================================================================

    fn loaded_adapter(&self) -> Option<Arc<dyn PlayerBackend>> {
        let state = self.inner.state.lock();
        state.media.as_ref()?;
        state.adapter()
    }

    pub fn play(&self) {
        let Some(adapter) = self.loaded_adapter() else {
            debug!("play ignored: nothing loaded");
            return;
        };
        adapter.play();

        let position = {
            let mut state = self.inner.state.lock();
            state.playback.is_playing = true;
            state.wants_playing = true;
            self.publish(&state);
            state.playback.current_time
        };
        self.emit(CoreEvent::Playback(PlaybackEvent::Started {
            position_ms: millis(position),
        }));
        self.show_feedback(Feedback::new("Play", FeedbackIcon::Play));
        self.note_interaction();
    }

    pub fn pause(&self) {
        let Some(adapter) = self.loaded_adapter() else {
            debug!("pause ignored: nothing loaded");
            return;
        };
        adapter.pause();

        let position = {
            let mut state = self.inner.state.lock();
            state.playback.is_playing = false;
            state.wants_playing = false;
            self.publish(&state);
            state.playback.current_time
        };
        self.emit(CoreEvent::Playback(PlaybackEvent::Paused {
            position_ms: millis(position),
        }));
        self.show_feedback(Feedback::new("Pause", FeedbackIcon::Pause));
        self.note_interaction();
    }

    pub fn toggle_play_pause(&self) {
        if self.inner.state.lock().wants_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Pause and return to the start.
    pub fn stop(&self) {
        let Some(adapter) = self.loaded_adapter() else {
            debug!("stop ignored: nothing loaded");
            return;
        };
        adapter.stop();

        {
            let mut state = self.inner.state.lock();
            state.playback.is_playing = false;
            state.playback.current_time = Duration::ZERO;
            state.playback.is_seeking = false;
            state.playback.pending_seek_time = None;
            state.seek_generation += 1;
            state.wants_playing = false;
            self.publish(&state);
        }
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped));
        self.note_interaction();
    }

    /// Seek to `to`, clamped to the media duration.
    ///
    /// The handle resolves once the backend settles the seek, or as
    /// superseded when a newer seek replaced it. Without loaded media the
    /// request is ignored and the handle resolves as an unsuccessful
    /// settlement.
    pub fn seek(&self, to: Duration) -> SeekHandle {
        let handle = self.issue_seek(to);
        self.note_interaction();
        handle
    }

    fn issue_seek(&self, to: Duration) -> SeekHandle {
        let (adapter, target, generation) = {
            let mut state = self.inner.state.lock();
            if state.media.is_none() {
                debug!("seek ignored: nothing loaded");
                return SeekHandle::rejected();
            }
            let Some(adapter) = state.adapter() else {
                return SeekHandle::rejected();
            };
            let target = state.playback.clamp_position(to);
            state.seek_generation += 1;
            state.playback.is_seeking = true;
            state.playback.pending_seek_time = Some(target);
            state.playback.current_time = target;
            self.publish(&state);
            (adapter, target, state.seek_generation)
        };

        trace!(target_ms = millis(target), generation, "Seek requested");
        let native = adapter.seek(target);
        drop(adapter);

        let (completer, handle) = SeekHandle::channel();
        let weak = self.downgrade();
        self.inner.runtime.spawn(async move {
            let outcome = native.await;
            if let Some(this) = Self::upgrade(&weak) {
                this.finish_seek(generation, target, outcome);
            }
            if let SeekOutcome::Settled { success } = outcome {
                let _ = completer.send(success);
            }
        });
        handle
    }

    fn finish_seek(&self, generation: u64, target: Duration, outcome: SeekOutcome) {
        {
            let mut state = self.inner.state.lock();
            if state.seek_generation != generation || state.scrubbing {
                return;
            }
            state.playback.is_seeking = false;
            state.playback.pending_seek_time = None;
            self.publish(&state);
        }

        if let SeekOutcome::Settled { success } = outcome {
            if !success {
                debug!(target_ms = millis(target), "Seek interrupted by engine");
            }
            self.emit(CoreEvent::Playback(PlaybackEvent::SeekSettled {
                target_ms: millis(target),
                success,
            }));
        }
    }

    /// Seek by `delta_secs` from the current (or pending) position.
    pub fn seek_relative(&self, delta_secs: f64) -> SeekHandle {
        let base = {
            let state = self.inner.state.lock();
            state
                .playback
                .pending_seek_time
                .unwrap_or(state.playback.current_time)
        };
        let target = Duration::try_from_secs_f64((base.as_secs_f64() + delta_secs).max(0.0))
            .unwrap_or_default();

        let icon = if delta_secs < 0.0 {
            FeedbackIcon::SeekBackward
        } else {
            FeedbackIcon::SeekForward
        };
        self.show_feedback(Feedback::new(format!("{:+}s", delta_secs.round() as i64), icon));
        self.seek(target)
    }

    /// Start a drag on the seek bar. Polling leaves `current_time` alone
    /// until [`end_scrub`](Self::end_scrub).
    pub fn begin_scrub(&self) {
        let mut state = self.inner.state.lock();
        if state.media.is_none() {
            return;
        }
        state.scrubbing = true;
        state.playback.is_seeking = true;
        self.publish(&state);
        drop(state);
        self.note_interaction();
    }

    /// Follow the drag; native seeks are coalesced by the backend.
    pub fn scrub_to(&self, to: Duration) {
        if !self.inner.state.lock().scrubbing {
            return;
        }
        drop(self.issue_seek(to));
        self.note_interaction();
    }

    pub fn end_scrub(&self, at: Duration) -> SeekHandle {
        self.inner.state.lock().scrubbing = false;
        self.seek(at)
    }

    pub fn set_playback_speed(&self, speed: f32) -> Result<()> {
        let config = &self.inner.config;
        if !config.accepts_speed(speed) {
            return Err(PlaybackError::InvalidPlaybackSpeed {
                speed,
                min: config.min_playback_speed,
                max: config.max_playback_speed,
            });
        }

        let adapter = self.inner.state.lock().adapter();
        let Some(adapter) = adapter else {
            return Err(PlaybackError::NoBackend);
        };
        adapter.set_playback_speed(speed);

        {
            let mut state = self.inner.state.lock();
            state.playback.playback_speed = speed;
            self.publish(&state);
        }
        self.emit(CoreEvent::Playback(PlaybackEvent::SpeedChanged {
            speed_percent: (speed * 100.0).round() as u32,
        }));
        self.show_feedback(Feedback::new(format!("{}x", speed), FeedbackIcon::Speed));
        self.note_interaction();
        Ok(())
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    /// Select an audio track by id. Unknown ids change nothing and return
    /// `false`.
    pub fn select_audio_track(&self, id: &str) -> bool {
        let Some(adapter) = self.loaded_adapter() else {
            return false;
        };
        if !adapter.select_audio_track(id) {
            return false;
        }
        let selected = adapter
            .selected_track(TrackKind::Audio)
            .or_else(|| Some(id.to_string()));

        let language = {
            let mut state = self.inner.state.lock();
            state.selected_audio = selected.clone();
            let language = language_of(&state.audio_tracks, selected.as_deref());
            if language.is_some() {
                state.preferred_audio = language.clone();
            }
            self.publish(&state);
            language
        };

        if let Some(language) = language {
            self.persist(AUDIO_LANGUAGE, language);
        }
        self.emit(CoreEvent::Playback(PlaybackEvent::TrackSelected {
            group: TrackKind::Audio.to_string(),
            track_id: selected,
        }));
        self.note_interaction();
        true
    }

    /// Select a subtitle track, or turn subtitles off with `None`.
    pub fn select_subtitle(&self, id: Option<&str>) -> bool {
        let Some(adapter) = self.loaded_adapter() else {
            return false;
        };
        if !adapter.select_subtitle(id) {
            return false;
        }
        let selected = match id {
            Some(id) => adapter
                .selected_track(TrackKind::Subtitle)
                .or_else(|| Some(id.to_string())),
            None => None,
        };

        let preference = {
            let mut state = self.inner.state.lock();
            state.selected_subtitle = selected.clone();
            let preference = match selected.as_deref() {
                None => Some(None),
                Some(id) => language_of(&state.subtitle_tracks, Some(id)).map(Some),
            };
            if preference.is_some() {
                state.preferred_subtitle = preference.clone();
            }
            self.publish(&state);
            preference
        };

        if let Some(preference) = preference {
            self.persist(SUBTITLE_LANGUAGE, preference);
        }
        let text = if selected.is_some() {
            "Subtitles on"
        } else {
            "Subtitles off"
        };
        self.emit(CoreEvent::Playback(PlaybackEvent::TrackSelected {
            group: TrackKind::Subtitle.to_string(),
            track_id: selected,
        }));
        self.show_feedback(Feedback::new(text, FeedbackIcon::Subtitles));
        self.note_interaction();
        true
    }

    // ========================================================================
    // Rendering, PiP, Diagnostics, Thumbnails
    // ========================================================================

    pub fn render_target(&self) -> Result<RenderSurface> {
        let adapter = self.inner.state.lock().adapter();
        adapter.ok_or(PlaybackError::NoBackend)?.render_target()
    }

    pub fn supports_picture_in_picture(&self) -> bool {
        let adapter = self.inner.state.lock().adapter();
        adapter.is_some_and(|adapter| adapter.supports_picture_in_picture())
    }

    /// `Ok(false)` when the backend supports PiP but cannot start it now.
    pub fn start_picture_in_picture(&self) -> Result<bool> {
        let adapter = self.loaded_adapter().ok_or(PlaybackError::NoMediaLoaded)?;
        adapter.start_picture_in_picture()
    }

    pub fn stop_picture_in_picture(&self) -> Result<()> {
        let adapter = self.inner.state.lock().adapter();
        adapter
            .ok_or(PlaybackError::NoBackend)?
            .stop_picture_in_picture()
    }

    /// Best-effort diagnostics of the active backend.
    pub fn fetch_streaming_info(&self) -> StreamingInfo {
        match self.inner.state.lock().adapter() {
            Some(adapter) => adapter.streaming_info(),
            None => StreamingInfo::unknown(None),
        }
    }

    /// Scrub preview for `at`. `Ok(None)` when a newer request superseded
    /// this one.
    pub async fn request_thumbnail(&self, at: Duration) -> Result<Option<Thumbnail>> {
        let adapter = self.loaded_adapter().ok_or(PlaybackError::NoMediaLoaded)?;
        self.inner.thumbnails.request(adapter, at).await
    }

    pub fn current_thumbnail(&self) -> Option<Thumbnail> {
        self.inner.thumbnails.current()
    }

    // ========================================================================
    // Gestures & UI
    // ========================================================================

    fn gesture_context(&self) -> GestureContext {
        let state = self.inner.state.lock();
        GestureContext {
            position: state
                .playback
                .pending_seek_time
                .unwrap_or(state.playback.current_time),
            duration: state.playback.duration,
            locked: state.ui.controls_locked,
        }
    }

    /// Tap at `x` on a surface `width` wide.
    pub fn tap(&self, x: f32, width: f32) {
        let context = self.gesture_context();
        self.inner.gestures.tap(x, width, context);
    }

    /// Vertical drag. Returns the volume/brightness command for the host to
    /// apply; `None` when locked or outside the side regions.
    pub fn drag(&self, start_x: f32, width: f32, dy: f32, height: f32) -> Option<GestureCommand> {
        let locked = self.inner.state.lock().ui.controls_locked;
        let command = gestures::drag(start_x, width, dy, height, locked)?;

        let (text, icon) = match &command {
            GestureCommand::AdjustVolume { delta } => {
                (format!("Volume {:+.0}%", delta * 100.0), FeedbackIcon::Volume)
            }
            GestureCommand::AdjustBrightness { delta } => (
                format!("Brightness {:+.0}%", delta * 100.0),
                FeedbackIcon::Brightness,
            ),
            _ => return Some(command),
        };
        self.show_feedback(Feedback::new(text, icon));
        Some(command)
    }

    /// Pinch with cumulative `scale`; switches fit/fill past the threshold.
    pub fn pinch(&self, scale: f32) -> Option<GestureCommand> {
        let (locked, mode) = {
            let state = self.inner.state.lock();
            (state.ui.controls_locked, state.ui.scale_mode)
        };
        let command = gestures::pinch(scale, mode, locked)?;
        if let GestureCommand::SetScaleMode(mode) = command {
            self.set_scale_mode(mode);
        }
        Some(command)
    }

    fn apply_gesture(&self, command: GestureCommand) {
        match command {
            GestureCommand::ToggleControls => self.toggle_controls(),
            GestureCommand::SeekTo {
                target,
                offset_secs,
            } => {
                let icon = if offset_secs < 0 {
                    FeedbackIcon::SeekBackward
                } else {
                    FeedbackIcon::SeekForward
                };
                self.show_feedback(Feedback::new(format!("{:+}s", offset_secs), icon));
                drop(self.seek(target));
            }
            GestureCommand::SetScaleMode(mode) => self.set_scale_mode(mode),
            GestureCommand::AdjustVolume { .. } | GestureCommand::AdjustBrightness { .. } => {
                trace!(?command, "Volume/brightness is applied by the host");
            }
        }
    }

    pub fn set_scale_mode(&self, mode: VideoScaleMode) {
        let adapter = {
            let mut state = self.inner.state.lock();
            if state.ui.scale_mode == mode {
                return;
            }
            state.ui.scale_mode = mode;
            self.publish(&state);
            state.adapter()
        };
        if let Some(adapter) = adapter {
            adapter.set_scale_mode(mode);
        }

        self.emit(CoreEvent::Ui(UiEvent::ScaleModeChanged {
            mode: mode.as_str().to_string(),
        }));
        let text = match mode {
            VideoScaleMode::Fit => "Fit",
            VideoScaleMode::Fill => "Fill",
        };
        self.show_feedback(Feedback::new(text, FeedbackIcon::Zoom));
    }

    /// Lock or unlock the controls. While locked, drags, pinches and seek
    /// taps are ignored.
    pub fn set_controls_locked(&self, locked: bool) {
        {
            let mut state = self.inner.state.lock();
            if state.ui.controls_locked == locked {
                return;
            }
            state.ui.controls_locked = locked;
            self.publish(&state);
        }
        if locked {
            self.inner.gestures.reset();
        }
        self.emit(CoreEvent::Ui(UiEvent::ControlsLockChanged { locked }));
        self.note_interaction();
    }

    /// Show the controls and restart the auto-hide countdown.
    pub fn note_interaction(&self) {
        let (epoch, was_hidden) = {
            let mut state = self.inner.state.lock();
            state.controls_epoch += 1;
            let was_hidden = !state.ui.controls_visible;
            state.ui.controls_visible = true;
            self.publish(&state);
            (state.controls_epoch, was_hidden)
        };

        if was_hidden {
            self.emit(CoreEvent::Ui(UiEvent::ControlsShown));
        }

        let weak = self.downgrade();
        self.inner
            .controls_timer
            .arm(self.inner.config.controls_auto_hide, move || {
                if let Some(this) = Self::upgrade(&weak) {
                    this.hide_controls(epoch);
                }
            });
    }

    fn hide_controls(&self, epoch: u64) {
        {
            let mut state = self.inner.state.lock();
            if state.controls_epoch != epoch || !state.ui.controls_visible {
                return;
            }
            state.ui.controls_visible = false;
            self.publish(&state);
        }
        self.emit(CoreEvent::Ui(UiEvent::ControlsHidden));
    }

    pub fn toggle_controls(&self) {
        let hidden = {
            let mut state = self.inner.state.lock();
            if !state.ui.controls_visible {
                false
            } else {
                state.controls_epoch += 1;
                state.ui.controls_visible = false;
                self.publish(&state);
                true
            }
        };

        if hidden {
            self.inner.controls_timer.cancel();
            self.emit(CoreEvent::Ui(UiEvent::ControlsHidden));
        } else {
            self.note_interaction();
        }
    }

    /// Show transient feedback, replacing the current one.
    pub fn show_feedback(&self, feedback: Feedback) {
        let text = feedback.text.clone();
        let epoch = {
            let mut state = self.inner.state.lock();
            state.feedback_epoch += 1;
            state.ui.feedback = Some(feedback);
            self.publish(&state);
            state.feedback_epoch
        };
        self.emit(CoreEvent::Ui(UiEvent::Feedback { text }));

        let weak = self.downgrade();
        self.inner
            .feedback_timer
            .arm(self.inner.config.feedback_duration, move || {
                if let Some(this) = Self::upgrade(&weak) {
                    let mut state = this.inner.state.lock();
                    if state.feedback_epoch == epoch {
                        state.ui.feedback = None;
                        this.publish(&state);
                    }
                }
            });
    }

    pub fn set_casting_active(&self, active: bool) {
        let mut state = self.inner.state.lock();
        state.ui.casting_active = active;
        self.publish(&state);
    }

    /// Current media and position, for handing playback to a remote surface.
    pub fn now_playing(&self) -> Option<(MediaItem, Duration)> {
        let state = self.inner.state.lock();
        let media = state.media.clone()?;
        Some((media, state.playback.current_time))
    }

    // ========================================================================
    // Interruptions
    // ========================================================================

    pub fn handle_interruption(&self, interruption: Interruption) {
        match interruption {
            Interruption::Began => {
                let Some(adapter) = self.loaded_adapter() else {
                    return;
                };
                adapter.pause();

                let position = {
                    let mut state = self.inner.state.lock();
                    let position = state.playback.current_time;
                    state.interrupted_while_playing = state.wants_playing;
                    state.playback.is_playing = false;
                    state.wants_playing = false;
                    if let Some(media) = state.media.take() {
                        state.media = Some(media.with_last_known_position(position));
                    }
                    self.publish(&state);
                    position
                };
                info!(position_ms = millis(position), "Playback interrupted");
                self.emit(CoreEvent::Playback(PlaybackEvent::Interrupted {
                    position_ms: millis(position),
                }));
            }
            Interruption::Ended { should_resume } => {
                let resume = {
                    let mut state = self.inner.state.lock();
                    std::mem::take(&mut state.interrupted_while_playing)
                };
                if should_resume && resume {
                    self.play();
                }
            }
        }
    }
}

impl std::fmt::Debug for PlayerOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PlayerOrchestrator")
            .field("backend", &state.active.as_ref().map(|a| a.kind))
            .field("lifecycle", &state.lifecycle)
            .field("load_status", &state.load_status)
            .finish_non_exhaustive()
    }
}
