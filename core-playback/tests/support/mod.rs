//! Hand-rolled fake engines shared by the integration tests.
//!
//! Each fake records the calls it receives and lets the test drive native
//! notifications and seek completions explicitly.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AccessLogSnapshot, BackendKind, BridgeError, MediaCharacteristic, MediaSelectionOption,
    MediaStatistics, NativeEngineProvider, NativeImage, ObserverToken, RenderSurface,
    SeekCallback, SettingsStore, StreamingEngine, StreamingEngineEvent, StreamingEngineState,
    StreamingObserver, StreamingTrack, SystemEngine, SystemEngineEvent, SystemItemStatus,
    SystemObserver, TimeControlStatus,
};
use bytes::Bytes;
use core_playback::{EngineBackendFactory, PlayerConfig, PlayerOrchestrator, PlayerPreferences};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

fn thumbnail(at_ms: i64) -> NativeImage {
    NativeImage {
        width: 160,
        height: 90,
        data: Bytes::from(at_ms.to_string()),
    }
}

// ============================================================================
// System Engine
// ============================================================================

struct SystemState {
    item: Option<String>,
    time: f64,
    duration: Option<f64>,
    time_control: TimeControlStatus,
    rate: f32,
    audio: Vec<MediaSelectionOption>,
    legible: Vec<MediaSelectionOption>,
    selected_audio: Option<usize>,
    selected_legible: Option<usize>,
    gravity_fill: bool,
    pip_possible: bool,
}

pub struct FakeSystemEngine {
    calls: Mutex<Vec<String>>,
    observers: Mutex<HashMap<u64, SystemObserver>>,
    next_token: AtomicU64,
    pending_seeks: Mutex<VecDeque<(f64, SeekCallback)>>,
    auto_complete_seeks: AtomicBool,
    state: Mutex<SystemState>,
}

impl FakeSystemEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            observers: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            pending_seeks: Mutex::new(VecDeque::new()),
            auto_complete_seeks: AtomicBool::new(false),
            state: Mutex::new(SystemState {
                item: None,
                time: 0.0,
                duration: Some(120.0),
                time_control: TimeControlStatus::Paused,
                rate: 1.0,
                audio: vec![
                    option("English", Some("en-US"), Some("en_US")),
                    option("Français", Some("fr-FR"), Some("fr_FR")),
                ],
                legible: vec![option("English CC", Some("en"), None)],
                selected_audio: Some(0),
                selected_legible: None,
                gravity_fill: false,
                pip_possible: true,
            }),
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn position_of(&self, call: &str) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }

    pub fn fire(&self, event: SystemEngineEvent) {
        let observers: Vec<SystemObserver> = self.observers.lock().values().cloned().collect();
        for observer in observers {
            observer(event.clone());
        }
    }

    pub fn fire_ready(&self) {
        self.fire(SystemEngineEvent::ItemStatusChanged(
            SystemItemStatus::ReadyToPlay,
        ));
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn set_auto_complete_seeks(&self, enabled: bool) {
        self.auto_complete_seeks.store(enabled, Ordering::SeqCst);
    }

    /// Targets of native seeks that have not completed yet.
    pub fn pending_seeks(&self) -> Vec<f64> {
        self.pending_seeks.lock().iter().map(|(t, _)| *t).collect()
    }

    /// Complete the oldest outstanding native seek.
    pub fn complete_seek(&self, finished: bool) -> Option<f64> {
        let (target, completion) = self.pending_seeks.lock().pop_front()?;
        if finished {
            self.state.lock().time = target;
        }
        completion(finished);
        Some(target)
    }

    pub fn set_time(&self, seconds: f64) {
        self.state.lock().time = seconds;
    }

    pub fn set_duration(&self, seconds: Option<f64>) {
        self.state.lock().duration = seconds;
    }

    pub fn set_pip_possible(&self, possible: bool) {
        self.state.lock().pip_possible = possible;
    }

    pub fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    pub fn gravity_fill(&self) -> bool {
        self.state.lock().gravity_fill
    }

    pub fn selected(&self, characteristic: MediaCharacteristic) -> Option<usize> {
        let state = self.state.lock();
        match characteristic {
            MediaCharacteristic::Audible => state.selected_audio,
            MediaCharacteristic::Legible => state.selected_legible,
        }
    }
}

pub fn option(name: &str, tag: Option<&str>, locale: Option<&str>) -> MediaSelectionOption {
    MediaSelectionOption {
        display_name: name.to_string(),
        extended_language_tag: tag.map(str::to_string),
        locale_identifier: locale.map(str::to_string),
    }
}

#[async_trait]
impl SystemEngine for FakeSystemEngine {
    fn replace_current_item(&self, url: &str) {
        self.record(format!("replace:{}", url));
        let mut state = self.state.lock();
        state.item = Some(url.to_string());
        state.time = 0.0;
    }

    fn clear_current_item(&self) {
        self.record("clear_current_item");
        self.state.lock().item = None;
    }

    fn play(&self) {
        self.record("play");
        self.state.lock().time_control = TimeControlStatus::Playing;
    }

    fn pause(&self) {
        self.record("pause");
        self.state.lock().time_control = TimeControlStatus::Paused;
    }

    fn set_rate(&self, rate: f32) {
        self.record(format!("rate:{}", rate));
        self.state.lock().rate = rate;
    }

    fn current_time(&self) -> f64 {
        self.state.lock().time
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn loaded_time_end(&self) -> Option<f64> {
        let state = self.state.lock();
        Some(state.time + 10.0)
    }

    fn time_control_status(&self) -> TimeControlStatus {
        self.state.lock().time_control
    }

    fn seek(&self, to_seconds: f64, _tolerance_seconds: f64, completion: SeekCallback) {
        self.record(format!("seek:{}", to_seconds));
        if self.auto_complete_seeks.load(Ordering::SeqCst) {
            self.state.lock().time = to_seconds;
            completion(true);
        } else {
            self.pending_seeks.lock().push_back((to_seconds, completion));
        }
    }

    fn media_selection_options(
        &self,
        characteristic: MediaCharacteristic,
    ) -> Vec<MediaSelectionOption> {
        let state = self.state.lock();
        match characteristic {
            MediaCharacteristic::Audible => state.audio.clone(),
            MediaCharacteristic::Legible => state.legible.clone(),
        }
    }

    fn select_media_option(&self, characteristic: MediaCharacteristic, index: Option<usize>) {
        self.record(format!("select:{:?}:{:?}", characteristic, index));
        let mut state = self.state.lock();
        match characteristic {
            MediaCharacteristic::Audible => state.selected_audio = index,
            MediaCharacteristic::Legible => state.selected_legible = index,
        }
    }

    fn selected_media_option(&self, characteristic: MediaCharacteristic) -> Option<usize> {
        self.selected(characteristic)
    }

    fn set_video_gravity_fill(&self, fill: bool) {
        self.state.lock().gravity_fill = fill;
    }

    fn create_render_surface(&self) -> BridgeResult<RenderSurface> {
        self.record("create_render_surface");
        Ok(RenderSurface::new(BackendKind::System))
    }

    fn is_picture_in_picture_possible(&self) -> bool {
        self.state.lock().pip_possible
    }

    fn start_picture_in_picture(&self) {
        self.record("start_pip");
    }

    fn stop_picture_in_picture(&self) {
        self.record("stop_pip");
    }

    fn access_log(&self) -> Option<AccessLogSnapshot> {
        let state = self.state.lock();
        state.item.as_ref().map(|url| AccessLogSnapshot {
            uri: Some(url.clone()),
            server_address: Some("203.0.113.7".to_string()),
            indicated_bitrate: 4_000_000.0,
            observed_bitrate: 12_500_000.0,
            stall_count: 1,
            dropped_video_frames: 3,
            presentation_width: 1920,
            presentation_height: 1080,
        })
    }

    fn add_observer(&self, observer: SystemObserver) -> ObserverToken {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.record("add_observer");
        self.observers.lock().insert(token, observer);
        ObserverToken(token)
    }

    fn remove_observer(&self, token: ObserverToken) {
        self.record("remove_observer");
        self.observers.lock().remove(&token.0);
    }

    async fn generate_image(&self, at_seconds: f64) -> BridgeResult<NativeImage> {
        if self.state.lock().item.is_none() {
            return Err(BridgeError::Engine("no item".to_string()));
        }
        Ok(thumbnail((at_seconds * 1000.0) as i64))
    }
}

// ============================================================================
// Streaming Engine
// ============================================================================

struct StreamingState {
    media: Option<String>,
    time_ms: i64,
    length_ms: i64,
    state: StreamingEngineState,
    rate: f32,
    audio: Vec<StreamingTrack>,
    subtitles: Vec<StreamingTrack>,
    audio_track: i32,
    subtitle_track: i32,
    aspect_fill: bool,
}

pub struct FakeStreamingEngine {
    calls: Mutex<Vec<String>>,
    observers: Mutex<HashMap<u64, StreamingObserver>>,
    next_token: AtomicU64,
    state: Mutex<StreamingState>,
}

pub fn track(index: i32, name: &str, language: Option<&str>) -> StreamingTrack {
    StreamingTrack {
        index,
        name: name.to_string(),
        language: language.map(str::to_string),
    }
}

impl FakeStreamingEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            observers: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            state: Mutex::new(StreamingState {
                media: None,
                time_ms: 0,
                length_ms: 120_000,
                state: StreamingEngineState::Stopped,
                rate: 1.0,
                audio: vec![
                    track(-1, "Disable", None),
                    track(1, "English", Some("en")),
                    track(2, "French", Some("fr")),
                ],
                subtitles: vec![track(-1, "Disable", None), track(3, "English", Some("en"))],
                audio_track: 1,
                subtitle_track: -1,
                aspect_fill: false,
            }),
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn position_of(&self, call: &str) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }

    pub fn fire(&self, state: StreamingEngineState) {
        self.state.lock().state = state;
        let observers: Vec<StreamingObserver> = self.observers.lock().values().cloned().collect();
        for observer in observers {
            observer(StreamingEngineEvent::StateChanged(state));
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn time_ms(&self) -> i64 {
        self.state.lock().time_ms
    }

    pub fn set_time(&self, time_ms: i64) {
        self.state.lock().time_ms = time_ms;
    }

    pub fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    pub fn subtitle_track(&self) -> i32 {
        self.state.lock().subtitle_track
    }

    pub fn audio_track(&self) -> i32 {
        self.state.lock().audio_track
    }

    pub fn aspect_fill(&self) -> bool {
        self.state.lock().aspect_fill
    }
}

#[async_trait]
impl StreamingEngine for FakeStreamingEngine {
    fn set_media(&self, url: &str, start_time_ms: Option<i64>) {
        self.record(format!("set_media:{}:{:?}", url, start_time_ms));
        let mut state = self.state.lock();
        state.media = Some(url.to_string());
        state.time_ms = start_time_ms.unwrap_or(0);
        state.state = StreamingEngineState::Opening;
    }

    fn clear_media(&self) {
        self.record("clear_media");
        self.state.lock().media = None;
    }

    fn play(&self) {
        self.record("play");
    }

    fn pause(&self) {
        self.record("pause");
        self.state.lock().state = StreamingEngineState::Paused;
    }

    fn stop(&self) {
        self.record("stop");
        let mut state = self.state.lock();
        state.state = StreamingEngineState::Stopped;
        state.time_ms = 0;
    }

    fn is_playing(&self) -> bool {
        self.state.lock().state == StreamingEngineState::Playing
    }

    fn state(&self) -> StreamingEngineState {
        self.state.lock().state
    }

    fn time_ms(&self) -> i64 {
        self.state.lock().time_ms
    }

    fn length_ms(&self) -> i64 {
        self.state.lock().length_ms
    }

    fn set_time_ms(&self, time_ms: i64) {
        self.record(format!("set_time:{}", time_ms));
        self.state.lock().time_ms = time_ms;
    }

    fn set_rate(&self, rate: f32) {
        self.record(format!("rate:{}", rate));
        self.state.lock().rate = rate;
    }

    fn audio_tracks(&self) -> Vec<StreamingTrack> {
        self.state.lock().audio.clone()
    }

    fn current_audio_track(&self) -> i32 {
        self.state.lock().audio_track
    }

    fn set_audio_track(&self, index: i32) {
        self.record(format!("audio_track:{}", index));
        self.state.lock().audio_track = index;
    }

    fn subtitle_tracks(&self) -> Vec<StreamingTrack> {
        self.state.lock().subtitles.clone()
    }

    fn current_subtitle_track(&self) -> i32 {
        self.state.lock().subtitle_track
    }

    fn set_subtitle_track(&self, index: i32) {
        self.record(format!("subtitle_track:{}", index));
        self.state.lock().subtitle_track = index;
    }

    fn set_aspect_fill(&self, fill: bool) {
        self.state.lock().aspect_fill = fill;
    }

    fn create_render_surface(&self) -> BridgeResult<RenderSurface> {
        self.record("create_render_surface");
        Ok(RenderSurface::new(BackendKind::Streaming))
    }

    fn media_statistics(&self) -> Option<MediaStatistics> {
        self.state.lock().media.as_ref().map(|_| MediaStatistics {
            input_bitrate_kbps: 5200.0,
            demux_bitrate_kbps: 4800.0,
            read_bytes: 1 << 20,
            decoded_video_blocks: 900,
            displayed_pictures: 880,
            lost_pictures: 20,
            video_width: 1280,
            video_height: 720,
        })
    }

    fn add_observer(&self, observer: StreamingObserver) -> ObserverToken {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.record("add_observer");
        self.observers.lock().insert(token, observer);
        ObserverToken(token)
    }

    fn remove_observer(&self, token: ObserverToken) {
        self.record("remove_observer");
        self.observers.lock().remove(&token.0);
    }

    async fn generate_thumbnail(&self, at_ms: i64) -> BridgeResult<NativeImage> {
        Ok(thumbnail(at_ms))
    }
}

// ============================================================================
// Provider & Settings
// ============================================================================

/// Hands out a fresh fake per activation and remembers each one.
#[derive(Default)]
pub struct FakeEngines {
    system: Mutex<Vec<Arc<FakeSystemEngine>>>,
    streaming: Mutex<Vec<Arc<FakeStreamingEngine>>>,
    fail_streaming: AtomicBool,
}

impl FakeEngines {
    pub fn system(&self, n: usize) -> Arc<FakeSystemEngine> {
        Arc::clone(&self.system.lock()[n])
    }

    pub fn last_system(&self) -> Arc<FakeSystemEngine> {
        Arc::clone(self.system.lock().last().expect("no system engine created"))
    }

    pub fn last_streaming(&self) -> Arc<FakeStreamingEngine> {
        Arc::clone(
            self.streaming
                .lock()
                .last()
                .expect("no streaming engine created"),
        )
    }

    pub fn system_count(&self) -> usize {
        self.system.lock().len()
    }

    pub fn set_streaming_unavailable(&self, unavailable: bool) {
        self.fail_streaming.store(unavailable, Ordering::SeqCst);
    }
}

impl NativeEngineProvider for FakeEngines {
    fn system_engine(&self) -> BridgeResult<Arc<dyn SystemEngine>> {
        let engine = Arc::new(FakeSystemEngine::new());
        self.system.lock().push(Arc::clone(&engine));
        Ok(engine)
    }

    fn streaming_engine(&self) -> BridgeResult<Arc<dyn StreamingEngine>> {
        if self.fail_streaming.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("streaming engine".to_string()));
        }
        let engine = Arc::new(FakeStreamingEngine::new());
        self.streaming.lock().push(Arc::clone(&engine));
        Ok(engine)
    }
}

#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.insert(key, value);
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.value(key))
    }

    async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()> {
        self.insert(key, &value.to_string());
        Ok(())
    }

    async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
        Ok(self.value(key).and_then(|v| v.parse().ok()))
    }

    async fn set_f64(&self, key: &str, value: f64) -> BridgeResult<()> {
        self.insert(key, &value.to_string());
        Ok(())
    }

    async fn get_f64(&self, key: &str) -> BridgeResult<Option<f64>> {
        Ok(self.value(key).and_then(|v| v.parse().ok()))
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> BridgeResult<Vec<String>> {
        Ok(self
            .values
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub player: PlayerOrchestrator,
    pub engines: Arc<FakeEngines>,
    pub settings: Arc<MemorySettings>,
    pub events: EventBus,
}

pub fn harness(config: PlayerConfig) -> Harness {
    let engines = Arc::new(FakeEngines::default());
    let settings = Arc::new(MemorySettings::default());
    let events = EventBus::new(256);
    let factory = Arc::new(EngineBackendFactory::new(engines.clone(), &config));
    let preferences = PlayerPreferences::new(settings.clone(), "test");

    let player = PlayerOrchestrator::new(
        config,
        factory,
        Some(preferences),
        events.clone(),
        Handle::current(),
    )
    .expect("valid config");

    Harness {
        player,
        engines,
        settings,
        events,
    }
}

/// Let spawned tasks (event pump, seek completions) run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Advance paused time past one polling tick.
pub async fn poll_tick() {
    tokio::time::sleep(Duration::from_millis(510)).await;
    settle().await;
}
