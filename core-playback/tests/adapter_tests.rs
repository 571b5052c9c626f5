//! Backend adapters against fake native engines.

mod support;

use bridge_traits::{
    MediaCharacteristic, StreamingEngineState, SystemEngineEvent, SystemItemStatus,
};
use core_playback::{
    AdapterEvent, MediaItem, PlaybackError, PlayerBackend, SeekOutcome, StreamingBackend,
    SystemBackend, TrackKind,
};
use std::sync::Arc;
use std::time::Duration;
use support::{FakeStreamingEngine, FakeSystemEngine};
use tokio::sync::mpsc;

const URL: &str = "https://cdn.example.com/show/ep1.m3u8";

fn system() -> (Arc<FakeSystemEngine>, SystemBackend, mpsc::UnboundedReceiver<AdapterEvent>) {
    let engine = Arc::new(FakeSystemEngine::new());
    let backend = SystemBackend::new(engine.clone(), Duration::from_millis(500));
    let (tx, rx) = mpsc::unbounded_channel();
    backend.attach(tx);
    (engine, backend, rx)
}

fn streaming() -> (
    Arc<FakeStreamingEngine>,
    StreamingBackend,
    mpsc::UnboundedReceiver<AdapterEvent>,
) {
    let engine = Arc::new(FakeStreamingEngine::new());
    let backend = StreamingBackend::new(engine.clone());
    let (tx, rx) = mpsc::unbounded_channel();
    backend.attach(tx);
    (engine, backend, rx)
}

// ============================================================================
// System Adapter
// ============================================================================

#[tokio::test]
async fn test_system_ready_reports_once_and_autoplays() {
    let (engine, backend, mut events) = system();
    backend.load(&MediaItem::new("Ep 1", URL), None);

    engine.fire(SystemEngineEvent::ItemStatusChanged(SystemItemStatus::ReadyToPlay));
    engine.fire(SystemEngineEvent::ItemStatusChanged(SystemItemStatus::ReadyToPlay));

    assert_eq!(events.recv().await, Some(AdapterEvent::Ready));
    assert!(events.try_recv().is_err());
    assert_eq!(engine.count("play"), 1);
    assert!(engine.pending_seeks().is_empty());
}

#[tokio::test]
async fn test_system_ignores_readiness_without_load() {
    let (engine, _backend, mut events) = system();
    engine.fire_ready();
    assert!(events.try_recv().is_err());
    assert_eq!(engine.count("play"), 0);
}

#[tokio::test]
async fn test_system_seek_burst_issues_first_and_last() {
    let (engine, backend, _events) = system();
    backend.load(&MediaItem::new("Ep 1", URL), None);
    engine.fire_ready();

    let handles: Vec<_> = [5u64, 10, 15, 20]
        .into_iter()
        .map(|s| backend.seek(Duration::from_secs(s)))
        .collect();
    assert_eq!(engine.pending_seeks(), vec![5.0]);

    engine.complete_seek(true);
    assert_eq!(engine.pending_seeks(), vec![20.0]);
    engine.complete_seek(false);

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await);
    }
    assert_eq!(
        outcomes,
        vec![
            SeekOutcome::Superseded,
            SeekOutcome::Superseded,
            SeekOutcome::Superseded,
            SeekOutcome::Settled { success: false },
        ]
    );
    assert_eq!(engine.count("seek:"), 2);
}

#[tokio::test]
async fn test_system_resume_seek_on_ready() {
    let (engine, backend, mut events) = system();
    backend.load(
        &MediaItem::new("Ep 1", URL),
        Some(Duration::from_secs(30)),
    );
    engine.fire_ready();

    assert_eq!(events.recv().await, Some(AdapterEvent::Ready));
    assert_eq!(engine.pending_seeks(), vec![30.0]);

    let (target, handle) = backend.take_resume_seek().unwrap();
    assert_eq!(target, Duration::from_secs(30));
    assert!(backend.take_resume_seek().is_none());

    engine.complete_seek(true);
    assert_eq!(handle.await, SeekOutcome::Settled { success: true });
    assert_eq!(backend.status().current_time, Duration::from_secs(30));
}

#[tokio::test]
async fn test_system_reload_ignores_previous_item_seek_completion() {
    let (engine, backend, _events) = system();
    backend.load(&MediaItem::new("Ep 1", URL), None);
    engine.fire_ready();
    let old = backend.seek(Duration::from_secs(10));

    backend.load(
        &MediaItem::new("Ep 2", URL),
        Some(Duration::from_secs(30)),
    );
    engine.fire_ready();
    let latest = backend.seek(Duration::from_secs(50));
    assert_eq!(engine.pending_seeks(), vec![10.0, 30.0]);

    // The first item's seek finishes late; the resume seek is still out.
    engine.complete_seek(false);
    assert_eq!(engine.pending_seeks(), vec![30.0]);

    engine.complete_seek(true);
    assert_eq!(engine.pending_seeks(), vec![50.0]);
    engine.complete_seek(true);

    assert_eq!(old.await, SeekOutcome::Superseded);
    assert_eq!(latest.await, SeekOutcome::Settled { success: true });
    assert_eq!(engine.count("seek:"), 3);
}

#[tokio::test]
async fn test_system_failure_before_and_after_ready() {
    let (engine, backend, mut events) = system();
    backend.load(&MediaItem::new("Ep 1", URL), None);

    engine.fire(SystemEngineEvent::ItemStatusChanged(SystemItemStatus::Failed));
    assert!(matches!(
        events.recv().await,
        Some(AdapterEvent::LoadFailed { .. })
    ));

    engine.fire_ready();
    assert_eq!(events.recv().await, Some(AdapterEvent::Ready));

    engine.fire(SystemEngineEvent::ItemFailedToPlayToEnd {
        message: "network lost".to_string(),
    });
    assert!(matches!(
        events.recv().await,
        Some(AdapterEvent::PlaybackFailed { .. })
    ));

    engine.fire(SystemEngineEvent::ItemDidPlayToEnd);
    assert_eq!(events.recv().await, Some(AdapterEvent::DidPlayToEnd));
}

#[tokio::test]
async fn test_system_rate_applied_only_while_playing() {
    let (engine, backend, _events) = system();
    backend.load(&MediaItem::new("Ep 1", URL), None);

    backend.set_playback_speed(2.0);
    assert_eq!(engine.count("rate:"), 0);

    engine.fire_ready();
    assert_eq!(engine.rate(), 2.0);

    backend.pause();
    backend.set_playback_speed(1.25);
    assert_eq!(engine.rate(), 2.0);

    backend.play();
    assert_eq!(engine.rate(), 1.25);
}

#[tokio::test]
async fn test_system_tracks_and_selection() {
    let (engine, backend, _events) = system();
    backend.load(&MediaItem::new("Ep 1", URL), None);
    engine.fire_ready();

    let audio = backend.tracks(TrackKind::Audio);
    assert_eq!(audio.len(), 2);
    assert_eq!(audio[1].id, "fr-FR");
    assert_eq!(audio[1].language_code.as_deref(), Some("fr"));
    assert_eq!(
        backend.selected_track(TrackKind::Audio).as_deref(),
        Some("en-US")
    );

    // Raw locale identifiers resolve too.
    assert!(backend.select_audio_track("fr_FR"));
    assert_eq!(engine.selected(MediaCharacteristic::Audible), Some(1));
    assert!(!backend.select_audio_track("de"));
    assert_eq!(engine.selected(MediaCharacteristic::Audible), Some(1));

    assert_eq!(backend.selected_track(TrackKind::Subtitle), None);
    assert!(backend.select_subtitle(Some("en")));
    assert_eq!(
        backend.selected_track(TrackKind::Subtitle).as_deref(),
        Some("en")
    );
    assert!(backend.select_subtitle(None));
    assert_eq!(engine.selected(MediaCharacteristic::Legible), None);
}

#[tokio::test]
async fn test_system_status_filters_indefinite_duration() {
    let (engine, backend, _events) = system();
    assert_eq!(backend.status().current_time, Duration::ZERO);

    backend.load(&MediaItem::new("Live", URL), None);
    assert!(backend.status().is_buffering);

    engine.fire_ready();
    engine.set_duration(Some(f64::INFINITY));
    engine.set_time(7.5);

    let status = backend.status();
    assert!(status.is_playing);
    assert!(!status.is_buffering);
    assert_eq!(status.duration, None);
    assert_eq!(status.current_time, Duration::from_millis(7500));
}

#[tokio::test]
async fn test_system_release_removes_observer_before_clearing() {
    let (engine, backend, _events) = system();
    backend.load(&MediaItem::new("Ep 1", URL), None);
    assert_eq!(engine.observer_count(), 1);

    backend.detach();
    backend.release();

    assert_eq!(engine.observer_count(), 0);
    let remove = engine.position_of("remove_observer").unwrap();
    let clear = engine.position_of("clear_current_item").unwrap();
    assert!(remove < clear);
}

#[tokio::test]
async fn test_system_drop_detaches() {
    let (engine, backend, _events) = system();
    drop(backend);
    assert_eq!(engine.observer_count(), 0);
}

#[tokio::test]
async fn test_system_thumbnail_failure_maps_error() {
    let (_engine, backend, _events) = system();
    let result = backend.generate_thumbnail(Duration::from_secs(3)).await;
    assert!(matches!(result, Err(PlaybackError::ThumbnailUnavailable(_))));
}

#[tokio::test]
async fn test_system_render_target_is_reused() {
    let (engine, backend, _events) = system();
    let first = backend.render_target().unwrap();
    let second = backend.render_target().unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.count("create_render_surface"), 1);
}

// ============================================================================
// Streaming Adapter
// ============================================================================

#[tokio::test]
async fn test_streaming_load_passes_start_time() {
    let (engine, backend, mut events) = streaming();
    backend.load(
        &MediaItem::new("Ep 1", URL),
        Some(Duration::from_millis(90_500)),
    );

    assert!(engine
        .calls()
        .contains(&format!("set_media:{}:Some(90500)", URL)));
    assert!(engine.position_of("play").is_some());

    engine.fire(StreamingEngineState::Buffering);
    engine.fire(StreamingEngineState::Playing);
    engine.fire(StreamingEngineState::Paused);
    engine.fire(StreamingEngineState::Playing);
    assert_eq!(events.recv().await, Some(AdapterEvent::Ready));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_streaming_zero_resume_opens_from_start() {
    let (engine, backend, _events) = streaming();
    backend.load(&MediaItem::new("Ep 1", URL), Some(Duration::ZERO));
    assert!(engine.calls().contains(&format!("set_media:{}:None", URL)));
}

#[tokio::test]
async fn test_streaming_seek_settles_immediately() {
    let (engine, backend, _events) = streaming();
    backend.load(&MediaItem::new("Ep 1", URL), None);

    let outcome = backend.seek(Duration::from_secs(12)).await;
    assert_eq!(outcome, SeekOutcome::Settled { success: true });
    assert_eq!(engine.time_ms(), 12_000);
}

#[tokio::test]
async fn test_streaming_tracks_skip_disable_entry() {
    let (engine, backend, _events) = streaming();
    backend.load(&MediaItem::new("Ep 1", URL), None);

    let audio = backend.tracks(TrackKind::Audio);
    let ids: Vec<&str> = audio.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["en", "fr"]);

    assert_eq!(backend.selected_track(TrackKind::Subtitle), None);
    assert!(backend.select_subtitle(Some("en")));
    assert_eq!(engine.subtitle_track(), 3);
    assert!(backend.select_subtitle(None));
    assert_eq!(engine.subtitle_track(), -1);

    assert!(!backend.select_audio_track("-1"));
    assert_eq!(engine.audio_track(), 1);
}

#[tokio::test]
async fn test_streaming_errors_and_end() {
    let (engine, backend, mut events) = streaming();
    backend.load(&MediaItem::new("Ep 1", URL), None);

    engine.fire(StreamingEngineState::Error);
    assert!(matches!(
        events.recv().await,
        Some(AdapterEvent::LoadFailed { .. })
    ));

    engine.fire(StreamingEngineState::Playing);
    assert_eq!(events.recv().await, Some(AdapterEvent::Ready));

    engine.fire(StreamingEngineState::Error);
    assert!(matches!(
        events.recv().await,
        Some(AdapterEvent::PlaybackFailed { .. })
    ));

    engine.fire(StreamingEngineState::Ended);
    assert_eq!(events.recv().await, Some(AdapterEvent::DidPlayToEnd));
}

#[tokio::test]
async fn test_streaming_has_no_picture_in_picture() {
    let (_engine, backend, _events) = streaming();
    assert!(!backend.supports_picture_in_picture());
    assert!(matches!(
        backend.start_picture_in_picture(),
        Err(PlaybackError::Unsupported { .. })
    ));
    assert!(backend.stop_picture_in_picture().is_err());
}

#[tokio::test]
async fn test_streaming_info_uses_engine_statistics() {
    let (_engine, backend, _events) = streaming();
    assert_eq!(backend.streaming_info().source, "Unknown");

    backend.load(&MediaItem::new("Ep 1", "https://user:pw@cdn.example.com/x.mp4"), None);
    let info = backend.streaming_info();
    assert_eq!(info.source, "https://cdn.example.com/x.mp4");
    assert_eq!(info.indicated_bitrate_kbps, 5200.0);
    assert_eq!(info.dropped_frames, 20);
    assert_eq!(info.resolution(), Some((1280, 720)));
}

#[tokio::test]
async fn test_streaming_release_order() {
    let (engine, backend, _events) = streaming();
    backend.load(&MediaItem::new("Ep 1", URL), None);

    backend.detach();
    backend.release();

    assert_eq!(engine.observer_count(), 0);
    assert!(engine.position_of("remove_observer").unwrap() < engine.position_of("clear_media").unwrap());
    assert_eq!(backend.status().current_time, Duration::ZERO);
}
