// Integration test: the threaded engine driven by a manual clock

use std::time::Duration;

use metronome::audio::manual::{ManualClock, ManualProvider};
use metronome::{EngineConfig, MetronomeError, MetronomeHandle, TempoConfig};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn spawn(tempo: TempoConfig) -> (MetronomeHandle, ManualProvider) {
    let controls = ManualProvider::new(ManualClock::new(0.0));
    let handle =
        MetronomeHandle::spawn_with_tempo(controls.clone(), EngineConfig::default(), tempo).unwrap();
    (handle, controls)
}

/// Advance the playback clock in pass-sized steps, giving the engine time
/// to react
fn advance(controls: &ManualProvider, seconds: f64) {
    for _ in 0..(seconds / 0.025).round() as usize {
        controls.clock().advance(0.025);
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_downbeats_through_the_engine() {
    let (handle, controls) = spawn(TempoConfig {
        time_signature: 3,
        accent_on_downbeat: true,
        ..Default::default()
    });
    let beats = handle.subscribe().unwrap();
    handle.start().unwrap();
    advance(&controls, 3.0);

    let mut events = Vec::new();
    while events.len() < 6 {
        events.push(beats.recv_timeout(RECV_TIMEOUT).unwrap());
    }
    let downbeats: Vec<u64> = events
        .iter()
        .filter(|e| e.is_downbeat)
        .map(|e| e.beat_number)
        .collect();
    assert_eq!(downbeats, vec![1, 4]);
}

#[test]
fn test_update_settings_restarts_and_update_bpm_does_not() {
    let (handle, controls) = spawn(TempoConfig::default());
    let beats = handle.subscribe().unwrap();
    handle.start().unwrap();
    advance(&controls, 1.2);

    // Tempo change keeps counting
    handle.update_bpm(240.0);
    advance(&controls, 1.0);
    let before: Vec<u64> = beats.try_iter().map(|e| e.beat_number).collect();
    assert_eq!(before, (1..=before.len() as u64).collect::<Vec<_>>());
    assert!(before.len() >= 4);

    // Full settings change starts over
    handle
        .update_settings(TempoConfig {
            bpm: 90.0,
            ..Default::default()
        })
        .unwrap();
    // Beat 1 of the new run is emitted before update_settings returns
    let latest = beats.try_iter().last().unwrap();
    assert_eq!(latest.beat_number, 1);
}

#[test]
fn test_stop_silences_observers() {
    let (handle, controls) = spawn(TempoConfig::default());
    let beats = handle.subscribe().unwrap();
    handle.start().unwrap();
    assert_eq!(beats.recv_timeout(RECV_TIMEOUT).unwrap().beat_number, 1);

    handle.stop();
    // Round trip through the engine so the stop has been handled
    let _ = handle.subscribe().unwrap();
    advance(&controls, 2.0);
    assert!(beats.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn test_errors_cross_the_thread_boundary() {
    let (handle, controls) = spawn(TempoConfig::default());
    controls.set_start_suspended(true);
    controls.set_fail_resume(true);

    let err = handle.start().unwrap_err();
    assert!(matches!(err, MetronomeError::ResumeFailed(_)));
    assert!(err.is_retryable());

    controls.set_fail_resume(false);
    handle.start().unwrap();
}

#[test]
fn test_invalid_initial_tempo_rejected() {
    let controls = ManualProvider::new(ManualClock::new(0.0));
    let result = MetronomeHandle::spawn_with_tempo(
        controls,
        EngineConfig::default(),
        TempoConfig {
            bpm: 5.0,
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(MetronomeError::InvalidSettings(_))));
}

#[test]
fn test_independent_engines() {
    let (a, controls_a) = spawn(TempoConfig::default());
    let (b, controls_b) = spawn(TempoConfig::default());

    a.start().unwrap();
    assert_eq!(controls_a.clicks().len(), 1);
    assert!(controls_b.clicks().is_empty());

    b.start().unwrap();
    a.stop();
    assert_eq!(controls_b.clicks().len(), 1);
}
