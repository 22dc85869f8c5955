// Beat scheduler - look-ahead click scheduling against the audio clock
//
// Two horizons are at work here. Audio clicks are handed to the output up to
// `schedule_ahead` in advance, stamped with exact times on the output clock,
// so they stay sample-accurate however late the periodic pass runs. Observer
// notifications go through a short deferred queue instead, released when the
// clock reaches the click time; they only need to be perceptually in sync.

use std::collections::VecDeque;

use crossbeam_channel::Receiver;

use super::events::{BeatCallback, BeatEvent, BeatListeners};
use super::tempo::{TempoConfig, clamp_bpm};
use crate::audio::output::{AudioOutput, OutputProvider, OutputState};
use crate::config::EngineConfig;
use crate::error::MetronomeError;
use crate::messaging::notification::Notification;
use crate::synth::click::ClickSynthesizer;

/// Notification waiting for its click time
#[derive(Debug, Clone, Copy)]
struct PendingBeat {
    /// Clock time at which the observers should hear about it
    due: f64,
    /// `start` generation that queued it
    session: u64,
    event: BeatEvent,
}

pub struct BeatScheduler<P: OutputProvider> {
    provider: P,
    output: Option<P::Output>,
    synth: ClickSynthesizer,
    engine_config: EngineConfig,
    tempo: TempoConfig,

    // Runtime state, reset on stop
    is_playing: bool,
    beat_counter: u64,
    next_scheduled_time: f64,
    beat_interval: f64,
    session: u64,

    pending: VecDeque<PendingBeat>,
    listeners: BeatListeners,
}

impl<P: OutputProvider> BeatScheduler<P> {
    pub fn new(provider: P, engine_config: EngineConfig) -> Self {
        Self::with_tempo(provider, engine_config, TempoConfig::default())
    }

    pub fn with_tempo(provider: P, engine_config: EngineConfig, tempo: TempoConfig) -> Self {
        let beat_interval = tempo.beat_interval();
        Self {
            provider,
            output: None,
            synth: ClickSynthesizer,
            engine_config,
            tempo,
            is_playing: false,
            beat_counter: 0,
            next_scheduled_time: 0.0,
            beat_interval,
            session: 0,
            pending: VecDeque::new(),
            listeners: BeatListeners::new(),
        }
    }

    /// Register a callback invoked once per audible click
    pub fn on_beat<F>(&mut self, callback: F)
    where
        F: FnMut(BeatEvent) + Send + 'static,
    {
        self.listeners.add_callback(Box::new(callback));
    }

    pub fn add_listener(&mut self, callback: BeatCallback) {
        self.listeners.add_callback(callback);
    }

    /// Channel receiving every future beat
    pub fn subscribe(&mut self) -> Receiver<BeatEvent> {
        self.listeners.subscribe()
    }

    /// Start the click sequence at beat 1
    ///
    /// No-op when already playing. Acquires the output on first use and
    /// resumes it if suspended; either failure leaves the scheduler stopped.
    pub fn start(&mut self) -> Result<(), MetronomeError> {
        if self.is_playing {
            return Ok(());
        }

        if self.output.is_none() {
            let output = self.provider.acquire().inspect_err(|e| {
                log::error!("Could not acquire audio output: {}", e);
            })?;
            log::info!("Audio output acquired");
            self.output = Some(output);
        }
        let Some(output) = self.output.as_mut() else {
            return Err(MetronomeError::AudioUnavailable(
                "output missing after acquisition".to_string(),
            ));
        };

        if output.state() == OutputState::Suspended {
            log::debug!("Audio output suspended, resuming");
            output.resume().inspect_err(|e| {
                log::error!("Could not resume audio output: {}", e);
            })?;
        }

        self.session += 1;
        self.beat_counter = 1;
        self.beat_interval = self.tempo.beat_interval();

        let t0 = output.current_time();
        let first_click = t0 + self.engine_config.start_margin_secs();
        let is_downbeat = self.tempo.is_downbeat(1);

        self.render_click(first_click, is_downbeat);
        self.listeners.emit(BeatEvent::new(1, is_downbeat));

        self.beat_counter = 2;
        self.next_scheduled_time = first_click + self.beat_interval;
        self.is_playing = true;

        log::info!("Metronome started: {}", self.tempo);
        self.run_pass();
        Ok(())
    }

    /// Stop scheduling
    ///
    /// Clicks already handed to the output still play (at most
    /// `schedule_ahead` worth); queued notifications are discarded when due.
    pub fn stop(&mut self) {
        if !self.is_playing {
            return;
        }

        self.is_playing = false;
        self.beat_counter = 0;
        log::info!("Metronome stopped");
    }

    /// Change tempo without disturbing the bar position
    pub fn update_bpm(&mut self, new_bpm: f64) {
        let bpm = clamp_bpm(new_bpm);
        if bpm != new_bpm {
            log::warn!("BPM {} out of range, using {}", new_bpm, bpm);
        }

        self.tempo.bpm = bpm;
        self.beat_interval = self.tempo.beat_interval();
        log::debug!("BPM -> {} (interval {:.4}s)", bpm, self.beat_interval);
    }

    /// Replace the whole configuration
    ///
    /// While playing this restarts the sequence at beat 1.
    pub fn update_settings(&mut self, tempo: TempoConfig) -> Result<(), MetronomeError> {
        tempo.validate()?;

        if self.is_playing {
            self.stop();
            self.tempo = tempo;
            self.start()
        } else {
            self.tempo = tempo;
            self.beat_interval = self.tempo.beat_interval();
            Ok(())
        }
    }

    /// One look-ahead pass: schedule every click due before now + horizon
    pub fn run_pass(&mut self) {
        if !self.is_playing {
            return;
        }
        let Some(now) = self.current_time() else {
            return;
        };
        let horizon = now + self.engine_config.schedule_ahead_secs();

        while self.next_scheduled_time < horizon {
            let beat_number = self.beat_counter;
            let is_downbeat = self.tempo.is_downbeat(beat_number);
            let click_time = self.next_scheduled_time;

            self.render_click(click_time, is_downbeat);

            // Delay is measured from now: the notification path is not
            // sample-accurate, only the audio trigger is
            let delay = (click_time - now).max(0.0);
            self.pending.push_back(PendingBeat {
                due: now + delay,
                session: self.session,
                event: BeatEvent::new(beat_number, is_downbeat),
            });

            self.next_scheduled_time += self.beat_interval;
            self.beat_counter += 1;
        }
    }

    /// Deliver deferred notifications whose time has come
    ///
    /// Returns the number of events emitted. Entries queued before a stop
    /// (or by an earlier session) are dropped without emitting.
    pub fn dispatch_due(&mut self) -> usize {
        let Some(now) = self.current_time() else {
            return 0;
        };

        let mut emitted = 0;
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due > now {
                i += 1;
                continue;
            }
            let Some(entry) = self.pending.remove(i) else {
                break;
            };
            if self.is_playing && entry.session == self.session {
                self.listeners.emit(entry.event);
                emitted += 1;
            } else {
                log::trace!("Dropping stale beat {}", entry.event.beat_number);
            }
        }
        emitted
    }

    /// Clock time of the earliest queued notification
    pub fn next_due(&self) -> Option<f64> {
        self.pending.iter().map(|p| p.due).reduce(f64::min)
    }

    /// Drain one asynchronous notification from the output, if any
    pub fn poll_output_notification(&mut self) -> Option<Notification> {
        self.output.as_mut().and_then(|o| o.poll_notification())
    }

    fn render_click(&mut self, time: f64, is_downbeat: bool) {
        if !self.tempo.sound_enabled {
            return;
        }
        if let Some(output) = self.output.as_mut() {
            self.synth.render(
                output,
                time,
                self.tempo.click_frequency(is_downbeat),
                self.tempo.click_duration(is_downbeat),
                is_downbeat,
                self.tempo.click_sound_type,
            );
        }
    }

    /// Output clock time, once an output has been acquired
    pub fn current_time(&self) -> Option<f64> {
        self.output.as_ref().map(|o| o.current_time())
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Number of the next click to schedule (0 when stopped)
    pub fn beat_counter(&self) -> u64 {
        self.beat_counter
    }

    pub fn next_scheduled_time(&self) -> f64 {
        self.next_scheduled_time
    }

    pub fn beat_interval(&self) -> f64 {
        self.beat_interval
    }

    pub fn tempo(&self) -> &TempoConfig {
        &self.tempo
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine_config
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::manual::{ManualClock, ManualProvider};

    const STEP: f64 = 0.025;

    fn scheduler_with(tempo: TempoConfig) -> (BeatScheduler<ManualProvider>, ManualProvider) {
        let controls = ManualProvider::new(ManualClock::new(10.0));
        let scheduler =
            BeatScheduler::with_tempo(controls.clone(), EngineConfig::default(), tempo);
        (scheduler, controls)
    }

    /// Drive the scheduler the way the engine loop does
    fn run_for(scheduler: &mut BeatScheduler<ManualProvider>, clock: &ManualClock, seconds: f64) {
        let steps = (seconds / STEP).round() as usize;
        for _ in 0..steps {
            clock.advance(STEP);
            scheduler.run_pass();
            scheduler.dispatch_due();
        }
    }

    #[test]
    fn test_start_emits_first_beat_synchronously() {
        for accent in [true, false] {
            let (mut scheduler, _) = scheduler_with(TempoConfig {
                accent_on_downbeat: accent,
                ..Default::default()
            });
            let rx = scheduler.subscribe();

            scheduler.start().unwrap();

            let first = rx.try_recv().unwrap();
            assert_eq!(first, BeatEvent::new(1, accent));
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_start_schedules_first_click_after_margin() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        scheduler.start().unwrap();

        let clicks = controls.clicks().snapshot();
        assert_eq!(clicks.len(), 1);
        assert!((clicks[0].start_time - 10.001).abs() < 1e-9);
        assert_eq!(scheduler.beat_counter(), 2);
        assert!((scheduler.next_scheduled_time() - 10.501).abs() < 1e-9);
        assert!(scheduler.is_playing());
    }

    #[test]
    fn test_pass_fills_horizon_only() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        scheduler.start().unwrap();

        // 120 BPM: next click at +0.501, beyond the 100ms horizon
        scheduler.run_pass();
        assert_eq!(controls.clicks().len(), 1);

        controls.clock().advance(0.45);
        scheduler.run_pass();
        assert_eq!(controls.clicks().len(), 2);
        assert_eq!(scheduler.beat_counter(), 3);

        // Idempotent within the same instant
        scheduler.run_pass();
        assert_eq!(controls.clicks().len(), 2);
    }

    #[test]
    fn test_click_times_are_evenly_spaced() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig {
            bpm: 90.0,
            subdivision_multiplier: 2.0,
            ..Default::default()
        });
        scheduler.start().unwrap();
        run_for(&mut scheduler, controls.clock(), 3.0);

        let times: Vec<f64> = controls.clicks().snapshot().iter().map(|c| c.start_time).collect();
        assert!(times.len() >= 9);
        let interval = 60.0 / (90.0 * 2.0);
        for pair in times.windows(2) {
            assert!((pair[1] - pair[0] - interval).abs() < 1e-9);
        }
    }

    #[test]
    fn test_downbeat_pattern_four_four() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig {
            accent_on_downbeat: true,
            ..Default::default()
        });
        let rx = scheduler.subscribe();
        scheduler.start().unwrap();
        run_for(&mut scheduler, controls.clock(), 6.0);

        let events: Vec<BeatEvent> = rx.try_iter().collect();
        let numbers: Vec<u64> = events.iter().map(|e| e.beat_number).collect();
        assert_eq!(numbers, (1..=numbers.len() as u64).collect::<Vec<_>>());
        assert!(numbers.len() >= 12);

        for event in &events {
            let expected = matches!(event.beat_number, 1 | 5 | 9 | 13);
            assert_eq!(event.is_downbeat, expected, "beat {}", event.beat_number);
        }

        // Accented clicks use the accent pitch and length
        let clicks = controls.clicks().snapshot();
        assert_eq!(clicks[0].frequency, 1000.0);
        assert_eq!(clicks[1].frequency, 600.0);
        assert!(clicks[4].is_downbeat);
    }

    #[test]
    fn test_notifications_wait_for_click_time() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        let rx = scheduler.subscribe();
        scheduler.start().unwrap();
        rx.try_recv().unwrap();

        // Beat 2 (at +0.501) is scheduled at +0.425 but announced later
        controls.clock().advance(0.425);
        scheduler.run_pass();
        assert_eq!(scheduler.dispatch_due(), 0);
        assert!(scheduler.next_due().is_some());

        controls.clock().advance(0.1);
        assert_eq!(scheduler.dispatch_due(), 1);
        assert_eq!(rx.try_recv().unwrap().beat_number, 2);
    }

    #[test]
    fn test_update_bpm_preserves_position() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig {
            accent_on_downbeat: true,
            ..Default::default()
        });
        let rx = scheduler.subscribe();
        scheduler.start().unwrap();
        run_for(&mut scheduler, controls.clock(), 1.0);

        let counter = scheduler.beat_counter();
        let next = scheduler.next_scheduled_time();

        scheduler.update_bpm(240.0);
        assert_eq!(scheduler.beat_interval(), 0.25);
        assert_eq!(scheduler.beat_counter(), counter);
        assert_eq!(scheduler.next_scheduled_time(), next);
        assert!(scheduler.is_playing());

        run_for(&mut scheduler, controls.clock(), 2.0);
        let numbers: Vec<u64> = rx.try_iter().map(|e| e.beat_number).collect();
        // No restart: numbering continues without a jump
        assert_eq!(numbers, (1..=numbers.len() as u64).collect::<Vec<_>>());
    }

    #[test]
    fn test_update_bpm_clamps() {
        let (mut scheduler, _) = scheduler_with(TempoConfig::default());
        scheduler.update_bpm(1000.0);
        assert_eq!(scheduler.tempo().bpm, 300.0);
        assert_eq!(scheduler.beat_interval(), 0.2);
    }

    #[test]
    fn test_update_settings_restarts_at_beat_one() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        let rx = scheduler.subscribe();
        scheduler.start().unwrap();
        run_for(&mut scheduler, controls.clock(), 1.6);
        let _ = rx.try_iter().count();

        let new_tempo = TempoConfig {
            time_signature: 3,
            accent_on_downbeat: true,
            ..Default::default()
        };
        scheduler.update_settings(new_tempo.clone()).unwrap();

        assert!(scheduler.is_playing());
        assert_eq!(scheduler.tempo(), &new_tempo);
        assert_eq!(rx.try_recv().unwrap(), BeatEvent::new(1, true));
        assert_eq!(scheduler.beat_counter(), 2);
    }

    #[test]
    fn test_update_settings_when_stopped_has_no_side_effects() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        let rx = scheduler.subscribe();

        scheduler
            .update_settings(TempoConfig {
                bpm: 60.0,
                ..Default::default()
            })
            .unwrap();

        assert!(!scheduler.is_playing());
        assert!(!scheduler.has_output());
        assert_eq!(scheduler.beat_interval(), 1.0);
        assert!(rx.try_recv().is_err());
        assert!(controls.clicks().is_empty());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let (mut scheduler, _) = scheduler_with(TempoConfig::default());
        scheduler.start().unwrap();

        let result = scheduler.update_settings(TempoConfig {
            subdivision_multiplier: -1.0,
            ..Default::default()
        });
        assert!(matches!(result, Err(MetronomeError::InvalidSettings(_))));
        // Still playing the old configuration
        assert!(scheduler.is_playing());
        assert_eq!(scheduler.tempo().subdivision_multiplier, 1.0);
    }

    #[test]
    fn test_runaway_subdivision_schedules_nothing() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        let result = scheduler.update_settings(TempoConfig {
            bpm: 300.0,
            subdivision_multiplier: 1e5,
            ..Default::default()
        });
        assert!(matches!(result, Err(MetronomeError::InvalidSettings(_))));

        scheduler.start().unwrap();
        // 100ms horizon at 120 BPM: beat 1 only
        assert_eq!(controls.clicks().len(), 1);
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        let rx = scheduler.subscribe();

        scheduler.stop();
        assert!(!scheduler.is_playing());

        scheduler.start().unwrap();
        scheduler.start().unwrap();
        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(controls.clicks().len(), 1);

        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_playing());
        assert_eq!(scheduler.beat_counter(), 0);
    }

    #[test]
    fn test_no_stale_beats_after_stop() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        let rx = scheduler.subscribe();
        scheduler.start().unwrap();
        let _ = rx.try_recv();

        // Queue beat 2, then stop before its time
        controls.clock().advance(0.45);
        scheduler.run_pass();
        scheduler.stop();

        controls.clock().advance(1.0);
        scheduler.run_pass();
        assert_eq!(scheduler.dispatch_due(), 0);
        assert!(rx.try_recv().is_err());
        assert!(scheduler.next_due().is_none());

        // The click itself was already handed to the output
        assert_eq!(controls.clicks().len(), 2);
    }

    #[test]
    fn test_previous_session_beats_dropped_after_restart() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig {
            bpm: 300.0,
            subdivision_multiplier: 4.0,
            ..Default::default()
        });
        let rx = scheduler.subscribe();
        scheduler.start().unwrap();
        let queued_before = scheduler.next_due();
        assert!(queued_before.is_some());

        scheduler.stop();
        scheduler.start().unwrap();
        controls.clock().advance(0.2);
        scheduler.run_pass();
        scheduler.dispatch_due();

        let numbers: Vec<u64> = rx.try_iter().map(|e| e.beat_number).collect();
        // Session 1 emitted beat 1; session 2 restarts at 1 with no leftovers
        assert_eq!(numbers[0], 1);
        assert_eq!(numbers[1], 1);
        assert_eq!(&numbers[1..], &(1..numbers.len() as u64).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_acquire_failure_keeps_stopped_and_retry_works() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        controls.set_fail_acquire(true);

        let result = scheduler.start();
        assert!(matches!(result, Err(MetronomeError::AudioUnavailable(_))));
        assert!(!scheduler.is_playing());
        assert_eq!(scheduler.beat_counter(), 0);

        controls.set_fail_acquire(false);
        scheduler.start().unwrap();
        assert!(scheduler.is_playing());
    }

    #[test]
    fn test_resume_failure_keeps_stopped() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        controls.set_start_suspended(true);
        controls.set_fail_resume(true);
        let rx = scheduler.subscribe();

        let result = scheduler.start();
        assert!(matches!(result, Err(MetronomeError::ResumeFailed(_))));
        assert!(!scheduler.is_playing());
        assert!(rx.try_recv().is_err());
        assert!(controls.clicks().is_empty());

        controls.set_fail_resume(false);
        scheduler.start().unwrap();
        assert_eq!(rx.try_recv().unwrap().beat_number, 1);
    }

    #[test]
    fn test_output_acquired_once() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        for _ in 0..3 {
            scheduler.start().unwrap();
            scheduler.stop();
        }
        assert_eq!(controls.acquisitions(), 1);
    }

    #[test]
    fn test_sound_disabled_still_notifies() {
        let (mut scheduler, controls) = scheduler_with(TempoConfig {
            sound_enabled: false,
            ..Default::default()
        });
        let rx = scheduler.subscribe();
        scheduler.start().unwrap();
        run_for(&mut scheduler, controls.clock(), 2.0);

        assert!(controls.clicks().is_empty());
        assert!(rx.try_iter().count() >= 4);
    }

    #[test]
    fn test_on_beat_callbacks() {
        use std::sync::{Arc, Mutex};

        let (mut scheduler, controls) = scheduler_with(TempoConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scheduler.on_beat(move |event| sink.lock().unwrap().push(event.beat_number));

        scheduler.start().unwrap();
        run_for(&mut scheduler, controls.clock(), 1.1);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }
}
