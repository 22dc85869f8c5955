// Manual output - in-memory output driven by an externally advanced clock
//
// Used for headless runs and for deterministic tests: the clock only moves
// when `ManualClock::advance` is called, and every scheduled click is kept in
// a shared log instead of being played.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::output::{AudioOutput, OutputProvider, OutputState};
use super::parameters::AtomicF64;
use crate::error::MetronomeError;
use crate::synth::click::{ClickSink, ScheduledClick};

/// Playback clock advanced by hand
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    time: AtomicF64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: AtomicF64::new(start),
        }
    }

    pub fn now(&self) -> f64 {
        self.time.get()
    }

    pub fn advance(&self, seconds: f64) {
        let step = seconds.max(0.0);
        self.time.update(|now| now + step);
    }

    /// Jump to `seconds` (never moves backwards)
    pub fn set(&self, seconds: f64) {
        self.time.update(|now| now.max(seconds));
    }
}

/// Shared record of every click handed to a manual output
#[derive(Clone, Debug, Default)]
pub struct ClickLog {
    inner: Arc<Mutex<Vec<ScheduledClick>>>,
}

impl ClickLog {
    pub fn snapshot(&self) -> Vec<ScheduledClick> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn push(&self, click: ScheduledClick) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(click);
    }
}

/// Provider of manual outputs
///
/// Cloning shares the clock, the click log and the failure switches, so a test
/// can keep a clone while the engine owns the original.
#[derive(Clone, Debug, Default)]
pub struct ManualProvider {
    clock: ManualClock,
    clicks: ClickLog,
    fail_acquire: Arc<AtomicBool>,
    fail_resume: Arc<AtomicBool>,
    start_suspended: Arc<AtomicBool>,
    acquisitions: Arc<AtomicUsize>,
}

impl ManualProvider {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            ..Default::default()
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn clicks(&self) -> &ClickLog {
        &self.clicks
    }

    /// Make the next acquisitions fail (no device)
    pub fn set_fail_acquire(&self, fail: bool) {
        self.fail_acquire.store(fail, Ordering::SeqCst);
    }

    /// Make resuming a suspended output fail
    pub fn set_fail_resume(&self, fail: bool) {
        self.fail_resume.store(fail, Ordering::SeqCst);
    }

    /// Create outputs in the suspended state
    pub fn set_start_suspended(&self, suspended: bool) {
        self.start_suspended.store(suspended, Ordering::SeqCst);
    }

    /// Number of outputs created so far
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

impl OutputProvider for ManualProvider {
    type Output = ManualOutput;

    fn acquire(&mut self) -> Result<ManualOutput, MetronomeError> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(MetronomeError::AudioUnavailable(
                "No audio device found".to_string(),
            ));
        }

        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let state = if self.start_suspended.load(Ordering::SeqCst) {
            OutputState::Suspended
        } else {
            OutputState::Running
        };

        Ok(ManualOutput {
            clock: self.clock.clone(),
            clicks: self.clicks.clone(),
            fail_resume: Arc::clone(&self.fail_resume),
            state,
        })
    }
}

#[derive(Debug)]
pub struct ManualOutput {
    clock: ManualClock,
    clicks: ClickLog,
    fail_resume: Arc<AtomicBool>,
    state: OutputState,
}

impl ClickSink for ManualOutput {
    fn schedule_click(&mut self, click: ScheduledClick) {
        self.clicks.push(click);
    }
}

impl AudioOutput for ManualOutput {
    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) -> Result<(), MetronomeError> {
        if self.fail_resume.load(Ordering::SeqCst) {
            return Err(MetronomeError::ResumeFailed(
                "output refused to resume".to_string(),
            ));
        }
        self.state = OutputState::Running;
        Ok(())
    }
}
