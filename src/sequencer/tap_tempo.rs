// Tap tempo - BPM estimate from a sequence of taps

use super::tempo::clamp_bpm;
use std::collections::VecDeque;
use std::time::Duration;

/// Taps kept in history
pub const MAX_TAPS: usize = 10;

/// Estimates BPM from tap timestamps
///
/// Timestamps are durations since any fixed reference (an `Instant` captured at
/// startup, an input event clock...). Intervals far from the median are treated
/// as missed or doubled taps and ignored.
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    taps: VecDeque<Duration>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self {
            taps: VecDeque::with_capacity(MAX_TAPS),
        }
    }

    /// Record a tap; returns the new estimate when one can be made
    pub fn record_tap(&mut self, timestamp: Duration) -> Option<f64> {
        if let Some(&last) = self.taps.back()
            && timestamp <= last
        {
            log::debug!("Tap timestamp went backwards, restarting tap history");
            self.taps.clear();
        }

        self.taps.push_back(timestamp);
        if self.taps.len() > MAX_TAPS {
            self.taps.pop_front();
        }

        self.estimate()
    }

    /// Current estimate from the recorded taps
    pub fn estimate(&self) -> Option<f64> {
        if self.taps.len() < 2 {
            return None;
        }

        let intervals: Vec<f64> = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(a, b)| (*b - *a).as_secs_f64() * 1000.0)
            .collect();

        let mut sorted = intervals.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = sorted[sorted.len() / 2];

        let (low, high) = (median * 0.5, median * 2.0);
        let kept: Vec<f64> = intervals
            .into_iter()
            .filter(|&ms| ms >= low && ms <= high)
            .collect();

        if kept.is_empty() {
            return None;
        }

        let average_ms = kept.iter().sum::<f64>() / kept.len() as f64;
        if average_ms <= 0.0 {
            return None;
        }

        Some(clamp_bpm((60_000.0 / average_ms).round()))
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}
