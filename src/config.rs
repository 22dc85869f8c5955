// Engine configuration - timing constants of the look-ahead scheduler

use std::time::Duration;

/// Tuning of the scheduling engine
///
/// The defaults give a 25ms scheduling period and a 100ms audio horizon: the
/// pass can be delayed by up to ~75ms before a click is scheduled late.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Period of the look-ahead scheduling pass
    pub lookahead: Duration,
    /// How far past "now" each pass schedules clicks
    pub schedule_ahead: Duration,
    /// Delay before the first click so it is never scheduled in the past
    pub start_margin: Duration,
    /// Capacity of the engine -> audio callback click queue
    pub click_queue_capacity: usize,
    /// Capacity of the audio callback -> engine notification queue
    pub notification_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookahead: Duration::from_millis(25),
            schedule_ahead: Duration::from_millis(100),
            start_margin: Duration::from_millis(1),
            click_queue_capacity: 256,
            notification_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn schedule_ahead_secs(&self) -> f64 {
        self.schedule_ahead.as_secs_f64()
    }

    pub fn start_margin_secs(&self) -> f64 {
        self.start_margin.as_secs_f64()
    }
}
