// Audio clock - the playback timeline everything is scheduled against
//
// The clock is the number of frames the output callback has rendered so far.
// It only moves while the stream is running, so it is monotonic and immune to
// wall-clock jitter: a click scheduled at t seconds always lands on frame
// ceil(t * sample_rate).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared audio clock (frame counter + sample rate)
#[derive(Clone, Debug)]
pub struct AudioClock {
    /// Frames rendered so far (incremented by the audio callback)
    frame_position: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frame_position: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate as f64,
        }
    }

    /// Current frame position (read from any thread)
    pub fn current_frame(&self) -> u64 {
        self.frame_position.load(Ordering::Acquire)
    }

    /// Current playback time in seconds
    pub fn current_time(&self) -> f64 {
        self.frames_to_seconds(self.current_frame())
    }

    /// Advance the clock (called from the audio callback, once per buffer)
    pub fn advance(&self, frames: usize) {
        self.frame_position
            .fetch_add(frames as u64, Ordering::Release);
    }

    /// First frame whose time is at or after `seconds`
    pub fn seconds_to_frame(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate).ceil() as u64
    }

    pub fn frames_to_seconds(&self, frames: u64) -> f64 {
        frames as f64 / self.sample_rate
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }
}
