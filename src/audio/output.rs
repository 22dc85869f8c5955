// Audio output abstraction - the clock and click sink the scheduler runs against
//
// The scheduler never talks to a device directly. It acquires an output from
// an `OutputProvider` the first time it starts and keeps it for its lifetime;
// the output exposes a monotonic clock and accepts clicks stamped with times
// on that clock.

use crate::error::MetronomeError;
use crate::messaging::notification::Notification;
use crate::synth::click::ClickSink;

/// Power state of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Created but not rendering; the clock does not advance
    Suspended,
    Running,
}

pub trait AudioOutput: ClickSink {
    /// Current time on the playback clock, in seconds
    fn current_time(&self) -> f64;

    fn state(&self) -> OutputState;

    /// Leave the suspended state. Blocks until the output is running.
    fn resume(&mut self) -> Result<(), MetronomeError>;

    /// Asynchronous problems reported by the backend (stream errors...)
    fn poll_notification(&mut self) -> Option<Notification> {
        None
    }
}

/// Lazily creates the output on first `start`
pub trait OutputProvider {
    type Output: AudioOutput;

    fn acquire(&mut self) -> Result<Self::Output, MetronomeError>;
}
