// Presentation feedback - visual pulse and haptic patterns per beat

use std::time::{Duration, Instant};

/// How long the pulse stays lit after each beat
pub const PULSE_DURATION: Duration = Duration::from_millis(200);

/// Vibration patterns in milliseconds (on, off, on...)
pub const DOWNBEAT_HAPTIC_PATTERN: &[u64] = &[10, 5, 10];
pub const REGULAR_HAPTIC_PATTERN: &[u64] = &[5];

pub fn haptic_pattern(is_downbeat: bool) -> &'static [u64] {
    if is_downbeat {
        DOWNBEAT_HAPTIC_PATTERN
    } else {
        REGULAR_HAPTIC_PATTERN
    }
}

/// What a pulse display should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    Idle,
    Pulse,
    /// Pulse on a downbeat
    AccentPulse,
}

/// Beat indicator lit for `PULSE_DURATION` after each beat
#[derive(Debug, Clone, Default)]
pub struct PulseIndicator {
    active_until: Option<Instant>,
    accent: bool,
}

impl PulseIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&mut self, now: Instant, is_downbeat: bool) {
        self.active_until = Some(now + PULSE_DURATION);
        self.accent = is_downbeat;
    }

    pub fn state(&self, now: Instant) -> PulseState {
        match self.active_until {
            Some(until) if now < until => {
                if self.accent {
                    PulseState::AccentPulse
                } else {
                    PulseState::Pulse
                }
            }
            _ => PulseState::Idle,
        }
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.state(now) != PulseState::Idle
    }

    pub fn clear(&mut self) {
        self.active_until = None;
        self.accent = false;
    }
}

/// Vibration motor, when the platform has one
pub trait HapticDevice: Send {
    fn is_supported(&self) -> bool;

    /// Play `pattern` (alternating on/off durations in ms)
    fn vibrate(&mut self, pattern: &[u64]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_lasts_200ms() {
        let t0 = Instant::now();
        let mut pulse = PulseIndicator::new();
        assert_eq!(pulse.state(t0), PulseState::Idle);

        pulse.trigger(t0, false);
        assert_eq!(pulse.state(t0), PulseState::Pulse);
        assert!(pulse.is_active(t0 + Duration::from_millis(199)));
        assert!(!pulse.is_active(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn test_accent_state_follows_last_beat() {
        let t0 = Instant::now();
        let mut pulse = PulseIndicator::new();
        pulse.trigger(t0, true);
        assert_eq!(pulse.state(t0), PulseState::AccentPulse);

        let t1 = t0 + Duration::from_millis(100);
        pulse.trigger(t1, false);
        assert_eq!(pulse.state(t1), PulseState::Pulse);
        // Retriggering extends the pulse
        assert!(pulse.is_active(t0 + Duration::from_millis(250)));

        pulse.clear();
        assert_eq!(pulse.state(t1), PulseState::Idle);
    }

    #[test]
    fn test_haptic_patterns() {
        assert_eq!(haptic_pattern(true), &[10, 5, 10]);
        assert_eq!(haptic_pattern(false), &[5]);
    }
}
