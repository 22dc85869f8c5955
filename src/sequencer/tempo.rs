// Tempo configuration - BPM, meter and click settings
// Handles conversion between tempo and click timing

use crate::error::MetronomeError;
use crate::synth::sound::{ACCENT_CLICK_DURATION, ClickSoundType, REGULAR_CLICK_DURATION};
use std::fmt;

pub const MIN_BPM: f64 = 30.0;
pub const MAX_BPM: f64 = 300.0;

/// Highest clicks-per-beat multiplier (sixteenth-note triplets and below)
pub const MAX_SUBDIVISION: f64 = 16.0;

/// Clamp a tempo into the supported range
pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return MIN_BPM;
    }
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Everything the scheduler needs to know to produce clicks
///
/// Replaced wholesale by `update_settings`; only `bpm` is changed in place.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoConfig {
    /// Reference beats (quarter notes) per minute, [30, 300]
    pub bpm: f64,
    /// Reference beats per bar
    pub time_signature: u32,
    /// Clicks per reference beat: 1.0 quarters, 2.0 eighths, 1.5 triplets,
    /// 4.0 sixteenths
    pub subdivision_multiplier: f64,
    pub accent_on_downbeat: bool,
    pub sound_enabled: bool,
    pub click_sound_type: ClickSoundType,
    /// Pitch of accented clicks (Hz)
    pub accent_frequency: f32,
    /// Pitch of regular clicks (Hz)
    pub beat_frequency: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        let sound = ClickSoundType::default();
        Self {
            bpm: 120.0,
            time_signature: 4,
            subdivision_multiplier: 1.0,
            accent_on_downbeat: false,
            sound_enabled: true,
            click_sound_type: sound,
            accent_frequency: sound.profile().accent_frequency,
            beat_frequency: sound.profile().beat_frequency,
        }
    }
}

impl TempoConfig {
    /// Seconds between two consecutive clicks
    pub fn beat_interval(&self) -> f64 {
        60.0 / (self.bpm * self.subdivision_multiplier)
    }

    /// Clicks per bar before rounding (may be fractional, e.g. 5 x 1.5)
    pub fn beats_per_bar_exact(&self) -> f64 {
        self.time_signature as f64 * self.subdivision_multiplier
    }

    /// Clicks per bar used for accenting
    ///
    /// Fractional values are floored (minimum 1) so the downbeat lands on the
    /// same click of every bar instead of drifting.
    pub fn beats_per_bar(&self) -> u64 {
        let exact = self.beats_per_bar_exact();
        if exact.is_finite() && exact >= 1.0 {
            exact.floor() as u64
        } else {
            1
        }
    }

    /// 1-based position of click `beat_number` (1-based) inside its bar
    pub fn position_in_bar(&self, beat_number: u64) -> u64 {
        (beat_number.saturating_sub(1) % self.beats_per_bar()) + 1
    }

    /// Whether click `beat_number` gets the accent
    pub fn is_downbeat(&self, beat_number: u64) -> bool {
        self.accent_on_downbeat && self.position_in_bar(beat_number) == 1
    }

    pub fn click_frequency(&self, is_downbeat: bool) -> f32 {
        if is_downbeat {
            self.accent_frequency
        } else {
            self.beat_frequency
        }
    }

    pub fn click_duration(&self, is_downbeat: bool) -> f32 {
        if is_downbeat {
            ACCENT_CLICK_DURATION
        } else {
            REGULAR_CLICK_DURATION
        }
    }

    /// Reset both pitches to the table defaults of the current sound
    pub fn apply_sound_defaults(&mut self) {
        let profile = self.click_sound_type.profile();
        self.accent_frequency = profile.accent_frequency;
        self.beat_frequency = profile.beat_frequency;
    }

    pub fn validate(&self) -> Result<(), MetronomeError> {
        if !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return Err(MetronomeError::InvalidSettings(format!(
                "BPM must be between {} and {}, got {}",
                MIN_BPM, MAX_BPM, self.bpm
            )));
        }
        if self.time_signature == 0 {
            return Err(MetronomeError::InvalidSettings(
                "Time signature must have at least one beat per bar".to_string(),
            ));
        }
        if !self.subdivision_multiplier.is_finite()
            || self.subdivision_multiplier <= 0.0
            || self.subdivision_multiplier > MAX_SUBDIVISION
        {
            return Err(MetronomeError::InvalidSettings(format!(
                "Subdivision multiplier must be in (0, {}], got {}",
                MAX_SUBDIVISION, self.subdivision_multiplier
            )));
        }
        for (name, freq) in [
            ("accent", self.accent_frequency),
            ("beat", self.beat_frequency),
        ] {
            if !freq.is_finite() || freq <= 0.0 {
                return Err(MetronomeError::InvalidSettings(format!(
                    "{} frequency must be > 0 Hz, got {}",
                    name, freq
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TempoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} BPM, {} beats/bar x{} ({})",
            self.bpm, self.time_signature, self.subdivision_multiplier, self.click_sound_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TempoConfig::default();
        assert_eq!(config.bpm, 120.0);
        assert_eq!(config.time_signature, 4);
        assert_eq!(config.subdivision_multiplier, 1.0);
        assert!(!config.accent_on_downbeat);
        assert!(config.sound_enabled);
        assert_eq!(config.click_sound_type, ClickSoundType::Classic);
        assert_eq!(config.accent_frequency, 1000.0);
        assert_eq!(config.beat_frequency, 600.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_beat_interval_formula() {
        let mut config = TempoConfig::default();
        for bpm in [30.0, 60.0, 97.5, 120.0, 240.0, 300.0] {
            for sub in [1.0, 1.5, 2.0, 4.0, 0.5] {
                config.bpm = bpm;
                config.subdivision_multiplier = sub;
                assert_eq!(config.beat_interval(), 60.0 / (bpm * sub));
            }
        }

        config.bpm = 120.0;
        config.subdivision_multiplier = 1.0;
        assert_eq!(config.beat_interval(), 0.5);
        config.subdivision_multiplier = 2.0;
        assert_eq!(config.beat_interval(), 0.25);
    }

    #[test]
    fn test_four_four_downbeats() {
        let config = TempoConfig {
            accent_on_downbeat: true,
            ..Default::default()
        };

        for beat in [1, 5, 9, 13] {
            assert!(config.is_downbeat(beat), "beat {} should be a downbeat", beat);
        }
        for beat in [2, 3, 4, 6, 7, 8] {
            assert!(!config.is_downbeat(beat), "beat {} should not be a downbeat", beat);
        }
    }

    #[test]
    fn test_no_accent_when_disabled() {
        let config = TempoConfig::default();
        assert!(!config.is_downbeat(1));
        assert_eq!(config.position_in_bar(5), 1);
    }

    #[test]
    fn test_subdivided_bar() {
        let config = TempoConfig {
            time_signature: 3,
            subdivision_multiplier: 2.0,
            accent_on_downbeat: true,
            ..Default::default()
        };
        assert_eq!(config.beats_per_bar(), 6);
        assert!(config.is_downbeat(7));
        assert!(!config.is_downbeat(4));
    }

    #[test]
    fn test_fractional_beats_per_bar_is_floored() {
        // 5 beats of triplets -> 7.5 clicks; accent every 7 clicks
        let config = TempoConfig {
            time_signature: 5,
            subdivision_multiplier: 1.5,
            accent_on_downbeat: true,
            ..Default::default()
        };
        assert_eq!(config.beats_per_bar_exact(), 7.5);
        assert_eq!(config.beats_per_bar(), 7);
        assert!(config.is_downbeat(8));
        assert!(config.is_downbeat(15));

        // Below one click per bar, every click is a downbeat
        let sparse = TempoConfig {
            time_signature: 1,
            subdivision_multiplier: 0.5,
            accent_on_downbeat: true,
            ..Default::default()
        };
        assert_eq!(sparse.beats_per_bar(), 1);
        assert!(sparse.is_downbeat(2));
    }

    #[test]
    fn test_click_pitch_and_length() {
        let config = TempoConfig::default();
        assert_eq!(config.click_frequency(true), 1000.0);
        assert_eq!(config.click_frequency(false), 600.0);
        assert_eq!(config.click_duration(true), 0.05);
        assert_eq!(config.click_duration(false), 0.04);
    }

    #[test]
    fn test_validation() {
        let bad_bpm = TempoConfig {
            bpm: 301.0,
            ..Default::default()
        };
        assert!(matches!(bad_bpm.validate(), Err(MetronomeError::InvalidSettings(_))));

        let bad_ts = TempoConfig {
            time_signature: 0,
            ..Default::default()
        };
        assert!(bad_ts.validate().is_err());

        let bad_sub = TempoConfig {
            subdivision_multiplier: 0.0,
            ..Default::default()
        };
        assert!(bad_sub.validate().is_err());

        let bad_freq = TempoConfig {
            beat_frequency: f32::NAN,
            ..Default::default()
        };
        assert!(bad_freq.validate().is_err());
    }

    #[test]
    fn test_clamp_bpm() {
        assert_eq!(clamp_bpm(10.0), 30.0);
        assert_eq!(clamp_bpm(500.0), 300.0);
        assert_eq!(clamp_bpm(144.0), 144.0);
        assert_eq!(clamp_bpm(f64::NAN), 30.0);
    }

    #[test]
    fn test_apply_sound_defaults() {
        let mut config = TempoConfig {
            click_sound_type: ClickSoundType::Bell,
            accent_frequency: 1234.0,
            ..Default::default()
        };
        config.apply_sound_defaults();
        assert_eq!(config.accent_frequency, 700.0);
        assert_eq!(config.beat_frequency, 400.0);
    }

    #[test]
    fn test_subdivision_upper_bound() {
        let mut config = TempoConfig {
            bpm: MAX_BPM,
            subdivision_multiplier: MAX_SUBDIVISION,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        for sub in [16.5, 1e5, 1e9, f64::INFINITY] {
            config.subdivision_multiplier = sub;
            assert!(
                matches!(config.validate(), Err(MetronomeError::InvalidSettings(_))),
                "multiplier {} should be rejected",
                sub
            );
        }
    }
}
