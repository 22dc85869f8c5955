// Sound table - synthesis parameters per click sound
//
// Pure data: every click variant is a waveform plus two envelope parameter
// sets (accented / regular) and the default tone pitches.

use crate::synth::envelope::EnvelopeParams;
use crate::synth::oscillator::WaveformType;
use std::fmt;
use std::str::FromStr;

/// Click duration for accented clicks (seconds)
pub const ACCENT_CLICK_DURATION: f32 = 0.05;
/// Click duration for regular clicks (seconds)
pub const REGULAR_CLICK_DURATION: f32 = 0.04;

/// Available click sounds
///
/// Serialized with the identifiers used in the settings record
/// (`"classic"`, `"rimShot"`, ...). Unknown identifiers read back as `Classic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClickSoundType {
    #[default]
    Classic,
    RimShot,
    Woodblock,
    Stick,
    Electronic,
    Bell,
}

/// Full parameter set for one sound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundProfile {
    pub waveform: WaveformType,
    /// Default pitch of accented clicks (Hz)
    pub accent_frequency: f32,
    /// Default pitch of regular clicks (Hz)
    pub beat_frequency: f32,
    pub accent: EnvelopeParams,
    pub regular: EnvelopeParams,
}

impl SoundProfile {
    /// Envelope for an accented or regular click
    pub fn envelope(&self, is_downbeat: bool) -> EnvelopeParams {
        if is_downbeat { self.accent } else { self.regular }
    }
}

const CLASSIC: SoundProfile = SoundProfile {
    waveform: WaveformType::Sine,
    accent_frequency: 1000.0,
    beat_frequency: 600.0,
    accent: EnvelopeParams::new(0.6, 0.001, 0.015, 0.1, 0.015),
    regular: EnvelopeParams::new(0.45, 0.001, 0.012, 0.1, 0.015),
};

const RIM_SHOT: SoundProfile = SoundProfile {
    waveform: WaveformType::Sine,
    accent_frequency: 1200.0,
    beat_frequency: 900.0,
    accent: EnvelopeParams::new(0.65, 0.0005, 0.008, 0.05, 0.01),
    regular: EnvelopeParams::new(0.5, 0.0005, 0.006, 0.05, 0.01),
};

const WOODBLOCK: SoundProfile = SoundProfile {
    waveform: WaveformType::Sine,
    accent_frequency: 800.0,
    beat_frequency: 500.0,
    accent: EnvelopeParams::new(0.55, 0.002, 0.025, 0.15, 0.025),
    regular: EnvelopeParams::new(0.4, 0.002, 0.02, 0.15, 0.025),
};

const STICK: SoundProfile = SoundProfile {
    waveform: WaveformType::Sine,
    accent_frequency: 1500.0,
    beat_frequency: 1000.0,
    accent: EnvelopeParams::new(0.5, 0.0003, 0.01, 0.0, 0.005),
    regular: EnvelopeParams::new(0.4, 0.0003, 0.008, 0.0, 0.005),
};

const ELECTRONIC: SoundProfile = SoundProfile {
    waveform: WaveformType::Square,
    accent_frequency: 1800.0,
    beat_frequency: 1200.0,
    accent: EnvelopeParams::new(0.6, 0.001, 0.015, 0.05, 0.01),
    regular: EnvelopeParams::new(0.45, 0.001, 0.012, 0.05, 0.01),
};

const BELL: SoundProfile = SoundProfile {
    waveform: WaveformType::Sine,
    accent_frequency: 700.0,
    beat_frequency: 400.0,
    accent: EnvelopeParams::new(0.5, 0.003, 0.03, 0.2, 0.03),
    regular: EnvelopeParams::new(0.35, 0.003, 0.025, 0.2, 0.03),
};

impl ClickSoundType {
    pub const ALL: [ClickSoundType; 6] = [
        ClickSoundType::Classic,
        ClickSoundType::RimShot,
        ClickSoundType::Woodblock,
        ClickSoundType::Stick,
        ClickSoundType::Electronic,
        ClickSoundType::Bell,
    ];

    pub fn profile(&self) -> &'static SoundProfile {
        match self {
            ClickSoundType::Classic => &CLASSIC,
            ClickSoundType::RimShot => &RIM_SHOT,
            ClickSoundType::Woodblock => &WOODBLOCK,
            ClickSoundType::Stick => &STICK,
            ClickSoundType::Electronic => &ELECTRONIC,
            ClickSoundType::Bell => &BELL,
        }
    }

    /// Identifier used in persisted settings
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickSoundType::Classic => "classic",
            ClickSoundType::RimShot => "rimShot",
            ClickSoundType::Woodblock => "woodblock",
            ClickSoundType::Stick => "stick",
            ClickSoundType::Electronic => "electronic",
            ClickSoundType::Bell => "bell",
        }
    }

    /// Parse an identifier, falling back to `Classic` for unknown names
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::debug!("Unknown click sound '{}', using classic", name);
            ClickSoundType::Classic
        })
    }

    /// Next sound in table order (wraps)
    pub fn next(&self) -> Self {
        let index = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Returned when a sound identifier is not in the table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown click sound: {0}")]
pub struct UnknownSoundType(pub String);

impl FromStr for ClickSoundType {
    type Err = UnknownSoundType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClickSoundType::ALL
            .iter()
            .copied()
            .find(|sound| sound.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSoundType(s.to_string()))
    }
}

impl From<String> for ClickSoundType {
    fn from(name: String) -> Self {
        ClickSoundType::from_name(&name)
    }
}

impl From<ClickSoundType> for String {
    fn from(sound: ClickSoundType) -> Self {
        sound.as_str().to_string()
    }
}

impl fmt::Display for ClickSoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
