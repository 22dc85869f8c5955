// Playback controller - user-facing operations on top of the engine
//
// Keeps the user's settings, pushes them into the engine, saves them on
// every change and turns beat events into pulse/haptic feedback.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use super::feedback::{HapticDevice, PulseIndicator, PulseState, haptic_pattern};
use super::settings::{MAX_TIME_SIGNATURE, Settings, SettingsStore, load_settings, save_settings};
use crate::error::MetronomeError;
use crate::runtime::MetronomeHandle;
use crate::sequencer::events::BeatEvent;
use crate::sequencer::tap_tempo::TapTempo;
use crate::sequencer::tempo::clamp_bpm;
use crate::synth::sound::ClickSoundType;

/// Which click pitches the user set by hand
///
/// An overridden pitch survives the next sound change, which then clears
/// the flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrequencyOverrides {
    pub accent: bool,
    pub beat: bool,
}

impl FrequencyOverrides {
    /// Pitches differing from the table defaults of the saved sound
    pub fn detect(settings: &Settings) -> Self {
        let profile = settings.click_sound_type.profile();
        Self {
            accent: settings.accent_frequency != profile.accent_frequency,
            beat: settings.beat_frequency != profile.beat_frequency,
        }
    }
}

pub struct PlaybackController<S: SettingsStore> {
    engine: MetronomeHandle,
    store: S,
    settings: Settings,
    overrides: FrequencyOverrides,
    is_playing: bool,
    tap_tempo: TapTempo,
    beats: Receiver<BeatEvent>,
    pulse: PulseIndicator,
    haptics: Option<Box<dyn HapticDevice>>,
}

impl<S: SettingsStore> PlaybackController<S> {
    /// Load saved settings (defaults when missing or unreadable) and hand them
    /// to the engine
    pub fn new(engine: MetronomeHandle, store: S) -> Result<Self, MetronomeError> {
        let settings = match load_settings(&store) {
            Ok(Some(settings)) => {
                log::info!("Loaded saved settings");
                settings
            }
            Ok(None) => Settings::default(),
            Err(e) => {
                log::warn!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            }
        };

        let beats = engine.subscribe()?;
        engine.update_settings(settings.tempo_config())?;

        Ok(Self {
            engine,
            store,
            overrides: FrequencyOverrides::detect(&settings),
            settings,
            is_playing: false,
            tap_tempo: TapTempo::new(),
            beats,
            pulse: PulseIndicator::new(),
            haptics: None,
        })
    }

    pub fn with_haptics(mut self, device: Box<dyn HapticDevice>) -> Self {
        self.haptics = Some(device);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn overrides(&self) -> FrequencyOverrides {
        self.overrides
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start when stopped, stop when playing; returns the new playing state
    pub fn toggle(&mut self) -> Result<bool, MetronomeError> {
        if self.is_playing {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.is_playing)
    }

    pub fn start(&mut self) -> Result<(), MetronomeError> {
        if self.is_playing {
            return Ok(());
        }

        self.engine.update_settings(self.settings.tempo_config())?;
        self.engine.start()?;
        self.is_playing = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        self.is_playing = false;
        self.pulse.clear();
    }

    /// Set the tempo (clamped); applied live without restarting the bar
    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        let bpm = clamp_bpm(bpm);
        self.settings.bpm = bpm;
        if self.is_playing {
            self.engine.update_bpm(bpm);
        }
        self.persist();
        bpm
    }

    pub fn increment_bpm(&mut self) -> f64 {
        self.set_bpm(self.settings.bpm + 1.0)
    }

    pub fn decrement_bpm(&mut self) -> f64 {
        self.set_bpm(self.settings.bpm - 1.0)
    }

    /// Record a tap; adopts the estimated tempo once there is one
    pub fn tap(&mut self, timestamp: Duration) -> Option<f64> {
        let bpm = self.tap_tempo.record_tap(timestamp)?;
        Some(self.set_bpm(bpm))
    }

    pub fn set_time_signature(&mut self, beats_per_bar: u32) -> Result<(), MetronomeError> {
        if !(1..=MAX_TIME_SIGNATURE).contains(&beats_per_bar) {
            return Err(MetronomeError::InvalidSettings(format!(
                "Time signature must be between 1 and {}, got {}",
                MAX_TIME_SIGNATURE, beats_per_bar
            )));
        }
        self.apply(Settings {
            time_signature: beats_per_bar,
            ..self.settings.clone()
        })
    }

    pub fn set_subdivision(&mut self, multiplier: f64) -> Result<(), MetronomeError> {
        self.apply(Settings {
            subdivision_multiplier: multiplier,
            ..self.settings.clone()
        })
    }

    pub fn set_accent_on_downbeat(&mut self, enabled: bool) -> Result<(), MetronomeError> {
        self.apply(Settings {
            accent_on_downbeat: enabled,
            ..self.settings.clone()
        })
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) -> Result<(), MetronomeError> {
        self.apply(Settings {
            sound_enabled: enabled,
            ..self.settings.clone()
        })
    }

    /// Presentation only, the engine is not involved
    pub fn set_haptics_enabled(&mut self, enabled: bool) {
        self.settings.haptics_enabled = enabled;
        self.persist();
    }

    /// Switch sound; pitches the user did not override follow the new
    /// sound's defaults
    pub fn set_sound_type(&mut self, sound: ClickSoundType) -> Result<(), MetronomeError> {
        let profile = sound.profile();
        let mut next = Settings {
            click_sound_type: sound,
            ..self.settings.clone()
        };
        if !self.overrides.accent {
            next.accent_frequency = profile.accent_frequency;
        }
        if !self.overrides.beat {
            next.beat_frequency = profile.beat_frequency;
        }

        self.apply(next)?;
        self.overrides = FrequencyOverrides::default();
        Ok(())
    }

    pub fn set_accent_frequency(&mut self, hz: f32) -> Result<(), MetronomeError> {
        self.apply(Settings {
            accent_frequency: hz,
            ..self.settings.clone()
        })?;
        self.overrides.accent = true;
        Ok(())
    }

    pub fn set_beat_frequency(&mut self, hz: f32) -> Result<(), MetronomeError> {
        self.apply(Settings {
            beat_frequency: hz,
            ..self.settings.clone()
        })?;
        self.overrides.beat = true;
        Ok(())
    }

    /// Drain beat events and drive the pulse and haptics
    ///
    /// Events arriving while stopped (trailing clicks) are discarded.
    pub fn poll_feedback(&mut self, now: Instant) -> Vec<BeatEvent> {
        let events: Vec<BeatEvent> = self.beats.try_iter().collect();
        if !self.is_playing {
            return Vec::new();
        }

        for event in &events {
            self.pulse.trigger(now, event.is_downbeat);

            if self.settings.haptics_enabled
                && let Some(device) = self.haptics.as_mut()
                && device.is_supported()
            {
                device.vibrate(haptic_pattern(event.is_downbeat));
            }
        }
        events
    }

    pub fn pulse_state(&self, now: Instant) -> PulseState {
        self.pulse.state(now)
    }

    /// Validate, push to the engine when playing, then keep and save
    fn apply(&mut self, next: Settings) -> Result<(), MetronomeError> {
        let tempo = next.tempo_config();
        tempo.validate()?;

        if self.is_playing {
            self.engine.update_settings(tempo)?;
        }

        self.settings = next;
        self.persist();
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(e) = save_settings(&mut self.store, &self.settings) {
            log::warn!("Failed to save settings: {}", e);
        }
    }
}
