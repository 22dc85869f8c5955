// Settings persistence - the user's metronome setup, stored as JSON

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sequencer::tempo::{MAX_SUBDIVISION, TempoConfig, clamp_bpm};
use crate::synth::sound::ClickSoundType;

/// Key of the settings record in a `SettingsStore`
pub const SETTINGS_KEY: &str = "metronomeSettings";

/// Highest time signature accepted on load
pub const MAX_TIME_SIGNATURE: u32 = 32;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No configuration directory on this platform")]
    NoConfigDir,
}

/// Persisted record
///
/// Missing fields take their default; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredSettings")]
pub struct Settings {
    pub bpm: f64,
    pub time_signature: u32,
    pub subdivision_multiplier: f64,
    pub accent_on_downbeat: bool,
    pub sound_enabled: bool,
    pub haptics_enabled: bool,
    pub click_sound_type: ClickSoundType,
    pub accent_frequency: f32,
    pub beat_frequency: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let tempo = TempoConfig::default();
        Self {
            bpm: tempo.bpm,
            time_signature: tempo.time_signature,
            subdivision_multiplier: tempo.subdivision_multiplier,
            accent_on_downbeat: tempo.accent_on_downbeat,
            sound_enabled: tempo.sound_enabled,
            haptics_enabled: false,
            click_sound_type: tempo.click_sound_type,
            accent_frequency: tempo.accent_frequency,
            beat_frequency: tempo.beat_frequency,
        }
    }
}

/// On-disk shape, including the legacy `subdivision` field
///
/// Older records store the note length of one click relative to a beat
/// (`0.25` = sixteenths), the inverse of `subdivisionMultiplier`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredSettings {
    bpm: f64,
    time_signature: u32,
    subdivision_multiplier: Option<f64>,
    subdivision: Option<f64>,
    accent_on_downbeat: bool,
    sound_enabled: bool,
    haptics_enabled: bool,
    click_sound_type: ClickSoundType,
    accent_frequency: f32,
    beat_frequency: f32,
}

impl Default for StoredSettings {
    fn default() -> Self {
        let defaults = Settings::default();
        Self {
            bpm: defaults.bpm,
            time_signature: defaults.time_signature,
            subdivision_multiplier: None,
            subdivision: None,
            accent_on_downbeat: defaults.accent_on_downbeat,
            sound_enabled: defaults.sound_enabled,
            haptics_enabled: defaults.haptics_enabled,
            click_sound_type: defaults.click_sound_type,
            accent_frequency: defaults.accent_frequency,
            beat_frequency: defaults.beat_frequency,
        }
    }
}

impl From<StoredSettings> for Settings {
    fn from(stored: StoredSettings) -> Self {
        let subdivision_multiplier = stored
            .subdivision_multiplier
            .or_else(|| stored.subdivision.map(|note| 1.0 / note))
            .unwrap_or(Settings::default().subdivision_multiplier);

        Settings {
            bpm: stored.bpm,
            time_signature: stored.time_signature,
            subdivision_multiplier,
            accent_on_downbeat: stored.accent_on_downbeat,
            sound_enabled: stored.sound_enabled,
            haptics_enabled: stored.haptics_enabled,
            click_sound_type: stored.click_sound_type,
            accent_frequency: stored.accent_frequency,
            beat_frequency: stored.beat_frequency,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Bring every field back into its valid range
    pub fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        let profile = self.click_sound_type.profile();

        self.bpm = clamp_bpm(self.bpm);
        self.time_signature = self.time_signature.clamp(1, MAX_TIME_SIGNATURE);
        if !self.subdivision_multiplier.is_finite() || self.subdivision_multiplier <= 0.0 {
            self.subdivision_multiplier = defaults.subdivision_multiplier;
        }
        self.subdivision_multiplier = self.subdivision_multiplier.min(MAX_SUBDIVISION);
        if !self.accent_frequency.is_finite() || self.accent_frequency <= 0.0 {
            self.accent_frequency = profile.accent_frequency;
        }
        if !self.beat_frequency.is_finite() || self.beat_frequency <= 0.0 {
            self.beat_frequency = profile.beat_frequency;
        }
        self
    }

    /// Engine configuration described by these settings
    pub fn tempo_config(&self) -> TempoConfig {
        TempoConfig {
            bpm: self.bpm,
            time_signature: self.time_signature,
            subdivision_multiplier: self.subdivision_multiplier,
            accent_on_downbeat: self.accent_on_downbeat,
            sound_enabled: self.sound_enabled,
            click_sound_type: self.click_sound_type,
            accent_frequency: self.accent_frequency,
            beat_frequency: self.beat_frequency,
        }
    }
}

/// String-keyed durable storage
pub trait SettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// Read the settings record, if one was saved
pub fn load_settings<S: SettingsStore + ?Sized>(store: &S) -> Result<Option<Settings>, SettingsError> {
    match store.get(SETTINGS_KEY)? {
        Some(json) => Settings::from_json(&json).map(Some),
        None => Ok(None),
    }
}

pub fn save_settings<S: SettingsStore + ?Sized>(
    store: &mut S,
    settings: &Settings,
) -> Result<(), SettingsError> {
    store.set(SETTINGS_KEY, &settings.to_json()?)
}

/// One `<key>.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<platform config dir>/metronome`
    pub fn default_location() -> Result<Self, SettingsError> {
        let base = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(base.join("metronome")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        fs::create_dir_all(&self.dir)?;

        // Write then rename so a crash never leaves a truncated record
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        log::debug!("Saved {} to {}", key, path.display());
        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
