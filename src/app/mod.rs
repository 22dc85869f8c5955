// Application layer - controller, persisted settings and beat feedback

pub mod controller;
pub mod feedback;
pub mod settings;

pub use controller::{FrequencyOverrides, PlaybackController};
pub use feedback::{HapticDevice, PulseIndicator, PulseState};
pub use settings::{JsonFileStore, MemoryStore, Settings, SettingsError, SettingsStore};
