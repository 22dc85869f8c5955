// Metronome - Library exports for the binary, tests and benchmarks

pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod messaging;
pub mod runtime;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use app::{PlaybackController, Settings};
pub use audio::engine::CpalProvider;
pub use audio::manual::{ManualClock, ManualProvider};
pub use audio::output::{AudioOutput, OutputProvider, OutputState};
pub use config::EngineConfig;
pub use error::MetronomeError;
pub use runtime::MetronomeHandle;
pub use sequencer::{BeatEvent, BeatScheduler, TapTempo, TempoConfig};
pub use synth::click::{ClickSynthesizer, ScheduledClick};
pub use synth::sound::ClickSoundType;
