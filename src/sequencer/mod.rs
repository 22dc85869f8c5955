// Sequencer module - tempo, beat scheduling and tap tempo

pub mod events;
pub mod scheduler;
pub mod tap_tempo;
pub mod tempo;

pub use events::BeatEvent;
pub use scheduler::BeatScheduler;
pub use tap_tempo::TapTempo;
pub use tempo::TempoConfig;
