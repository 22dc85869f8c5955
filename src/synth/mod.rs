// Synthesis module - click sounds, envelopes and the voice pool

pub mod click;
pub mod envelope;
pub mod oscillator;
pub mod sound;
pub mod voice;
pub mod voice_manager;
