// Audio module - output abstraction, CPAL backend and playback clock

pub mod device;
pub mod dsp_utils;
pub mod engine;
pub mod manual;
pub mod output;
pub mod parameters;
pub mod timing;
