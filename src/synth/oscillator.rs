// Oscillators - tone generators for clicks

use std::f32::consts::PI;

pub trait Oscillator {
    fn next_sample(&mut self) -> f32;
    fn set_frequency(&mut self, freq: f32);
    fn reset(&mut self);
}

/// Click waveforms: every sound uses a sine except `electronic`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveformType {
    Sine,
    Square,
}

#[derive(Clone, Debug)]
pub struct SimpleOscillator {
    waveform: WaveformType,
    phase: f32,
    phase_increment: f32,
    sample_rate: f32,
}

impl SimpleOscillator {
    pub fn new(waveform: WaveformType, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate,
        }
    }

    pub fn set_waveform(&mut self, waveform: WaveformType) {
        self.waveform = waveform;
    }
}

impl Oscillator for SimpleOscillator {
    fn next_sample(&mut self) -> f32 {
        let sample = match self.waveform {
            WaveformType::Sine => (self.phase * 2.0 * PI).sin(),
            WaveformType::Square => {
                if self.phase < 0.5 { 1.0 } else { -1.0 }
            }
        };

        self.phase += self.phase_increment;
        // Keeps phase in [0, 1) even for frequencies above Nyquist
        self.phase -= self.phase.floor();

        sample
    }

    fn set_frequency(&mut self, freq: f32) {
        let increment = freq / self.sample_rate;
        self.phase_increment = if increment.is_finite() { increment } else { 0.0 };
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
