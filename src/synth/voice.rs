// Click voice - plays one scheduled click at its exact frame

use super::click::ScheduledClick;
use super::envelope::ClickEnvelope;
use super::oscillator::{Oscillator, SimpleOscillator, WaveformType};

pub struct ClickVoice {
    oscillator: SimpleOscillator,
    envelope: Option<ClickEnvelope>,
    start_frame: u64,
    length_frames: u64,
    sample_rate: f32,
    /// Scheduling order, used for voice stealing
    age: u64,
}

impl ClickVoice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            oscillator: SimpleOscillator::new(WaveformType::Sine, sample_rate),
            envelope: None,
            start_frame: 0,
            length_frames: 0,
            sample_rate,
            age: 0,
        }
    }

    /// Arm the voice for `click`, which must start on `start_frame`
    pub fn trigger(&mut self, click: &ScheduledClick, start_frame: u64, age: u64) {
        self.oscillator.set_waveform(click.waveform);
        self.oscillator.set_frequency(click.frequency);
        self.oscillator.reset();
        self.envelope = Some(click.envelope);
        self.start_frame = start_frame;
        self.length_frames =
            (click.envelope.duration() as f64 * self.sample_rate as f64).round() as u64;
        self.age = age;
    }

    /// Sample for absolute frame `frame`
    ///
    /// Frames must be requested in increasing order; the oscillator only
    /// advances once the click has started.
    pub fn render_frame(&mut self, frame: u64) -> f32 {
        let Some(envelope) = self.envelope else {
            return 0.0;
        };

        if frame < self.start_frame {
            return 0.0;
        }

        let offset = frame - self.start_frame;
        if offset >= self.length_frames {
            self.envelope = None;
            return 0.0;
        }

        let t = offset as f32 / self.sample_rate;
        self.oscillator.next_sample() * envelope.gain_at(t)
    }

    /// Armed or sounding
    pub fn is_active(&self) -> bool {
        self.envelope.is_some()
    }

    /// Armed but its start frame has not been reached yet
    pub fn is_pending(&self, frame: u64) -> bool {
        self.is_active() && frame < self.start_frame
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn get_age(&self) -> u64 {
        self.age
    }

    pub fn reset(&mut self) {
        self.envelope = None;
        self.oscillator.reset();
    }
}
