// Voice Manager - fixed pool of click voices for the output callback

use super::click::ScheduledClick;
use super::voice::ClickVoice;

/// At 300 BPM sixteenths a click starts every 50ms; 100ms of look-ahead plus
/// the click tails never needs more than a handful of voices
pub const MAX_VOICES: usize = 16;

pub struct VoiceManager {
    voices: [ClickVoice; MAX_VOICES],
    sample_rate: f32,
    /// Incremented on each scheduled click for voice stealing priority
    age_counter: u64,
}

impl VoiceManager {
    pub fn new(sample_rate: f32) -> Self {
        // Pre-allocate all voices
        let voices = std::array::from_fn(|_| ClickVoice::new(sample_rate));

        Self {
            voices,
            sample_rate,
            age_counter: 0,
        }
    }

    /// Frame on which a click starting at `time` seconds must begin
    pub fn start_frame_for(&self, time: f64) -> u64 {
        if time <= 0.0 {
            return 0;
        }
        (time * self.sample_rate as f64).ceil() as u64
    }

    /// Arm a voice for `click`; `current_frame` is the next frame to render
    ///
    /// Clicks whose start already passed begin on `current_frame`.
    pub fn schedule(&mut self, click: &ScheduledClick, current_frame: u64) {
        self.age_counter = self.age_counter.wrapping_add(1);
        let start_frame = self.start_frame_for(click.start_time).max(current_frame);

        if let Some(voice) = self.voices.iter_mut().find(|v| !v.is_active()) {
            voice.trigger(click, start_frame, self.age_counter);
            return;
        }

        let victim = self.find_voice_to_steal(current_frame);
        self.voices[victim].trigger(click, start_frame, self.age_counter);
    }

    /// Prefer the oldest sounding voice; a pending voice is only stolen when
    /// every voice is pending
    fn find_voice_to_steal(&self, current_frame: u64) -> usize {
        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, voice)| (voice.is_pending(current_frame), voice.get_age()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Mix of every voice at absolute frame `frame`
    pub fn next_sample(&mut self, frame: u64) -> f32 {
        self.voices.iter_mut().map(|v| v.render_frame(frame)).sum()
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
    }
}
