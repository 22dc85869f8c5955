// Click synthesizer - turns (time, pitch, sound) into a scheduled transient
//
// The synthesizer does no scheduling of its own: it trusts the caller's
// absolute time and hands a fully described click to the output, which plays
// it sample-accurately.

use super::envelope::ClickEnvelope;
use super::oscillator::WaveformType;
use super::sound::ClickSoundType;

/// One audio transient anchored at an absolute time on the playback clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledClick {
    /// Playback clock time (seconds) of the first sample
    pub start_time: f64,
    pub frequency: f32,
    pub waveform: WaveformType,
    pub envelope: ClickEnvelope,
    pub is_downbeat: bool,
}

impl ScheduledClick {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.envelope.duration() as f64
    }
}

/// Anything that accepts scheduled clicks (audio outputs, recorders)
pub trait ClickSink {
    fn schedule_click(&mut self, click: ScheduledClick);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClickSynthesizer;

impl ClickSynthesizer {
    /// Build the click for `sound_type` without sending it anywhere
    pub fn prepare(
        time: f64,
        frequency: f32,
        duration: f32,
        is_downbeat: bool,
        sound_type: ClickSoundType,
    ) -> ScheduledClick {
        let profile = sound_type.profile();

        ScheduledClick {
            start_time: time,
            frequency,
            waveform: profile.waveform,
            envelope: ClickEnvelope::new(profile.envelope(is_downbeat), duration),
            is_downbeat,
        }
    }

    /// Program one click at absolute `time` on `sink`
    pub fn render<S: ClickSink + ?Sized>(
        &self,
        sink: &mut S,
        time: f64,
        frequency: f32,
        duration: f32,
        is_downbeat: bool,
        sound_type: ClickSoundType,
    ) {
        let click = Self::prepare(time, frequency, duration, is_downbeat, sound_type);
        log::trace!(
            "click @ {:.4}s {} Hz ({}{})",
            time,
            frequency,
            sound_type,
            if is_downbeat { ", accent" } else { "" }
        );
        sink.schedule_click(click);
    }
}

impl ClickSink for Vec<ScheduledClick> {
    fn schedule_click(&mut self, click: ScheduledClick) {
        self.push(click);
    }
}
