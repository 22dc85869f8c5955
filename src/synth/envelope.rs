// Click envelope - amplitude shape of a single click
//
// Unlike a note envelope, a click has a fixed duration known up front, so the
// whole curve is a pure function of the time elapsed since the click started:
//
//   gain
//    amp |  /\
//        | /  \___
//  amp*s |/       \______
//        |               \
//      0 +---+---+-------+-\---> t
//          A   D    hold   R  (ends at `duration`)

/// Exponential ramps cannot reach zero; decay targets are floored here
/// (relative to full scale)
pub const EXPONENTIAL_FLOOR: f32 = 1e-4;

/// Envelope parameters for one click variant (times in seconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    /// Peak gain reached at the end of the attack
    pub amplitude: f32,
    pub attack: f32,
    pub decay: f32,
    /// Held level as a fraction of `amplitude` (0.0 to 1.0)
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeParams {
    pub const fn new(amplitude: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            amplitude,
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Level held between the decay and the release
    pub fn sustain_level(&self) -> f32 {
        self.amplitude * self.sustain.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopePhase {
    /// Before the click starts
    Pending,
    Attack,
    Decay,
    Sustain,
    Release,
    /// After `duration`
    Finished,
}

/// Envelope anchored at the start of a click of known duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEnvelope {
    params: EnvelopeParams,
    duration: f32,
}

impl ClickEnvelope {
    pub fn new(params: EnvelopeParams, duration: f32) -> Self {
        Self {
            params,
            duration: duration.max(0.0),
        }
    }

    pub fn params(&self) -> &EnvelopeParams {
        &self.params
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Time at which the linear release begins
    fn release_start(&self) -> f32 {
        (self.duration - self.params.release).max(0.0)
    }

    /// Which segment of the curve `t` seconds after the start falls in
    pub fn phase_at(&self, t: f32) -> EnvelopePhase {
        let attack_end = self.params.attack;
        let decay_end = attack_end + self.params.decay;

        if t < 0.0 {
            EnvelopePhase::Pending
        } else if t >= self.duration {
            EnvelopePhase::Finished
        } else if t >= self.release_start() {
            EnvelopePhase::Release
        } else if t < attack_end {
            EnvelopePhase::Attack
        } else if t < decay_end {
            EnvelopePhase::Decay
        } else {
            EnvelopePhase::Sustain
        }
    }

    /// Gain `t` seconds after the click start
    pub fn gain_at(&self, t: f32) -> f32 {
        match self.phase_at(t) {
            EnvelopePhase::Pending | EnvelopePhase::Finished => 0.0,
            EnvelopePhase::Release => {
                let release_start = self.release_start();
                let release_len = self.duration - release_start;
                if release_len <= 0.0 {
                    return 0.0;
                }
                let start_level = self.shape_before_release(release_start);
                start_level * (self.duration - t) / release_len
            }
            _ => self.shape_before_release(t),
        }
    }

    /// Attack / decay / hold curve, ignoring the release
    fn shape_before_release(&self, t: f32) -> f32 {
        let p = &self.params;

        if t < p.attack {
            // Linear 0 -> amplitude
            return p.amplitude * (t / p.attack);
        }

        let decay_t = t - p.attack;
        if decay_t < p.decay {
            // Exponential amplitude -> max(sustain level, floor)
            let start = p.amplitude.max(EXPONENTIAL_FLOOR);
            let target = p.sustain_level().max(EXPONENTIAL_FLOOR);
            let progress = decay_t / p.decay;
            return start * (target / start).powf(progress);
        }

        p.sustain_level()
    }
}
