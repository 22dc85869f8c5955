// DSP hygiene for the output callback
//
// Everything here runs inside the real-time callback: no allocation, no locks.

/// Values below this are treated as silence
const DENORMAL_THRESHOLD: f32 = 1e-15;

/// Flush denormals to zero
///
/// The tail of an exponential decay produces denormal floats, which are slow
/// on some CPUs.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD { 0.0 } else { x }
}

/// Soft clipping with tanh
///
/// Several overlapping clicks at high tempo can sum above 1.0; tanh keeps the
/// mix inside [-1, 1] and is nearly linear for the usual click levels.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// One-pole smoother for the master volume
///
/// y[n] = y[n-1] + a * (x[n] - y[n-1])
#[derive(Debug, Clone)]
pub struct OnePoleSmoother {
    current: f32,
    coefficient: f32,
}

impl OnePoleSmoother {
    /// `time_constant_ms` is the time to reach ~63% of a step change
    pub fn new(initial_value: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        let time_constant_samples = (time_constant_ms * 0.001 * sample_rate).max(1.0);

        Self {
            current: initial_value,
            coefficient: (1.0 / time_constant_samples).min(1.0),
        }
    }

    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.current += self.coefficient * (target - self.current);
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }
}
