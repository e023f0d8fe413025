//! IT resonant low-pass filter
//!
//! The engine only computes coefficients (from cutoff, resonance and the
//! mix rate); a mixer runs [`ResonantFilter::process`] per frame.

/// Direct Form II transposed biquad
#[derive(Clone, Debug, PartialEq)]
pub struct ResonantFilter {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
    z1: f32,
    z2: f32,
    /// Filter is wide open and can be bypassed
    pub bypass: bool,
}

impl Default for ResonantFilter {
    fn default() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            bypass: true,
        }
    }
}

impl ResonantFilter {
    /// Cutoff frequency in Hz for an IT cutoff value (0-127)
    ///
    /// IT formula: freq = 110 * 2^(cutoff/24 + 0.25)
    pub fn cutoff_hz(cutoff: u8) -> f32 {
        110.0 * 2.0_f32.powf(cutoff.min(127) as f32 / 24.0 + 0.25)
    }

    /// Recalculate coefficients. A cutoff of 127 with no resonance bypasses
    /// the filter.
    pub fn update(&mut self, cutoff: u8, resonance: u8, mix_frequency: u32) {
        if cutoff >= 127 && resonance == 0 {
            self.bypass = true;
            return;
        }
        self.bypass = false;

        let sample_rate = mix_frequency.max(1) as f32;
        let freq = Self::cutoff_hz(cutoff).min(sample_rate / 2.0 - 1.0);

        let omega = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();

        // Resonance 0-127 scaled to 0-1 narrows the peak
        let q_denom = 1.0 + (resonance.min(127) as f32 / 127.0) * 10.0;
        let alpha = sin_omega / (2.0 * q_denom);

        let a0 = 1.0 + alpha;
        self.b0 = (1.0 - cos_omega) / 2.0 / a0;
        self.b1 = (1.0 - cos_omega) / a0;
        self.b2 = (1.0 - cos_omega) / 2.0 / a0;
        self.a1 = -2.0 * cos_omega / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    /// Filter one sample
    pub fn process(&mut self, input: f32) -> f32 {
        if self.bypass {
            return input;
        }
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    pub fn clear_history(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_filter_bypasses() {
        let mut f = ResonantFilter::default();
        f.update(127, 0, 44100);
        assert!(f.bypass);
        assert_eq!(f.process(0.5), 0.5);
    }

    #[test]
    fn test_low_cutoff_attenuates_alternating_signal() {
        let mut f = ResonantFilter::default();
        f.update(20, 0, 44100);
        assert!(!f.bypass);
        let mut peak = 0.0f32;
        for i in 0..512 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let y = f.process(x);
            if i > 256 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.05, "nyquist leaked through: {peak}");
    }

    #[test]
    fn test_cutoff_hz_is_monotonic() {
        assert!(ResonantFilter::cutoff_hz(0) < ResonantFilter::cutoff_hz(64));
        assert!(ResonantFilter::cutoff_hz(64) < ResonantFilter::cutoff_hz(127));
    }
}
