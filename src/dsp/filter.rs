use std::f32::consts::{FRAC_1_SQRT_2, PI};

/*
Tone Filter
===========

The feedback delay darkens every repeat with a low-pass in its loop, the
way tape and bucket-brigade echoes lose their highs. This is a
topology-preserving-transform state-variable filter (Zavalishin's TPT SVF):

    g  = tan(π × cutoff / sample_rate)
    k  = 1 / Q
    h  = 1 / (1 + g × (g + k))

    v3 = x - ic2eq
    v1 = h × (ic1eq + g × v3)         band-pass
    v2 = ic2eq + g × v1               low-pass

    ic1eq = 2 × v1 - ic1eq
    ic2eq = 2 × v2 - ic2eq

With Q = 1/√2 (Butterworth) the low-pass response has no resonant peak,
so its gain never exceeds 1. That is what keeps a feedback loop with a
feedback gain ≤ 1 stable.

The cutoff can change every sample. `g` is only recomputed when it does,
which makes a static cutoff as cheap as a fixed filter.

The cutoff is clamped to [MIN_CUTOFF_HZ, 0.49 × sample_rate]: tan() blows up
at Nyquist.
*/

pub const MIN_CUTOFF_HZ: f32 = 10.0;

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    k: f32,
    g: f32,
    // inputs of the cached `g`
    cached_cutoff: f32,
    cached_sample_rate: f32,
}

impl SVFilter {
    /// Butterworth low-pass.
    pub fn lowpass() -> Self {
        Self::with_q(FRAC_1_SQRT_2)
    }

    pub fn with_q(q: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            k: 1.0 / q.max(0.01),
            g: 0.0,
            cached_cutoff: f32::NAN,
            cached_sample_rate: f32::NAN,
        }
    }

    #[inline]
    fn update_coefficient(&mut self, cutoff_hz: f32, sample_rate: f32) {
        if cutoff_hz == self.cached_cutoff && sample_rate == self.cached_sample_rate {
            return;
        }
        let nyquist_guard = 0.49 * sample_rate;
        let cutoff = cutoff_hz.clamp(MIN_CUTOFF_HZ, nyquist_guard.max(MIN_CUTOFF_HZ));
        self.g = (PI * cutoff / sample_rate).tan();
        self.cached_cutoff = cutoff_hz;
        self.cached_sample_rate = sample_rate;
    }

    /// Filter one sample with the cutoff in effect for that sample.
    #[inline]
    pub fn process(&mut self, sample: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        self.update_coefficient(cutoff_hz, sample_rate);

        let g = self.g;
        let h = 1.0 / (1.0 + g * (g + self.k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn sine_peak_through(filter: &mut SVFilter, freq: f32, cutoff: f32) -> f32 {
        let mut peak = 0.0f32;
        for i in 0..4_800 {
            let x = (TAU * freq * i as f32 / SAMPLE_RATE).sin();
            let y = filter.process(x, cutoff, SAMPLE_RATE);
            // skip the transient
            if i > 960 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn passes_dc() {
        let mut filter = SVFilter::lowpass();
        let mut last = 0.0;
        for _ in 0..512 {
            last = filter.process(1.0, 500.0, SAMPLE_RATE);
        }
        assert!(last > 0.99);
    }

    #[test]
    fn attenuates_above_cutoff() {
        let mut filter = SVFilter::lowpass();
        let peak = sine_peak_through(&mut filter, 8_000.0, 500.0);
        assert!(peak < 0.05, "expected attenuation, got {peak}");
    }

    #[test]
    fn butterworth_never_boosts() {
        for freq in [100.0, 1_000.0, 2_000.0, 4_000.0] {
            let mut filter = SVFilter::lowpass();
            let peak = sine_peak_through(&mut filter, freq, 2_000.0);
            assert!(peak <= 1.001, "gain above unity at {freq} Hz: {peak}");
        }
    }

    #[test]
    fn cutoff_at_nyquist_stays_finite() {
        let mut filter = SVFilter::lowpass();
        for _ in 0..64 {
            assert!(filter.process(1.0, 30_000.0, SAMPLE_RATE).is_finite());
        }
    }
}
