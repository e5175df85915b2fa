//! Gain primitives and decibel conversion.

/*
Gain and Decibels
=================

Every level control in the signal chain is a multiplication:

    output[i] = input[i] × gain[i]

The gain is a per-sample buffer rather than a constant so that automation
(ramps, smoothed targets) is applied at audio rate. A constant gain is just
a buffer filled with one value.

Volume controls are expressed in decibels because hearing is logarithmic:

    dB     = 20 × log₁₀(amplitude)
    linear = 10^(dB / 20)

    ×1.0    =   0 dB   (unity)
    ×0.5    ≈  -6 dB
    ×0.1    = -20 dB
    ×0.0001 = -80 dB   (the bottom of the bus volume range)
    ×4.0    ≈ +12 dB   (the top of the bus volume range)

Zero amplitude is -∞ dB. `linear_to_db` floors at `MIN_DB` so the value
stays finite and round-trips through `db_to_linear` to (almost) silence.
*/

/// Floor returned by [`linear_to_db`] for silent or negative amplitudes.
pub const MIN_DB: f32 = -200.0;

#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return MIN_DB;
    }
    (20.0 * linear.log10()).max(MIN_DB)
}

/// Multiply a signal by a per-sample gain buffer, in place.
#[inline]
pub fn multiply_in_place(signal: &mut [f32], gain: &[f32]) {
    debug_assert_eq!(signal.len(), gain.len());

    for (s, &g) in signal.iter_mut().zip(gain.iter()) {
        *s *= g;
    }
}

/// Sum `source` into `out`.
#[inline]
pub fn accumulate(out: &mut [f32], source: &[f32]) {
    debug_assert_eq!(out.len(), source.len());

    for (o, &s) in out.iter_mut().zip(source.iter()) {
        *o += s;
    }
}
