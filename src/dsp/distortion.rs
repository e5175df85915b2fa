//! Table Waveshaping
//!
//! The overdrive stage shapes its input through a lookup table, the same
//! model a browser `WaveShaperNode` uses:
//!
//!   output = curve(input)
//!
//! The table spans the input range [-1, 1]. An input `x` maps to the
//! fractional index
//!
//!   v = (n - 1) / 2 × (x + 1)
//!
//! and the output is read by linear interpolation between the two
//! neighbouring points. Inputs beyond ±1 return the first or last point, so
//! the shaper saturates instead of extrapolating.
//!
//! # Default Curve
//!
//! 1024 points of cos(φ) for φ swept over [π, 2π]:
//!
//!   φ = π      → cos = -1
//!   φ = 1.5π   → cos =  0
//!   φ = 2π     → cos = +1
//!
//! Over [-1, 1] this is sin(x × π/2): linear around zero, flattening as it
//! reaches the rails. Quiet material passes almost cleanly. Driving the
//! input harder pushes it into the soft knee.
//!
//! # Drive
//!
//! The pre-gain in front of the table sets how hard the table is hit:
//!
//!   1.0   = nearly clean
//!   2-4   = warm saturation
//!   10-25 = squashed, close to a square wave

use std::f32::consts::PI;

pub const DEFAULT_CURVE_LEN: usize = 1024;

/// The soft-knee cosine curve used when no curve is given.
pub fn default_curve() -> Vec<f32> {
    cosine_curve(DEFAULT_CURVE_LEN)
}

pub fn cosine_curve(len: usize) -> Vec<f32> {
    let len = len.max(2);
    let last = (len - 1) as f32;
    (0..len)
        .map(|i| (PI + PI * i as f32 / last).cos())
        .collect()
}

#[derive(Debug, Clone)]
pub struct Waveshaper {
    curve: Vec<f32>,
}

impl Waveshaper {
    pub fn new(curve: Vec<f32>) -> Self {
        Self { curve }
    }

    /// Build a table by sampling `f` over [-1, 1].
    pub fn from_fn(len: usize, f: impl Fn(f32) -> f32) -> Self {
        let len = len.max(2);
        let last = (len - 1) as f32;
        Self::new((0..len).map(|i| f(2.0 * i as f32 / last - 1.0)).collect())
    }

    pub fn curve(&self) -> &[f32] {
        &self.curve
    }

    #[inline]
    pub fn shape(&self, x: f32) -> f32 {
        let n = self.curve.len();
        match n {
            0 => return x, // no curve: pass through
            1 => return self.curve[0],
            _ => {}
        }

        let v = (n - 1) as f32 * 0.5 * (x + 1.0);
        if v <= 0.0 {
            return self.curve[0];
        }
        if v >= (n - 1) as f32 {
            return self.curve[n - 1];
        }

        let index = v.floor();
        let frac = v - index;
        let i = index as usize;
        self.curve[i] + (self.curve[i + 1] - self.curve[i]) * frac
    }

    pub fn process(&self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.shape(*sample);
        }
    }
}

impl Default for Waveshaper {
    fn default() -> Self {
        Self::new(default_curve())
    }
}
