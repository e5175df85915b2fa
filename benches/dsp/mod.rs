//! Benchmarks for low-level DSP primitives.

mod amplify;
mod automation;
mod delay;
mod distortion;
mod filter;

pub use amplify::bench_amplify;
pub use automation::bench_automation;
pub use delay::bench_delay;
pub use distortion::bench_distortion;
pub use filter::bench_filter;
