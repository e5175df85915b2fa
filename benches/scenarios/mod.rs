//! Real-world scenario benchmarks.
//!
//! These render what a thing renders live: overlapping grains, and the
//! full player chains behind them.

mod chains;
mod granular;

pub use chains::bench_chains;
pub use granular::bench_granular;
