//! Probability Stitcher: one gap-free, duplicate-free probability per frame.

mod stitcher;

#[cfg(test)]
mod unit_test;

pub use stitcher::{ProbabilitySequence, ProbabilityStitcher};
