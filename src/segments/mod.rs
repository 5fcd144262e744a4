//! Segment Materializer: one output file per scene interval.

mod materializer;
mod naming;
mod types;

#[cfg(test)]
mod unit_test;

pub use materializer::SegmentMaterializer;
pub use naming::segment_file_name;
pub use types::{MaterializeReport, Segment, SegmentFailure};
