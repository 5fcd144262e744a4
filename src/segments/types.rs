use serde::Serialize;
use std::path::PathBuf;

/// One scene written to its own file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub frame_count: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub path: PathBuf,
    /// JPEG data URL of the first frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// An interval that could not be written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentFailure {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub message: String,
}

/// Outcome of materializing every interval, both lists ordered by index
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterializeReport {
    pub segments: Vec<Segment>,
    pub failures: Vec<SegmentFailure>,
}

impl MaterializeReport {
    pub fn total_frames(&self) -> usize {
        self.segments.iter().map(|s| s.frame_count).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
