use crate::video::Frame;
use std::ops::Range;

/// A fixed-length, edge-padded block of frames fed to the classifier
#[derive(Debug, Clone)]
pub struct Window {
    pub index: usize,
    /// Exactly `window_length` frames; edge windows repeat the first or last real frame
    pub frames: Vec<Frame>,
    /// Positions inside `frames` whose predictions are kept
    pub core: Range<usize>,
    /// Real frame index of `frames[core.start]`
    pub core_start_frame: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Real frame indices covered by the core region
    pub fn core_frames(&self) -> Range<usize> {
        self.core_start_frame..self.core_start_frame + self.core.len()
    }
}
