use crate::config::validate_window;
use crate::errors::{EmptySequenceError, SceneCutResult};
use std::ops::Range;

/// Index arithmetic for slicing `frame_count` frames into padded windows.
///
/// The padded sequence is `pad_start` copies of frame 0, the real frames, then
/// `pad_end` copies of the last frame. Window `i` is the padded slice
/// `[i * stride, i * stride + window_length)`, and its core is the inner
/// `stride` positions starting at `pad_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub frame_count: usize,
    pub window_length: usize,
    pub stride: usize,
    pub pad_start: usize,
    pub pad_end: usize,
    pub window_count: usize,
}

impl WindowPlan {
    pub fn new(frame_count: usize, window_length: usize, stride: usize) -> SceneCutResult<Self> {
        validate_window(window_length, stride)?;
        if frame_count == 0 {
            return Err(EmptySequenceError::new("window").into());
        }

        let pad_start = (window_length - stride) / 2;
        let remainder = match frame_count % stride {
            0 => stride,
            r => r,
        };
        let pad_end = (window_length - stride - pad_start) + (stride - remainder);

        Ok(Self {
            frame_count,
            window_length,
            stride,
            pad_start,
            pad_end,
            window_count: frame_count.div_ceil(stride),
        })
    }

    /// Real frame feeding position `position` of window `window`
    pub fn source_index(&self, window: usize, position: usize) -> usize {
        (window * self.stride + position)
            .saturating_sub(self.pad_start)
            .min(self.frame_count - 1)
    }

    /// Positions inside window `window` whose outputs are kept
    pub fn core_positions(&self, window: usize) -> Range<usize> {
        self.pad_start..self.pad_start + self.core_frames(window).len()
    }

    /// Real frames covered by the core of window `window`, clipped to the sequence
    pub fn core_frames(&self, window: usize) -> Range<usize> {
        let start = (window * self.stride).min(self.frame_count);
        let end = (start + self.stride).min(self.frame_count);
        start..end
    }

    /// Real frames window `window` reads, padding excluded
    pub fn span(&self, window: usize) -> Range<usize> {
        let first = self.source_index(window, 0);
        let last = self.source_index(window, self.window_length - 1);
        first..last + 1
    }
}
