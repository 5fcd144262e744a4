use super::plan::WindowPlan;
use super::types::Window;
use crate::errors::{ClassifierError, DecodeError, SceneCutResult};
use crate::video::{Frame, FrameSource};
use log::debug;
use std::collections::VecDeque;

/// Pulls frames from a [`FrameSource`] on demand and yields windows in order.
///
/// Only frames that a later window still reads are buffered, never more than
/// `window_length` of them.
pub struct WindowAssembler<'a, F: FrameSource + ?Sized> {
    source: &'a mut F,
    plan: WindowPlan,
    buffer: VecDeque<Frame>,
    /// Real index of `buffer[0]`
    buffer_start: usize,
    next_window: usize,
    frame_size: Option<(u32, u32)>,
    failed: bool,
}

impl<'a, F: FrameSource + ?Sized> WindowAssembler<'a, F> {
    pub fn new(source: &'a mut F, window_length: usize, stride: usize) -> SceneCutResult<Self> {
        let plan = WindowPlan::new(source.info().frame_count, window_length, stride)?;
        Ok(Self {
            source,
            plan,
            buffer: VecDeque::with_capacity(window_length),
            buffer_start: 0,
            next_window: 0,
            frame_size: None,
            failed: false,
        })
    }

    /// Require every frame to be `width` x `height`
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    pub fn plan(&self) -> &WindowPlan {
        &self.plan
    }

    /// Frames currently held for upcoming windows
    pub fn buffered_frames(&self) -> usize {
        self.buffer.len()
    }

    /// Frames pulled from the source so far
    pub fn frames_read(&self) -> usize {
        self.buffer_start + self.buffer.len()
    }

    pub fn next_window(&mut self) -> SceneCutResult<Option<Window>> {
        let index = self.next_window;
        if index >= self.plan.window_count {
            return Ok(None);
        }

        let span = self.plan.span(index);
        while self.frames_read() < span.end {
            self.pull_frame()?;
        }
        while self.buffer_start < span.start {
            self.buffer.pop_front();
            self.buffer_start += 1;
        }

        let frames = (0..self.plan.window_length)
            .map(|pos| self.buffer[self.plan.source_index(index, pos) - self.buffer_start].clone())
            .collect();
        let core_frames = self.plan.core_frames(index);

        self.next_window += 1;
        debug!(
            "Window {}/{} covers frames {:?}, core {:?}",
            index + 1,
            self.plan.window_count,
            span,
            core_frames
        );

        Ok(Some(Window {
            index,
            frames,
            core: self.plan.core_positions(index),
            core_start_frame: core_frames.start,
        }))
    }

    fn pull_frame(&mut self) -> SceneCutResult<()> {
        let expected = self.frames_read();
        let frame = self.source.next_frame()?.ok_or_else(|| {
            DecodeError::new(format!(
                "frame source ended after {} of {} frames",
                expected, self.plan.frame_count
            ))
        })?;

        if frame.index != expected {
            return Err(DecodeError::new(format!(
                "frame source yielded frame {} where {} was expected",
                frame.index, expected
            ))
            .into());
        }
        if let Some((width, height)) = self.frame_size {
            if (frame.width(), frame.height()) != (width, height) {
                return Err(ClassifierError::new(format!(
                    "frame {} is {}x{} but the classifier expects {}x{}",
                    frame.index,
                    frame.width(),
                    frame.height(),
                    width,
                    height
                ))
                .into());
            }
        }

        self.buffer.push_back(frame);
        Ok(())
    }
}

impl<F: FrameSource + ?Sized> Iterator for WindowAssembler<'_, F> {
    type Item = SceneCutResult<Window>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_window() {
            Ok(window) => window.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
