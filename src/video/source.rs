use super::types::{Frame, VideoInfo};
use crate::errors::{DecodeError, SceneCutResult};
use image::RgbImage;
use std::collections::VecDeque;

/// Finite, pull-based sequence of decoded frames.
///
/// Frames come out in index order, all at `info()` resolution. Restarting a
/// source means opening a new one.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSource {
    fn info(&self) -> &VideoInfo;

    /// The next frame, or `None` once `info().frame_count` frames were produced
    fn next_frame(&mut self) -> SceneCutResult<Option<Frame>>;
}

/// Frames already held in memory
pub struct VecFrameSource {
    info: VideoInfo,
    frames: VecDeque<Frame>,
}

impl VecFrameSource {
    /// Build a source from images that all share one size
    pub fn new(images: Vec<RgbImage>, fps: f64) -> SceneCutResult<Self> {
        let (width, height) = images
            .first()
            .map(|img| img.dimensions())
            .unwrap_or((0, 0));
        if let Some(pos) = images.iter().position(|img| img.dimensions() != (width, height)) {
            return Err(DecodeError::new(format!(
                "frame {} is {}x{}, expected {}x{}",
                pos,
                images[pos].width(),
                images[pos].height(),
                width,
                height
            ))
            .into());
        }

        let frame_count = images.len();
        let frames = images
            .into_iter()
            .enumerate()
            .map(|(i, img)| Frame::new(i, fps, img))
            .collect();

        Ok(Self {
            info: VideoInfo {
                frame_count,
                fps,
                width,
                height,
                duration_secs: super::types::frame_time(frame_count, fps),
            },
            frames,
        })
    }
}

impl FrameSource for VecFrameSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> SceneCutResult<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}
