use image::RgbImage;
use serde::Serialize;
use std::sync::Arc;

/// One decoded picture. Pixels are shared, so windows that repeat an edge
/// frame hold the same buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    /// Presentation time in seconds (`index / fps`)
    pub timestamp: f64,
    pub pixels: Arc<RgbImage>,
}

impl Frame {
    pub fn new(index: usize, fps: f64, pixels: RgbImage) -> Self {
        Self {
            index,
            timestamp: frame_time(index, fps),
            pixels: Arc::new(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Stream properties known before the first frame is read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub frame_count: usize,
    pub fps: f64,
    /// Size of the frames this source yields
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

/// Seconds at which frame `index` starts; zero for a non-positive rate.
pub fn frame_time(index: usize, fps: f64) -> f64 {
    if fps > 0.0 {
        index as f64 / fps
    } else {
        0.0
    }
}
