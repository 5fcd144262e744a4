use serde::Serialize;

/// Fixed input the classifier was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputShape {
    /// Frames per window
    pub window_length: usize,
    pub height: u32,
    pub width: u32,
    pub channels: u32,
}

/// Classifier output for one window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPrediction {
    /// Per-frame cut probability, one entry per window position
    pub single_frame: Vec<f32>,
    /// Optional "all-frames" transition output
    pub many_hot: Option<Vec<f32>>,
}

impl WindowPrediction {
    pub fn new(single_frame: Vec<f32>) -> Self {
        Self {
            single_frame,
            many_hot: None,
        }
    }
}

/// Logistic function applied to raw model logits
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
