// Configuration for the scene-cut pipeline

use crate::errors::{ConfigError, SceneCutResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames per classifier window
    pub window_length: usize,

    /// Core-region size; consecutive windows overlap by `window_length - stride`
    pub stride: usize,

    /// Cut sensitivity: probabilities strictly above this count as "in transition"
    pub threshold: f32,

    /// Windows sent to the classifier per call
    pub batch_size: usize,

    /// Parallel classifier calls
    pub inference_workers: usize,

    pub classifier: ClassifierConfig,

    pub segments: SegmentConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_length: 100,
            stride: 50,
            threshold: 0.5,
            batch_size: 1,
            inference_workers: 1,
            classifier: ClassifierConfig::default(),
            segments: SegmentConfig::default(),
        }
    }
}

/// How to reach the classifier and what it expects as input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Base URL of the model server
    pub endpoint: String,

    pub model_name: String,

    /// Frame width the model was trained on
    pub input_width: u32,

    /// Frame height the model was trained on
    pub input_height: u32,

    /// Name of the per-frame transition output
    pub single_frame_output: String,

    /// Name of the optional many-hot output
    pub many_hot_output: Option<String>,

    /// Apply the logistic function to raw model outputs
    pub apply_sigmoid: bool,

    pub timeout_secs: u64,

    pub device: DeviceConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8501".to_string(),
            model_name: "transnetv2".to_string(),
            input_width: 48,
            input_height: 27,
            single_frame_output: "output_1".to_string(),
            many_hot_output: Some("output_2".to_string()),
            apply_sigmoid: true,
            timeout_secs: 60,
            device: DeviceConfig::default(),
        }
    }
}

/// Accelerator settings handed to the classifier once, at construction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// GPU ordinal; `None` runs on CPU
    pub gpu_index: Option<u32>,

    /// Grow device memory on demand instead of reserving it up front
    pub memory_growth: bool,

    /// Upper bound for device memory in megabytes
    pub memory_limit_mb: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            gpu_index: Some(0),
            memory_growth: true,
            memory_limit_mb: Some(4096),
        }
    }
}

/// Output file settings for segment materialization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentConfig {
    /// File-name prefix; callers usually set this to the input video's stem
    pub prefix: String,

    /// Embed `start-end` frame indices in file names
    pub include_frame_range: bool,

    /// Abort remaining intervals on the first encoding failure
    pub fail_fast: bool,

    /// Parallel segment encoders
    pub encode_workers: usize,

    /// Attach a base64 JPEG of each segment's first frame
    pub previews: bool,

    pub preview_max_width: u32,

    pub preview_max_height: u32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            prefix: "scene".to_string(),
            include_frame_range: false,
            fail_fast: false,
            encode_workers: 2,
            previews: false,
            preview_max_width: 320,
            preview_max_height: 180,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(text: &str) -> SceneCutResult<Self> {
        let config: PipelineConfig = toml::from_str(text)
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> SceneCutResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Check every knob once, before any frame is touched
    pub fn validate(&self) -> SceneCutResult<()> {
        validate_window(self.window_length, self.stride)?;
        validate_threshold(self.threshold)?;
        if self.batch_size == 0 {
            return Err(ConfigError::new("batch_size must be at least 1").into());
        }
        if self.inference_workers == 0 {
            return Err(ConfigError::new("inference_workers must be at least 1").into());
        }
        if self.segments.encode_workers == 0 {
            return Err(ConfigError::new("segments.encode_workers must be at least 1").into());
        }
        if self.classifier.input_width == 0 || self.classifier.input_height == 0 {
            return Err(ConfigError::new(format!(
                "classifier input size must be non-zero, got {}x{}",
                self.classifier.input_width, self.classifier.input_height
            ))
            .into());
        }
        if self.segments.prefix.is_empty()
            || self.segments.prefix.contains(['/', '\\'])
        {
            return Err(ConfigError::new(format!(
                "segments.prefix must be a plain file-name prefix, got {:?}",
                self.segments.prefix
            ))
            .into());
        }
        Ok(())
    }
}

/// Window length and stride rules shared with the window builder
pub(crate) fn validate_window(window_length: usize, stride: usize) -> Result<(), ConfigError> {
    if window_length == 0 {
        return Err(ConfigError::new("window_length must be positive"));
    }
    if stride == 0 {
        return Err(ConfigError::new("stride must be positive"));
    }
    if stride > window_length {
        return Err(ConfigError::new(format!(
            "stride ({}) must not exceed window_length ({})",
            stride, window_length
        )));
    }
    Ok(())
}

pub(crate) fn validate_threshold(threshold: f32) -> Result<(), ConfigError> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigError::new(format!(
            "threshold must lie in [0, 1], got {}",
            threshold
        )));
    }
    Ok(())
}
