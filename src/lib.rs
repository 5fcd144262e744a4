pub mod errors;
pub use errors::{
    ClassifierError, ConfigError, DecodeError, EmptySequenceError, EncodingError, SceneCutError,
    SceneCutResult,
};

pub mod config;
pub use config::{ClassifierConfig, DeviceConfig, PipelineConfig, SegmentConfig};

pub mod avc;
pub mod mp4;

pub mod video;
pub use video::{
    Frame, FrameScale, FrameSource, H264Mp4Encoder, Mp4FrameSource, SegmentEncoder,
    VecFrameSource, VideoInfo,
};

pub mod window;
pub use window::{Window, WindowAssembler, WindowPlan};

pub mod classifier;
pub use classifier::{FrameClassifier, FrameTensor, HttpClassifier, InputShape, WindowPrediction};

pub mod stitch;
pub use stitch::{ProbabilitySequence, ProbabilityStitcher};

pub mod scenes;
pub use scenes::{extract_scenes, scan_scenes, SceneInterval};

pub mod segments;
pub use segments::{segment_file_name, MaterializeReport, Segment, SegmentFailure, SegmentMaterializer};

pub mod pipeline;
pub use pipeline::{error_body, CancellationToken, DetectionReport, SceneCutPipeline};

/// Detect scenes in an MP4/MOV file with a remote classifier and write one
/// H.264 MP4 per scene into `output_dir`.
pub fn split_video<P, Q>(
    video: P,
    output_dir: Q,
    config: PipelineConfig,
) -> SceneCutResult<DetectionReport>
where
    P: AsRef<std::path::Path>,
    Q: AsRef<std::path::Path>,
{
    let classifier = HttpClassifier::new(config.classifier.clone(), config.window_length)?;
    let pipeline = SceneCutPipeline::new(classifier, H264Mp4Encoder::new(), config)?;
    pipeline.process_file(video.as_ref(), output_dir.as_ref())
}
