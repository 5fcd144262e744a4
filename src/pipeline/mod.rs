//! End-to-end orchestration: frames, windows, classifier, stitched
//! probabilities, scene intervals and finally segment files.

mod cancel;
mod inference;
mod report;

pub use cancel::CancellationToken;
pub use report::{error_body, DetectionReport};

use crate::classifier::FrameClassifier;
use crate::config::PipelineConfig;
use crate::errors::{ConfigError, SceneCutResult};
use crate::scenes::{extract_scenes, SceneInterval};
use crate::segments::{MaterializeReport, SegmentMaterializer};
use crate::stitch::ProbabilitySequence;
use crate::video::{FrameScale, FrameSource, Mp4FrameSource, SegmentEncoder};
use inference::{run_inference, InferenceSettings};
use log::info;
use std::path::Path;

/// One parameterized scene-cut pipeline around a classifier and an encoder
pub struct SceneCutPipeline<C, E> {
    classifier: C,
    encoder: E,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl<C: FrameClassifier, E: SegmentEncoder> SceneCutPipeline<C, E> {
    /// Validates `config` and checks it against the classifier's input shape
    pub fn new(classifier: C, encoder: E, config: PipelineConfig) -> SceneCutResult<Self> {
        config.validate()?;
        let shape = classifier.input_shape();
        if shape.window_length != config.window_length {
            return Err(ConfigError::new(format!(
                "window_length is {} but the classifier takes {} frames",
                config.window_length, shape.window_length
            ))
            .into());
        }

        Ok(Self {
            classifier,
            encoder,
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops this pipeline from another thread
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Per-frame transition probabilities for a source at classifier resolution
    pub fn predict<F: FrameSource + ?Sized>(
        &self,
        source: &mut F,
    ) -> SceneCutResult<ProbabilitySequence> {
        let settings = InferenceSettings {
            window_length: self.config.window_length,
            stride: self.config.stride,
            batch_size: self.config.batch_size,
            workers: self.config.inference_workers,
        };
        run_inference(&self.classifier, source, settings, &self.cancel)
    }

    pub fn detect_scenes<F: FrameSource + ?Sized>(
        &self,
        source: &mut F,
    ) -> SceneCutResult<Vec<SceneInterval>> {
        let probabilities = self.predict(source)?;
        let scenes = extract_scenes(probabilities.as_slice(), self.config.threshold)?;
        info!(
            "Found {} scene(s) in {} frames",
            scenes.len(),
            probabilities.len()
        );
        Ok(scenes)
    }

    /// Write one file per interval, reading frames from a native-resolution source
    pub fn materialize<F: FrameSource + ?Sized>(
        &self,
        source: &mut F,
        intervals: &[SceneInterval],
        output_dir: &Path,
    ) -> SceneCutResult<MaterializeReport> {
        SegmentMaterializer::new(&self.encoder, self.config.segments.clone())
            .with_cancellation(self.cancel.clone())
            .materialize(source, intervals, output_dir)
    }

    /// Detect scenes on `analysis` and cut them from `native`.
    ///
    /// Both sources must describe the same video; nothing is written unless
    /// detection succeeds.
    pub fn run<A, N>(
        &self,
        analysis: &mut A,
        native: &mut N,
        output_dir: &Path,
    ) -> SceneCutResult<DetectionReport>
    where
        A: FrameSource + ?Sized,
        N: FrameSource + ?Sized,
    {
        if analysis.info().frame_count != native.info().frame_count {
            return Err(ConfigError::new(format!(
                "analysis source has {} frames but the native source has {}",
                analysis.info().frame_count,
                native.info().frame_count
            ))
            .into());
        }

        let scenes = self.detect_scenes(analysis)?;
        self.cancel.check()?;
        let materialized = self.materialize(native, &scenes, output_dir)?;
        Ok(DetectionReport::new(
            scenes,
            output_dir,
            native.info().fps,
            materialized,
        ))
    }

    /// Full run on an MP4/MOV file
    pub fn process_file(
        &self,
        video: &Path,
        output_dir: &Path,
    ) -> SceneCutResult<DetectionReport> {
        let shape = self.classifier.input_shape();
        let mut analysis = Mp4FrameSource::open(
            video,
            FrameScale::Fixed {
                width: shape.width,
                height: shape.height,
            },
        )?;
        let mut native = Mp4FrameSource::open(video, FrameScale::Native)?;
        self.run(&mut analysis, &mut native, output_dir)
    }
}

#[cfg(test)]
mod unit_test;
