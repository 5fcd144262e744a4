use super::*;
use crate::classifier::{InputShape, MockFrameClassifier, WindowPrediction};
use crate::config::PipelineConfig;
use crate::errors::{ClassifierError, EncodingError, SceneCutError};
use crate::video::{Frame, VecFrameSource};
use crate::window::Window;
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

const SHAPE: InputShape = InputShape {
    window_length: 8,
    height: 3,
    width: 4,
    channels: 3,
};

/// Counts frames and writes their number instead of video
#[derive(Default)]
struct CountingEncoder {
    calls: AtomicUsize,
}

impl SegmentEncoder for CountingEncoder {
    fn encode(
        &self,
        frames: &mut dyn Iterator<Item = Frame>,
        _fps: f64,
        path: &Path,
    ) -> Result<usize, EncodingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let count = frames.count();
        std::fs::write(path, count.to_string()).map_err(|e| EncodingError::new(e.to_string()))?;
        Ok(count)
    }
}

fn config(batch_size: usize, inference_workers: usize) -> PipelineConfig {
    PipelineConfig {
        window_length: 8,
        stride: 4,
        batch_size,
        inference_workers,
        ..PipelineConfig::default()
    }
}

/// Frame `i` is fully red when it is a cut frame, black otherwise
fn source(count: usize, cuts: &[usize]) -> VecFrameSource {
    let images = (0..count)
        .map(|i| {
            let red = if cuts.contains(&i) { 255 } else { 0 };
            RgbImage::from_pixel(4, 3, Rgb([red, 0, 0]))
        })
        .collect();
    VecFrameSource::new(images, 25.0).unwrap()
}

fn red_scores(windows: &[Window]) -> Vec<WindowPrediction> {
    windows
        .iter()
        .map(|w| {
            WindowPrediction::new(
                w.frames
                    .iter()
                    .map(|f| f.pixels.get_pixel(0, 0)[0] as f32 / 255.0)
                    .collect(),
            )
        })
        .collect()
}

fn pixel_classifier() -> MockFrameClassifier {
    let mut classifier = MockFrameClassifier::new();
    classifier.expect_input_shape().return_const(SHAPE);
    classifier
        .expect_classify()
        .returning(|windows| Ok(red_scores(windows)));
    classifier
}

#[test]
fn test_batching_and_workers_do_not_change_probabilities() {
    let pipeline =
        SceneCutPipeline::new(pixel_classifier(), CountingEncoder::default(), config(1, 1))
            .unwrap();
    let baseline = pipeline.predict(&mut source(37, &[5, 20])).unwrap();
    assert_eq!(baseline.len(), 37);
    assert_eq!(baseline.single_frame[5], 1.0);
    assert_eq!(baseline.single_frame[20], 1.0);
    assert_eq!(baseline.single_frame.iter().filter(|&&p| p > 0.5).count(), 2);

    for (batch_size, workers) in [(3, 1), (2, 4), (16, 2)] {
        let pipeline = SceneCutPipeline::new(
            pixel_classifier(),
            CountingEncoder::default(),
            config(batch_size, workers),
        )
        .unwrap();
        let probabilities = pipeline.predict(&mut source(37, &[5, 20])).unwrap();
        assert_eq!(probabilities, baseline);
    }
}

#[test]
fn test_batches_are_sized_as_configured() {
    let mut classifier = MockFrameClassifier::new();
    classifier.expect_input_shape().return_const(SHAPE);
    classifier
        .expect_classify()
        .withf(|windows| windows.len() == 3)
        .times(3)
        .returning(|windows| Ok(red_scores(windows)));
    classifier
        .expect_classify()
        .withf(|windows| windows.len() == 1)
        .times(1)
        .returning(|windows| Ok(red_scores(windows)));

    // 40 frames at stride 4 make 10 windows: 3 + 3 + 3 + 1
    let pipeline =
        SceneCutPipeline::new(classifier, CountingEncoder::default(), config(3, 1)).unwrap();
    assert_eq!(pipeline.predict(&mut source(40, &[])).unwrap().len(), 40);
}

#[test]
fn test_scenes_follow_cut_frames() {
    let pipeline =
        SceneCutPipeline::new(pixel_classifier(), CountingEncoder::default(), config(2, 2))
            .unwrap();
    let scenes = pipeline.detect_scenes(&mut source(30, &[10, 11])).unwrap();
    assert_eq!(
        scenes,
        vec![SceneInterval::new(0, 10), SceneInterval::new(10, 30)]
    );
}

#[test]
fn test_malformed_output_writes_nothing() {
    let mut classifier = MockFrameClassifier::new();
    classifier.expect_input_shape().return_const(SHAPE);
    classifier
        .expect_classify()
        .returning(|windows| Ok(vec![WindowPrediction::new(vec![0.1; 7]); windows.len()]));
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let pipeline =
        SceneCutPipeline::new(classifier, CountingEncoder::default(), config(1, 2)).unwrap();
    let result = pipeline.run(&mut source(20, &[]), &mut source(20, &[]), &out);

    match result {
        Err(SceneCutError::Classifier(err)) => {
            assert!(err.window_index.is_some());
            assert!(err.message.contains("7 values"));
        }
        other => panic!("expected classifier error, got {:?}", other),
    }
    assert!(!out.exists());
    assert_eq!(pipeline.encoder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_classifier_failure_names_window() {
    let mut classifier = MockFrameClassifier::new();
    classifier.expect_input_shape().return_const(SHAPE);
    classifier.expect_classify().returning(|windows| {
        if windows[0].index == 2 {
            Err(ClassifierError::new("connection reset"))
        } else {
            Ok(red_scores(windows))
        }
    });

    let pipeline = SceneCutPipeline::new(classifier, CountingEncoder::default(), config(1, 1))
        .unwrap();
    let err = pipeline.predict(&mut source(20, &[])).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Classifier error: window 2: connection reset"
    );
}

#[test]
fn test_wrong_prediction_count_is_error() {
    let mut classifier = MockFrameClassifier::new();
    classifier.expect_input_shape().return_const(SHAPE);
    classifier
        .expect_classify()
        .returning(|_| Ok(Vec::new()));

    let pipeline = SceneCutPipeline::new(classifier, CountingEncoder::default(), config(2, 1))
        .unwrap();
    assert!(matches!(
        pipeline.predict(&mut source(20, &[])),
        Err(SceneCutError::Classifier(_))
    ));
}

#[test]
fn test_cancellation_discards_probabilities() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut classifier = MockFrameClassifier::new();
    classifier.expect_input_shape().return_const(SHAPE);
    classifier.expect_classify().returning(move |windows| {
        trigger.cancel();
        Ok(red_scores(windows))
    });

    let pipeline = SceneCutPipeline::new(classifier, CountingEncoder::default(), config(1, 1))
        .unwrap()
        .with_cancellation(cancel);
    assert!(matches!(
        pipeline.predict(&mut source(40, &[])),
        Err(SceneCutError::Cancelled)
    ));
}

#[test]
fn test_window_length_must_match_classifier() {
    let config = PipelineConfig {
        window_length: 100,
        stride: 50,
        ..PipelineConfig::default()
    };
    assert!(matches!(
        SceneCutPipeline::new(pixel_classifier(), CountingEncoder::default(), config),
        Err(SceneCutError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_frame_size_mismatch_is_classifier_error() {
    let images = vec![RgbImage::new(8, 8); 10];
    let mut wrong_size = VecFrameSource::new(images, 25.0).unwrap();
    let pipeline =
        SceneCutPipeline::new(pixel_classifier(), CountingEncoder::default(), config(1, 1))
            .unwrap();
    assert!(matches!(
        pipeline.predict(&mut wrong_size),
        Err(SceneCutError::Classifier(_))
    ));
}

#[test]
fn test_run_rejects_mismatched_sources() {
    let dir = tempdir().unwrap();
    let pipeline =
        SceneCutPipeline::new(pixel_classifier(), CountingEncoder::default(), config(1, 1))
            .unwrap();
    assert!(pipeline
        .run(&mut source(20, &[]), &mut source(19, &[]), dir.path())
        .is_err());
}
