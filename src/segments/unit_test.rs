use super::*;
use crate::config::SegmentConfig;
use crate::errors::{DecodeError, EncodingError, SceneCutError};
use crate::pipeline::CancellationToken;
use crate::scenes::SceneInterval;
use crate::video::{Frame, MockFrameSource, SegmentEncoder, VecFrameSource, VideoInfo};
use image::{Rgb, RgbImage};
use regex::Regex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn source(count: usize) -> VecFrameSource {
    let images = (0..count)
        .map(|i| RgbImage::from_pixel(8, 6, Rgb([i as u8, 0, 0])))
        .collect();
    VecFrameSource::new(images, 25.0).unwrap()
}

/// Source that yields `count` frames but fails to decode frame `bad`
fn corrupt_source(count: usize, bad: usize) -> MockFrameSource {
    let mut source = MockFrameSource::new();
    source.expect_info().return_const(VideoInfo {
        frame_count: count,
        fps: 25.0,
        width: 8,
        height: 6,
        duration_secs: count as f64 / 25.0,
    });
    let mut next = 0;
    source.expect_next_frame().returning(move || {
        let index = next;
        next += 1;
        if index == bad {
            return Err(DecodeError::new(format!("corrupt sample {}", index)).into());
        }
        Ok((index < count).then(|| Frame::new(index, 25.0, RgbImage::new(8, 6))))
    });
    source
}

/// Collects a segment's frames and hands them to a closure
struct FnEncoder<F>(F);

impl<F> SegmentEncoder for FnEncoder<F>
where
    F: Fn(&[Frame], &Path) -> Result<(), EncodingError> + Send + Sync,
{
    fn encode(
        &self,
        frames: &mut dyn Iterator<Item = Frame>,
        _fps: f64,
        path: &Path,
    ) -> Result<usize, EncodingError> {
        let frames: Vec<Frame> = frames.collect();
        (self.0)(&frames, path)?;
        Ok(frames.len())
    }
}

/// Writes the first pixel of every frame, one byte per frame
fn write_red_bytes(frames: &[Frame], path: &Path) -> Result<(), EncodingError> {
    let bytes: Vec<u8> = frames.iter().map(|f| f.pixels.get_pixel(0, 0)[0]).collect();
    std::fs::write(path, bytes).map_err(|e| EncodingError::new(e.to_string()))
}

fn recording_encoder() -> FnEncoder<fn(&[Frame], &Path) -> Result<(), EncodingError>> {
    FnEncoder(write_red_bytes)
}

fn unused_encoder() -> FnEncoder<fn(&[Frame], &Path) -> Result<(), EncodingError>> {
    FnEncoder(|_, _| panic!("encoder must not be called"))
}

fn config(prefix: &str) -> SegmentConfig {
    SegmentConfig {
        prefix: prefix.to_string(),
        ..SegmentConfig::default()
    }
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_each_interval_gets_its_own_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("scenes");
    let encoder = recording_encoder();
    let intervals = [SceneInterval::new(0, 60), SceneInterval::new(60, 150)];

    let report = SegmentMaterializer::new(&encoder, config("clip"))
        .materialize(&mut source(150), &intervals, &out)
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.segments.len(), 2);
    assert_eq!(report.total_frames(), 150);

    let second = &report.segments[1];
    assert_eq!((second.start, second.end, second.frame_count), (60, 150, 90));
    assert_eq!(second.start_time, 2.4);
    assert_eq!(second.end_time, 6.0);
    assert_eq!(second.path, out.join("clip_0001.mp4"));

    let written = std::fs::read(&second.path).unwrap();
    assert_eq!(written.len(), 90);
    assert_eq!(written[0], 60);
    assert_eq!(written[89], 149);
}

#[test]
fn test_frame_range_names() {
    let dir = tempdir().unwrap();
    let encoder = recording_encoder();
    let intervals = [
        SceneInterval::new(0, 3),
        SceneInterval::new(3, 7),
        SceneInterval::new(7, 10),
    ];
    let config = SegmentConfig {
        include_frame_range: true,
        encode_workers: 3,
        ..config("movie")
    };

    let report = SegmentMaterializer::new(&encoder, config)
        .materialize(&mut source(10), &intervals, dir.path())
        .unwrap();

    let pattern = Regex::new(r"^movie_\d{4}_\d{6}-\d{6}\.mp4$").unwrap();
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| pattern.is_match(n)));
    assert_eq!(names[1], "movie_0001_000003-000007.mp4");

    let indices: Vec<usize> = report.segments.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_bad_intervals_are_reported_and_others_continue() {
    let dir = tempdir().unwrap();
    let encoder = recording_encoder();
    let intervals = [
        SceneInterval::new(0, 4),
        SceneInterval::new(4, 4),
        SceneInterval::new(4, 8),
        SceneInterval::new(8, 12),
        SceneInterval::new(12, 14),
    ];

    let report = SegmentMaterializer::new(&encoder, config("scene"))
        .materialize(&mut source(10), &intervals, dir.path())
        .unwrap();

    let written: Vec<usize> = report.segments.iter().map(|s| s.index).collect();
    assert_eq!(written, vec![0, 2]);

    let failed: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 3, 4]);
    assert!(report.failures[0].message.contains("zero-length"));
    assert!(report.failures[1].message.contains("interval 3"));
    assert!(report.failures[1].message.contains("after 10 frames"));
    assert!(!dir.path().join("scene_0003.mp4").exists());
}

#[test]
fn test_corrupt_frame_fails_only_remaining_intervals() {
    let dir = tempdir().unwrap();
    let encoder = recording_encoder();
    let intervals = [
        SceneInterval::new(0, 10),
        SceneInterval::new(10, 20),
        SceneInterval::new(20, 40),
    ];

    let report = SegmentMaterializer::new(&encoder, config("scene"))
        .materialize(&mut corrupt_source(40, 15), &intervals, dir.path())
        .unwrap();

    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.segments[0].frame_count, 10);
    let failed: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 2]);
    assert!(report.failures[0].message.contains("corrupt sample 15"));
    assert!(report.failures[0].message.contains("inside [10, 20)"));
    assert!(report.failures[1].message.contains("before [20, 40)"));

    // The half-written second segment is removed
    assert_eq!(files_in(dir.path()), 1);
    assert!(dir.path().join("scene_0000.mp4").exists());
}

#[test]
fn test_corrupt_frame_with_fail_fast_aborts() {
    let dir = tempdir().unwrap();
    let encoder = recording_encoder();
    let intervals = [SceneInterval::new(0, 10), SceneInterval::new(10, 20)];
    let config = SegmentConfig {
        fail_fast: true,
        ..config("scene")
    };

    let result = SegmentMaterializer::new(&encoder, config).materialize(
        &mut corrupt_source(20, 15),
        &intervals,
        dir.path(),
    );
    match result {
        Err(SceneCutError::Encoding(err)) => {
            assert_eq!(err.interval_index, Some(1));
            assert!(err.message.contains("corrupt sample 15"));
        }
        other => panic!("expected encoding error, got {:?}", other),
    }
}

/// Records how far the source had been read when the first frame arrived
struct ReadPositionEncoder {
    read: Arc<AtomicUsize>,
    read_at_first_frame: AtomicUsize,
}

impl SegmentEncoder for ReadPositionEncoder {
    fn encode(
        &self,
        frames: &mut dyn Iterator<Item = Frame>,
        _fps: f64,
        path: &Path,
    ) -> Result<usize, EncodingError> {
        let mut count = 0;
        for _ in frames {
            if count == 0 {
                self.read_at_first_frame
                    .store(self.read.load(Ordering::SeqCst), Ordering::SeqCst);
            }
            count += 1;
        }
        std::fs::write(path, count.to_string()).map_err(|e| EncodingError::new(e.to_string()))?;
        Ok(count)
    }
}

#[test]
fn test_frames_stream_to_the_encoder() {
    let dir = tempdir().unwrap();
    let read = Arc::new(AtomicUsize::new(0));
    let counter = read.clone();

    let mut source = MockFrameSource::new();
    source.expect_info().return_const(VideoInfo {
        frame_count: 400,
        fps: 25.0,
        width: 8,
        height: 6,
        duration_secs: 16.0,
    });
    source.expect_next_frame().returning(move || {
        let index = counter.fetch_add(1, Ordering::SeqCst);
        Ok((index < 400).then(|| Frame::new(index, 25.0, RgbImage::new(8, 6))))
    });

    let encoder = ReadPositionEncoder {
        read: read.clone(),
        read_at_first_frame: AtomicUsize::new(usize::MAX),
    };
    let report = SegmentMaterializer::new(&encoder, config("long"))
        .materialize(&mut source, &[SceneInterval::new(0, 400)], dir.path())
        .unwrap();

    assert_eq!(report.segments[0].frame_count, 400);
    // Only a small buffer may sit between reading and encoding
    assert!(encoder.read_at_first_frame.load(Ordering::SeqCst) < 64);
}

#[test]
fn test_encoder_failure_is_collected() {
    let dir = tempdir().unwrap();
    let encoder = FnEncoder(|frames: &[Frame], path: &Path| -> Result<(), EncodingError> {
        if frames[0].index == 5 {
            return Err(EncodingError::new("codec refused frame"));
        }
        std::fs::write(path, b"ok").map_err(|e| EncodingError::new(e.to_string()))
    });
    let intervals = [SceneInterval::new(0, 5), SceneInterval::new(5, 10)];

    let report = SegmentMaterializer::new(&encoder, config("scene"))
        .materialize(&mut source(10), &intervals, dir.path())
        .unwrap();
    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(
        report.failures[0].message,
        "interval 1: codec refused frame"
    );
}

#[test]
fn test_fail_fast_aborts() {
    let dir = tempdir().unwrap();
    let encoder = FnEncoder(|_: &[Frame], _: &Path| -> Result<(), EncodingError> {
        Err(EncodingError::new("disk full"))
    });
    let intervals = [SceneInterval::new(0, 5), SceneInterval::new(5, 10)];
    let config = SegmentConfig {
        fail_fast: true,
        encode_workers: 1,
        ..config("scene")
    };

    let result = SegmentMaterializer::new(&encoder, config).materialize(
        &mut source(10),
        &intervals,
        dir.path(),
    );
    match result {
        Err(SceneCutError::Encoding(err)) => assert_eq!(err.interval_index, Some(0)),
        other => panic!("expected encoding error, got {:?}", other),
    }
}

#[test]
fn test_cancelled_before_start_writes_nothing() {
    let dir = tempdir().unwrap();
    let encoder = unused_encoder();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = SegmentMaterializer::new(&encoder, config("scene"))
        .with_cancellation(cancel)
        .materialize(&mut source(10), &[SceneInterval::new(0, 10)], dir.path());
    assert!(matches!(result, Err(SceneCutError::Cancelled)));
    assert_eq!(files_in(dir.path()), 0);
}

#[test]
fn test_overlapping_intervals_rejected() {
    let dir = tempdir().unwrap();
    let encoder = unused_encoder();
    let result = SegmentMaterializer::new(&encoder, config("scene")).materialize(
        &mut source(10),
        &[SceneInterval::new(0, 6), SceneInterval::new(5, 10)],
        dir.path(),
    );
    assert!(matches!(
        result,
        Err(SceneCutError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_previews_attached_when_enabled() {
    let dir = tempdir().unwrap();
    let encoder = recording_encoder();
    let config = SegmentConfig {
        previews: true,
        preview_max_width: 4,
        preview_max_height: 4,
        ..config("scene")
    };

    let report = SegmentMaterializer::new(&encoder, config)
        .materialize(&mut source(4), &[SceneInterval::new(0, 4)], dir.path())
        .unwrap();
    let preview = report.segments[0].preview.as_deref().unwrap();
    assert!(preview.starts_with("data:image/jpeg;base64,"));
}
