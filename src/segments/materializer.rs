use super::naming::segment_file_name;
use super::types::{MaterializeReport, Segment, SegmentFailure};
use crate::config::SegmentConfig;
use crate::errors::{ConfigError, EncodingError, SceneCutError, SceneCutResult};
use crate::pipeline::CancellationToken;
use crate::scenes::SceneInterval;
use crate::video::{preview_data_url, Frame, FrameSource, SegmentEncoder};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::thread;

/// Frames buffered between the reading thread and one encoder worker
const FRAME_BUFFER: usize = 16;

/// What the reading thread feeds a worker: frames in order, or the reason the
/// interval cannot be completed
type FrameFeed = Result<Frame, EncodingError>;

/// One interval handed to an encoder worker; its frames arrive on `feed`
struct EncodeJob {
    index: usize,
    interval: SceneInterval,
    path: PathBuf,
    feed: Receiver<FrameFeed>,
}

struct JobOutcome {
    index: usize,
    interval: SceneInterval,
    result: Result<Segment, EncodingError>,
}

/// Writes each scene interval to its own file through a [`SegmentEncoder`].
///
/// The calling thread decodes frames sequentially and streams each interval
/// to one of `encode_workers` threads, so at most a few frames per worker are
/// held in memory.
pub struct SegmentMaterializer<'a, E: SegmentEncoder + ?Sized> {
    encoder: &'a E,
    config: SegmentConfig,
    cancel: CancellationToken,
}

impl<'a, E: SegmentEncoder + ?Sized> SegmentMaterializer<'a, E> {
    pub fn new(encoder: &'a E, config: SegmentConfig) -> Self {
        Self {
            encoder,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Encode every interval from `source` into `output_dir`.
    ///
    /// Intervals must be ordered and non-overlapping. Per-interval failures,
    /// including a source that breaks or ends early, are collected in the
    /// report unless `fail_fast` is set, in which case the first one aborts
    /// the run.
    pub fn materialize<F: FrameSource + ?Sized>(
        &self,
        source: &mut F,
        intervals: &[SceneInterval],
        output_dir: &Path,
    ) -> SceneCutResult<MaterializeReport> {
        check_order(intervals)?;
        std::fs::create_dir_all(output_dir)?;

        let fps = source.info().fps;
        let workers = self.config.encode_workers.max(1);
        info!(
            "Materializing {} scene(s) into {} with {} encoder(s)",
            intervals.len(),
            output_dir.display(),
            workers
        );

        let mut outcomes = Vec::with_capacity(intervals.len());
        let dispatched = thread::scope(|scope| -> SceneCutResult<()> {
            // Rendezvous: a job is only handed over once a worker is free
            let (job_tx, job_rx) = bounded::<EncodeJob>(0);
            let (done_tx, done_rx) = unbounded::<JobOutcome>();

            for n in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                thread::Builder::new()
                    .name(format!("scenecut-encoder-{}", n))
                    .spawn_scoped(scope, move || {
                        for job in job_rx {
                            if done_tx.send(self.run_job(job, fps)).is_err() {
                                break;
                            }
                        }
                    })?;
            }
            drop(job_rx);
            drop(done_tx);

            let result = self.dispatch(
                source,
                intervals,
                output_dir,
                &job_tx,
                &done_rx,
                &mut outcomes,
            );
            drop(job_tx);
            // Workers finish whatever they already hold
            outcomes.extend(done_rx.iter());
            result
        });

        outcomes.sort_by_key(|o| o.index);
        dispatched?;
        if self.config.fail_fast {
            if let Some(err) = outcomes.iter().find_map(|o| o.result.as_ref().err()) {
                return Err(err.clone().into());
            }
        }

        let mut report = MaterializeReport::default();
        for outcome in outcomes {
            match outcome.result {
                Ok(segment) => report.segments.push(segment),
                Err(err) => {
                    warn!("Scene {} not written: {}", outcome.index, err.message);
                    report.failures.push(SegmentFailure {
                        index: outcome.index,
                        start: outcome.interval.start,
                        end: outcome.interval.end,
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            "Wrote {} segment(s), {} failure(s)",
            report.segments.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Read frames interval by interval and stream them to the workers
    fn dispatch<F: FrameSource + ?Sized>(
        &self,
        source: &mut F,
        intervals: &[SceneInterval],
        output_dir: &Path,
        jobs: &Sender<EncodeJob>,
        done: &Receiver<JobOutcome>,
        outcomes: &mut Vec<JobOutcome>,
    ) -> SceneCutResult<()> {
        let mut position = 0usize;
        // Set once the source ends or fails; later intervals cannot be read
        let mut broken: Option<String> = None;

        for (index, &interval) in intervals.iter().enumerate() {
            self.cancel.check()?;
            outcomes.extend(done.try_iter());
            if self.config.fail_fast && outcomes.iter().any(|o| o.result.is_err()) {
                return Ok(());
            }

            let failed = |message: String| JobOutcome {
                index,
                interval,
                result: Err(EncodingError::new(message).at_interval(index)),
            };

            if interval.is_empty() {
                outcomes.push(failed(format!(
                    "zero-length interval [{}, {})",
                    interval.start, interval.end
                )));
                continue;
            }
            if let Some(reason) = &broken {
                outcomes.push(failed(format!(
                    "{}, before [{}, {})",
                    reason, interval.start, interval.end
                )));
                continue;
            }

            let name = segment_file_name(
                &self.config.prefix,
                index,
                interval,
                self.config.include_frame_range,
            );
            let (feed_tx, feed_rx) = bounded::<FrameFeed>(FRAME_BUFFER);
            let job = EncodeJob {
                index,
                interval,
                path: output_dir.join(&name),
                feed: feed_rx,
            };
            debug!(
                "Streaming scene {} ({} frames) as {}",
                index,
                interval.len(),
                name
            );
            if jobs.send(job).is_err() {
                return Err(EncodingError::new("encoder workers stopped")
                    .at_interval(index)
                    .into());
            }

            while position < interval.end {
                let reason = match source.next_frame() {
                    Ok(Some(frame)) => {
                        position += 1;
                        if frame.index >= interval.start {
                            // Fails only once the worker is gone
                            let _ = feed_tx.send(Ok(frame));
                        }
                        continue;
                    }
                    Ok(None) => format!("source ended after {} frames", position),
                    Err(err) => format!("source failed after {} frames: {}", position, err),
                };
                let _ = feed_tx.send(Err(EncodingError::new(format!(
                    "{}, inside [{}, {})",
                    reason, interval.start, interval.end
                ))));
                broken = Some(reason);
                break;
            }
        }
        Ok(())
    }

    fn run_job(&self, job: EncodeJob, fps: f64) -> JobOutcome {
        let result = self.encode_job(&job, fps);
        if result.is_err() && job.path.exists() {
            let _ = std::fs::remove_file(&job.path);
        }
        JobOutcome {
            index: job.index,
            interval: job.interval,
            result: result.map_err(|err| EncodingError {
                interval_index: Some(job.index),
                ..err
            }),
        }
    }

    fn encode_job(&self, job: &EncodeJob, fps: f64) -> Result<Segment, EncodingError> {
        let mut first: Option<Frame> = None;
        let mut interrupted: Option<EncodingError> = None;
        let mut received = 0usize;

        let encoded = {
            let mut frames = job.feed.iter().map_while(|item| match item {
                Ok(frame) => {
                    received += 1;
                    if first.is_none() {
                        first = Some(frame.clone());
                    }
                    Some(frame)
                }
                Err(err) => {
                    interrupted = Some(err);
                    None
                }
            });
            let encoded = self.encoder.encode(&mut frames, fps, &job.path);
            // Drain what the encoder left so the reading thread never blocks
            frames.for_each(drop);
            encoded
        };

        if let Some(err) = interrupted {
            return Err(err);
        }
        let frame_count = encoded?;
        if received != job.interval.len() {
            return Err(EncodingError::new(format!(
                "expected {} frames for [{}, {}), received {}",
                job.interval.len(),
                job.interval.start,
                job.interval.end,
                received
            )));
        }

        let preview = match (self.config.previews, &first) {
            (true, Some(first)) => Some(preview_data_url(
                &first.pixels,
                self.config.preview_max_width,
                self.config.preview_max_height,
            )?),
            _ => None,
        };

        debug!("Scene {} written to {}", job.index, job.path.display());
        Ok(Segment {
            index: job.index,
            start: job.interval.start,
            end: job.interval.end,
            frame_count,
            start_time: job.interval.start_time(fps),
            end_time: job.interval.end_time(fps),
            path: job.path.clone(),
            preview,
        })
    }
}

fn check_order(intervals: &[SceneInterval]) -> Result<(), SceneCutError> {
    for (i, pair) in intervals.windows(2).enumerate() {
        if pair[1].start < pair[0].end.max(pair[0].start) {
            return Err(ConfigError::new(format!(
                "scene intervals must be ordered and non-overlapping: [{}, {}) then [{}, {}) at {}",
                pair[0].start,
                pair[0].end,
                pair[1].start,
                pair[1].end,
                i + 1
            ))
            .into());
        }
    }
    Ok(())
}
