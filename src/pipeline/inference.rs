use super::cancel::CancellationToken;
use crate::classifier::{FrameClassifier, WindowPrediction};
use crate::errors::{ClassifierError, ConfigError, SceneCutError, SceneCutResult};
use crate::stitch::{ProbabilitySequence, ProbabilityStitcher};
use crate::video::FrameSource;
use crate::window::{Window, WindowAssembler};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, info};
use std::thread;

/// Results flowing from the classifier workers back to the stitching thread
enum InferenceEvent {
    Predictions(Vec<(usize, WindowPrediction)>),
    Failed(SceneCutError),
}

/// Knobs for one inference run
#[derive(Debug, Clone, Copy)]
pub(crate) struct InferenceSettings {
    pub window_length: usize,
    pub stride: usize,
    pub batch_size: usize,
    pub workers: usize,
}

/// Window the source, classify batches on a worker pool and stitch the
/// results on the calling thread.
///
/// Any classifier or source error stops the pool and is returned; partial
/// probabilities are dropped.
pub(crate) fn run_inference<C, F>(
    classifier: &C,
    source: &mut F,
    settings: InferenceSettings,
    cancel: &CancellationToken,
) -> SceneCutResult<ProbabilitySequence>
where
    C: FrameClassifier + ?Sized,
    F: FrameSource + ?Sized,
{
    let shape = classifier.input_shape();
    if shape.window_length != settings.window_length {
        return Err(ConfigError::new(format!(
            "window_length is {} but the classifier takes {} frames",
            settings.window_length, shape.window_length
        ))
        .into());
    }

    let mut assembler = WindowAssembler::new(source, settings.window_length, settings.stride)?
        .with_frame_size(shape.width, shape.height);
    let plan = *assembler.plan();
    let mut stitcher = ProbabilityStitcher::new(plan);
    let workers = settings.workers.max(1);
    let batch_size = settings.batch_size.max(1);

    info!(
        "Running inference on {} frames: {} windows of {} (stride {}), batch {}, {} worker(s)",
        plan.frame_count,
        plan.window_count,
        plan.window_length,
        plan.stride,
        batch_size,
        workers
    );

    // Set on failure so queued batches are skipped instead of classified
    let stop = CancellationToken::new();

    thread::scope(|scope| -> SceneCutResult<()> {
        let (batch_tx, batch_rx) = bounded::<Vec<Window>>(workers);
        let (event_tx, event_rx) = unbounded::<InferenceEvent>();

        for n in 0..workers {
            let batch_rx = batch_rx.clone();
            let event_tx = event_tx.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name(format!("scenecut-inference-{}", n))
                .spawn_scoped(scope, move || {
                    classify_batches(classifier, &batch_rx, &event_tx, &stop, cancel)
                })?;
        }
        drop(batch_rx);
        drop(event_tx);

        let result = feed_and_stitch(
            &mut assembler,
            &mut stitcher,
            batch_size,
            &batch_tx,
            &event_rx,
            cancel,
        );
        if result.is_err() {
            stop.cancel();
        }
        drop(batch_tx);
        result?;

        for event in event_rx.iter() {
            if let Err(err) = apply(event, &mut stitcher, plan.frame_count) {
                stop.cancel();
                return Err(err);
            }
        }
        Ok(())
    })?;

    cancel.check()?;
    stitcher.finish()
}

fn classify_batches<C: FrameClassifier + ?Sized>(
    classifier: &C,
    batches: &Receiver<Vec<Window>>,
    events: &Sender<InferenceEvent>,
    stop: &CancellationToken,
    cancel: &CancellationToken,
) {
    for batch in batches {
        if stop.is_cancelled() {
            continue;
        }
        let event = if cancel.is_cancelled() {
            InferenceEvent::Failed(SceneCutError::Cancelled)
        } else {
            classify_batch(classifier, &batch)
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

fn classify_batch<C>(classifier: &C, batch: &[Window]) -> InferenceEvent
where
    C: FrameClassifier + ?Sized,
{
    let first = batch.first().map(|w| w.index).unwrap_or(0);
    debug!("Classifying windows {}..{}", first, first + batch.len());

    match classifier.classify(batch) {
        Ok(predictions) if predictions.len() == batch.len() => InferenceEvent::Predictions(
            batch.iter().map(|w| w.index).zip(predictions).collect(),
        ),
        Ok(predictions) => InferenceEvent::Failed(
            ClassifierError::new(format!(
                "classifier returned {} predictions for {} windows",
                predictions.len(),
                batch.len()
            ))
            .at_window(first)
            .into(),
        ),
        Err(err) => {
            let err = match err.window_index {
                Some(_) => err,
                None => err.at_window(first),
            };
            InferenceEvent::Failed(err.into())
        }
    }
}

/// Build windows into batches, hand them to the workers and stitch whatever
/// results are already back
fn feed_and_stitch<F: FrameSource + ?Sized>(
    assembler: &mut WindowAssembler<'_, F>,
    stitcher: &mut ProbabilityStitcher,
    batch_size: usize,
    batches: &Sender<Vec<Window>>,
    events: &Receiver<InferenceEvent>,
    cancel: &CancellationToken,
) -> SceneCutResult<()> {
    let frame_count = assembler.plan().frame_count;
    let mut batch = Vec::with_capacity(batch_size);

    loop {
        cancel.check()?;
        let window = assembler.next_window()?;
        let done = window.is_none();
        batch.extend(window);

        if batch.len() == batch_size || (done && !batch.is_empty()) {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            batches
                .send(full)
                .map_err(|_| ClassifierError::new("inference workers stopped"))?;
        }
        for event in events.try_iter() {
            apply(event, stitcher, frame_count)?;
        }
        if done {
            return Ok(());
        }
    }
}

fn apply(
    event: InferenceEvent,
    stitcher: &mut ProbabilityStitcher,
    frame_count: usize,
) -> SceneCutResult<()> {
    match event {
        InferenceEvent::Predictions(predictions) => {
            for (window, prediction) in predictions {
                stitcher.push(window, prediction)?;
            }
            info!(
                "Processed frames {}/{}",
                stitcher.stitched_frames(),
                frame_count
            );
            Ok(())
        }
        InferenceEvent::Failed(err) => Err(err),
    }
}
