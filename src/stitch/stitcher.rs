use crate::classifier::WindowPrediction;
use crate::errors::{ClassifierError, EmptySequenceError, SceneCutResult};
use crate::window::WindowPlan;
use log::debug;
use std::collections::BTreeMap;

/// Dense per-frame transition probabilities, index `i` is real frame `i`
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilitySequence {
    pub single_frame: Vec<f32>,
    /// Present only when every window carried the many-hot output
    pub many_hot: Option<Vec<f32>>,
}

impl ProbabilitySequence {
    pub fn new(single_frame: Vec<f32>) -> Self {
        Self {
            single_frame,
            many_hot: None,
        }
    }

    pub fn len(&self) -> usize {
        self.single_frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.single_frame.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.single_frame
    }
}

/// Appends the core slice of each window's prediction, in window order.
///
/// Predictions may arrive in any order; early ones wait in `pending` until
/// every window before them has been appended.
pub struct ProbabilityStitcher {
    plan: WindowPlan,
    next_window: usize,
    pending: BTreeMap<usize, WindowPrediction>,
    single_frame: Vec<f32>,
    many_hot: Option<Vec<f32>>,
}

impl ProbabilityStitcher {
    pub fn new(plan: WindowPlan) -> Self {
        Self {
            plan,
            next_window: 0,
            pending: BTreeMap::new(),
            single_frame: Vec::with_capacity(plan.frame_count),
            many_hot: Some(Vec::with_capacity(plan.frame_count)),
        }
    }

    /// Windows appended so far
    pub fn stitched_windows(&self) -> usize {
        self.next_window
    }

    pub fn stitched_frames(&self) -> usize {
        self.single_frame.len()
    }

    pub fn push(
        &mut self,
        window: usize,
        prediction: WindowPrediction,
    ) -> Result<(), ClassifierError> {
        if window >= self.plan.window_count {
            return Err(ClassifierError::new(format!(
                "prediction for unknown window (plan has {} windows)",
                self.plan.window_count
            ))
            .at_window(window));
        }
        if window < self.next_window || self.pending.contains_key(&window) {
            return Err(ClassifierError::new("duplicate prediction").at_window(window));
        }

        self.check(window, "single-frame", &prediction.single_frame)?;
        if let Some(many_hot) = &prediction.many_hot {
            self.check(window, "many-hot", many_hot)?;
        }

        self.pending.insert(window, prediction);
        while let Some(prediction) = self.pending.remove(&self.next_window) {
            self.append(prediction);
        }
        Ok(())
    }

    fn check(&self, window: usize, output: &str, values: &[f32]) -> Result<(), ClassifierError> {
        if values.len() != self.plan.window_length {
            return Err(ClassifierError::new(format!(
                "{} output has {} values, expected {}",
                output,
                values.len(),
                self.plan.window_length
            ))
            .at_window(window));
        }
        if let Some(pos) = values
            .iter()
            .position(|v| !v.is_finite() || !(0.0..=1.0).contains(v))
        {
            return Err(ClassifierError::new(format!(
                "{} output at position {} is {}, expected a probability",
                output, pos, values[pos]
            ))
            .at_window(window));
        }
        Ok(())
    }

    fn append(&mut self, prediction: WindowPrediction) {
        let core = self.plan.core_positions(self.next_window);
        self.single_frame
            .extend_from_slice(&prediction.single_frame[core.clone()]);

        self.many_hot = match (self.many_hot.take(), prediction.many_hot) {
            (Some(mut acc), Some(values)) => {
                acc.extend_from_slice(&values[core]);
                Some(acc)
            }
            _ => None,
        };

        debug!(
            "Stitched window {}, {}/{} frames",
            self.next_window,
            self.single_frame.len(),
            self.plan.frame_count
        );
        self.next_window += 1;
    }

    /// The complete sequence; fails if any window is still missing
    pub fn finish(self) -> SceneCutResult<ProbabilitySequence> {
        if self.next_window < self.plan.window_count {
            return Err(ClassifierError::new(format!(
                "no prediction received ({} of {} windows stitched)",
                self.next_window, self.plan.window_count
            ))
            .at_window(self.next_window)
            .into());
        }
        if self.single_frame.is_empty() {
            return Err(EmptySequenceError::new("stitch").into());
        }

        Ok(ProbabilitySequence {
            single_frame: self.single_frame,
            many_hot: self.many_hot,
        })
    }
}
