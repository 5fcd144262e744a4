use crate::config::validate_threshold;
use crate::errors::{EmptySequenceError, SceneCutResult};
use crate::video::frame_time;
use serde::Serialize;

/// Half-open frame range `[start, end)` belonging to one shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SceneInterval {
    pub start: usize,
    pub end: usize,
}

impl SceneInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn start_time(&self, fps: f64) -> f64 {
        frame_time(self.start, fps)
    }

    pub fn end_time(&self, fps: f64) -> f64 {
        frame_time(self.end, fps)
    }
}

fn check_input(probabilities: &[f32], threshold: f32) -> SceneCutResult<()> {
    if probabilities.is_empty() {
        return Err(EmptySequenceError::new("boundary").into());
    }
    validate_threshold(threshold)?;
    Ok(())
}

/// Single hysteresis pass over the binarized sequence.
///
/// A fall (`1 -> 0`) at `i` opens a scene at `i`; a rise (`0 -> 1`) at
/// `i != 0` closes the open scene at `i`. Frames above the threshold belong to
/// no interval here, and a sequence that never drops below it yields nothing.
pub fn scan_scenes(probabilities: &[f32], threshold: f32) -> SceneCutResult<Vec<SceneInterval>> {
    check_input(probabilities, threshold)?;

    let mut scenes = Vec::new();
    let mut previous = false;
    let mut start = 0;

    for (i, &p) in probabilities.iter().enumerate() {
        let current = p > threshold;
        match (previous, current) {
            (true, false) => start = i,
            (false, true) if i != 0 => scenes.push(SceneInterval::new(start, i)),
            _ => {}
        }
        previous = current;
    }
    if !previous {
        scenes.push(SceneInterval::new(start, probabilities.len()));
    }
    Ok(scenes)
}

/// Scene intervals that tile `[0, N)`.
///
/// Runs [`scan_scenes`], then hands each run of transition frames to the
/// scene that follows it, stretches the last scene to the end, and falls back
/// to one scene spanning everything.
pub fn extract_scenes(
    probabilities: &[f32],
    threshold: f32,
) -> SceneCutResult<Vec<SceneInterval>> {
    let mut scenes = scan_scenes(probabilities, threshold)?;
    let total = probabilities.len();

    if scenes.is_empty() {
        return Ok(vec![SceneInterval::new(0, total)]);
    }

    let mut boundary = 0;
    for scene in scenes.iter_mut() {
        scene.start = boundary;
        boundary = scene.end;
    }
    if let Some(last) = scenes.last_mut() {
        last.end = total;
    }
    Ok(scenes)
}
