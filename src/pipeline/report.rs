use crate::errors::{EncodingError, SceneCutError, SceneCutResult};
use crate::scenes::SceneInterval;
use crate::segments::{MaterializeReport, Segment, SegmentFailure};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// JSON body describing a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
    pub status: String,
    pub scenes: Vec<SceneInterval>,
    pub output_dir: PathBuf,
    pub frame_count: usize,
    pub fps: f64,
    pub segments: Vec<Segment>,
    pub failures: Vec<SegmentFailure>,
}

impl DetectionReport {
    pub fn new(
        scenes: Vec<SceneInterval>,
        output_dir: &Path,
        fps: f64,
        materialized: MaterializeReport,
    ) -> Self {
        Self {
            status: "success".to_string(),
            frame_count: scenes.last().map(|s| s.end).unwrap_or(0),
            scenes,
            output_dir: output_dir.to_path_buf(),
            fps,
            segments: materialized.segments,
            failures: materialized.failures,
        }
    }

    pub fn to_json(&self) -> SceneCutResult<String> {
        serde_json::to_string_pretty(self).map_err(serialization_error)
    }
}

fn serialization_error(err: serde_json::Error) -> SceneCutError {
    EncodingError::new(format!("report serialization failed: {}", err)).into()
}

/// `{"error": "<stage>: <message>"}`
pub fn error_body(err: &SceneCutError) -> Value {
    json!({ "error": format!("{}: {}", err.stage(), err) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClassifierError;

    #[test]
    fn test_report_shape() {
        let scenes = vec![SceneInterval::new(0, 60), SceneInterval::new(60, 150)];
        let report = DetectionReport::new(
            scenes,
            Path::new("/tmp/out"),
            25.0,
            MaterializeReport::default(),
        );
        let value: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(value["scenes"][1], json!({"start": 60, "end": 150}));
        assert_eq!(value["output_dir"], "/tmp/out");
        assert_eq!(value["frame_count"], 150);
        assert_eq!(value["failures"], json!([]));
    }

    #[test]
    fn test_error_body_names_stage() {
        let err: SceneCutError = ClassifierError::new("expected 100 scores, got 99")
            .at_window(2)
            .into();
        assert_eq!(
            error_body(&err),
            json!({"error": "inference: Classifier error: window 2: expected 100 scores, got 99"})
        );
    }

    #[test]
    fn test_serialization_failure_is_not_io() {
        let json_err = serde_json::from_str::<Value>("{").unwrap_err();
        let err = serialization_error(json_err);
        assert!(matches!(err, SceneCutError::Encoding(_)));
        assert_eq!(err.stage(), "encode");

        let body = error_body(&err);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("encode: Encoding error: report serialization failed"));
    }
}
