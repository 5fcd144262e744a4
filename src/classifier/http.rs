use super::tensor::FrameTensor;
use super::types::{sigmoid, InputShape, WindowPrediction};
use super::FrameClassifier;
use crate::config::ClassifierConfig;
use crate::errors::{ClassifierError, SceneCutResult};
use crate::window::Window;
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Classifier served over the TensorFlow Serving REST predict API
pub struct HttpClassifier {
    client: Client,
    config: ClassifierConfig,
    shape: InputShape,
    predict_url: String,
    status_url: String,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: super::tensor::Nested<'a>,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Value>,
}

impl HttpClassifier {
    pub fn new(config: ClassifierConfig, window_length: usize) -> SceneCutResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifierError::new(format!("Failed to build HTTP client: {}", e)))?;

        let base = config.endpoint.trim_end_matches('/');
        let status_url = format!("{}/v1/models/{}", base, config.model_name);
        let predict_url = format!("{}:predict", status_url);

        let device = &config.device;
        info!(
            "Classifier {} at {} (device: {}, memory growth {}, limit {})",
            config.model_name,
            base,
            device
                .gpu_index
                .map(|i| format!("gpu:{}", i))
                .unwrap_or_else(|| "cpu".to_string()),
            device.memory_growth,
            device
                .memory_limit_mb
                .map(|mb| format!("{} MB", mb))
                .unwrap_or_else(|| "none".to_string()),
        );

        let shape = InputShape {
            window_length,
            height: config.input_height,
            width: config.input_width,
            channels: 3,
        };

        Ok(Self {
            client,
            config,
            shape,
            predict_url,
            status_url,
        })
    }

    /// Readiness probe against the model status endpoint
    pub fn check_ready(&self) -> Result<(), ClassifierError> {
        let response = self
            .client
            .get(&self.status_url)
            .send()
            .map_err(|e| ClassifierError::new(format!("Model server unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(ClassifierError::new(format!(
                "Model {} is not available: HTTP {}",
                self.config.model_name,
                response.status()
            )));
        }
        Ok(())
    }

    fn parse_prediction(
        &self,
        value: &Value,
        window: usize,
    ) -> Result<WindowPrediction, ClassifierError> {
        let (single, many_hot) = match value {
            Value::Object(outputs) => {
                let single = outputs.get(&self.config.single_frame_output).ok_or_else(|| {
                    ClassifierError::new(format!(
                        "prediction has no '{}' output",
                        self.config.single_frame_output
                    ))
                    .at_window(window)
                })?;
                let many_hot = self
                    .config
                    .many_hot_output
                    .as_ref()
                    .and_then(|name| outputs.get(name));
                (single, many_hot)
            }
            Value::Array(_) => (value, None),
            other => {
                return Err(ClassifierError::new(format!(
                    "unexpected prediction type: {}",
                    other
                ))
                .at_window(window))
            }
        };

        let single_frame = self.scores(single, window)?;
        let many_hot = many_hot.map(|v| self.scores(v, window)).transpose()?;
        Ok(WindowPrediction {
            single_frame,
            many_hot,
        })
    }

    /// Accepts `[p, ...]` and `[[p], ...]`
    fn scores(&self, value: &Value, window: usize) -> Result<Vec<f32>, ClassifierError> {
        let malformed = |what: String| ClassifierError::new(what).at_window(window);

        let items = value
            .as_array()
            .ok_or_else(|| malformed(format!("scores are not an array: {}", value)))?;

        let mut scores = items
            .iter()
            .map(|item| match item {
                Value::Array(inner) if inner.len() == 1 => inner[0].as_f64(),
                other => other.as_f64(),
            })
            .map(|score| score.map(|s| s as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| malformed("scores contain a non-numeric entry".to_string()))?;

        if scores.len() != self.shape.window_length {
            return Err(malformed(format!(
                "expected {} scores, got {}",
                self.shape.window_length,
                scores.len()
            )));
        }
        if self.config.apply_sigmoid {
            scores.iter_mut().for_each(|s| *s = sigmoid(*s));
        }
        Ok(scores)
    }
}

impl FrameClassifier for HttpClassifier {
    fn input_shape(&self) -> InputShape {
        self.shape
    }

    fn classify(&self, windows: &[Window]) -> Result<Vec<WindowPrediction>, ClassifierError> {
        let tensor = FrameTensor::from_windows(windows, self.shape)?;
        let first = windows.first().map(|w| w.index).unwrap_or(0);

        let body = serde_json::to_vec(&PredictRequest {
            instances: tensor.instances(),
        })
        .map_err(|e| ClassifierError::new(format!("Failed to serialize request: {}", e)))?;

        debug!(
            "POST {} with {} window(s) from window {} ({} bytes)",
            self.predict_url,
            tensor.batch_size(),
            first,
            body.len()
        );

        let response = self
            .client
            .post(&self.predict_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| {
                ClassifierError::new(format!("Predict request failed: {}", e)).at_window(first)
            })?;

        let status = response.status();
        let text = response.text().map_err(|e| {
            ClassifierError::new(format!("Failed to read response: {}", e)).at_window(first)
        })?;
        if !status.is_success() {
            return Err(
                ClassifierError::new(format!("HTTP {}: {}", status, text.trim())).at_window(first),
            );
        }

        let parsed: PredictResponse = serde_json::from_str(&text).map_err(|e| {
            ClassifierError::new(format!("Malformed predict response: {}", e)).at_window(first)
        })?;

        if parsed.predictions.len() != windows.len() {
            return Err(ClassifierError::new(format!(
                "expected {} predictions, got {}",
                windows.len(),
                parsed.predictions.len()
            ))
            .at_window(first));
        }

        parsed
            .predictions
            .iter()
            .zip(windows)
            .map(|(value, window)| self.parse_prediction(value, window.index))
            .collect()
    }
}
