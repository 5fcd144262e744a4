//! Classifier Adapter: the boundary to the black-box frame classifier.

pub mod http;
pub mod tensor;
mod types;

pub use http::HttpClassifier;
pub use tensor::FrameTensor;
pub use types::{sigmoid, InputShape, WindowPrediction};

use crate::errors::ClassifierError;
use crate::window::Window;

/// Maps windows of frames to per-frame transition probabilities.
///
/// `classify` returns one prediction per input window, in input order, each
/// with `input_shape().window_length` scores. Implementations are shared
/// between inference workers.
#[cfg_attr(test, mockall::automock)]
pub trait FrameClassifier: Send + Sync {
    fn input_shape(&self) -> InputShape;

    fn classify(&self, windows: &[Window]) -> Result<Vec<WindowPrediction>, ClassifierError>;
}
