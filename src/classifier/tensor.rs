use super::types::InputShape;
use crate::errors::ClassifierError;
use crate::window::Window;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Dense `[batch, frames, height, width, channels]` u8 tensor built from windows
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTensor {
    pub shape: [usize; 5],
    pub data: Vec<u8>,
}

impl FrameTensor {
    /// Pack windows, checking every frame against `shape`
    pub fn from_windows(windows: &[Window], shape: InputShape) -> Result<Self, ClassifierError> {
        if shape.channels != 3 {
            return Err(ClassifierError::new(format!(
                "only RGB input is supported, classifier expects {} channels",
                shape.channels
            )));
        }

        let frame_len = shape.height as usize * shape.width as usize * 3;
        let mut data = Vec::with_capacity(windows.len() * shape.window_length * frame_len);

        for window in windows {
            if window.len() != shape.window_length {
                return Err(ClassifierError::new(format!(
                    "window holds {} frames, classifier expects {}",
                    window.len(),
                    shape.window_length
                ))
                .at_window(window.index));
            }
            for frame in &window.frames {
                if (frame.width(), frame.height()) != (shape.width, shape.height) {
                    return Err(ClassifierError::new(format!(
                        "frame {} is {}x{}, classifier expects {}x{}",
                        frame.index,
                        frame.width(),
                        frame.height(),
                        shape.width,
                        shape.height
                    ))
                    .at_window(window.index));
                }
                data.extend_from_slice(frame.pixels.as_raw());
            }
        }

        Ok(Self {
            shape: [
                windows.len(),
                shape.window_length,
                shape.height as usize,
                shape.width as usize,
                3,
            ],
            data,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.shape[0]
    }

    /// One nested-array instance per window, as the REST predict API expects
    pub fn instances(&self) -> Nested<'_> {
        Nested {
            data: &self.data,
            dims: &self.shape,
        }
    }
}

/// Row-major view serialized as nested JSON arrays
pub struct Nested<'a> {
    data: &'a [u8],
    dims: &'a [usize],
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some((&outer, inner)) = self.dims.split_first() else {
            return serializer.serialize_seq(Some(0))?.end();
        };
        let mut seq = serializer.serialize_seq(Some(outer))?;
        if inner.is_empty() {
            for value in self.data {
                seq.serialize_element(value)?;
            }
        } else {
            let step = inner.iter().product::<usize>();
            for chunk in self.data.chunks(step.max(1)) {
                seq.serialize_element(&Nested {
                    data: chunk,
                    dims: inner,
                })?;
            }
        }
        seq.end()
    }
}
