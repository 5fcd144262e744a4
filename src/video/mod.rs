//! Frame-level video collaborators: decoding into [`Frame`]s and encoding them back.

pub mod decoder;
pub mod encoder;
pub mod preview;
pub mod source;
mod types;


pub use decoder::{FrameScale, Mp4FrameSource};
pub use encoder::{H264Mp4Encoder, SegmentEncoder};
pub use preview::preview_data_url;
pub use source::{FrameSource, VecFrameSource};
pub use types::{frame_time, Frame, VideoInfo};

#[cfg(test)]
pub use source::MockFrameSource;
