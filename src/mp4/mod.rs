//! ISO base media file (MP4/MOV) reading and writing for one H.264 video track.

pub mod avcc;
pub mod r#box;
pub mod ftyp;
pub mod tables;
pub mod track;
pub mod writer;

pub use avcc::AvccConfig;
pub use ftyp::{detect_format, ContainerFormat};
pub use track::{analyze_video_track, SampleLocation, VideoTrack};
pub use writer::Mp4Writer;
