use super::source::FrameSource;
use super::types::{Frame, VideoInfo};
use crate::avc::{split_length_prefixed, to_annexb, NaluKind};
use crate::errors::{DecodeError, SceneCutResult};
use crate::mp4::r#box::read_top_level_box;
use crate::mp4::{analyze_video_track, detect_format, SampleLocation, VideoTrack};
use image::imageops::FilterType;
use image::RgbImage;
use log::{debug, info};
use openh264::decoder::Decoder;
use openh264::formats::YUVSource;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Output size of a frame source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameScale {
    /// Coded size of the track
    Native,
    /// Resize every frame to exactly this size
    Fixed { width: u32, height: u32 },
}

/// Sequential H.264 decoder over the first video track of an MP4/MOV file
pub struct Mp4FrameSource {
    reader: BufReader<File>,
    decoder: Decoder,
    locations: Vec<SampleLocation>,
    info: VideoInfo,
    scale: FrameScale,
    next_index: usize,
    last_picture: Option<RgbImage>,
}

impl Mp4FrameSource {
    pub fn open<P: AsRef<Path>>(path: P, scale: FrameScale) -> SceneCutResult<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);

        let format = detect_format(&mut reader)?;
        let moov = read_top_level_box(&mut reader, b"moov")?;
        let track = analyze_video_track(&moov)?;
        let locations = track.sample_locations()?;

        if track.avcc.nal_length_size != 4 {
            return Err(DecodeError::new(format!(
                "unsupported NAL length size {}",
                track.avcc.nal_length_size
            ))
            .into());
        }

        let mut decoder = Decoder::new()
            .map_err(|e| DecodeError::new(format!("Failed to create decoder: {}", e)))?;
        initialize_decoder(&mut decoder, &track)?;

        let (width, height) = match scale {
            FrameScale::Native => (track.width, track.height),
            FrameScale::Fixed { width, height } => (width, height),
        };
        let info = VideoInfo {
            frame_count: locations.len(),
            fps: track.frame_rate(),
            width,
            height,
            duration_secs: track.duration_secs(),
        };

        info!(
            "Opened {} ({}): {} frames at {:.3} fps, {}x{} coded, reading at {}x{}",
            path.display(),
            format.name(),
            info.frame_count,
            info.fps,
            track.width,
            track.height,
            width,
            height
        );

        Ok(Self {
            reader,
            decoder,
            locations,
            info,
            scale,
            next_index: 0,
            last_picture: None,
        })
    }

    fn read_sample(&mut self, location: SampleLocation) -> SceneCutResult<Vec<u8>> {
        let mut data = vec![0u8; location.size as usize];
        self.reader.seek(SeekFrom::Start(location.offset))?;
        self.reader.read_exact(&mut data).map_err(|e| {
            DecodeError::new(format!(
                "sample {} at offset {} is truncated: {}",
                self.next_index, location.offset, e
            ))
        })?;
        Ok(data)
    }

    /// Decode one sample; `None` when the decoder buffered it without output
    fn decode_sample(&mut self, sample: &[u8]) -> SceneCutResult<Option<RgbImage>> {
        let nalus = split_length_prefixed(sample).ok_or_else(|| {
            DecodeError::new(format!("sample {} has a corrupt NAL length", self.next_index))
        })?;
        // Parameter sets were fed from avcC up front
        let bitstream = to_annexb(nalus.iter().filter(|n| !n.kind.is_parameter_set()));
        if bitstream.is_empty() {
            return Ok(None);
        }

        let decoded = self.decoder.decode(&bitstream).map_err(|e| {
            DecodeError::new(format!(
                "H.264 decoding failed at frame {}: {}",
                self.next_index, e
            ))
        })?;

        let Some(yuv) = decoded else {
            return Ok(None);
        };
        let (width, height) = yuv.dimensions();
        let mut rgb = vec![0u8; yuv.rgb8_len()];
        yuv.write_rgb8(&mut rgb);
        RgbImage::from_raw(width as u32, height as u32, rgb)
            .map(Some)
            .ok_or_else(|| DecodeError::new("Failed to create RgbImage from RGB data").into())
    }

    fn scaled(&self, picture: &RgbImage) -> RgbImage {
        match self.scale {
            FrameScale::Fixed { width, height } if picture.dimensions() != (width, height) => {
                image::imageops::resize(picture, width, height, FilterType::Triangle)
            }
            _ => picture.clone(),
        }
    }
}

impl FrameSource for Mp4FrameSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> SceneCutResult<Option<Frame>> {
        let Some(&location) = self.locations.get(self.next_index) else {
            return Ok(None);
        };
        let sample = self.read_sample(location)?;

        let picture = match self.decode_sample(&sample)? {
            Some(picture) => {
                self.last_picture = Some(picture);
                self.last_picture.as_ref()
            }
            None => {
                debug!("No picture for frame {}, repeating previous", self.next_index);
                self.last_picture.as_ref()
            }
        };
        let picture = picture.ok_or_else(|| {
            DecodeError::new(format!(
                "decoder produced no picture up to frame {}",
                self.next_index
            ))
        })?;
        let frame = Frame::new(self.next_index, self.info.fps, self.scaled(picture));

        self.next_index += 1;
        if self.next_index % 500 == 0 {
            debug!("Decoded {}/{} frames", self.next_index, self.info.frame_count);
        }
        Ok(Some(frame))
    }
}

/// Feed SPS then PPS from the avcC record before the first slice
fn initialize_decoder(decoder: &mut Decoder, track: &VideoTrack) -> Result<(), DecodeError> {
    let parameter_sets = track
        .avcc
        .sps
        .iter()
        .map(|sps| (NaluKind::Sps, sps))
        .chain(track.avcc.pps.iter().map(|pps| (NaluKind::Pps, pps)));

    for (kind, data) in parameter_sets {
        let mut packet = vec![0, 0, 0, 1];
        packet.extend_from_slice(data);
        decoder.decode(&packet).map_err(|e| {
            DecodeError::new(format!(
                "Failed to initialize decoder with {:?}: {}",
                kind, e
            ))
        })?;
    }
    Ok(())
}
