use super::types::Frame;
use crate::errors::EncodingError;
use crate::mp4::Mp4Writer;
use image::RgbImage;
use log::debug;
use openh264::encoder::{BitRate, Encoder, EncoderConfig, FrameRate};
use openh264::formats::{RgbSliceU8, YUVBuffer};
use openh264::OpenH264API;
use std::path::Path;

/// Lowest target bitrate handed to the encoder
const MIN_BITRATE_BPS: f64 = 500_000.0;

/// Target bits per pixel per frame
const BITS_PER_PIXEL: f64 = 0.15;

/// Writes an ordered run of frames to a standalone video file.
///
/// Frames are pulled one at a time so a scene never has to sit in memory as a
/// whole. Returns the number of frames stored in the file.
pub trait SegmentEncoder: Send + Sync {
    fn encode(
        &self,
        frames: &mut dyn Iterator<Item = Frame>,
        fps: f64,
        path: &Path,
    ) -> Result<usize, EncodingError>;
}

/// OpenH264 encoding into a single-track MP4
#[derive(Debug, Default, Clone)]
pub struct H264Mp4Encoder;

impl H264Mp4Encoder {
    pub fn new() -> Self {
        Self
    }
}

impl SegmentEncoder for H264Mp4Encoder {
    fn encode(
        &self,
        frames: &mut dyn Iterator<Item = Frame>,
        fps: f64,
        path: &Path,
    ) -> Result<usize, EncodingError> {
        let mut frames = frames.peekable();
        let first = frames
            .peek()
            .ok_or_else(|| EncodingError::new("no frames to encode"))?;

        // 4:2:0 chroma needs even dimensions
        let width = first.width() & !1;
        let height = first.height() & !1;
        if width == 0 || height == 0 {
            return Err(EncodingError::new(format!(
                "frame size {}x{} is too small to encode",
                first.width(),
                first.height()
            )));
        }

        let mut encoder =
            Encoder::with_api_config(OpenH264API::from_source(), encoder_config(width, height, fps))
                .map_err(|e| EncodingError::new(format!("Failed to create encoder: {}", e)))?;
        let mut writer = Mp4Writer::new(width, height, fps)?;

        let mut pushed = 0usize;
        for frame in frames {
            let rgb = even_sized(&frame.pixels, width, height)?;
            let yuv = YUVBuffer::from_rgb_source(RgbSliceU8::new(
                rgb.as_raw(),
                (width as usize, height as usize),
            ));
            let bitstream = encoder.encode(&yuv).map_err(|e| {
                EncodingError::new(format!("H.264 encoding failed at frame {}: {}", frame.index, e))
            })?;
            writer.push_access_unit(&bitstream.to_vec())?;
            pushed += 1;
        }

        let stored = writer.sample_count();
        if stored != pushed {
            return Err(EncodingError::new(format!(
                "encoder dropped frames: {} pushed, {} stored",
                pushed, stored
            )));
        }

        debug!("Muxing {} frames into {}", stored, path.display());
        writer.write_to(path)?;
        Ok(stored)
    }
}

/// Every frame is coded; rate control only trades quality for size
fn encoder_config(width: u32, height: u32, fps: f64) -> EncoderConfig {
    let rate = if fps > 0.0 { fps } else { 25.0 };
    let bps = (width as f64 * height as f64 * rate * BITS_PER_PIXEL).max(MIN_BITRATE_BPS);
    EncoderConfig::new()
        .skip_frames(false)
        .max_frame_rate(FrameRate::from_hz(rate as f32))
        .bitrate(BitRate::from_bps(bps.min(u32::MAX as f64) as u32))
}

/// Crop to the encoder size; frames of a different size are rejected
fn even_sized(pixels: &RgbImage, width: u32, height: u32) -> Result<RgbImage, EncodingError> {
    let (w, h) = pixels.dimensions();
    if w & !1 != width || h & !1 != height {
        return Err(EncodingError::new(format!(
            "frame size changed mid-segment: {}x{}, expected {}x{}",
            w, h, width, height
        )));
    }
    if (w, h) == (width, height) {
        return Ok(pixels.clone());
    }
    Ok(image::imageops::crop_imm(pixels, 0, 0, width, height).to_image())
}
