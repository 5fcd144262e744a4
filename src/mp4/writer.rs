//! Minimal progressive MP4 writer for a single H.264 video track.
//!
//! Layout is `ftyp`, `mdat`, `moov`, with every sample in one chunk. This is
//! all a segment needs and it is readable by [`analyze_video_track`].
//!
//! [`analyze_video_track`]: super::track::analyze_video_track

use super::avcc::AvccConfig;
use super::r#box::{write_box, write_full_box};
use crate::avc::{split_annexb, to_length_prefixed, NaluKind};
use crate::errors::EncodingError;
use std::path::Path;

const MOVIE_TIMESCALE: u32 = 1000;
const UNITY_MATRIX: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

/// Collects encoded access units and lays them out as an MP4 file
pub struct Mp4Writer {
    width: u32,
    height: u32,
    timescale: u32,
    sample_delta: u32,
    mdat: Vec<u8>,
    sample_sizes: Vec<u32>,
    sample_durations: Vec<u32>,
    sync_samples: Vec<u32>,
    sps: Option<Vec<u8>>,
    pps: Option<Vec<u8>>,
}

impl Mp4Writer {
    pub fn new(width: u32, height: u32, fps: f64) -> Result<Self, EncodingError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(EncodingError::new(format!("invalid frame rate {}", fps)));
        }
        if width == 0 || height == 0 || width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(EncodingError::new(format!(
                "invalid frame size {}x{}",
                width, height
            )));
        }
        // 1/1000 frame precision keeps NTSC rates (29.97, 23.976) exact
        let timescale = (fps * 1000.0).round() as u32;
        Ok(Self {
            width,
            height,
            timescale,
            sample_delta: 1000,
            mdat: Vec::new(),
            sample_sizes: Vec::new(),
            sample_durations: Vec::new(),
            sync_samples: Vec::new(),
            sps: None,
            pps: None,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.sample_sizes.len()
    }

    /// Append one encoded frame given as an Annex B bytestream.
    ///
    /// Parameter sets are moved into the `avcC` record. An access unit without
    /// picture data (a frame the encoder skipped) lengthens the previous sample.
    pub fn push_access_unit(&mut self, bytestream: &[u8]) -> Result<(), EncodingError> {
        let nalus = split_annexb(bytestream);

        for nalu in nalus.iter().filter(|n| n.kind.is_parameter_set()) {
            let slot = if nalu.kind == NaluKind::Sps {
                &mut self.sps
            } else {
                &mut self.pps
            };
            if slot.is_none() {
                *slot = Some(nalu.data.clone());
            }
        }

        let picture: Vec<_> = nalus
            .iter()
            .filter(|n| !n.kind.is_parameter_set() && n.kind != NaluKind::Aud)
            .collect();

        if !picture.iter().any(|n| n.kind.is_picture()) {
            match self.sample_durations.last_mut() {
                Some(last) => *last += self.sample_delta,
                None => {
                    return Err(EncodingError::new(
                        "first access unit carries no picture data",
                    ))
                }
            }
            return Ok(());
        }

        let sample = to_length_prefixed(picture.iter().copied());
        if picture.iter().any(|n| n.kind == NaluKind::Idr) {
            self.sync_samples.push(self.sample_sizes.len() as u32 + 1);
        }
        self.sample_sizes.push(sample.len() as u32);
        self.sample_durations.push(self.sample_delta);
        self.mdat.extend_from_slice(&sample);
        Ok(())
    }

    /// Lay out the finished file in memory
    pub fn finish(self) -> Result<Vec<u8>, EncodingError> {
        if self.sample_sizes.is_empty() {
            return Err(EncodingError::new("no samples were written"));
        }
        let (Some(sps), Some(pps)) = (self.sps.clone(), self.pps.clone()) else {
            return Err(EncodingError::new(
                "encoder produced no SPS/PPS parameter sets",
            ));
        };
        let avcc = AvccConfig::from_parameter_sets(sps, pps)
            .map_err(|e| EncodingError::new(e.message))?;

        let mut out = Vec::with_capacity(self.mdat.len() + 1024);
        write_box(&mut out, b"ftyp", &ftyp_payload());

        if self.mdat.len() as u64 + 8 > u32::MAX as u64 {
            out.extend_from_slice(&1u32.to_be_bytes());
            out.extend_from_slice(b"mdat");
            out.extend_from_slice(&(self.mdat.len() as u64 + 16).to_be_bytes());
        } else {
            out.extend_from_slice(&(self.mdat.len() as u32 + 8).to_be_bytes());
            out.extend_from_slice(b"mdat");
        }
        // All samples live in one chunk that starts right after the mdat header
        let chunk_offset = out.len() as u64;
        out.extend_from_slice(&self.mdat);

        let moov = self.moov_payload(&avcc, chunk_offset);
        write_box(&mut out, b"moov", &moov);
        Ok(out)
    }

    /// Lay out the file and write it to `path`
    pub fn write_to<P: AsRef<Path>>(self, path: P) -> Result<(), EncodingError> {
        let path = path.as_ref();
        let bytes = self.finish()?;
        std::fs::write(path, bytes).map_err(|e| {
            EncodingError::new(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    fn media_duration(&self) -> u64 {
        self.sample_durations.iter().map(|&d| d as u64).sum()
    }

    fn moov_payload(&self, avcc: &AvccConfig, chunk_offset: u64) -> Vec<u8> {
        let media_duration = self.media_duration();
        let movie_duration =
            (media_duration * MOVIE_TIMESCALE as u64 / self.timescale as u64) as u32;

        let mut moov = Vec::new();

        let mut mvhd = Vec::new();
        put_u32s(&mut mvhd, &[0, 0, MOVIE_TIMESCALE, movie_duration, 0x0001_0000]);
        mvhd.extend_from_slice(&0x0100u16.to_be_bytes());
        mvhd.extend_from_slice(&[0; 10]);
        put_u32s(&mut mvhd, &UNITY_MATRIX);
        mvhd.extend_from_slice(&[0; 24]);
        put_u32s(&mut mvhd, &[2]);
        write_full_box(&mut moov, b"mvhd", 0, 0, &mvhd);

        let mut trak = Vec::new();
        let mut tkhd = Vec::new();
        put_u32s(&mut tkhd, &[0, 0, 1, 0, movie_duration, 0, 0]);
        tkhd.extend_from_slice(&[0; 8]); // layer, alternate group, volume, reserved
        put_u32s(&mut tkhd, &UNITY_MATRIX);
        put_u32s(&mut tkhd, &[self.width << 16, self.height << 16]);
        write_full_box(&mut trak, b"tkhd", 0, 0x0000_0003, &tkhd);

        let mut mdia = Vec::new();
        let mut mdhd = Vec::new();
        put_u32s(&mut mdhd, &[0, 0, self.timescale, media_duration as u32]);
        mdhd.extend_from_slice(&0x55c4u16.to_be_bytes()); // "und"
        mdhd.extend_from_slice(&[0; 2]);
        write_full_box(&mut mdia, b"mdhd", 0, 0, &mdhd);

        let mut hdlr = Vec::new();
        put_u32s(&mut hdlr, &[0]);
        hdlr.extend_from_slice(b"vide");
        hdlr.extend_from_slice(&[0; 12]);
        hdlr.extend_from_slice(b"VideoHandler\0");
        write_full_box(&mut mdia, b"hdlr", 0, 0, &hdlr);

        let mut minf = Vec::new();
        write_full_box(&mut minf, b"vmhd", 0, 1, &[0; 8]);

        let mut dref = Vec::new();
        put_u32s(&mut dref, &[1]);
        write_full_box(&mut dref, b"url ", 0, 1, &[]);
        let mut dinf = Vec::new();
        write_full_box(&mut dinf, b"dref", 0, 0, &dref);
        write_box(&mut minf, b"dinf", &dinf);

        write_box(&mut minf, b"stbl", &self.stbl_payload(avcc, chunk_offset));
        write_box(&mut mdia, b"minf", &minf);
        write_box(&mut trak, b"mdia", &mdia);
        write_box(&mut moov, b"trak", &trak);
        moov
    }

    fn stbl_payload(&self, avcc: &AvccConfig, chunk_offset: u64) -> Vec<u8> {
        let mut stbl = Vec::new();
        let sample_count = self.sample_sizes.len() as u32;

        let mut avc1 = vec![0u8; 6];
        avc1.extend_from_slice(&1u16.to_be_bytes()); // data reference index
        avc1.extend_from_slice(&[0; 16]);
        avc1.extend_from_slice(&(self.width as u16).to_be_bytes());
        avc1.extend_from_slice(&(self.height as u16).to_be_bytes());
        put_u32s(&mut avc1, &[0x0048_0000, 0x0048_0000, 0]);
        avc1.extend_from_slice(&1u16.to_be_bytes()); // frame count
        avc1.extend_from_slice(&[0; 32]); // compressor name
        avc1.extend_from_slice(&0x0018u16.to_be_bytes());
        avc1.extend_from_slice(&0xffffu16.to_be_bytes());
        write_box(&mut avc1, b"avcC", &avcc.to_bytes());

        let mut stsd = Vec::new();
        put_u32s(&mut stsd, &[1]);
        write_box(&mut stsd, b"avc1", &avc1);
        write_full_box(&mut stbl, b"stsd", 0, 0, &stsd);

        let runs = run_lengths(&self.sample_durations);
        let mut stts = Vec::new();
        put_u32s(&mut stts, &[runs.len() as u32]);
        for (count, delta) in runs {
            put_u32s(&mut stts, &[count, delta]);
        }
        write_full_box(&mut stbl, b"stts", 0, 0, &stts);

        if self.sync_samples.len() < self.sample_sizes.len() {
            let mut stss = Vec::new();
            put_u32s(&mut stss, &[self.sync_samples.len() as u32]);
            put_u32s(&mut stss, &self.sync_samples);
            write_full_box(&mut stbl, b"stss", 0, 0, &stss);
        }

        let mut stsc = Vec::new();
        put_u32s(&mut stsc, &[1, 1, sample_count, 1]);
        write_full_box(&mut stbl, b"stsc", 0, 0, &stsc);

        let mut stsz = Vec::new();
        put_u32s(&mut stsz, &[0, sample_count]);
        put_u32s(&mut stsz, &self.sample_sizes);
        write_full_box(&mut stbl, b"stsz", 0, 0, &stsz);

        if chunk_offset > u32::MAX as u64 {
            let mut co64 = Vec::new();
            put_u32s(&mut co64, &[1]);
            co64.extend_from_slice(&chunk_offset.to_be_bytes());
            write_full_box(&mut stbl, b"co64", 0, 0, &co64);
        } else {
            let mut stco = Vec::new();
            put_u32s(&mut stco, &[1, chunk_offset as u32]);
            write_full_box(&mut stbl, b"stco", 0, 0, &stco);
        }
        stbl
    }
}

fn ftyp_payload() -> Vec<u8> {
    let mut ftyp = Vec::new();
    ftyp.extend_from_slice(b"isom");
    ftyp.extend_from_slice(&0x200u32.to_be_bytes());
    for brand in [b"isom", b"iso2", b"avc1", b"mp41"] {
        ftyp.extend_from_slice(brand);
    }
    ftyp
}

fn put_u32s(out: &mut Vec<u8>, values: &[u32]) {
    for v in values {
        out.extend_from_slice(&v.to_be_bytes());
    }
}

/// Collapse equal consecutive durations into `(count, delta)` stts runs
fn run_lengths(durations: &[u32]) -> Vec<(u32, u32)> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for &d in durations {
        match runs.last_mut() {
            Some((count, delta)) if *delta == d => *count += 1,
            _ => runs.push((1, d)),
        }
    }
    runs
}
