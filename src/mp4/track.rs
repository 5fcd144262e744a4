use super::avcc::AvccConfig;
use super::r#box::{be_u16, child_boxes, find_box};
use super::tables::{
    parse_chunk_offsets, parse_mdhd, parse_stsc, parse_stss, parse_stsz, parse_stts,
    total_ticks, SampleToChunkEntry, SttsEntry,
};
use crate::errors::DecodeError;

// size+type + reserved + data_ref + visual sample entry fields
const VISUAL_SAMPLE_ENTRY_HEADER: usize = 8 + 6 + 2 + 70;

/// Everything needed to locate, time and decode the samples of a video track
#[derive(Debug, Clone)]
pub struct VideoTrack {
    pub timescale: u32,
    pub duration: u64,
    pub width: u32,
    pub height: u32,
    pub chunk_offsets: Vec<u64>,
    pub sample_sizes: Vec<u32>,
    pub sample_to_chunk: Vec<SampleToChunkEntry>,
    pub stts_entries: Vec<SttsEntry>,
    /// 1-based sync sample numbers; `None` when every sample is a sync sample
    pub sync_samples: Option<Vec<u32>>,
    pub avcc: AvccConfig,
}

/// Byte range of one sample in the file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleLocation {
    pub offset: u64,
    pub size: u32,
}

impl VideoTrack {
    pub fn sample_count(&self) -> usize {
        self.sample_sizes.len()
    }

    /// Average frame rate over the whole track
    pub fn frame_rate(&self) -> f64 {
        let ticks = total_ticks(&self.stts_entries);
        if ticks == 0 || self.timescale == 0 {
            return 0.0;
        }
        self.sample_count() as f64 * self.timescale as f64 / ticks as f64
    }

    pub fn duration_secs(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.duration as f64 / self.timescale as f64
    }

    /// Resolve the byte range of every sample, in decode order.
    pub fn sample_locations(&self) -> Result<Vec<SampleLocation>, DecodeError> {
        let mut locations = Vec::with_capacity(self.sample_count());
        let chunk_count = self.chunk_offsets.len() as u32;
        let mut sample = 0usize;

        for (i, entry) in self.sample_to_chunk.iter().enumerate() {
            let next_first_chunk = self
                .sample_to_chunk
                .get(i + 1)
                .map(|e| e.first_chunk)
                .unwrap_or(chunk_count + 1);

            if entry.first_chunk == 0 || next_first_chunk < entry.first_chunk {
                return Err(DecodeError::new(format!(
                    "stsc entry {} has invalid chunk range {}..{}",
                    i, entry.first_chunk, next_first_chunk
                )));
            }

            for chunk in entry.first_chunk..next_first_chunk {
                let mut offset = *self
                    .chunk_offsets
                    .get(chunk as usize - 1)
                    .ok_or_else(|| DecodeError::new(format!("chunk {} has no offset", chunk)))?;

                for _ in 0..entry.samples_per_chunk {
                    let Some(&size) = self.sample_sizes.get(sample) else {
                        return Ok(locations);
                    };
                    locations.push(SampleLocation { offset, size });
                    offset += size as u64;
                    sample += 1;
                }
            }
        }

        if locations.len() != self.sample_count() {
            return Err(DecodeError::new(format!(
                "sample tables describe {} samples but chunks hold {}",
                self.sample_count(),
                locations.len()
            )));
        }
        Ok(locations)
    }
}

/// Analyze the moov payload and extract the first H.264 video track
pub fn analyze_video_track(moov_payload: &[u8]) -> Result<VideoTrack, DecodeError> {
    let trak = find_video_trak(moov_payload).ok_or_else(|| DecodeError::new("No video track"))?;

    let mdia = find_box(trak, b"mdia").ok_or_else(|| DecodeError::new("No mdia box"))?;
    let mdhd = find_box(mdia, b"mdhd").ok_or_else(|| DecodeError::new("No mdhd box"))?;
    let minf = find_box(mdia, b"minf").ok_or_else(|| DecodeError::new("No minf box"))?;
    let stbl = find_box(minf, b"stbl").ok_or_else(|| DecodeError::new("No stbl box"))?;
    let stsd = find_box(stbl, b"stsd").ok_or_else(|| DecodeError::new("No stsd box"))?;

    let (timescale, duration) = parse_mdhd(mdhd)?;
    let (width, height, avcc) = parse_avc_sample_entry(stsd)?;

    Ok(VideoTrack {
        timescale,
        duration,
        width,
        height,
        chunk_offsets: parse_chunk_offsets(stbl)?,
        sample_sizes: parse_stsz(stbl)?,
        sample_to_chunk: parse_stsc(stbl)?,
        stts_entries: parse_stts(stbl)?,
        sync_samples: parse_stss(stbl),
        avcc,
    })
}

/// Find the first track whose handler is `vide`
fn find_video_trak(moov_payload: &[u8]) -> Option<&[u8]> {
    child_boxes(moov_payload)
        .filter(|(name, _)| name == b"trak")
        .map(|(_, payload)| payload)
        .find(|trak| {
            find_box(trak, b"mdia")
                .and_then(|mdia| find_box(mdia, b"hdlr"))
                .is_some_and(|hdlr| hdlr.len() >= 12 && &hdlr[8..12] == b"vide")
        })
}

/// Read coded size and avcC from the first avc1/avc3 sample entry
fn parse_avc_sample_entry(stsd: &[u8]) -> Result<(u32, u32, AvccConfig), DecodeError> {
    // Skip version/flags and entry_count
    let entries = stsd
        .get(8..)
        .ok_or_else(|| DecodeError::new("stsd box too small"))?;

    for (codec, entry) in child_boxes(entries) {
        if &codec != b"avc1" && &codec != b"avc3" {
            continue;
        }
        // `entry` is the payload after the 8-byte header; width/height sit 24 bytes in
        let width = be_u16(entry, 24).unwrap_or(0) as u32;
        let height = be_u16(entry, 26).unwrap_or(0) as u32;

        let children = entry
            .get(VISUAL_SAMPLE_ENTRY_HEADER - 8..)
            .ok_or_else(|| DecodeError::new("avc1 sample entry truncated"))?;
        let avcc = find_box(children, b"avcC")
            .ok_or_else(|| DecodeError::new("avc1 sample entry has no avcC box"))?;
        return Ok((width, height, AvccConfig::parse(avcc)?));
    }

    let codec = child_boxes(entries)
        .next()
        .map(|(name, _)| String::from_utf8_lossy(&name).into_owned())
        .unwrap_or_else(|| "none".to_string());
    Err(DecodeError::new(format!(
        "Unsupported video codec {}: only H.264 (avc1/avc3) can be decoded",
        codec
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(sizes: Vec<u32>, offsets: Vec<u64>, stsc: Vec<(u32, u32)>) -> VideoTrack {
        VideoTrack {
            timescale: 30_000,
            duration: 1001 * sizes.len() as u64,
            width: 64,
            height: 48,
            chunk_offsets: offsets,
            sample_to_chunk: stsc
                .into_iter()
                .map(|(first_chunk, samples_per_chunk)| SampleToChunkEntry {
                    first_chunk,
                    samples_per_chunk,
                    sample_description_index: 1,
                })
                .collect(),
            stts_entries: vec![SttsEntry {
                sample_count: sizes.len() as u32,
                sample_delta: 1001,
            }],
            sample_sizes: sizes,
            sync_samples: None,
            avcc: AvccConfig {
                profile: 66,
                compatibility: 0,
                level: 30,
                nal_length_size: 4,
                sps: vec![],
                pps: vec![],
            },
        }
    }

    #[test]
    fn test_sample_locations_walk_chunks() {
        // Chunks 1-2 hold two samples each, chunk 3 holds one
        let t = track(
            vec![10, 20, 30, 40, 50],
            vec![100, 1000, 5000],
            vec![(1, 2), (3, 1)],
        );
        let locations = t.sample_locations().unwrap();
        let offsets: Vec<u64> = locations.iter().map(|l| l.offset).collect();
        assert_eq!(offsets, vec![100, 110, 1000, 1030, 5000]);
        assert_eq!(locations[4].size, 50);
    }

    #[test]
    fn test_missing_samples_detected() {
        let t = track(vec![10, 20, 30], vec![100], vec![(1, 2)]);
        assert!(t.sample_locations().is_err());
    }

    #[test]
    fn test_frame_rate_from_stts() {
        let t = track(vec![1; 30], vec![0], vec![(1, 30)]);
        assert!((t.frame_rate() - 29.97).abs() < 0.01);
    }
}
