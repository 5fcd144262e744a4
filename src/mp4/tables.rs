//! Sample-table parsing for a single track (`mdhd` and the `stbl` children).

use super::r#box::{be_u32, be_u64, find_box};
use crate::errors::DecodeError;

#[derive(Debug, Clone, PartialEq)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleToChunkEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// Parse mdhd payload to get timescale and duration
pub fn parse_mdhd(mdhd: &[u8]) -> Result<(u32, u64), DecodeError> {
    let too_small = || DecodeError::new("mdhd box too small");

    match mdhd.first() {
        Some(1) => {
            let timescale = be_u32(mdhd, 20).ok_or_else(too_small)?;
            let duration = be_u64(mdhd, 24).ok_or_else(too_small)?;
            Ok((timescale, duration))
        }
        Some(_) => {
            let timescale = be_u32(mdhd, 12).ok_or_else(too_small)?;
            let duration = be_u32(mdhd, 16).ok_or_else(too_small)? as u64;
            Ok((timescale, duration))
        }
        None => Err(too_small()),
    }
}

/// Read the `entry_count` field of a full box and check that `entry_size`-byte
/// entries starting at `first_entry` fit in the payload.
fn entry_count(
    data: &[u8],
    name: &str,
    count_pos: usize,
    first_entry: usize,
    entry_size: usize,
) -> Result<usize, DecodeError> {
    let count = be_u32(data, count_pos)
        .ok_or_else(|| DecodeError::new(format!("{} box too small", name)))?
        as usize;
    let required = count
        .checked_mul(entry_size)
        .and_then(|n| n.checked_add(first_entry))
        .unwrap_or(usize::MAX);
    if required > data.len() {
        return Err(DecodeError::new(format!(
            "{} box too small for {} entries: expected {} bytes, got {}",
            name,
            count,
            required,
            data.len()
        )));
    }
    Ok(count)
}

fn require<'a>(stbl: &'a [u8], name: &[u8; 4]) -> Result<&'a [u8], DecodeError> {
    find_box(stbl, name).ok_or_else(|| {
        DecodeError::new(format!(
            "{} box not found in stbl box",
            String::from_utf8_lossy(name)
        ))
    })
}

/// Parse stts (decoding time-to-sample) box
pub fn parse_stts(stbl: &[u8]) -> Result<Vec<SttsEntry>, DecodeError> {
    let stts = require(stbl, b"stts")?;
    let count = entry_count(stts, "stts", 4, 8, 8)?;

    Ok((0..count)
        .map(|i| {
            let pos = 8 + i * 8;
            SttsEntry {
                sample_count: be_u32(stts, pos).unwrap_or(0),
                sample_delta: be_u32(stts, pos + 4).unwrap_or(0),
            }
        })
        .collect())
}

/// Parse stsz (sample size) box
pub fn parse_stsz(stbl: &[u8]) -> Result<Vec<u32>, DecodeError> {
    let stsz = require(stbl, b"stsz")?;
    let uniform_size =
        be_u32(stsz, 4).ok_or_else(|| DecodeError::new("stsz box too small"))?;

    if uniform_size != 0 {
        let count = be_u32(stsz, 8).ok_or_else(|| DecodeError::new("stsz box too small"))?;
        return Ok(vec![uniform_size; count as usize]);
    }

    let count = entry_count(stsz, "stsz", 8, 12, 4)?;
    Ok((0..count)
        .map(|i| be_u32(stsz, 12 + i * 4).unwrap_or(0))
        .collect())
}

/// Parse stsc (sample-to-chunk) box
pub fn parse_stsc(stbl: &[u8]) -> Result<Vec<SampleToChunkEntry>, DecodeError> {
    let stsc = require(stbl, b"stsc")?;
    let count = entry_count(stsc, "stsc", 4, 8, 12)?;

    Ok((0..count)
        .map(|i| {
            let pos = 8 + i * 12;
            SampleToChunkEntry {
                first_chunk: be_u32(stsc, pos).unwrap_or(0),
                samples_per_chunk: be_u32(stsc, pos + 4).unwrap_or(0),
                sample_description_index: be_u32(stsc, pos + 8).unwrap_or(0),
            }
        })
        .collect())
}

/// Parse stco (32-bit) or co64 (64-bit) chunk offsets
pub fn parse_chunk_offsets(stbl: &[u8]) -> Result<Vec<u64>, DecodeError> {
    if let Some(stco) = find_box(stbl, b"stco") {
        let count = entry_count(stco, "stco", 4, 8, 4)?;
        return Ok((0..count)
            .map(|i| be_u32(stco, 8 + i * 4).unwrap_or(0) as u64)
            .collect());
    }

    if let Some(co64) = find_box(stbl, b"co64") {
        let count = entry_count(co64, "co64", 4, 8, 8)?;
        return Ok((0..count)
            .map(|i| be_u64(co64, 8 + i * 8).unwrap_or(0))
            .collect());
    }

    Err(DecodeError::new(
        "No chunk offset box found: missing both stco and co64",
    ))
}

/// Parse stss (sync samples, 1-based). Absent box means every sample is a sync sample.
pub fn parse_stss(stbl: &[u8]) -> Option<Vec<u32>> {
    let stss = find_box(stbl, b"stss")?;
    let count = entry_count(stss, "stss", 4, 8, 4).ok()?;
    Some(
        (0..count)
            .map(|i| be_u32(stss, 8 + i * 4).unwrap_or(0))
            .collect(),
    )
}

/// Sum of all sample durations in timescale ticks
pub fn total_ticks(entries: &[SttsEntry]) -> u64 {
    entries
        .iter()
        .map(|e| e.sample_count as u64 * e.sample_delta as u64)
        .sum()
}
