/// H.264 NAL unit type, from the low five bits of the header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluKind {
    NonIdr,
    Idr,
    Sei,
    Sps,
    Pps,
    Aud,
    Other(u8),
}

impl NaluKind {
    pub fn from_header_byte(b: u8) -> Self {
        match b & 0x1f {
            1 => NaluKind::NonIdr,
            5 => NaluKind::Idr,
            6 => NaluKind::Sei,
            7 => NaluKind::Sps,
            8 => NaluKind::Pps,
            9 => NaluKind::Aud,
            v => NaluKind::Other(v),
        }
    }

    /// Slice data that produces a picture
    pub fn is_picture(&self) -> bool {
        matches!(self, NaluKind::NonIdr | NaluKind::Idr)
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, NaluKind::Sps | NaluKind::Pps)
    }
}

/// A NAL unit without start code or length prefix
#[derive(Debug, Clone, PartialEq)]
pub struct Nalu {
    pub kind: NaluKind,
    pub data: Vec<u8>,
}

impl Nalu {
    pub fn new(data: Vec<u8>) -> Option<Self> {
        let kind = NaluKind::from_header_byte(*data.first()?);
        Some(Nalu { kind, data })
    }
}

/// Split an Annex B bytestream (3- or 4-byte start codes) into NAL units.
pub fn split_annexb(stream: &[u8]) -> Vec<Nalu> {
    let mut nalus = Vec::new();
    let mut pos = 0usize;
    let mut current: Option<usize> = None;

    while pos + 3 <= stream.len() {
        let code_len = if stream[pos..pos + 3] == [0, 0, 1] {
            3
        } else if pos + 4 <= stream.len() && stream[pos..pos + 4] == [0, 0, 0, 1] {
            4
        } else {
            pos += 1;
            continue;
        };

        if let Some(start) = current {
            push_trimmed(&mut nalus, &stream[start..pos]);
        }
        current = Some(pos + code_len);
        pos += code_len;
    }

    if let Some(start) = current {
        push_trimmed(&mut nalus, &stream[start..]);
    }
    nalus
}

// Trailing zero bytes belong to the next start code, not to the unit.
fn push_trimmed(nalus: &mut Vec<Nalu>, unit: &[u8]) {
    let mut end = unit.len();
    while end > 0 && unit[end - 1] == 0 {
        end -= 1;
    }
    if let Some(nalu) = Nalu::new(unit[..end].to_vec()) {
        nalus.push(nalu);
    }
}

/// Split an MP4 sample (4-byte big-endian length prefixes) into NAL units.
/// Returns `None` when a length runs past the end of the sample.
pub fn split_length_prefixed(sample: &[u8]) -> Option<Vec<Nalu>> {
    let mut pos = 0usize;
    let mut nalus = Vec::new();
    while pos + 4 <= sample.len() {
        let len = u32::from_be_bytes([
            sample[pos],
            sample[pos + 1],
            sample[pos + 2],
            sample[pos + 3],
        ]) as usize;
        pos += 4;
        if len > sample.len() - pos {
            return None;
        }
        if let Some(nalu) = Nalu::new(sample[pos..pos + len].to_vec()) {
            nalus.push(nalu);
        }
        pos += len;
    }
    Some(nalus)
}

/// Re-frame NAL units with 4-byte start codes, the form OpenH264 consumes.
pub fn to_annexb<'a>(nalus: impl IntoIterator<Item = &'a Nalu>) -> Vec<u8> {
    let mut out = Vec::new();
    for nalu in nalus {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(&nalu.data);
    }
    out
}

/// Re-frame NAL units with 4-byte length prefixes, the form MP4 samples store.
pub fn to_length_prefixed<'a>(nalus: impl IntoIterator<Item = &'a Nalu>) -> Vec<u8> {
    let mut out = Vec::new();
    for nalu in nalus {
        out.extend_from_slice(&(nalu.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&nalu.data);
    }
    out
}
