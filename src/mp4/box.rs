use crate::errors::DecodeError;
use std::io::{self, Read, Seek, SeekFrom};

/// Box header information for a box read from a stream
#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub name: [u8; 4],
    /// Absolute position of the first header byte
    pub position: u64,
    /// Full box size including the header
    pub size: u64,
    pub header_size: u64,
}

impl BoxHeader {
    pub fn is(&self, name: &[u8; 4]) -> bool {
        &self.name == name
    }

    pub fn payload_size(&self) -> u64 {
        self.size - self.header_size
    }
}

/// Read the box header at the current stream position.
/// Returns `Ok(None)` at a clean end of stream.
pub fn read_box_header<R: Read + Seek>(
    r: &mut R,
    stream_len: u64,
) -> io::Result<Option<BoxHeader>> {
    let position = r.stream_position()?;
    if position + 8 > stream_len {
        return Ok(None);
    }

    let mut head = [0u8; 8];
    r.read_exact(&mut head)?;
    let size32 = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    let name = [head[4], head[5], head[6], head[7]];

    let (size, header_size) = match size32 {
        // Box runs to the end of the file
        0 => (stream_len - position, 8),
        1 => {
            let mut large = [0u8; 8];
            r.read_exact(&mut large)?;
            (u64::from_be_bytes(large), 16)
        }
        n => (n as u64, 8),
    };

    if size < header_size || position + size > stream_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "box {} at {} has invalid size {}",
                String::from_utf8_lossy(&name),
                position,
                size
            ),
        ));
    }

    Ok(Some(BoxHeader {
        name,
        position,
        size,
        header_size,
    }))
}

/// Walk the top-level boxes of a file and read the payload of the first `name` box.
pub fn read_top_level_box<R: Read + Seek>(
    r: &mut R,
    name: &[u8; 4],
) -> Result<Vec<u8>, DecodeError> {
    let io_err = |e: io::Error| DecodeError::new(format!("Failed to scan top-level boxes: {}", e));

    let stream_len = r.seek(SeekFrom::End(0)).map_err(io_err)?;
    r.seek(SeekFrom::Start(0)).map_err(io_err)?;

    while let Some(header) = read_box_header(r, stream_len).map_err(io_err)? {
        if header.is(name) {
            let mut payload = vec![0u8; header.payload_size() as usize];
            r.read_exact(&mut payload).map_err(io_err)?;
            return Ok(payload);
        }
        r.seek(SeekFrom::Start(header.position + header.size))
            .map_err(io_err)?;
    }

    Err(DecodeError::new(format!(
        "{} box not found",
        String::from_utf8_lossy(name)
    )))
}

/// Parse a box header from a byte slice, advancing the cursor past it.
/// Returns the box name and its full size.
pub fn parse_box_header(data: &[u8], pos: &mut usize) -> Option<([u8; 4], u64)> {
    if *pos + 8 > data.len() {
        return None;
    }
    let size = be_u32(data, *pos)? as u64;
    let name = [
        data[*pos + 4],
        data[*pos + 5],
        data[*pos + 6],
        data[*pos + 7],
    ];
    *pos += 8;

    if size == 1 {
        let large = be_u64(data, *pos)?;
        *pos += 8;
        return Some((name, large));
    }
    Some((name, size))
}

/// Find a child box and return its payload
pub fn find_box<'a>(data: &'a [u8], name: &[u8; 4]) -> Option<&'a [u8]> {
    let mut pos = 0usize;

    while pos + 8 <= data.len() {
        let start = pos;
        let (box_name, size) = parse_box_header(data, &mut pos)?;

        if size < (pos - start) as u64 || size as usize > data.len() - start {
            return None;
        }
        let end = start + size as usize;

        if &box_name == name {
            return Some(&data[pos..end]);
        }
        pos = end;
    }
    None
}

/// Iterate over the direct children of a container payload
pub fn child_boxes(data: &[u8]) -> impl Iterator<Item = ([u8; 4], &[u8])> {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        let start = pos;
        let (name, size) = parse_box_header(data, &mut pos)?;
        if size < (pos - start) as u64 || size as usize > data.len() - start {
            return None;
        }
        let payload = &data[pos..start + size as usize];
        pos = start + size as usize;
        Some((name, payload))
    })
}

/// Big-endian u16 at `pos`
pub fn be_u16(data: &[u8], pos: usize) -> Option<u16> {
    let bytes = data.get(pos..pos + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Big-endian u32 at `pos`
pub fn be_u32(data: &[u8], pos: usize) -> Option<u32> {
    let bytes = data.get(pos..pos + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Big-endian u64 at `pos`
pub fn be_u64(data: &[u8], pos: usize) -> Option<u64> {
    let bytes = data.get(pos..pos + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}

/// Append a complete box (header + payload) to `output`
pub fn write_box(output: &mut Vec<u8>, name: &[u8; 4], payload: &[u8]) {
    output.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
    output.extend_from_slice(name);
    output.extend_from_slice(payload);
}

/// Append a full box (version + flags + payload) to `output`
pub fn write_full_box(output: &mut Vec<u8>, name: &[u8; 4], version: u8, flags: u32, payload: &[u8]) {
    let mut body = Vec::with_capacity(payload.len() + 4);
    body.push(version);
    body.extend_from_slice(&flags.to_be_bytes()[1..]);
    body.extend_from_slice(payload);
    write_box(output, name, &body);
}
