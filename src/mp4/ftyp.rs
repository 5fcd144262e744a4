use crate::errors::DecodeError;
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom};

/// Container family detected from the `ftyp` major brand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ContainerFormat {
    MP4,
    M4V,
    ThreeGP,
    MOV,
    Unknown(String),
}

impl ContainerFormat {
    pub fn name(&self) -> &str {
        match self {
            ContainerFormat::MP4 => "MP4",
            ContainerFormat::M4V => "M4V",
            ContainerFormat::ThreeGP => "3GP",
            ContainerFormat::MOV => "MOV",
            ContainerFormat::Unknown(s) => s,
        }
    }
}

/// Read the leading `ftyp` box and classify the container.
/// Files without an `ftyp` box are not ISO base media files and are rejected.
pub fn detect_format<R: Read + Seek>(r: &mut R) -> Result<ContainerFormat, DecodeError> {
    let mut header = [0u8; 12];
    r.seek(SeekFrom::Start(0))
        .and_then(|_| r.read_exact(&mut header))
        .map_err(|e| DecodeError::new(format!("Failed to read file header: {}", e)))?;

    if &header[4..8] != b"ftyp" {
        return Err(DecodeError::new(
            "Unknown container format: no ftyp box found",
        ));
    }

    let major_brand = String::from_utf8_lossy(&header[8..12]).into_owned();
    Ok(parse_brand(&major_brand))
}

/// Map an ftyp major brand to its container family
pub fn parse_brand(major_brand: &str) -> ContainerFormat {
    match major_brand {
        "isom" | "mp41" | "mp42" | "iso2" | "iso4" | "iso5" | "iso6" | "avc1" => {
            ContainerFormat::MP4
        }
        "M4V " | "M4VH" | "M4VP" => ContainerFormat::M4V,
        "3gp4" | "3gp5" | "3gp6" | "3gp7" | "3ge6" | "3ge7" | "3gg6" => ContainerFormat::ThreeGP,
        "qt  " => ContainerFormat::MOV,
        other => ContainerFormat::Unknown(other.to_string()),
    }
}
