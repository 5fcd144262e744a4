//! AVCDecoderConfigurationRecord (`avcC`) reading and writing.

use crate::errors::DecodeError;

/// Parsed avcC record: the parameter sets a decoder needs before the first slice
#[derive(Debug, Clone, PartialEq)]
pub struct AvccConfig {
    pub profile: u8,
    pub compatibility: u8,
    pub level: u8,
    /// NAL length field size in bytes (1, 2 or 4)
    pub nal_length_size: u8,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

impl AvccConfig {
    /// Parse the avcC payload as defined in ISO/IEC 14496-15.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < 7 {
            return Err(DecodeError::new("avcC data too short"));
        }
        let profile = data[1];
        let compatibility = data[2];
        let level = data[3];
        let nal_length_size = (data[4] & 0x03) + 1;

        let mut pos = 5;
        let sps_count = (data[pos] & 0x1f) as usize;
        pos += 1;
        let sps = read_parameter_sets(data, &mut pos, sps_count, "SPS")?;

        let pps_count = *data
            .get(pos)
            .ok_or_else(|| DecodeError::new("Unexpected EOF while reading PPS count"))?
            as usize;
        pos += 1;
        let pps = read_parameter_sets(data, &mut pos, pps_count, "PPS")?;

        Ok(AvccConfig {
            profile,
            compatibility,
            level,
            nal_length_size,
            sps,
            pps,
        })
    }

    /// Build a record from one SPS and one PPS NAL unit, 4-byte NAL lengths
    pub fn from_parameter_sets(sps: Vec<u8>, pps: Vec<u8>) -> Result<Self, DecodeError> {
        if sps.len() < 4 {
            return Err(DecodeError::new("SPS too short to carry profile and level"));
        }
        Ok(AvccConfig {
            profile: sps[1],
            compatibility: sps[2],
            level: sps[3],
            nal_length_size: 4,
            sps: vec![sps],
            pps: vec![pps],
        })
    }

    /// Serialize back into an avcC payload
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            1,
            self.profile,
            self.compatibility,
            self.level,
            0xfc | (self.nal_length_size.saturating_sub(1) & 0x03),
            0xe0 | (self.sps.len() as u8 & 0x1f),
        ];
        for sps in &self.sps {
            out.extend_from_slice(&(sps.len() as u16).to_be_bytes());
            out.extend_from_slice(sps);
        }
        out.push(self.pps.len() as u8);
        for pps in &self.pps {
            out.extend_from_slice(&(pps.len() as u16).to_be_bytes());
            out.extend_from_slice(pps);
        }
        out
    }

    pub fn is_valid(&self) -> bool {
        !self.sps.is_empty() && !self.pps.is_empty()
    }
}

fn read_parameter_sets(
    data: &[u8],
    pos: &mut usize,
    count: usize,
    kind: &str,
) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut sets = Vec::with_capacity(count);
    for _ in 0..count {
        if *pos + 2 > data.len() {
            return Err(DecodeError::new(format!(
                "Unexpected EOF while reading {} length",
                kind
            )));
        }
        let len = u16::from_be_bytes([data[*pos], data[*pos + 1]]) as usize;
        *pos += 2;
        if *pos + len > data.len() {
            return Err(DecodeError::new(format!(
                "Unexpected EOF while reading {} data",
                kind
            )));
        }
        sets.push(data[*pos..*pos + len].to_vec());
        *pos += len;
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: [u8; 8] = [0x67, 0x42, 0xc0, 0x1e, 0xd9, 0x00, 0xa0, 0x47];
    const PPS: [u8; 4] = [0x68, 0xce, 0x38, 0x80];

    #[test]
    fn test_record_written_then_parsed() {
        let config = AvccConfig::from_parameter_sets(SPS.to_vec(), PPS.to_vec()).unwrap();
        assert_eq!(config.profile, 0x42);
        assert_eq!(config.level, 0x1e);

        let bytes = config.to_bytes();
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[4], 0xff);
        assert_eq!(bytes[5], 0xe1);

        let parsed = AvccConfig::parse(&bytes).unwrap();
        assert_eq!(parsed, config);
        assert!(parsed.is_valid());
    }

    #[test]
    fn test_truncated_record() {
        let bytes = AvccConfig::from_parameter_sets(SPS.to_vec(), PPS.to_vec())
            .unwrap()
            .to_bytes();
        assert!(AvccConfig::parse(&bytes[..bytes.len() - 2]).is_err());
        assert!(AvccConfig::parse(&bytes[..4]).is_err());
    }
}
