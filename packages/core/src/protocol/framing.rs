//! Внешний заголовок конверта
//!
//! ```text
//! version:u16 (BE) | pre_header_len:u16 (BE) | pre_header
//! ```
//!
//! Единственная часть конверта, которую можно разобрать до аутентификации.
//! Несовпадение версии отклоняется до любых криптографических операций.

use crate::error::FramingError;
use crate::protocol::limits::{MAX_PRE_HEADER_SIZE, VERSION};
use std::io::{ErrorKind, Read};

pub fn write_header(version: u16, pre_header: &[u8]) -> Result<Vec<u8>, FramingError> {
    if pre_header.len() > MAX_PRE_HEADER_SIZE {
        return Err(FramingError::PreHeaderTooLarge(pre_header.len()));
    }
    let mut out = Vec::with_capacity(4 + pre_header.len());
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(&(pre_header.len() as u16).to_be_bytes());
    out.extend_from_slice(pre_header);
    Ok(out)
}

pub fn read_header<R: Read + ?Sized>(reader: &mut R) -> Result<(u16, Vec<u8>), FramingError> {
    let mut fixed = [0u8; 4];
    read_exact_or_truncated(reader, &mut fixed)?;

    let version = u16::from_be_bytes([fixed[0], fixed[1]]);
    if version != VERSION {
        return Err(FramingError::VersionMismatch {
            expected: VERSION,
            found: version,
        });
    }

    let len = u16::from_be_bytes([fixed[2], fixed[3]]) as usize;
    if len > MAX_PRE_HEADER_SIZE {
        return Err(FramingError::PreHeaderTooLarge(len));
    }

    let mut pre_header = vec![0u8; len];
    read_exact_or_truncated(reader, &mut pre_header)?;
    Ok((version, pre_header))
}

fn read_exact_or_truncated<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<(), FramingError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => FramingError::Truncated,
        _ => FramingError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let bytes = write_header(VERSION, b"pre-header").unwrap();
        assert_eq!(&bytes[..4], &[0, 1, 0, 10]);
        let (version, pre_header) = read_header(&mut bytes.as_slice()).unwrap();
        assert_eq!(version, VERSION);
        assert_eq!(pre_header, b"pre-header");
    }

    #[test]
    fn test_truncated() {
        let bytes = write_header(VERSION, b"pre-header").unwrap();
        for cut in [0, 1, 3, 4, 9] {
            let result = read_header(&mut &bytes[..cut]);
            assert!(matches!(result, Err(FramingError::Truncated)), "cut at {}", cut);
        }
    }

    #[test]
    fn test_version_mismatch() {
        let bytes = write_header(VERSION + 1, b"x").unwrap();
        let result = read_header(&mut bytes.as_slice());
        assert!(matches!(
            result,
            Err(FramingError::VersionMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_oversized_pre_header() {
        assert!(write_header(VERSION, &vec![0u8; MAX_PRE_HEADER_SIZE + 1]).is_err());
        let mut bytes = vec![0, 1];
        bytes.extend_from_slice(&(u16::MAX).to_be_bytes());
        assert!(matches!(
            read_header(&mut bytes.as_slice()),
            Err(FramingError::PreHeaderTooLarge(_))
        ));
    }
}
