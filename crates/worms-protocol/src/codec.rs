//! Big-endian integer encode/decode and the CRC-32 used to validate event
//! records on the wire.
//!
//! Every decode helper is bounds-checked against the slice it is handed and
//! returns a [`DecodeError`] on a short read rather than panicking — the
//! buffers these operate on come straight off the network.

use crc::{Crc, CRC_32_ISO_HDLC};
use thiserror::Error;

/// IEEE 802.3 CRC-32 (polynomial 0xEDB88320 reflected), the same algorithm
/// `zip`/`gzip` use.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: need {need} bytes at offset {offset}, have {have}")]
    ShortBuffer {
        offset: usize,
        need: usize,
        have: usize,
    },
    #[error("declared length {len} is smaller than the minimum record size 5")]
    LenTooSmall { len: u32 },
    #[error("crc mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    CrcMismatch { expected: u32, computed: u32 },
    #[error("trailing bytes after the last event record")]
    TrailingBytes,
    #[error("unknown event type tag {0}")]
    UnknownEventType(u8),
}

/// Compute the CRC-32 (IEEE 802.3) of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

fn need(buf: &[u8], offset: usize, len: usize) -> Result<(), DecodeError> {
    if buf.len() < offset + len {
        Err(DecodeError::ShortBuffer {
            offset,
            need: len,
            have: buf.len().saturating_sub(offset),
        })
    } else {
        Ok(())
    }
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8, DecodeError> {
    need(buf, offset, 1)?;
    Ok(buf[offset])
}

pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32, DecodeError> {
    need(buf, offset, 4)?;
    Ok(u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap()))
}

pub fn read_u64(buf: &[u8], offset: usize) -> Result<u64, DecodeError> {
    need(buf, offset, 8)?;
    Ok(u64::from_be_bytes(buf[offset..offset + 8].try_into().unwrap()))
}

pub fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_known_check_value() {
        // Standard check value for CRC-32/ISO-HDLC over "123456789".
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc32_empty_is_zero() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn read_u32_round_trips_write_u32() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0xDEAD_BEEF);
        assert_eq!(read_u32(&buf, 0).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn read_u64_round_trips_write_u64() {
        let mut buf = Vec::new();
        write_u64(&mut buf, 0x1122_3344_5566_7788);
        assert_eq!(read_u64(&buf, 0).unwrap(), 0x1122_3344_5566_7788);
    }

    #[test]
    fn read_u8_short_buffer_errors() {
        let buf: [u8; 0] = [];
        assert_eq!(
            read_u8(&buf, 0),
            Err(DecodeError::ShortBuffer {
                offset: 0,
                need: 1,
                have: 0
            })
        );
    }

    #[test]
    fn read_u32_past_end_errors() {
        let buf = [1u8, 2, 3];
        assert!(read_u32(&buf, 0).is_err());
    }

    #[test]
    fn read_at_nonzero_offset() {
        let buf = [0xff, 0, 0, 0, 1];
        assert_eq!(read_u32(&buf, 1).unwrap(), 1);
    }
}
