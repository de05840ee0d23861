//! Low-level binary parsing helpers for BIFF records.
//!
//! All multi-byte integers in BIFF are little-endian.

use crate::error::{XlsError, XlsResult};

#[inline]
fn take<'a>(data: &'a [u8], offset: &mut usize, needed: usize) -> XlsResult<&'a [u8]> {
    let end = offset
        .checked_add(needed)
        .filter(|&end| end <= data.len())
        .ok_or(XlsError::UnexpectedEnd {
            offset: *offset,
            needed,
        })?;
    let bytes = &data[*offset..end];
    *offset = end;
    Ok(bytes)
}

/// Read a `u8` from a byte slice at `offset`, advancing `offset`.
#[inline]
pub fn read_u8(data: &[u8], offset: &mut usize) -> XlsResult<u8> {
    take(data, offset, 1).map(|b| b[0])
}

/// Read a `u16` (little-endian) from a byte slice at `offset`, advancing `offset`.
#[inline]
pub fn read_u16(data: &[u8], offset: &mut usize) -> XlsResult<u16> {
    take(data, offset, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

/// Read a `u32` (little-endian) from a byte slice at `offset`, advancing `offset`.
#[inline]
pub fn read_u32(data: &[u8], offset: &mut usize) -> XlsResult<u32> {
    take(data, offset, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Read an `f64` (IEEE 754 double, little-endian) from a byte slice.
#[inline]
pub fn read_f64(data: &[u8], offset: &mut usize) -> XlsResult<f64> {
    let b = take(data, offset, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(b);
    Ok(f64::from_le_bytes(bytes))
}

/// Read `len` raw bytes, advancing `offset`.
#[inline]
pub fn read_bytes<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> XlsResult<&'a [u8]> {
    take(data, offset, len)
}

/// Bytes left after `offset`.
#[inline]
pub fn remaining(data: &[u8], offset: usize) -> usize {
    data.len().saturating_sub(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16() {
        let data = [0x34, 0x12];
        let mut off = 0;
        assert_eq!(read_u16(&data, &mut off).unwrap(), 0x1234);
        assert_eq!(off, 2);
    }

    #[test]
    fn test_read_f64() {
        let val = 3.14_f64;
        let bytes = val.to_le_bytes();
        let mut off = 0;
        let result = read_f64(&bytes, &mut off).unwrap();
        assert!((result - val).abs() < f64::EPSILON);
    }

    #[test]
    fn test_short_read_leaves_offset() {
        let data = [0x01, 0x02, 0x03];
        let mut off = 1;
        let err = read_u32(&data, &mut off).unwrap_err();
        assert!(matches!(err, XlsError::UnexpectedEnd { offset: 1, needed: 4 }));
        assert_eq!(off, 1);
        assert_eq!(remaining(&data, off), 2);
    }
}
