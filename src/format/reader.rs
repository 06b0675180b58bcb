//! Low-level little-endian helpers for header parsing and writing.

use std::io::{self, Read};

use crate::{Error, Result};

/// Reads a little-endian `i32` at `pos` in `buf`.
///
/// Returns `None` if fewer than four bytes are available at `pos`.
pub fn i32_at(buf: &[u8], pos: usize) -> Option<i32> {
    let end = pos.checked_add(4)?;
    let bytes = buf.get(pos..end)?;
    Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Writes `value` as a little-endian `i32` at `pos` in `buf`.
///
/// # Panics
///
/// Panics if `buf` is shorter than `pos + 4`; callers size their header
/// buffers up front.
pub fn put_i32(buf: &mut [u8], pos: usize, value: i32) {
    buf[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
}

/// Converts a length or offset to the `i32` used on the wire.
pub fn wire_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| {
        Error::InvalidArgument(format!(
            "length {len} does not fit the 32-bit container fields"
        ))
    })
}

/// Reads a fixed number of bytes from a reader.
pub fn read_exact<const N: usize, R: Read + ?Sized>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads a little-endian `i32` from a reader.
pub fn read_i32<R: Read + ?Sized>(r: &mut R) -> io::Result<i32> {
    Ok(i32::from_le_bytes(read_exact::<4, R>(r)?))
}

/// Reads up to `buf.len()` bytes, stopping early only at end of input.
///
/// Returns the number of bytes read.
pub fn read_up_to<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_i32_at_bounds() {
        let buf = [1u8, 0, 0, 0, 0xFF];
        assert_eq!(i32_at(&buf, 0), Some(1));
        assert_eq!(i32_at(&buf, 2), None);
        assert_eq!(i32_at(&buf, usize::MAX), None);
    }

    #[test]
    fn test_put_i32_negative() {
        let mut buf = [0u8; 8];
        put_i32(&mut buf, 4, -1);
        assert_eq!(&buf[4..], &[0xFF; 4]);
        assert_eq!(i32_at(&buf, 4), Some(-1));
    }

    #[test]
    fn test_read_i32() {
        let mut cur = Cursor::new(vec![0x10, 0x00, 0x00, 0x00]);
        assert_eq!(read_i32(&mut cur).unwrap(), 16);
        assert!(read_i32(&mut cur).is_err());
    }

    #[test]
    fn test_read_up_to_short_input() {
        let mut cur = Cursor::new(vec![1, 2, 3]);
        let mut buf = [0u8; 8];
        assert_eq!(read_up_to(&mut cur, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    fn test_wire_len() {
        assert_eq!(wire_len(48).unwrap(), 48);
        assert!(wire_len(usize::MAX).is_err());
    }
}
