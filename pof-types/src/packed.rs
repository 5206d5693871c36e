//! The packed integer codec: a signed variable-length encoding.
//!
//! The low 6 bits of the first byte carry magnitude bits 0-5, plus a sign
//! bit and a continuation bit. Each subsequent byte carries 7 magnitude
//! bits and a continuation bit. Values in `[-64, 63]` fit in one byte.
//! Encoding is unique per value: the writer never emits a continuation byte
//! whose remaining magnitude is zero.

use crate::error::{Error, Result};
use crate::io::{PofSink, PofSource};

const FIRST_BYTE_MAGNITUDE_BITS: u32 = 6;
const CONT_BYTE_MAGNITUDE_BITS: u32 = 7;
const SIGN_BIT: u8 = 0x40;
const CONT_BIT: u8 = 0x80;
const FIRST_BYTE_MASK: u8 = 0x3F;
const CONT_BYTE_MASK: u8 = 0x7F;

/// Writes `value` as a packed integer.
pub fn write_packed_i64<S: PofSink + ?Sized>(sink: &mut S, value: i64) -> Result<()> {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();

    let mut first = (magnitude as u8) & FIRST_BYTE_MASK;
    if negative {
        first |= SIGN_BIT;
    }
    magnitude >>= FIRST_BYTE_MAGNITUDE_BITS;
    if magnitude != 0 {
        first |= CONT_BIT;
    }
    sink.write_u8(first)?;

    while magnitude != 0 {
        let mut byte = (magnitude as u8) & CONT_BYTE_MASK;
        magnitude >>= CONT_BYTE_MAGNITUDE_BITS;
        if magnitude != 0 {
            byte |= CONT_BIT;
        }
        sink.write_u8(byte)?;
    }

    Ok(())
}

/// Writes `value` as a packed integer.
pub fn write_packed_i32<S: PofSink + ?Sized>(sink: &mut S, value: i32) -> Result<()> {
    write_packed_i64(sink, value as i64)
}

/// Reads a packed integer, failing with [`Error::MalformedStream`] if the
/// continuation run overrun the source or overflow 64 bits of magnitude.
pub fn read_packed_i64<S: PofSource + ?Sized>(source: &mut S) -> Result<i64> {
    let first = source.read_u8()?;
    let negative = first & SIGN_BIT != 0;
    let mut magnitude: u64 = (first & FIRST_BYTE_MASK) as u64;
    let mut cont = first & CONT_BIT != 0;
    let mut shift = FIRST_BYTE_MAGNITUDE_BITS;

    while cont {
        if shift >= 64 {
            return Err(Error::MalformedStream("packed integer overflowed 64 bits"));
        }
        let byte = source.read_u8()?;
        let chunk = (byte & CONT_BYTE_MASK) as u64;
        magnitude |= chunk
            .checked_shl(shift)
            .ok_or(Error::MalformedStream("packed integer overflowed 64 bits"))?;
        shift += CONT_BYTE_MAGNITUDE_BITS;
        cont = byte & CONT_BIT != 0;
    }

    Ok(if negative {
        (magnitude as i64).wrapping_neg()
    } else {
        if magnitude > i64::MAX as u64 {
            return Err(Error::MalformedStream("packed integer overflowed i64"));
        }
        magnitude as i64
    })
}

/// Reads a packed integer that must fit in `i32`.
pub fn read_packed_i32<S: PofSource + ?Sized>(source: &mut S) -> Result<i32> {
    let value = read_packed_i64(source)?;
    i32::try_from(value).map_err(|_| Error::MalformedStream("packed integer overflowed i32"))
}

/// Skips `count` packed integers without materializing their values.
pub fn skip_n<S: PofSource + ?Sized>(source: &mut S, count: usize) -> Result<()> {
    for _ in 0..count {
        skip_one(source)?;
    }
    Ok(())
}

/// Skips exactly one packed integer.
pub fn skip_one<S: PofSource + ?Sized>(source: &mut S) -> Result<()> {
    let first = source.read_u8()?;
    let mut cont = first & CONT_BIT != 0;
    while cont {
        let byte = source.read_u8()?;
        cont = byte & CONT_BIT != 0;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(n: i64) {
        let mut buf = Vec::new();
        write_packed_i64(&mut buf, n).unwrap();
        let mut slice = buf.as_slice();
        assert_eq!(read_packed_i64(&mut slice).unwrap(), n);
        assert!(slice.is_empty(), "trailing bytes after decoding {n}");
    }

    #[test]
    fn single_byte_range() {
        for n in -64..=63 {
            let mut buf = Vec::new();
            write_packed_i64(&mut buf, n).unwrap();
            assert_eq!(buf.len(), 1, "expected single byte for {n}");
            roundtrip(n);
        }
    }

    #[test]
    fn boundary_values() {
        for n in [
            0,
            1,
            -1,
            64,
            -65,
            i32::MAX as i64,
            i32::MIN as i64,
            i64::MAX,
            i64::MIN,
        ] {
            roundtrip(n);
        }
    }

    #[test]
    fn skip_without_materializing() {
        let mut buf = Vec::new();
        write_packed_i64(&mut buf, 123_456_789).unwrap();
        write_packed_i64(&mut buf, -1).unwrap();
        let mut slice = buf.as_slice();
        skip_n(&mut slice, 1).unwrap();
        assert_eq!(read_packed_i64(&mut slice).unwrap(), -1);
    }

    #[quickcheck_macros::quickcheck]
    fn prop_roundtrip_i64(n: i64) -> bool {
        let mut buf = Vec::new();
        write_packed_i64(&mut buf, n).unwrap();
        let mut slice = buf.as_slice();
        read_packed_i64(&mut slice).unwrap() == n && slice.is_empty()
    }

    #[quickcheck_macros::quickcheck]
    fn prop_roundtrip_i32(n: i32) -> bool {
        let mut buf = Vec::new();
        write_packed_i32(&mut buf, n).unwrap();
        let mut slice = buf.as_slice();
        read_packed_i32(&mut slice).unwrap() == n && slice.is_empty()
    }
}
