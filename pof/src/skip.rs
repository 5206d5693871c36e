//! Generic tag-driven skipping, used both by [`crate::user_type`] to drain
//! properties a reader's static type doesn't model (forward compatibility)
//! and by [`crate::navigator`] to step over sibling values while descending
//! a path without materializing them.

use pof_types::packed::read_packed_i32;
use pof_types::type_id::{self as tid, Family};
use pof_types::PofSource;

use crate::error::{Error, Result};

/// Reads and discards one complete tagged value (tag + body) from `source`.
pub fn skip_value<S: PofSource + ?Sized>(source: &mut S) -> Result<()> {
    let tag = read_packed_i32(source)?;
    skip_body(source, tag)
}

/// Discards the body belonging to an already-consumed leading `tag`.
pub fn skip_body<S: PofSource + ?Sized>(source: &mut S, tag: i32) -> Result<()> {
    match tid::classify(tag).map_err(Error::from)? {
        Family::Null => Ok(()),
        Family::Boolean => {
            if tag == tid::T_BOOLEAN {
                source.skip(1)?;
            }
            Ok(())
        }
        Family::Octet => source.skip(1),
        Family::Char => {
            let len = read_packed_i32(source)? as usize;
            source.skip(len)
        }
        Family::Integer => {
            if tid::int_sentinel_value(tag).is_some() {
                Ok(())
            } else {
                read_packed_i32(source)?;
                Ok(())
            }
        }
        Family::Float32 => source.skip(4),
        Family::Float64 => {
            if tag == tid::T_FLOAT64 {
                source.skip(8)
            } else {
                Ok(())
            }
        }
        Family::Decimal => {
            read_packed_i32(source)?;
            read_packed_i32(source)?;
            Ok(())
        }
        Family::Date => {
            for _ in 0..3 {
                read_packed_i32(source)?;
            }
            Ok(())
        }
        Family::Time => skip_time_body(source),
        Family::DateTime => {
            for _ in 0..3 {
                read_packed_i32(source)?;
            }
            skip_time_body(source)
        }
        Family::YearMonthInterval => {
            read_packed_i32(source)?;
            read_packed_i32(source)?;
            Ok(())
        }
        Family::TimeInterval => {
            for _ in 0..4 {
                read_packed_i32(source)?;
            }
            Ok(())
        }
        Family::DayTimeInterval => {
            for _ in 0..5 {
                read_packed_i32(source)?;
            }
            Ok(())
        }
        Family::OctetString => {
            let len = read_packed_i32(source)? as usize;
            source.skip(len)
        }
        Family::CharString => {
            if tag == tid::V_STRING_ZERO_LENGTH {
                return Ok(());
            }
            let len = read_packed_i32(source)? as usize;
            source.skip(len)
        }
        Family::Array | Family::Collection => {
            if tag == tid::V_COLLECTION_EMPTY {
                return Ok(());
            }
            let len = read_packed_i32(source)?;
            for _ in 0..len {
                skip_value(source)?;
            }
            Ok(())
        }
        Family::UniformArray | Family::UniformCollection => {
            let elem_tag = read_packed_i32(source)?;
            let len = read_packed_i32(source)?;
            for _ in 0..len {
                skip_body(source, elem_tag)?;
            }
            Ok(())
        }
        Family::SparseArray => {
            loop {
                let idx = read_packed_i32(source)?;
                if idx == -1 {
                    return Ok(());
                }
                skip_value(source)?;
            }
        }
        Family::UniformSparseArray => {
            let elem_tag = read_packed_i32(source)?;
            loop {
                let idx = read_packed_i32(source)?;
                if idx == -1 {
                    return Ok(());
                }
                skip_body(source, elem_tag)?;
            }
        }
        Family::Map => {
            let len = read_packed_i32(source)?;
            for _ in 0..len {
                skip_value(source)?;
                skip_value(source)?;
            }
            Ok(())
        }
        Family::UniformKeysMap => {
            let key_tag = read_packed_i32(source)?;
            let len = read_packed_i32(source)?;
            for _ in 0..len {
                skip_body(source, key_tag)?;
                skip_value(source)?;
            }
            Ok(())
        }
        Family::UniformMap => {
            let key_tag = read_packed_i32(source)?;
            let val_tag = read_packed_i32(source)?;
            let len = read_packed_i32(source)?;
            for _ in 0..len {
                skip_body(source, key_tag)?;
                skip_body(source, val_tag)?;
            }
            Ok(())
        }
        Family::Reference => {
            read_packed_i32(source)?;
            Ok(())
        }
        Family::Identity => {
            read_packed_i32(source)?;
            skip_value(source)
        }
        Family::UserType => {
            read_packed_i32(source)?; // version id
            loop {
                let idx = read_packed_i32(source)?;
                if idx == -1 {
                    return Ok(());
                }
                skip_value(source)?;
            }
        }
    }
}

fn skip_time_body<S: PofSource + ?Sized>(source: &mut S) -> Result<()> {
    for _ in 0..4 {
        read_packed_i32(source)?;
    }
    match read_packed_i32(source)? {
        2 => {
            read_packed_i32(source)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pof_types::packed::write_packed_i32;

    #[test]
    fn skips_sentinel_with_no_body() {
        let mut buf = Vec::new();
        write_packed_i32(&mut buf, tid::V_BOOLEAN_TRUE).unwrap();
        let mut slice = buf.as_slice();
        skip_value(&mut slice).unwrap();
        assert!(slice.is_empty());
    }

    #[test]
    fn skips_nested_array() {
        let mut buf = Vec::new();
        write_packed_i32(&mut buf, tid::T_ARRAY).unwrap();
        write_packed_i32(&mut buf, 2).unwrap();
        write_packed_i32(&mut buf, tid::V_INT_1).unwrap();
        write_packed_i32(&mut buf, tid::T_OCTET).unwrap();
        buf.push(7);
        write_packed_i32(&mut buf, tid::V_REFERENCE_NULL).unwrap();
        let mut slice = buf.as_slice();
        skip_value(&mut slice).unwrap();
        assert!(slice.is_empty());
    }
}
