//! `Evolvable<T>`: wraps a reflected type so that decoding it
//! against an older schema doesn't discard whatever extra trailing
//! properties a newer writer appended. Re-encoding replays the captured
//! tail verbatim after `T`'s own properties, so a value can hop through an
//! intermediate reader that doesn't know the newest fields without losing
//! them.

use crate::error::Result;
use crate::reader::PofReader;
use crate::reflect::{PofDecode, PofDecodeFields, PofEncode, PofEncodeFields};
use crate::writer::PofWriter;

/// A reflected value plus whatever of its wire frame this build's `T`
/// doesn't model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evolvable<T> {
    /// The decoded (or freshly constructed) value.
    pub value: T,
    /// The frame's version id, as stamped by whichever writer produced it.
    pub version_id: i32,
    /// Raw, already-encoded trailing properties from a newer writer,
    /// replayed byte-exact on re-encode.
    pub remainder: Vec<u8>,
}

impl<T> Evolvable<T> {
    /// Wraps a value with no remainder to carry, as if freshly constructed
    /// by the current schema version.
    pub fn new(value: T) -> Self {
        Evolvable {
            value,
            version_id: 0,
            remainder: Vec::new(),
        }
    }
}

impl<T: PofEncodeFields + 'static> PofEncode for Evolvable<T> {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        let type_id = writer.context().type_id_of::<T>()?;
        writer.write_user_type_with_remainder(
            type_id,
            T::version_id(),
            |frame| self.value.pof_encode_fields(frame),
            &self.remainder,
        )
    }
}

impl<T: PofDecodeFields + 'static> PofDecode for Evolvable<T> {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        let (value, version_id, remainder) = reader.read_user_type_with_remainder(T::pof_decode_fields)?;
        Ok(Evolvable {
            value,
            version_id,
            remainder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::reflect::AttributeMeta;

    struct Point {
        x: i32,
    }

    impl PofEncodeFields for Point {
        fn pof_encode_fields(&self, frame: &mut crate::user_type::UserTypeWriter<'_, '_>) -> Result<()> {
            frame.write_property(0, &self.x)
        }
    }
    impl PofDecodeFields for Point {
        fn pof_decode_fields(frame: &mut crate::user_type::UserTypeReader<'_, '_>) -> Result<Self> {
            Ok(Point {
                x: frame.read_property(0)?,
            })
        }
    }
    impl crate::reflect::Reflected for Point {
        fn metadata() -> &'static [AttributeMeta] {
            &[AttributeMeta {
                name: "x",
                index: 0,
                explicit_index: true,
            }]
        }
    }

    #[test]
    fn roundtrips_with_no_remainder() {
        let ctx = Context::new();
        ctx.register::<Point>(1, "Point").unwrap();
        let mut buf = Vec::new();
        {
            let mut writer = PofWriter::new(&mut buf, ctx.clone());
            Evolvable::new(Point { x: 7 }).pof_encode(&mut writer).unwrap();
        }
        let mut reader = PofReader::new(&buf, ctx);
        let decoded = Evolvable::<Point>::pof_decode(&mut reader).unwrap();
        assert_eq!(decoded.value.x, 7);
        assert!(decoded.remainder.is_empty());
    }

    #[test]
    fn preserves_a_captured_remainder_across_a_roundtrip() {
        let ctx = Context::new();
        ctx.register::<Point>(1, "Point").unwrap();

        // Simulate a newer writer that also wrote property 1, a string.
        let mut newer = Vec::new();
        {
            let mut writer = PofWriter::new(&mut newer, ctx.clone());
            writer
                .write_user_type(1, 0, |frame| {
                    frame.write_property(0, &9i32)?;
                    frame.write_property(1, &String::from("extra"))
                })
                .unwrap();
        }

        let mut reader = PofReader::new(&newer, ctx.clone());
        let older = Evolvable::<Point>::pof_decode(&mut reader).unwrap();
        assert_eq!(older.value.x, 9);
        assert!(!older.remainder.is_empty());

        let mut replayed = Vec::new();
        {
            let mut writer = PofWriter::new(&mut replayed, ctx.clone());
            older.pof_encode(&mut writer).unwrap();
        }
        assert_eq!(replayed, newer);
    }
}
