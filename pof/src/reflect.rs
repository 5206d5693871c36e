//! Runtime half of the reflection/annotation serializer: the traits
//! `pof-derive`'s generated code implements, plus the blanket glue that
//! turns a type's property-frame codec into a full tagged [`PofEncode`]/
//! [`PofDecode`] implementation usable anywhere a value is expected
//! (top-level, nested field, array element).

use crate::error::{Error, Result};
use crate::reader::PofReader;
use crate::user_type::{UserTypeReader, UserTypeWriter};
use crate::writer::PofWriter;

/// One entry of a derived type's property metadata, ordered by `index`.
///
/// Built once per type by `#[derive(PofSerialize)]` and cached by the
/// registry; mirrors the (index, name) half of the spec's "ordered by
/// (version-id, index, name)" attribute metadata rule. The type-level
/// version id is tracked separately via [`PofEncodeFields::version_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeMeta {
    /// The field's mangled wire-visible name.
    pub name: &'static str,
    /// The field's property index.
    pub index: i32,
    /// Whether this index was given explicitly via `#[pof(index = ..)]`
    /// (`false` means it was auto-assigned from declaration order).
    pub explicit_index: bool,
}

/// Per-type reflection metadata, generated by `#[derive(PofSerialize)]`.
pub trait Reflected {
    /// Returns this type's attribute metadata, ordered by property index.
    fn metadata() -> &'static [AttributeMeta];

    /// Whether every field in [`Self::metadata`] has an explicit index.
    /// Used by the registry to enforce `Context::with_auto_index(false)`.
    fn fully_explicit() -> bool {
        Self::metadata().iter().all(|m| m.explicit_index)
    }
}

/// Fills an already-open user-type frame's properties in index order.
/// Generated by `#[derive(PofSerialize)]`.
pub trait PofEncodeFields {
    /// Writes every non-skipped field as an indexed property.
    fn pof_encode_fields(&self, frame: &mut UserTypeWriter<'_, '_>) -> Result<()>;

    /// The version id stamped on this type's frame; `0` unless overridden
    /// by a struct-level `#[pof(version = N)]`.
    fn version_id() -> i32 {
        0
    }
}

/// Reconstructs `Self` from an already-open user-type frame.
/// Generated by `#[derive(PofDeserialize)]`.
pub trait PofDecodeFields: Sized {
    /// Reads every non-skipped field by index, defaulting skipped ones.
    fn pof_decode_fields(frame: &mut UserTypeReader<'_, '_>) -> Result<Self>;
}

/// Writes a complete tagged value (primitive family or user type) to a
/// primitive writer. Implemented directly for every POF primitive family
/// and, via the blanket impl below, for any reflected user type.
pub trait PofEncode {
    /// Writes `self`'s tag and body to `writer`.
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()>;
}

/// Reads a complete tagged value (primitive family or user type) from a
/// primitive reader.
pub trait PofDecode: Sized {
    /// Reads a tag and body from `reader`, producing `Self`.
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self>;
}

impl<T: PofEncodeFields + 'static> PofEncode for T {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        let type_id = writer.context().type_id_of::<T>()?;
        if writer.context().enable_references_enabled() {
            let ptr = self as *const T as *const ();
            return writer.write_user_type_shared(type_id, T::version_id(), ptr, |frame| {
                self.pof_encode_fields(frame)
            });
        }
        writer.write_user_type(type_id, T::version_id(), |frame| {
            self.pof_encode_fields(frame)
        })
    }
}

impl<T: PofDecodeFields + 'static> PofDecode for T {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_user_type::<T, _>(T::pof_decode_fields)
    }
}

/// Writes one uniform-array element's body with no leading tag — the
/// container already wrote `Self::pof_tag()` once, in its header.
pub trait PofEncodeBody {
    /// The fixed element tag a uniform-array container writes once, in its
    /// header, instead of once per element.
    fn pof_tag() -> i32;

    /// Writes `self`'s body only, no tag.
    fn pof_encode_body(&self, writer: &mut PofWriter<'_>) -> Result<()>;
}

/// Reads one uniform-array element's body, given the element tag already
/// consumed from the container header.
pub trait PofDecodeBody: Sized {
    /// Reads `Self`'s body only, no tag, from `reader`.
    fn pof_decode_body(reader: &mut PofReader<'_>) -> Result<Self>;
}

/// A stateless per-field codec override installed via `#[pof(codec = ..)]`.
///
/// Implementors encode/decode exactly one field's value without going
/// through that field type's own `PofEncode`/`PofDecode` impl (useful for
/// third-party field types, or to force a non-default wire representation).
pub trait FieldCodec<T> {
    /// Writes `value` as property `index`.
    fn encode(&self, value: &T, writer: &mut UserTypeWriter<'_, '_>, index: i32) -> Result<()>;

    /// Reads property `index` back into a `T`.
    fn decode(&self, reader: &mut UserTypeReader<'_, '_>, index: i32) -> Result<T>;
}

pub(crate) fn missing_index_guard(name: &'static str, explicit: bool, auto_index: bool) -> Result<()> {
    if explicit || auto_index {
        Ok(())
    } else {
        Err(Error::MissingIndex(name))
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
        fn pof_encode_fields(&self, frame: &mut UserTypeWriter<'_, '_>) -> Result<()> {
            frame.write_property(0, &self.x)
        }
    }
    impl PofDecodeFields for Point {
        fn pof_decode_fields(frame: &mut UserTypeReader<'_, '_>) -> Result<Self> {
            Ok(Point {
                x: frame.read_property(0)?,
            })
        }
    }
    impl Reflected for Point {
        fn metadata() -> &'static [AttributeMeta] {
            &[AttributeMeta {
                name: "x",
                index: 0,
                explicit_index: true,
            }]
        }
    }

    #[test]
    fn enable_references_shares_the_same_value_written_twice() {
        let ctx = Context::new().with_enable_references(true);
        ctx.register::<Point>(1, "Point").unwrap();
        let p = Point { x: 7 };

        let mut buf = Vec::new();
        {
            let mut writer = crate::writer::PofWriter::new(&mut buf, ctx.clone());
            p.pof_encode(&mut writer).unwrap();
            p.pof_encode(&mut writer).unwrap();
        }

        let mut reader = crate::reader::PofReader::new(&buf, ctx);
        let first: std::rc::Rc<Point> = reader.read_user_type_shared(Point::pof_decode_fields).unwrap();
        let second: std::rc::Rc<Point> = reader.read_user_type_shared(Point::pof_decode_fields).unwrap();
        assert_eq!(first.x, 7);
        assert!(std::rc::Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn without_enable_references_each_write_is_independent() {
        let ctx = Context::new();
        ctx.register::<Point>(1, "Point").unwrap();
        let p = Point { x: 7 };

        let mut buf = Vec::new();
        {
            let mut writer = crate::writer::PofWriter::new(&mut buf, ctx.clone());
            p.pof_encode(&mut writer).unwrap();
            p.pof_encode(&mut writer).unwrap();
        }

        let mut reader = crate::reader::PofReader::new(&buf, ctx);
        let first = Point::pof_decode(&mut reader).unwrap();
        let second = Point::pof_decode(&mut reader).unwrap();
        assert_eq!(first.x, 7);
        assert_eq!(second.x, 7);
    }
}
