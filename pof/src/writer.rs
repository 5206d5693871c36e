//! The primitive writer: encodes POF tags and bodies onto a byte sink,
//! threading a shared [`Context`] through for user-type dispatch and an
//! [`IdentityWriterTable`] through for shared-reference sharing.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use pof_types::packed::{write_packed_i32, write_packed_i64};
use pof_types::raw_time::{RawDate, RawDateTime, RawDayTimeInterval, RawTime, RawYearMonthInterval};
use pof_types::type_id as tid;
use pof_types::PofSink;

use crate::context::Context;
use crate::error::Result;
use crate::identity::IdentityWriterTable;
use crate::reflect::{PofEncode, PofEncodeBody};
use crate::user_type::UserTypeWriter;
use crate::value::Value;

/// Writes POF-encoded values onto a byte sink.
pub struct PofWriter<'a> {
    sink: &'a mut dyn PofSink,
    ctx: Context,
    identity: IdentityWriterTable,
}

impl<'a> PofWriter<'a> {
    /// Creates a writer over `sink`, bound to `ctx`'s type registry.
    pub fn new(sink: &'a mut dyn PofSink, ctx: Context) -> Self {
        Self {
            sink,
            ctx,
            identity: IdentityWriterTable::new(),
        }
    }

    /// The registry this writer's stream is bound to.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub(crate) fn sink_mut(&mut self) -> &mut dyn PofSink {
        self.sink
    }

    fn write_tag(&mut self, tag: i32) -> Result<()> {
        write_packed_i32(self.sink, tag).map_err(Into::into)
    }

    /// `V_REFERENCE_NULL`.
    pub fn write_null(&mut self) -> Result<()> {
        self.write_tag(tid::V_REFERENCE_NULL)
    }

    /// `T_BOOLEAN`, always narrowed to the compact `V_BOOLEAN_*` sentinels.
    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_tag(if v { tid::V_BOOLEAN_TRUE } else { tid::V_BOOLEAN_FALSE })
    }

    /// `T_OCTET`.
    pub fn write_octet(&mut self, v: u8) -> Result<()> {
        self.write_tag(tid::T_OCTET)?;
        self.sink.write_u8(v).map_err(Into::into)
    }

    /// `T_CHAR`.
    pub fn write_char(&mut self, v: char) -> Result<()> {
        self.write_tag(tid::T_CHAR)?;
        let mut buf = [0u8; 4];
        let s = v.encode_utf8(&mut buf);
        write_packed_i32(self.sink, s.len() as i32)?;
        self.sink.write_bytes(s.as_bytes()).map_err(Into::into)
    }

    /// `T_INT16`, narrowed to a compact sentinel when the value is `-1..=22`.
    pub fn write_int16(&mut self, v: i16) -> Result<()> {
        if let Some(tag) = tid::int_sentinel(v as i32) {
            return self.write_tag(tag);
        }
        self.write_tag(tid::T_INT16)?;
        write_packed_i32(self.sink, v as i32).map_err(Into::into)
    }

    /// `T_INT32`, narrowed to a compact sentinel when the value is `-1..=22`.
    pub fn write_int32(&mut self, v: i32) -> Result<()> {
        if let Some(tag) = tid::int_sentinel(v) {
            return self.write_tag(tag);
        }
        self.write_tag(tid::T_INT32)?;
        write_packed_i32(self.sink, v).map_err(Into::into)
    }

    /// `T_INT64`, narrowed to a compact sentinel when the value is `-1..=22`.
    pub fn write_int64(&mut self, v: i64) -> Result<()> {
        if (-1..=22).contains(&v) {
            return self.write_tag(tid::int_sentinel(v as i32).expect("range checked above"));
        }
        self.write_tag(tid::T_INT64)?;
        write_packed_i64(self.sink, v).map_err(Into::into)
    }

    /// `T_FLOAT32`, narrowed to the shared infinity/NaN sentinels.
    pub fn write_float32(&mut self, v: f32) -> Result<()> {
        if v.is_nan() {
            return self.write_tag(tid::V_FP_NAN);
        }
        if v == f32::INFINITY {
            return self.write_tag(tid::V_FP_POS_INFINITY);
        }
        if v == f32::NEG_INFINITY {
            return self.write_tag(tid::V_FP_NEG_INFINITY);
        }
        self.write_tag(tid::T_FLOAT32)?;
        self.sink.write_bytes(&v.to_bits().to_be_bytes()).map_err(Into::into)
    }

    /// `T_FLOAT64`, narrowed to the shared infinity/NaN sentinels.
    pub fn write_float64(&mut self, v: f64) -> Result<()> {
        if v.is_nan() {
            return self.write_tag(tid::V_FP_NAN);
        }
        if v == f64::INFINITY {
            return self.write_tag(tid::V_FP_POS_INFINITY);
        }
        if v == f64::NEG_INFINITY {
            return self.write_tag(tid::V_FP_NEG_INFINITY);
        }
        self.write_tag(tid::T_FLOAT64)?;
        self.sink.write_bytes(&v.to_bits().to_be_bytes()).map_err(Into::into)
    }

    /// `T_DECIMAL32`: unscaled value and scale as two packed integers.
    pub fn write_decimal32(&mut self, unscaled: i32, scale: i32) -> Result<()> {
        self.write_tag(tid::T_DECIMAL32)?;
        write_packed_i32(self.sink, unscaled)?;
        write_packed_i32(self.sink, scale).map_err(Into::into)
    }

    /// `T_DATE`.
    pub fn write_date(&mut self, v: &RawDate) -> Result<()> {
        self.write_tag(tid::T_DATE)?;
        v.encode(self.sink).map_err(Into::into)
    }

    /// `T_TIME`.
    pub fn write_time(&mut self, v: &RawTime) -> Result<()> {
        self.write_tag(tid::T_TIME)?;
        v.encode(self.sink).map_err(Into::into)
    }

    /// `T_DATETIME`.
    pub fn write_datetime(&mut self, v: &RawDateTime) -> Result<()> {
        self.write_tag(tid::T_DATETIME)?;
        v.encode(self.sink).map_err(Into::into)
    }

    /// `T_YEAR_MONTH_INTERVAL`.
    pub fn write_year_month_interval(&mut self, v: &RawYearMonthInterval) -> Result<()> {
        self.write_tag(tid::T_YEAR_MONTH_INTERVAL)?;
        v.encode(self.sink).map_err(Into::into)
    }

    /// `T_DAY_TIME_INTERVAL`.
    pub fn write_day_time_interval(&mut self, v: &RawDayTimeInterval) -> Result<()> {
        self.write_tag(tid::T_DAY_TIME_INTERVAL)?;
        v.encode(self.sink).map_err(Into::into)
    }

    /// `T_OCTET_STRING`.
    pub fn write_octet_string(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_tag(tid::T_OCTET_STRING)?;
        write_packed_i32(self.sink, bytes.len() as i32)?;
        self.sink.write_bytes(bytes).map_err(Into::into)
    }

    /// `T_CHAR_STRING`, narrowed to `V_STRING_ZERO_LENGTH` when empty.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        if s.is_empty() {
            return self.write_tag(tid::V_STRING_ZERO_LENGTH);
        }
        self.write_tag(tid::T_CHAR_STRING)?;
        write_packed_i32(self.sink, s.len() as i32)?;
        self.sink.write_bytes(s.as_bytes()).map_err(Into::into)
    }

    /// `T_ARRAY`, narrowed to `V_COLLECTION_EMPTY` when empty.
    pub fn write_array<T: PofEncode>(&mut self, items: &[T]) -> Result<()> {
        if items.is_empty() {
            return self.write_tag(tid::V_COLLECTION_EMPTY);
        }
        self.write_tag(tid::T_ARRAY)?;
        write_packed_i32(self.sink, items.len() as i32)?;
        for item in items {
            item.pof_encode(self)?;
        }
        Ok(())
    }

    /// Body of [`Self::write_int16`], no tag, no sentinel narrowing.
    pub(crate) fn write_int16_body(&mut self, v: i16) -> Result<()> {
        write_packed_i32(self.sink, v as i32).map_err(Into::into)
    }

    /// Body of [`Self::write_int32`], no tag, no sentinel narrowing.
    pub(crate) fn write_int32_body(&mut self, v: i32) -> Result<()> {
        write_packed_i32(self.sink, v).map_err(Into::into)
    }

    /// Body of [`Self::write_int64`], no tag, no sentinel narrowing.
    pub(crate) fn write_int64_body(&mut self, v: i64) -> Result<()> {
        write_packed_i64(self.sink, v).map_err(Into::into)
    }

    /// Body of [`Self::write_float32`], no tag, no sentinel narrowing.
    pub(crate) fn write_float32_body(&mut self, v: f32) -> Result<()> {
        self.sink.write_bytes(&v.to_bits().to_be_bytes()).map_err(Into::into)
    }

    /// Body of [`Self::write_float64`], no tag, no sentinel narrowing.
    pub(crate) fn write_float64_body(&mut self, v: f64) -> Result<()> {
        self.sink.write_bytes(&v.to_bits().to_be_bytes()).map_err(Into::into)
    }

    /// Body of [`Self::write_octet`], no tag.
    pub(crate) fn write_octet_body(&mut self, v: u8) -> Result<()> {
        self.sink.write_u8(v).map_err(Into::into)
    }

    /// Body of [`Self::write_char`], no tag.
    pub(crate) fn write_char_body(&mut self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        let s = v.encode_utf8(&mut buf);
        write_packed_i32(self.sink, s.len() as i32)?;
        self.sink.write_bytes(s.as_bytes()).map_err(Into::into)
    }

    /// Body of [`Self::write_string`], no tag, no zero-length narrowing.
    pub(crate) fn write_string_body(&mut self, s: &str) -> Result<()> {
        write_packed_i32(self.sink, s.len() as i32)?;
        self.sink.write_bytes(s.as_bytes()).map_err(Into::into)
    }

    /// `T_UNIFORM_ARRAY`: tags the container with `T::pof_tag()` once, in
    /// its header, then writes each element's body only — no per-element
    /// tag or sentinel narrowing, since every slot shares the header's tag.
    pub fn write_uniform_array<T: PofEncodeBody>(&mut self, items: &[T]) -> Result<()> {
        if items.is_empty() {
            return self.write_tag(tid::V_COLLECTION_EMPTY);
        }
        self.write_tag(tid::T_UNIFORM_ARRAY)?;
        write_packed_i32(self.sink, T::pof_tag())?;
        write_packed_i32(self.sink, items.len() as i32)?;
        for item in items {
            item.pof_encode_body(self)?;
        }
        Ok(())
    }

    /// `T_SPARSE_ARRAY`: present indices in ascending order; absent indices
    /// are implicitly nil. Terminated by index `-1`.
    pub fn write_sparse_array<T: PofEncode>(&mut self, entries: &BTreeMap<i32, T>) -> Result<()> {
        self.write_tag(tid::T_SPARSE_ARRAY)?;
        for (index, value) in entries {
            write_packed_i32(self.sink, *index)?;
            value.pof_encode(self)?;
        }
        write_packed_i32(self.sink, -1).map_err(Into::into)
    }

    /// `T_MAP`.
    pub fn write_map<K: PofEncode, V: PofEncode>(&mut self, entries: &[(K, V)]) -> Result<()> {
        self.write_tag(tid::T_MAP)?;
        write_packed_i32(self.sink, entries.len() as i32)?;
        for (k, v) in entries {
            k.pof_encode(self)?;
            v.pof_encode(self)?;
        }
        Ok(())
    }

    /// Writes `value` as a stream-local shared reference: the first writer
    /// to see a given `Rc` allocation writes `T_IDENTITY` followed by the
    /// value itself; every later sighting of the same allocation writes
    /// `T_REFERENCE`. Only acyclic sharing round-trips this way — a true
    /// cycle needs the dynamic [`Value`] path.
    pub fn write_shared<T: PofEncode + 'static>(&mut self, value: &Rc<T>) -> Result<()> {
        let (id, seen) = self.identity.mark(value);
        if seen {
            self.write_tag(tid::T_REFERENCE)?;
            return write_packed_i32(self.sink, id).map_err(Into::into);
        }
        self.write_tag(tid::T_IDENTITY)?;
        write_packed_i32(self.sink, id)?;
        value.as_ref().pof_encode(self)
    }

    /// Writes a dynamic [`Value::Shared`] cell the same way [`Self::write_shared`]
    /// writes a static `Rc<T>`, keyed by the cell's own allocation — so a
    /// self-referential cell (`cell.borrow()` pointing back at `cell`) still
    /// only writes `T_REFERENCE` on the recursive sighting instead of
    /// looping forever.
    pub(crate) fn write_shared_value(&mut self, cell: &Rc<RefCell<Value>>) -> Result<()> {
        let ptr = Rc::as_ptr(cell) as *const ();
        let (id, seen) = self.identity.mark_ptr(ptr);
        if seen {
            self.write_tag(tid::T_REFERENCE)?;
            return write_packed_i32(self.sink, id).map_err(Into::into);
        }
        self.write_tag(tid::T_IDENTITY)?;
        write_packed_i32(self.sink, id)?;
        cell.borrow().pof_encode(self)
    }

    /// Like [`Self::write_user_type`], but wraps the whole frame in
    /// `T_IDENTITY`/`T_REFERENCE` keyed by `ptr`, for `enable_references`
    /// streams where every user-type value is written at most once.
    pub(crate) fn write_user_type_shared(
        &mut self,
        type_id: i32,
        version_id: i32,
        ptr: *const (),
        body: impl FnOnce(&mut UserTypeWriter<'_, '_>) -> Result<()>,
    ) -> Result<()> {
        let (id, seen) = self.identity.mark_ptr(ptr);
        if seen {
            self.write_tag(tid::T_REFERENCE)?;
            return write_packed_i32(self.sink, id).map_err(Into::into);
        }
        self.write_tag(tid::T_IDENTITY)?;
        write_packed_i32(self.sink, id)?;
        self.write_user_type(type_id, version_id, body)
    }

    /// Opens a `type_id`-tagged user-type frame, calls `body` to fill its
    /// properties in ascending index order, then writes the `-1`
    /// terminator.
    pub fn write_user_type(
        &mut self,
        type_id: i32,
        version_id: i32,
        body: impl FnOnce(&mut UserTypeWriter<'_, '_>) -> Result<()>,
    ) -> Result<()> {
        self.write_tag(type_id)?;
        write_packed_i32(self.sink, version_id)?;
        let mut frame = UserTypeWriter::new(self);
        body(&mut frame)?;
        frame.finish(&[])
    }

    /// Like [`Self::write_user_type`], but writes a non-empty `remainder`
    /// of already-encoded trailing properties instead, for
    /// [`crate::evolvable::Evolvable`].
    pub fn write_user_type_with_remainder(
        &mut self,
        type_id: i32,
        version_id: i32,
        body: impl FnOnce(&mut UserTypeWriter<'_, '_>) -> Result<()>,
        remainder: &[u8],
    ) -> Result<()> {
        self.write_tag(type_id)?;
        write_packed_i32(self.sink, version_id)?;
        let mut frame = UserTypeWriter::new(self);
        body(&mut frame)?;
        frame.finish(remainder)
    }

    /// Writes a dynamically-held user-type value (a [`Value::UserType`]),
    /// replaying its captured remainder bytes verbatim after its known
    /// properties.
    pub fn write_user_type_dynamic(
        &mut self,
        type_id: i32,
        version_id: i32,
        properties: &[(i32, Value)],
        remainder: &[u8],
    ) -> Result<()> {
        self.write_tag(type_id)?;
        write_packed_i32(self.sink, version_id)?;
        let mut frame = UserTypeWriter::new(self);
        for (index, value) in properties {
            frame.write_property(*index, value)?;
        }
        frame.finish(remainder)
    }
}
