//! The primitive reader: decodes POF tags and bodies off a byte slice,
//! threading a shared [`Context`] through for user-type dispatch and
//! capturing a user-type frame's opaque tail for forward compatibility.
//! Keeps the original slice (`full`) alongside the moving cursor (`source`)
//! so [`crate::user_type::UserTypeReader::finish`] can slice out the exact
//! bytes of an unparsed remainder without copying as it goes.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use pof_types::packed::{read_packed_i32, read_packed_i64};
use pof_types::raw_time::{RawDate, RawDateTime, RawDayTimeInterval, RawTime, RawYearMonthInterval};
use pof_types::type_id as tid;
use pof_types::PofSource;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::identity::IdentityReaderTable;
use crate::reflect::{PofDecode, PofDecodeBody};
use crate::user_type::UserTypeReader;
use crate::value::Value;

/// Reads POF-encoded values off a byte slice.
pub struct PofReader<'a> {
    full: &'a [u8],
    source: &'a [u8],
    ctx: Context,
    identity: IdentityReaderTable,
}

impl<'a> PofReader<'a> {
    /// Creates a reader over `bytes`, bound to `ctx`'s type registry.
    pub fn new(bytes: &'a [u8], ctx: Context) -> Self {
        Self {
            full: bytes,
            source: bytes,
            ctx,
            identity: IdentityReaderTable::new(),
        }
    }

    /// The registry this reader's stream is bound to.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// How many bytes of the original slice remain unread.
    pub fn remaining(&self) -> usize {
        self.source.len()
    }

    pub(crate) fn offset(&self) -> usize {
        self.full.len() - self.source.len()
    }

    pub(crate) fn source_mut(&mut self) -> &mut &'a [u8] {
        &mut self.source
    }

    pub(crate) fn full(&self) -> &'a [u8] {
        self.full
    }

    fn read_tag(&mut self) -> Result<i32> {
        read_packed_i32(&mut self.source).map_err(Into::into)
    }

    fn peek_tag(&self) -> Result<i32> {
        let mut probe = self.source;
        read_packed_i32(&mut probe).map_err(Into::into)
    }

    fn expect_tag(&mut self, expected_tag: i32, name: &'static str) -> Result<()> {
        let tag = self.read_tag()?;
        if tag != expected_tag {
            return Err(Error::Wire(pof_types::Error::TypeMismatch { expected: name, found: tag }));
        }
        Ok(())
    }

    /// True if the next value is `V_REFERENCE_NULL`, without consuming it.
    pub fn peek_is_null(&self) -> Result<bool> {
        Ok(self.peek_tag()? == tid::V_REFERENCE_NULL)
    }

    /// Consumes a `V_REFERENCE_NULL`.
    pub fn read_null(&mut self) -> Result<()> {
        self.expect_tag(tid::V_REFERENCE_NULL, "null")
    }

    /// `T_BOOLEAN`/`V_BOOLEAN_*`.
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_tag()? {
            tid::V_BOOLEAN_TRUE => Ok(true),
            tid::V_BOOLEAN_FALSE => Ok(false),
            tid::T_BOOLEAN => Ok(self.source.read_u8()? != 0),
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "boolean", found: other })),
        }
    }

    /// `T_OCTET`.
    pub fn read_octet(&mut self) -> Result<u8> {
        self.expect_tag(tid::T_OCTET, "octet")?;
        self.source.read_u8().map_err(Into::into)
    }

    /// `T_CHAR`.
    pub fn read_char(&mut self) -> Result<char> {
        self.expect_tag(tid::T_CHAR, "char")?;
        let len = read_packed_i32(&mut self.source)? as usize;
        let mut buf = vec![0u8; len];
        self.source.read_bytes(&mut buf)?;
        let s = core::str::from_utf8(&buf).map_err(|_| Error::malformed("char body was not valid utf-8"))?;
        s.chars().next().ok_or_else(|| Error::malformed("char body was empty"))
    }

    fn read_integer_body(&mut self, tag: i32, expected: &'static str) -> Result<i64> {
        if let Some(n) = tid::int_sentinel_value(tag) {
            return Ok(n as i64);
        }
        match tag {
            tid::T_INT16 | tid::T_INT32 | tid::T_INT64 => read_packed_i64(&mut self.source).map_err(Into::into),
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected, found: other })),
        }
    }

    /// `T_INT16` or a compact int sentinel.
    pub fn read_int16(&mut self) -> Result<i16> {
        let tag = self.read_tag()?;
        Ok(self.read_integer_body(tag, "int16")? as i16)
    }

    /// `T_INT32` or a compact int sentinel.
    pub fn read_int32(&mut self) -> Result<i32> {
        let tag = self.read_tag()?;
        Ok(self.read_integer_body(tag, "int32")? as i32)
    }

    /// `T_INT64` or a compact int sentinel.
    pub fn read_int64(&mut self) -> Result<i64> {
        let tag = self.read_tag()?;
        self.read_integer_body(tag, "int64")
    }

    /// `T_FLOAT32` or the shared infinity/NaN sentinels.
    pub fn read_float32(&mut self) -> Result<f32> {
        match self.read_tag()? {
            tid::T_FLOAT32 => {
                let mut buf = [0u8; 4];
                self.source.read_bytes(&mut buf)?;
                Ok(f32::from_bits(u32::from_be_bytes(buf)))
            }
            tid::V_FP_POS_INFINITY => Ok(f32::INFINITY),
            tid::V_FP_NEG_INFINITY => Ok(f32::NEG_INFINITY),
            tid::V_FP_NAN => Ok(f32::NAN),
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "float32", found: other })),
        }
    }

    /// `T_FLOAT64` or the shared infinity/NaN sentinels.
    pub fn read_float64(&mut self) -> Result<f64> {
        match self.read_tag()? {
            tid::T_FLOAT64 => {
                let mut buf = [0u8; 8];
                self.source.read_bytes(&mut buf)?;
                Ok(f64::from_bits(u64::from_be_bytes(buf)))
            }
            tid::V_FP_POS_INFINITY => Ok(f64::INFINITY),
            tid::V_FP_NEG_INFINITY => Ok(f64::NEG_INFINITY),
            tid::V_FP_NAN => Ok(f64::NAN),
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "float64", found: other })),
        }
    }

    /// `T_DECIMAL32`: `(unscaled, scale)`.
    pub fn read_decimal32(&mut self) -> Result<(i32, i32)> {
        self.expect_tag(tid::T_DECIMAL32, "decimal32")?;
        let unscaled = read_packed_i32(&mut self.source)?;
        let scale = read_packed_i32(&mut self.source)?;
        Ok((unscaled, scale))
    }

    /// `T_DATE`.
    pub fn read_date(&mut self) -> Result<RawDate> {
        self.expect_tag(tid::T_DATE, "date")?;
        RawDate::decode(&mut self.source).map_err(Into::into)
    }

    /// `T_TIME`.
    pub fn read_time(&mut self) -> Result<RawTime> {
        self.expect_tag(tid::T_TIME, "time")?;
        RawTime::decode(&mut self.source).map_err(Into::into)
    }

    /// `T_DATETIME`.
    pub fn read_datetime(&mut self) -> Result<RawDateTime> {
        self.expect_tag(tid::T_DATETIME, "datetime")?;
        RawDateTime::decode(&mut self.source).map_err(Into::into)
    }

    /// `T_YEAR_MONTH_INTERVAL`.
    pub fn read_year_month_interval(&mut self) -> Result<RawYearMonthInterval> {
        self.expect_tag(tid::T_YEAR_MONTH_INTERVAL, "year-month interval")?;
        RawYearMonthInterval::decode(&mut self.source).map_err(Into::into)
    }

    /// `T_DAY_TIME_INTERVAL`.
    pub fn read_day_time_interval(&mut self) -> Result<RawDayTimeInterval> {
        self.expect_tag(tid::T_DAY_TIME_INTERVAL, "day-time interval")?;
        RawDayTimeInterval::decode(&mut self.source).map_err(Into::into)
    }

    /// `T_OCTET_STRING`.
    pub fn read_octet_string(&mut self) -> Result<Vec<u8>> {
        self.expect_tag(tid::T_OCTET_STRING, "octet string")?;
        let len = read_packed_i32(&mut self.source)? as usize;
        let mut buf = vec![0u8; len];
        self.source.read_bytes(&mut buf)?;
        Ok(buf)
    }

    /// `T_CHAR_STRING`/`V_STRING_ZERO_LENGTH`.
    pub fn read_string(&mut self) -> Result<String> {
        match self.read_tag()? {
            tid::V_STRING_ZERO_LENGTH => Ok(String::new()),
            tid::T_CHAR_STRING => {
                let len = read_packed_i32(&mut self.source)? as usize;
                let mut buf = vec![0u8; len];
                self.source.read_bytes(&mut buf)?;
                String::from_utf8(buf).map_err(|_| Error::malformed("char string body was not valid utf-8"))
            }
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "char string", found: other })),
        }
    }

    /// Body of [`Self::read_int16`], given the tag was already `T_INT16`.
    pub(crate) fn read_int16_body(&mut self) -> Result<i16> {
        Ok(read_packed_i64(&mut self.source)? as i16)
    }

    /// Body of [`Self::read_int32`], given the tag was already `T_INT32`.
    pub(crate) fn read_int32_body(&mut self) -> Result<i32> {
        Ok(read_packed_i64(&mut self.source)? as i32)
    }

    /// Body of [`Self::read_int64`], given the tag was already `T_INT64`.
    pub(crate) fn read_int64_body(&mut self) -> Result<i64> {
        read_packed_i64(&mut self.source).map_err(Into::into)
    }

    /// Body of [`Self::read_float32`], given the tag was already `T_FLOAT32`.
    pub(crate) fn read_float32_body(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.source.read_bytes(&mut buf)?;
        Ok(f32::from_bits(u32::from_be_bytes(buf)))
    }

    /// Body of [`Self::read_float64`], given the tag was already `T_FLOAT64`.
    pub(crate) fn read_float64_body(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.source.read_bytes(&mut buf)?;
        Ok(f64::from_bits(u64::from_be_bytes(buf)))
    }

    /// Body of [`Self::read_octet`], given the tag was already `T_OCTET`.
    pub(crate) fn read_octet_body(&mut self) -> Result<u8> {
        self.source.read_u8().map_err(Into::into)
    }

    /// Body of [`Self::read_char`], given the tag was already `T_CHAR`.
    pub(crate) fn read_char_body(&mut self) -> Result<char> {
        let len = read_packed_i32(&mut self.source)? as usize;
        let mut buf = vec![0u8; len];
        self.source.read_bytes(&mut buf)?;
        let s = core::str::from_utf8(&buf).map_err(|_| Error::malformed("char body was not valid utf-8"))?;
        s.chars().next().ok_or_else(|| Error::malformed("char body was empty"))
    }

    /// Body of [`Self::read_string`], given the tag was already
    /// `T_CHAR_STRING` (no zero-length narrowing, since the empty-array
    /// case is handled by the container, not the element).
    pub(crate) fn read_string_body(&mut self) -> Result<String> {
        let len = read_packed_i32(&mut self.source)? as usize;
        let mut buf = vec![0u8; len];
        self.source.read_bytes(&mut buf)?;
        String::from_utf8(buf).map_err(|_| Error::malformed("char string body was not valid utf-8"))
    }

    /// `T_ARRAY`/`V_COLLECTION_EMPTY`. A `T_UNIFORM_ARRAY` needs
    /// [`Self::read_uniform_array`] instead, since its elements carry no
    /// per-element tag for `T::pof_decode` to consume.
    pub fn read_array<T: PofDecode>(&mut self) -> Result<Vec<T>> {
        match self.read_tag()? {
            tid::V_COLLECTION_EMPTY => Ok(Vec::new()),
            tid::T_ARRAY => {
                let len = read_packed_i32(&mut self.source)? as usize;
                (0..len).map(|_| T::pof_decode(self)).collect()
            }
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "array", found: other })),
        }
    }

    /// `T_UNIFORM_ARRAY`/`V_COLLECTION_EMPTY`: reads the shared element tag
    /// from the container header once, then each element's body only.
    pub fn read_uniform_array<T: PofDecodeBody>(&mut self) -> Result<Vec<T>> {
        match self.read_tag()? {
            tid::V_COLLECTION_EMPTY => Ok(Vec::new()),
            tid::T_UNIFORM_ARRAY => {
                let _element_tag = read_packed_i32(&mut self.source)?;
                let len = read_packed_i32(&mut self.source)? as usize;
                (0..len).map(|_| T::pof_decode_body(self)).collect()
            }
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "uniform array", found: other })),
        }
    }

    /// `T_SPARSE_ARRAY`: absent indices are simply never inserted.
    pub fn read_sparse_array<T: PofDecode>(&mut self) -> Result<BTreeMap<i32, T>> {
        self.expect_tag(tid::T_SPARSE_ARRAY, "sparse array")?;
        let mut map = BTreeMap::new();
        loop {
            let index = read_packed_i32(&mut self.source)?;
            if index == -1 {
                break;
            }
            map.insert(index, T::pof_decode(self)?);
        }
        Ok(map)
    }

    /// `T_MAP`.
    pub fn read_map<K: PofDecode, V: PofDecode>(&mut self) -> Result<Vec<(K, V)>> {
        self.expect_tag(tid::T_MAP, "map")?;
        let len = read_packed_i32(&mut self.source)? as usize;
        (0..len).map(|_| Ok((K::pof_decode(self)?, V::pof_decode(self)?))).collect()
    }

    /// Resolves a stream-local shared reference. Only acyclic sharing
    /// round-trips this way; see [`crate::identity`].
    pub fn read_shared<T: PofDecode + 'static>(&mut self) -> Result<Rc<T>> {
        match self.read_tag()? {
            tid::T_IDENTITY => {
                let id = read_packed_i32(&mut self.source)?;
                let value = Rc::new(T::pof_decode(self)?);
                self.identity.insert(id, value.clone());
                Ok(value)
            }
            tid::T_REFERENCE => {
                let id = read_packed_i32(&mut self.source)?;
                self.identity.resolve(id)
            }
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "identity or reference", found: other })),
        }
    }

    /// Resolves a stream-local shared [`Value`], registering a placeholder
    /// cell before decoding the value it holds, so a `T_REFERENCE` nested
    /// inside its own `T_IDENTITY` (a true cycle) resolves to the same cell
    /// instead of recursing forever.
    fn read_shared_value(&mut self) -> Result<Value> {
        match self.read_tag()? {
            tid::T_IDENTITY => {
                let id = read_packed_i32(&mut self.source)?;
                let cell = Rc::new(RefCell::new(Value::Null));
                self.identity.insert(id, cell.clone());
                let inner = self.read_value()?;
                *cell.borrow_mut() = inner;
                Ok(Value::Shared(cell))
            }
            tid::T_REFERENCE => {
                let id = read_packed_i32(&mut self.source)?;
                let cell: Rc<RefCell<Value>> = self.identity.resolve(id)?;
                Ok(Value::Shared(cell))
            }
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "identity or reference", found: other })),
        }
    }

    /// Materializes one uniform-array element into a dynamic [`Value`],
    /// given its tag (already consumed from the container header).
    pub(crate) fn read_value_for_known_tag(&mut self, tag: i32) -> Result<Value> {
        match tag {
            tid::T_INT16 => Ok(Value::Int(self.read_int16_body()? as i64)),
            tid::T_INT32 => Ok(Value::Int(self.read_int32_body()? as i64)),
            tid::T_INT64 => Ok(Value::Int(self.read_int64_body()?)),
            tid::T_FLOAT32 => Ok(Value::Float32(self.read_float32_body()?)),
            tid::T_FLOAT64 => Ok(Value::Float64(self.read_float64_body()?)),
            tid::T_OCTET => Ok(Value::Octet(self.read_octet_body()?)),
            tid::T_CHAR => Ok(Value::Char(self.read_char_body()?)),
            tid::T_CHAR_STRING => Ok(Value::String(self.read_string_body()?)),
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "uniform array element", found: other })),
        }
    }

    /// Opens a user-type frame, verifies its tag names a type compatible
    /// with `T` (when `T` is registered), hands a scoped reader to `body`
    /// to reconstruct `T`'s own properties, then drains and discards any
    /// trailing unknown properties.
    pub fn read_user_type<T: 'static, F>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(&mut UserTypeReader<'_, '_>) -> Result<T>,
    {
        self.read_user_type_tagged(body)
    }

    fn read_user_type_tagged<T: 'static, F>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(&mut UserTypeReader<'_, '_>) -> Result<T>,
    {
        let tag = self.read_tag()?;
        if !tid::is_user_type(tag) {
            return Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "user type", found: tag }));
        }
        if !self.ctx.type_id_matches::<T>(tag) {
            tracing::warn!(tag, "decoded tag did not match the requested type's registration");
            return Err(Error::UnknownType(tag));
        }
        let version_id = read_packed_i32(&mut self.source)?;
        let mut frame = UserTypeReader::new(self, version_id);
        let value = body(&mut frame)?;
        frame.read_remainder()?;
        Ok(value)
    }

    /// Like [`Self::read_user_type`], but first resolves a `T_IDENTITY`/
    /// `T_REFERENCE` wrapper, mirroring [`crate::writer::PofWriter::write_user_type_shared`].
    pub fn read_user_type_shared<T: 'static, F>(&mut self, body: F) -> Result<Rc<T>>
    where
        F: FnOnce(&mut UserTypeReader<'_, '_>) -> Result<T>,
    {
        match self.read_tag()? {
            tid::T_IDENTITY => {
                let id = read_packed_i32(&mut self.source)?;
                let value = Rc::new(self.read_user_type_tagged(body)?);
                self.identity.insert(id, value.clone());
                Ok(value)
            }
            tid::T_REFERENCE => {
                let id = read_packed_i32(&mut self.source)?;
                self.identity.resolve(id)
            }
            other => Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "identity or reference", found: other })),
        }
    }

    /// Like [`Self::read_user_type`], but also returns the frame's version
    /// id and unconsumed remainder instead of discarding them, for
    /// [`crate::evolvable::Evolvable`].
    pub fn read_user_type_with_remainder<T, F>(&mut self, body: F) -> Result<(T, i32, Vec<u8>)>
    where
        F: FnOnce(&mut UserTypeReader<'_, '_>) -> Result<T>,
    {
        let tag = self.read_tag()?;
        if !tid::is_user_type(tag) {
            return Err(Error::Wire(pof_types::Error::TypeMismatch { expected: "user type", found: tag }));
        }
        let version_id = read_packed_i32(&mut self.source)?;
        let mut frame = UserTypeReader::new(self, version_id);
        let value = body(&mut frame)?;
        let remainder = frame.read_remainder()?;
        Ok((value, version_id, remainder))
    }

    /// Decodes a dynamic [`Value`], recursively, without any static type.
    pub fn read_value(&mut self) -> Result<Value> {
        let tag = self.peek_tag()?;
        if tid::is_user_type(tag) {
            self.read_tag()?;
            let version_id = read_packed_i32(&mut self.source)?;
            let mut properties = Vec::new();
            loop {
                let index = read_packed_i32(&mut self.source)?;
                if index == -1 {
                    return Ok(Value::UserType {
                        type_id: tag,
                        version_id,
                        properties,
                        remainder: Vec::new(),
                    });
                }
                properties.push((index, self.read_value()?));
            }
        }
        match tid::classify(tag).map_err(Error::from)? {
            tid::Family::Null => {
                self.read_null()?;
                Ok(Value::Null)
            }
            tid::Family::Boolean => Ok(Value::Bool(self.read_bool()?)),
            tid::Family::Octet => Ok(Value::Octet(self.read_octet()?)),
            tid::Family::Char => Ok(Value::Char(self.read_char()?)),
            tid::Family::Integer => Ok(Value::Int(self.read_int64()?)),
            tid::Family::Float32 => Ok(Value::Float32(self.read_float32()?)),
            tid::Family::Float64 => Ok(Value::Float64(self.read_float64()?)),
            tid::Family::Decimal => {
                let (unscaled, scale) = self.read_decimal32()?;
                Ok(Value::Decimal32(unscaled, scale))
            }
            tid::Family::Date => Ok(Value::Date(self.read_date()?)),
            tid::Family::Time => Ok(Value::Time(self.read_time()?)),
            tid::Family::DateTime => Ok(Value::DateTime(self.read_datetime()?)),
            tid::Family::YearMonthInterval => Ok(Value::YearMonthInterval(self.read_year_month_interval()?)),
            tid::Family::DayTimeInterval => Ok(Value::DayTimeInterval(self.read_day_time_interval()?)),
            tid::Family::TimeInterval => Err(Error::malformed("bare time-interval family is not implemented")),
            tid::Family::OctetString => Ok(Value::OctetString(self.read_octet_string()?)),
            tid::Family::CharString => Ok(Value::String(self.read_string()?)),
            tid::Family::Array | tid::Family::Collection => Ok(Value::Array(self.read_array()?)),
            tid::Family::UniformArray | tid::Family::UniformCollection => {
                self.read_tag()?;
                let element_tag = read_packed_i32(&mut self.source)?;
                let len = read_packed_i32(&mut self.source)? as usize;
                let items = (0..len)
                    .map(|_| self.read_value_for_known_tag(element_tag))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(items))
            }
            tid::Family::SparseArray | tid::Family::UniformSparseArray => Ok(Value::SparseArray(self.read_sparse_array()?)),
            tid::Family::Map | tid::Family::UniformKeysMap | tid::Family::UniformMap => {
                self.read_tag()?;
                self.read_map_dynamic()
            }
            tid::Family::Reference | tid::Family::Identity => self.read_shared_value(),
            tid::Family::UserType => unreachable!("handled above"),
        }
    }

    fn read_map_dynamic(&mut self) -> Result<Value> {
        let len = read_packed_i32(&mut self.source)? as usize;
        let mut pairs = Vec::with_capacity(len);
        for _ in 0..len {
            let k = self.read_value()?;
            let v = self.read_value()?;
            pairs.push((k, v));
        }
        Ok(Value::Map(pairs))
    }
}
