//! Primitive `PofEncode`/`PofDecode` impls and the dynamic [`Value`] tree
//! that the navigator and facade hand back when the caller has no static
//! Rust type to decode into.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use pof_types::raw_time::{RawDate, RawDateTime, RawDayTimeInterval, RawTime, RawYearMonthInterval};
use pof_types::type_id as tid;

use crate::error::Result;
use crate::reader::PofReader;
use crate::reflect::{PofDecode, PofDecodeBody, PofEncode, PofEncodeBody};
use crate::writer::PofWriter;

/// A raw binary blob, distinct from `Vec<u8>` (which is a uniform array of
/// octets): maps to `T_OCTET_STRING` rather than `T_ARRAY`/`T_UNIFORM_ARRAY`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bytes(pub Vec<u8>);

/// A dynamically-decoded POF value: one variant per wire value family.
///
/// `Debug` and `PartialEq` are hand-written rather than derived, because
/// [`Value::Shared`] wraps an `Rc<RefCell<Value>>` cell that may point back
/// into a structure that itself holds that same `Shared` — a derived impl
/// would recurse into the cell's content and loop forever on a true cycle.
/// The hand-written impls treat `Shared` as a single opaque handle: `Debug`
/// prints the cell's address without touching its content, and `PartialEq`
/// compares `Shared` cells by pointer identity instead of structural
/// equality. This also means `Value` no longer derives `serde`'s traits
/// (unlike [`Bytes`]) — a self-referential `Rc<RefCell<Value>>` has no
/// meaningful serde encoding, so the feature is simply not offered for it.
#[derive(Clone)]
pub enum Value {
    /// `V_REFERENCE_NULL`.
    Null,
    /// `T_BOOLEAN`/`V_BOOLEAN_*`.
    Bool(bool),
    /// `T_OCTET`.
    Octet(u8),
    /// `T_CHAR`.
    Char(char),
    /// `T_INT16`/`T_INT32`/`T_INT64` and the small-int sentinels,
    /// normalized to the widest representation.
    Int(i64),
    /// `T_FLOAT32`.
    Float32(f32),
    /// `T_FLOAT64`.
    Float64(f64),
    /// `T_DECIMAL32`: `(unscaled, scale)`.
    Decimal32(i32, i32),
    /// `T_DATE`.
    Date(RawDate),
    /// `T_TIME`.
    Time(RawTime),
    /// `T_DATETIME`.
    DateTime(RawDateTime),
    /// `T_YEAR_MONTH_INTERVAL`.
    YearMonthInterval(RawYearMonthInterval),
    /// `T_DAY_TIME_INTERVAL`.
    DayTimeInterval(RawDayTimeInterval),
    /// `T_OCTET_STRING`.
    OctetString(Vec<u8>),
    /// `T_CHAR_STRING`/`V_STRING_ZERO_LENGTH`.
    String(String),
    /// `T_ARRAY`/`T_UNIFORM_ARRAY`/`V_COLLECTION_EMPTY` (as an array).
    Array(Vec<Value>),
    /// `T_SPARSE_ARRAY`/`T_UNIFORM_SPARSE_ARRAY`: absent indices are nil.
    SparseArray(BTreeMap<i32, Value>),
    /// `T_MAP`/`T_UNIFORM_KEYS_MAP`/`T_UNIFORM_MAP`.
    Map(Vec<(Value, Value)>),
    /// A registered user type, decoded generically without a static Rust
    /// type: `(user_type_id, version_id, properties, remainder)`.
    UserType {
        /// The registry type id read from the tag.
        type_id: i32,
        /// The frame's version id.
        version_id: i32,
        /// Properties in the order they were read.
        properties: Vec<(i32, Value)>,
        /// The unconsumed tail, preserved byte-exact for the Evolvable
        /// remainder mechanism.
        remainder: Vec<u8>,
    },
    /// A stream-local shared (possibly self-referential) value, read back
    /// from a `T_IDENTITY`/`T_REFERENCE` pair. Two `Shared` handles that
    /// came from the same identity are `Rc::ptr_eq`.
    Shared(Rc<RefCell<Value>>),
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Octet(o) => f.debug_tuple("Octet").field(o).finish(),
            Value::Char(c) => f.debug_tuple("Char").field(c).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Float32(v) => f.debug_tuple("Float32").field(v).finish(),
            Value::Float64(v) => f.debug_tuple("Float64").field(v).finish(),
            Value::Decimal32(u, s) => f.debug_tuple("Decimal32").field(u).field(s).finish(),
            Value::Date(v) => f.debug_tuple("Date").field(v).finish(),
            Value::Time(v) => f.debug_tuple("Time").field(v).finish(),
            Value::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
            Value::YearMonthInterval(v) => f.debug_tuple("YearMonthInterval").field(v).finish(),
            Value::DayTimeInterval(v) => f.debug_tuple("DayTimeInterval").field(v).finish(),
            Value::OctetString(v) => f.debug_tuple("OctetString").field(v).finish(),
            Value::String(v) => f.debug_tuple("String").field(v).finish(),
            Value::Array(v) => f.debug_tuple("Array").field(v).finish(),
            Value::SparseArray(v) => f.debug_tuple("SparseArray").field(v).finish(),
            Value::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Value::UserType { type_id, version_id, properties, remainder } => f
                .debug_struct("UserType")
                .field("type_id", type_id)
                .field("version_id", version_id)
                .field("properties", properties)
                .field("remainder", remainder)
                .finish(),
            Value::Shared(cell) => write!(f, "Shared(@{:p})", Rc::as_ptr(cell)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Octet(a), Value::Octet(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Decimal32(au, asc), Value::Decimal32(bu, bsc)) => au == bu && asc == bsc,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::YearMonthInterval(a), Value::YearMonthInterval(b)) => a == b,
            (Value::DayTimeInterval(a), Value::DayTimeInterval(b)) => a == b,
            (Value::OctetString(a), Value::OctetString(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::SparseArray(a), Value::SparseArray(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (
                Value::UserType { type_id: at, version_id: av, properties: ap, remainder: ar },
                Value::UserType { type_id: bt, version_id: bv, properties: bp, remainder: br },
            ) => at == bt && av == bv && ap == bp && ar == br,
            (Value::Shared(a), Value::Shared(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------
// Primitive PofEncode/PofDecode
// ---------------------------------------------------------------------

impl PofEncode for bool {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_bool(*self)
    }
}
impl PofDecode for bool {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_bool()
    }
}

impl PofEncode for u8 {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_octet(*self)
    }
}
impl PofDecode for u8 {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_octet()
    }
}

impl PofEncode for char {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_char(*self)
    }
}
impl PofDecode for char {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_char()
    }
}

macro_rules! impl_int {
    ($ty:ty, $write:ident, $read:ident) => {
        impl PofEncode for $ty {
            fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
                writer.$write(*self)
            }
        }
        impl PofDecode for $ty {
            fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
                reader.$read()
            }
        }
    };
}

impl_int!(i16, write_int16, read_int16);
impl_int!(i32, write_int32, read_int32);
impl_int!(i64, write_int64, read_int64);

impl PofEncode for f32 {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_float32(*self)
    }
}
impl PofDecode for f32 {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_float32()
    }
}

impl PofEncode for f64 {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_float64(*self)
    }
}
impl PofDecode for f64 {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_float64()
    }
}

impl PofEncode for String {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_string(self)
    }
}

// ---------------------------------------------------------------------
// Body-only codec for uniform array elements
// ---------------------------------------------------------------------
//
// A uniform array writes its element type's tag exactly once, in the
// container header, so each element's own body is written with no leading
// tag and no sentinel narrowing (every slot has to have the same shape).
// `pof_tag()` is what the container header actually writes; it is also the
// tag `PofReader::read_value_for_known_tag` matches on when materializing
// one such element into a dynamic `Value` without a static Rust type.

macro_rules! impl_body_copy {
    ($ty:ty, $tag:expr, $write:ident, $read:ident) => {
        impl PofEncodeBody for $ty {
            fn pof_tag() -> i32 {
                $tag
            }
            fn pof_encode_body(&self, writer: &mut PofWriter<'_>) -> Result<()> {
                writer.$write(*self)
            }
        }
        impl PofDecodeBody for $ty {
            fn pof_decode_body(reader: &mut PofReader<'_>) -> Result<Self> {
                reader.$read()
            }
        }
    };
}

impl_body_copy!(i16, tid::T_INT16, write_int16_body, read_int16_body);
impl_body_copy!(i32, tid::T_INT32, write_int32_body, read_int32_body);
impl_body_copy!(i64, tid::T_INT64, write_int64_body, read_int64_body);
impl_body_copy!(f32, tid::T_FLOAT32, write_float32_body, read_float32_body);
impl_body_copy!(f64, tid::T_FLOAT64, write_float64_body, read_float64_body);
impl_body_copy!(u8, tid::T_OCTET, write_octet_body, read_octet_body);
impl_body_copy!(char, tid::T_CHAR, write_char_body, read_char_body);

impl PofEncodeBody for String {
    fn pof_tag() -> i32 {
        tid::T_CHAR_STRING
    }
    fn pof_encode_body(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_string_body(self)
    }
}
impl PofDecodeBody for String {
    fn pof_decode_body(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_string_body()
    }
}
impl PofDecode for String {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_string()
    }
}

impl PofEncode for Bytes {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_octet_string(&self.0)
    }
}
impl PofDecode for Bytes {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        Ok(Bytes(reader.read_octet_string()?))
    }
}

impl PofEncode for RawDate {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_date(self)
    }
}
impl PofDecode for RawDate {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_date()
    }
}

impl PofEncode for RawTime {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_time(self)
    }
}
impl PofDecode for RawTime {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_time()
    }
}

impl PofEncode for RawDateTime {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_datetime(self)
    }
}
impl PofDecode for RawDateTime {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_datetime()
    }
}

impl PofEncode for RawYearMonthInterval {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_year_month_interval(self)
    }
}
impl PofDecode for RawYearMonthInterval {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_year_month_interval()
    }
}

impl PofEncode for RawDayTimeInterval {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_day_time_interval(self)
    }
}
impl PofDecode for RawDayTimeInterval {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_day_time_interval()
    }
}

// ---------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------

impl<T: PofEncode> PofEncode for Option<T> {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        match self {
            Some(v) => v.pof_encode(writer),
            None => writer.write_null(),
        }
    }
}
impl<T: PofDecode> PofDecode for Option<T> {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        if reader.peek_is_null()? {
            reader.read_null()?;
            Ok(None)
        } else {
            Ok(Some(T::pof_decode(reader)?))
        }
    }
}

impl<T: PofEncode> PofEncode for Vec<T> {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_array(self)
    }
}
impl<T: PofDecode> PofDecode for Vec<T> {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_array()
    }
}

impl<T: PofEncode> PofEncode for BTreeMap<i32, T> {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_sparse_array(self)
    }
}
impl<T: PofDecode> PofDecode for BTreeMap<i32, T> {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_sparse_array()
    }
}

/// A `T_MAP`-encoded ordered list of key/value pairs.
///
/// A distinct wrapper from `Vec<(K, V)>` rather than a blanket impl over
/// tuples, so it doesn't collide with the generic `Vec<T>` (`T_ARRAY`)
/// impl under Rust's overlap rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Map<K, V>(pub Vec<(K, V)>);

impl<K: PofEncode, V: PofEncode> PofEncode for Map<K, V> {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_map(&self.0)
    }
}
impl<K: PofDecode, V: PofDecode> PofDecode for Map<K, V> {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        Ok(Map(reader.read_map()?))
    }
}

impl<T: PofEncode + 'static> PofEncode for Rc<T> {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        writer.write_shared(self)
    }
}
impl<T: PofDecode + 'static> PofDecode for Rc<T> {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_shared()
    }
}

// ---------------------------------------------------------------------
// Dynamic Value
// ---------------------------------------------------------------------

impl PofEncode for Value {
    fn pof_encode(&self, writer: &mut PofWriter<'_>) -> Result<()> {
        match self {
            Value::Null => writer.write_null(),
            Value::Bool(b) => writer.write_bool(*b),
            Value::Octet(o) => writer.write_octet(*o),
            Value::Char(c) => writer.write_char(*c),
            Value::Int(n) => writer.write_int64(*n),
            Value::Float32(f) => writer.write_float32(*f),
            Value::Float64(f) => writer.write_float64(*f),
            Value::Decimal32(unscaled, scale) => writer.write_decimal32(*unscaled, *scale),
            Value::Date(d) => writer.write_date(d),
            Value::Time(t) => writer.write_time(t),
            Value::DateTime(dt) => writer.write_datetime(dt),
            Value::YearMonthInterval(i) => writer.write_year_month_interval(i),
            Value::DayTimeInterval(i) => writer.write_day_time_interval(i),
            Value::OctetString(bytes) => writer.write_octet_string(bytes),
            Value::String(s) => writer.write_string(s),
            Value::Array(items) => writer.write_array(items),
            Value::SparseArray(map) => writer.write_sparse_array(map),
            Value::Map(pairs) => writer.write_map(pairs),
            Value::UserType {
                type_id,
                version_id,
                properties,
                remainder,
            } => writer.write_user_type_dynamic(*type_id, *version_id, properties, remainder),
            Value::Shared(cell) => writer.write_shared_value(cell),
        }
    }
}

impl PofDecode for Value {
    fn pof_decode(reader: &mut PofReader<'_>) -> Result<Self> {
        reader.read_value()
    }
}
