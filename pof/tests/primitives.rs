//! Primitive round-trip coverage for `pof::writer`/`pof::reader`, across
//! the sentinel-narrowing boundaries for integers and floats.

use pof::{Context, PofReader, PofWriter};
use pof_types::raw_time::RawDate;
use rstest::rstest;

#[rstest]
#[case(-1)]
#[case(0)]
#[case(22)]
#[case(23)]
#[case(-2)]
#[case(i32::MAX)]
#[case(i32::MIN)]
fn int32_roundtrips(#[case] value: i32) {
    let ctx = Context::new();
    let mut buf = Vec::new();
    PofWriter::new(&mut buf, ctx.clone()).write_int32(value).unwrap();
    assert_eq!(PofReader::new(&buf, ctx).read_int32().unwrap(), value);
}

#[rstest]
#[case(0.0)]
#[case(-0.0)]
#[case(1.5)]
#[case(f64::INFINITY)]
#[case(f64::NEG_INFINITY)]
fn float64_roundtrips(#[case] value: f64) {
    let ctx = Context::new();
    let mut buf = Vec::new();
    PofWriter::new(&mut buf, ctx.clone()).write_float64(value).unwrap();
    assert_eq!(PofReader::new(&buf, ctx).read_float64().unwrap(), value);
}

#[test]
fn float64_nan_roundtrips_as_nan() {
    let ctx = Context::new();
    let mut buf = Vec::new();
    PofWriter::new(&mut buf, ctx.clone()).write_float64(f64::NAN).unwrap();
    assert!(PofReader::new(&buf, ctx).read_float64().unwrap().is_nan());
}

#[rstest]
#[case(true)]
#[case(false)]
fn bool_roundtrips(#[case] value: bool) {
    let ctx = Context::new();
    let mut buf = Vec::new();
    PofWriter::new(&mut buf, ctx.clone()).write_bool(value).unwrap();
    assert_eq!(PofReader::new(&buf, ctx).read_bool().unwrap(), value);
}

#[rstest]
#[case("")]
#[case("hello")]
#[case("\u{1F980}")]
fn string_roundtrips(#[case] value: &str) {
    let ctx = Context::new();
    let mut buf = Vec::new();
    PofWriter::new(&mut buf, ctx.clone()).write_string(value).unwrap();
    assert_eq!(PofReader::new(&buf, ctx).read_string().unwrap(), value);
}

#[test]
fn decimal32_roundtrips() {
    let ctx = Context::new();
    let mut buf = Vec::new();
    PofWriter::new(&mut buf, ctx.clone()).write_decimal32(12345, 2).unwrap();
    assert_eq!(PofReader::new(&buf, ctx).read_decimal32().unwrap(), (12345, 2));
}

#[test]
fn date_roundtrips() {
    let ctx = Context::new();
    let date = RawDate {
        year: 2026,
        month: 7,
        day: 28,
    };
    let mut buf = Vec::new();
    PofWriter::new(&mut buf, ctx.clone()).write_date(&date).unwrap();
    assert_eq!(PofReader::new(&buf, ctx).read_date().unwrap(), date);
}

#[test]
fn octet_string_roundtrips() {
    let ctx = Context::new();
    let bytes = [1u8, 2, 3, 4, 5];
    let mut buf = Vec::new();
    PofWriter::new(&mut buf, ctx.clone()).write_octet_string(&bytes).unwrap();
    assert_eq!(PofReader::new(&buf, ctx).read_octet_string().unwrap(), bytes);
}
