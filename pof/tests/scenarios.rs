//! End-to-end scenarios, reproducing the schematic byte sequences of the
//! wire format's representative encodings.

use std::collections::BTreeMap;
use std::rc::Rc;

use pof::{Context, PofDecode, PofEncode, PofReader, PofWriter, Value};
use pof_types::packed::write_packed_i32;
use pof_types::type_id as tid;

#[test]
fn scenario_1_compact_int() {
    let ctx = Context::new();
    let mut buf = Vec::new();
    PofWriter::new(&mut buf, ctx.clone()).write_int32(0).unwrap();

    let mut reader = PofReader::new(&buf, ctx);
    assert_eq!(reader.read_int32().unwrap(), 0);
}

#[test]
fn scenario_2_user_type_with_two_scalars() {
    struct Point {
        x: i32,
        y: i32,
    }
    impl pof::PofEncodeFields for Point {
        fn pof_encode_fields(&self, frame: &mut pof::user_type::UserTypeWriter<'_, '_>) -> pof::Result<()> {
            frame.write_property(0, &self.x)?;
            frame.write_property(1, &self.y)
        }
    }
    impl pof::PofDecodeFields for Point {
        fn pof_decode_fields(frame: &mut pof::user_type::UserTypeReader<'_, '_>) -> pof::Result<Self> {
            Ok(Point {
                x: frame.read_property(0)?,
                y: frame.read_property(1)?,
            })
        }
    }
    impl pof::Reflected for Point {
        fn metadata() -> &'static [pof::reflect::AttributeMeta] {
            &[
                pof::reflect::AttributeMeta {
                    name: "x",
                    index: 0,
                    explicit_index: true,
                },
                pof::reflect::AttributeMeta {
                    name: "y",
                    index: 1,
                    explicit_index: true,
                },
            ]
        }
    }

    let ctx = Context::new();
    ctx.register::<Point>(7, "Point").unwrap();

    let mut buf = Vec::new();
    {
        let mut writer = PofWriter::new(&mut buf, ctx.clone());
        Point { x: 3, y: -1 }.pof_encode(&mut writer).unwrap();
    }

    let mut reader = PofReader::new(&buf, ctx);
    let decoded = Point::pof_decode(&mut reader).unwrap();
    assert_eq!((decoded.x, decoded.y), (3, -1));
}

#[test]
fn scenario_4_sparse_array_with_a_hole() {
    let ctx = Context::new();
    let mut buf = Vec::new();
    {
        let mut writer = PofWriter::new(&mut buf, ctx.clone());
        let mut entries: BTreeMap<i32, String> = BTreeMap::new();
        entries.insert(0, "a".to_string());
        entries.insert(5, "b".to_string());
        writer.write_sparse_array(&entries).unwrap();
    }

    let root = pof::PofValue::open(&buf, ctx);
    assert!(root.child(3).unwrap().is_none());
    assert_eq!(root.child(0).unwrap().unwrap().value().unwrap(), Value::String("a".into()));
    assert_eq!(root.child(5).unwrap().unwrap().value().unwrap(), Value::String("b".into()));
}

#[test]
fn scenario_6_navigator_patch() {
    struct Point {
        x: i32,
        y: i32,
    }
    impl pof::PofEncodeFields for Point {
        fn pof_encode_fields(&self, frame: &mut pof::user_type::UserTypeWriter<'_, '_>) -> pof::Result<()> {
            frame.write_property(0, &self.x)?;
            frame.write_property(1, &self.y)
        }
    }
    impl pof::Reflected for Point {
        fn metadata() -> &'static [pof::reflect::AttributeMeta] {
            &[]
        }
    }

    let ctx = Context::new();
    ctx.register::<Point>(7, "Point").unwrap();

    let mut original = Vec::new();
    {
        let mut writer = PofWriter::new(&mut original, ctx.clone());
        Point { x: 3, y: -1 }.pof_encode(&mut writer).unwrap();
    }

    let root = pof::PofValue::open(&original, ctx.clone());
    let mut patch = pof::PofPatch::new(root);
    let mut new_y = Vec::new();
    PofWriter::new(&mut new_y, ctx.clone()).write_int32(42).unwrap();
    patch.set_property(1, new_y).unwrap();
    let patched = patch.apply_changes().unwrap();

    let mut expected = Vec::new();
    {
        let mut writer = PofWriter::new(&mut expected, ctx.clone());
        Point { x: 3, y: 42 }.pof_encode(&mut writer).unwrap();
    }
    assert_eq!(patched, expected);

    // Bytes preceding y's body (tag, version, x's index+value, y's index)
    // are byte-identical to the original.
    let shared_prefix_len = original
        .iter()
        .zip(expected.iter())
        .take_while(|(a, b)| a == b)
        .count();
    assert!(shared_prefix_len > 0);
    assert_eq!(original[..shared_prefix_len], expected[..shared_prefix_len]);
}

#[test]
fn identity_fidelity_for_acyclic_sharing() {
    let ctx = Context::new();
    let shared = Rc::new(5i32);
    let pair = (shared.clone(), shared.clone());

    let mut buf = Vec::new();
    {
        let mut writer = PofWriter::new(&mut buf, ctx.clone());
        pair.0.pof_encode(&mut writer).unwrap();
        pair.1.pof_encode(&mut writer).unwrap();
    }

    let mut reader = PofReader::new(&buf, ctx);
    let a: Rc<i32> = reader.read_shared().unwrap();
    let b: Rc<i32> = reader.read_shared().unwrap();
    assert!(Rc::ptr_eq(&a, &b));
}

#[test]
fn scenario_3_uniform_int_array() {
    let ctx = Context::new();
    let mut buf = Vec::new();
    {
        let mut writer = PofWriter::new(&mut buf, ctx.clone());
        writer.write_uniform_array(&[10i32, 20, 30]).unwrap();
    }

    let mut expected = Vec::new();
    write_packed_i32(&mut expected, tid::T_UNIFORM_ARRAY).unwrap();
    write_packed_i32(&mut expected, tid::T_INT32).unwrap();
    write_packed_i32(&mut expected, 3).unwrap();
    write_packed_i32(&mut expected, 10).unwrap();
    write_packed_i32(&mut expected, 20).unwrap();
    write_packed_i32(&mut expected, 30).unwrap();
    assert_eq!(buf, expected);

    let mut reader = PofReader::new(&buf, ctx);
    let values: Vec<i32> = reader.read_uniform_array().unwrap();
    assert_eq!(values, vec![10, 20, 30]);
}

#[test]
fn scenario_5_identity_and_cycle() {
    // A value that is its own `T_IDENTITY` payload: `IDENTITY(0) -> REFERENCE(0)`.
    let mut buf = Vec::new();
    write_packed_i32(&mut buf, tid::T_IDENTITY).unwrap();
    write_packed_i32(&mut buf, 0).unwrap();
    write_packed_i32(&mut buf, tid::T_REFERENCE).unwrap();
    write_packed_i32(&mut buf, 0).unwrap();

    let ctx = Context::new();
    let mut reader = PofReader::new(&buf, ctx);
    let value = reader.read_value().unwrap();

    match &value {
        Value::Shared(cell) => match &*cell.borrow() {
            Value::Shared(inner) => assert!(Rc::ptr_eq(cell, inner)),
            other => panic!("expected a self-reference, got {other:?}"),
        },
        other => panic!("expected Value::Shared, got {other:?}"),
    }
}
