//! Property tests for the universal invariants that operate above
//! the packed-integer layer (which `pof-types` already covers on its own).

use pof::{Context, PofDecode, PofEncode, PofReader, PofWriter};

#[quickcheck_macros::quickcheck]
fn array_of_ints_roundtrips(values: Vec<i32>) -> bool {
    let ctx = Context::new();
    let mut buf = Vec::new();
    {
        let mut writer = PofWriter::new(&mut buf, ctx.clone());
        values.pof_encode(&mut writer).unwrap();
    }
    let mut reader = PofReader::new(&buf, ctx);
    Vec::<i32>::pof_decode(&mut reader).unwrap() == values
}

#[quickcheck_macros::quickcheck]
fn string_roundtrips(value: String) -> bool {
    let ctx = Context::new();
    let mut buf = Vec::new();
    {
        let mut writer = PofWriter::new(&mut buf, ctx.clone());
        value.pof_encode(&mut writer).unwrap();
    }
    let mut reader = PofReader::new(&buf, ctx);
    String::pof_decode(&mut reader).unwrap() == value
}

#[test]
fn navigator_neutrality_with_no_mutation() {
    let ctx = Context::new();
    let mut buf = Vec::new();
    {
        let mut writer = PofWriter::new(&mut buf, ctx.clone());
        writer.write_array(&[1i32, 2, 3]).unwrap();
    }
    let root = pof::PofValue::open(&buf, ctx);
    let patch = pof::PofPatch::new(root);
    assert_eq!(patch.apply_changes().unwrap(), buf);
}

#[test]
fn out_of_order_property_index_is_rejected() {
    let ctx = Context::new();
    let mut buf = Vec::new();
    {
        let mut writer = PofWriter::new(&mut buf, ctx.clone());
        writer
            .write_user_type(1, 0, |frame| {
                frame.write_property(2, &1i32)?;
                // Writing a lower index after a higher one must fail before
                // any bytes reach the sink for this property.
                let result = frame.write_property(1, &2i32);
                assert!(result.is_err());
                Ok(())
            })
            .unwrap();
    }
}
