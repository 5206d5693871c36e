//! The consumer-facing façade: the single call most external extractors and
//! indexers need — given an encoded blob and an index path, produce a value
//! — without touching the reader, registry, or navigator types directly.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::navigator::PofValue;
use crate::reader::PofReader;
use crate::reflect::PofDecode;
use crate::value::Value;

/// A thin façade bundling a [`Context`] for repeated blob queries.
#[derive(Clone)]
pub struct PofFacade {
    ctx: Context,
}

impl PofFacade {
    /// Builds a façade bound to `ctx`'s type registry.
    pub fn new(ctx: Context) -> Self {
        PofFacade { ctx }
    }

    /// Navigates `blob` along `path` and decodes the value found there into
    /// the dynamic [`Value`] tree. A path ending on a sparse-array hole
    /// yields `Value::Null` rather than an error.
    pub fn extract(&self, blob: &[u8], path: &[i32]) -> Result<Value> {
        let root = PofValue::open(blob, self.ctx.clone());
        match root.at(path)? {
            Some(found) => found.value(),
            None => Ok(Value::Null),
        }
    }

    /// Like [`Self::extract`], but decodes into a concrete static type `T`
    /// instead of the dynamic tree. Not usable to extract a single element
    /// out of a `T_UNIFORM_ARRAY`: the element's tag lives in the
    /// container header, not in the element's own bytes, so `T::pof_decode`
    /// has nothing to match against there — use [`Self::extract`] followed
    /// by a `Value` match for that case.
    pub fn extract_as<T: PofDecode>(&self, blob: &[u8], path: &[i32]) -> Result<T> {
        let root = PofValue::open(blob, self.ctx.clone());
        let found = root
            .at(path)?
            .ok_or(Error::NavigationError("path descended through a sparse-array hole"))?;
        T::pof_decode(&mut PofReader::new(found.as_bytes(), self.ctx.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::PofWriter;

    #[test]
    fn extracts_an_array_element_by_path() {
        let ctx = Context::new();
        let mut buf = Vec::new();
        {
            let mut writer = PofWriter::new(&mut buf, ctx.clone());
            writer.write_array(&[1i32, 2, 3]).unwrap();
        }
        let facade = PofFacade::new(ctx);
        assert_eq!(facade.extract(&buf, &[1]).unwrap(), Value::Int(2));
        assert_eq!(facade.extract_as::<i32>(&buf, &[1]).unwrap(), 2);
    }

    #[test]
    fn extracting_a_sparse_hole_yields_null() {
        let ctx = Context::new();
        let mut buf = Vec::new();
        {
            let mut writer = PofWriter::new(&mut buf, ctx.clone());
            let mut entries = std::collections::BTreeMap::new();
            entries.insert(0, 1i32);
            writer.write_sparse_array(&entries).unwrap();
        }
        let facade = PofFacade::new(ctx);
        assert_eq!(facade.extract(&buf, &[4]).unwrap(), Value::Null);
    }
}
