//! The zero-copy value navigator: a lazy cursor over an encoded blob that
//! descends an ordered path of child indices without materializing any
//! sibling it doesn't visit, plus a patch-and-reassemble mutation API for
//! user-type values.

use itertools::Itertools;
use pof_types::packed::{read_packed_i32, write_packed_i32};
use pof_types::type_id::{self as tid, Family};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::reader::PofReader;
use crate::skip::{skip_body, skip_value};
use crate::value::Value;

/// A cursor over one value within an encoded blob, bound to a [`Context`]
/// for subsequent decode.
///
/// `PofValue` never decodes more than the value it's asked about: opening a
/// root and calling [`Self::child`] reads only the tag of each sibling
/// skipped along the way, never their full contents.
#[derive(Clone)]
pub struct PofValue<'a> {
    bytes: &'a [u8],
    ctx: Context,
    /// `Some(tag)` when this cursor's bytes are a tag-elided uniform-array
    /// element: the tag lives in the container header, not in `bytes`
    /// itself, so [`Self::value`] has to be told what it is.
    element_tag: Option<i32>,
}

impl<'a> PofValue<'a> {
    /// Opens `bytes` as a navigable root value, bound to `ctx`'s registry.
    pub fn open(bytes: &'a [u8], ctx: Context) -> Self {
        PofValue { bytes, ctx, element_tag: None }
    }

    /// This cursor's raw encoded bytes (leading tag included, unless this is
    /// a tag-elided uniform-array element).
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Decodes this cursor's value into the dynamic [`Value`] tree.
    pub fn value(&self) -> Result<Value> {
        let mut reader = PofReader::new(self.bytes, self.ctx.clone());
        match self.element_tag {
            Some(tag) => reader.read_value_for_known_tag(tag),
            None => reader.read_value(),
        }
    }

    /// Descends into child `index`.
    ///
    /// For an array or map this is the element/pair position; for a sparse
    /// array it's the sparse index itself, and a hole there (an index never
    /// written by the encoder) yields `Ok(None)` rather than an error — the
    /// sparse-array nil semantics. A value with no children, or an
    /// out-of-range index under non-sparse semantics, is a
    /// [`Error::NavigationError`].
    pub fn child(&self, index: i32) -> Result<Option<PofValue<'a>>> {
        let mut probe = self.bytes;
        let tag = read_packed_i32(&mut probe)?;
        if tid::is_user_type(tag) {
            return self.child_of_user_type(probe, index);
        }
        match tid::classify(tag).map_err(Error::from)? {
            Family::Array | Family::Collection | Family::UniformArray | Family::UniformCollection => {
                self.child_of_array(tag, probe, index)
            }
            Family::SparseArray | Family::UniformSparseArray => self.child_of_sparse_array(tag, probe, index),
            Family::Map | Family::UniformKeysMap | Family::UniformMap => self.child_of_map(tag, probe, index),
            _ => Err(Error::NavigationError("value has no children")),
        }
    }

    /// Descends a full path of child indices, in order. The last step may
    /// resolve to a sparse-array hole (`Ok(None)`); any earlier step doing
    /// so is a [`Error::NavigationError`], since there is nothing further to
    /// descend into.
    pub fn at(&self, path: &[i32]) -> Result<Option<PofValue<'a>>> {
        let mut current = self.clone();
        for (i, &index) in path.iter().enumerate() {
            match current.child(index)? {
                Some(next) => current = next,
                None if i + 1 == path.len() => return Ok(None),
                None => return Err(Error::NavigationError("path descended through a sparse-array hole")),
            }
        }
        Ok(Some(current))
    }

    fn child_of_user_type(&self, mut probe: &'a [u8], target: i32) -> Result<Option<PofValue<'a>>> {
        let _version = read_packed_i32(&mut probe)?;
        loop {
            let idx = read_packed_i32(&mut probe)?;
            if idx == -1 {
                return Ok(None);
            }
            let value_start = probe;
            let found = idx == target;
            skip_value(&mut probe)?;
            if found {
                let len = value_start.len() - probe.len();
                return Ok(Some(PofValue {
                    bytes: &value_start[..len],
                    ctx: self.ctx.clone(),
                    element_tag: None,
                }));
            }
        }
    }

    fn child_of_array(&self, tag: i32, mut probe: &'a [u8], target: i32) -> Result<Option<PofValue<'a>>> {
        if tag == tid::V_COLLECTION_EMPTY {
            return Err(Error::NavigationError("array index out of range"));
        }
        let uniform = matches!(tid::classify(tag).map_err(Error::from)?, Family::UniformArray | Family::UniformCollection);
        let element_tag = if uniform { Some(read_packed_i32(&mut probe)?) } else { None };
        let len = read_packed_i32(&mut probe)?;
        if target < 0 || target >= len {
            return Err(Error::NavigationError("array index out of range"));
        }
        for i in 0..len {
            let value_start = probe;
            match element_tag {
                Some(elem_tag) => skip_body(&mut probe, elem_tag)?,
                None => skip_value(&mut probe)?,
            }
            if i == target {
                let len = value_start.len() - probe.len();
                return Ok(Some(PofValue {
                    bytes: &value_start[..len],
                    ctx: self.ctx.clone(),
                    element_tag,
                }));
            }
        }
        unreachable!("target range-checked against len above")
    }

    fn child_of_sparse_array(&self, tag: i32, mut probe: &'a [u8], target: i32) -> Result<Option<PofValue<'a>>> {
        if matches!(tid::classify(tag).map_err(Error::from)?, Family::UniformSparseArray) {
            let _element_tag = read_packed_i32(&mut probe)?;
        }
        loop {
            let idx = read_packed_i32(&mut probe)?;
            if idx == -1 {
                return Ok(None);
            }
            let value_start = probe;
            let found = idx == target;
            skip_value(&mut probe)?;
            if found {
                let len = value_start.len() - probe.len();
                return Ok(Some(PofValue {
                    bytes: &value_start[..len],
                    ctx: self.ctx.clone(),
                    element_tag: None,
                }));
            }
        }
    }

    /// Maps address `index` as the `index`-th pair's value, keyed by
    /// position rather than by a decoded key — path navigation into a map
    /// is positional, matching the array/sparse-array addressing scheme.
    fn child_of_map(&self, _tag: i32, mut probe: &'a [u8], target: i32) -> Result<Option<PofValue<'a>>> {
        let len = read_packed_i32(&mut probe)?;
        if target < 0 || target >= len {
            return Err(Error::NavigationError("map index out of range"));
        }
        for i in 0..len {
            skip_value(&mut probe)?; // key
            let value_start = probe;
            skip_value(&mut probe)?; // value
            if i == target {
                let len = value_start.len() - probe.len();
                return Ok(Some(PofValue {
                    bytes: &value_start[..len],
                    ctx: self.ctx.clone(),
                    element_tag: None,
                }));
            }
        }
        unreachable!("target range-checked against len above")
    }
}

/// One contiguous span of a reassembled buffer, produced by the
/// patch-and-reassemble mutation API: either copied verbatim from the
/// original blob, or substituted with freshly-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaSegment {
    /// `original[offset..offset + len]`, copied unchanged.
    Unchanged {
        /// Start offset within the patch root's own byte range.
        offset: usize,
        /// Number of bytes to copy.
        len: usize,
    },
    /// Bytes to splice in instead of the corresponding original span.
    Replaced(Vec<u8>),
}

/// A staged set of property replacements against one user-type
/// [`PofValue`], reassembled without re-encoding any untouched sibling
/// property.
pub struct PofPatch<'a> {
    root: PofValue<'a>,
    edits: std::collections::BTreeMap<i32, Vec<u8>>,
}

impl<'a> PofPatch<'a> {
    /// Starts a patch over `root` with no edits staged. `root` must be a
    /// user-type value; non-user-type roots are rejected lazily, at
    /// [`Self::changes`]/[`Self::apply_changes`] time.
    pub fn new(root: PofValue<'a>) -> Self {
        PofPatch {
            root,
            edits: std::collections::BTreeMap::new(),
        }
    }

    /// Stages property `index` to be replaced by `encoded`, a complete
    /// tag-and-body encoding of the new value. Rejects staging a mutation
    /// on a `T_REFERENCE` cursor (`Error::AmbiguousMutation`): mutate the
    /// `T_IDENTITY` origin instead.
    pub fn set_property(&mut self, index: i32, encoded: Vec<u8>) -> Result<()> {
        let mut probe = self.root.bytes;
        let tag = read_packed_i32(&mut probe)?;
        if tid::classify(tag).map_err(Error::from)? == Family::Reference {
            return Err(Error::AmbiguousMutation);
        }
        self.edits.insert(index, encoded);
        Ok(())
    }

    /// Computes the ordered delta segments covering the patch root's full
    /// byte range. With no staged edits this is always the whole root,
    /// copied unchanged, regardless of what kind of value the root is —
    /// opening a blob and reassembling it without touching anything is a
    /// no-op for any value, not just user types. With edits staged, a
    /// user-type root walks its property stream (index prefix, then
    /// unchanged-or-replaced value, repeated, then the `-1` terminator and
    /// any remainder); a sparse-array root walks its `(index, value)`
    /// entries the same way, additionally splicing in edits whose index
    /// isn't present yet. Adjacent `Unchanged` segments are coalesced into
    /// one span.
    pub fn changes(&self) -> Result<Vec<DeltaSegment>> {
        let root = self.root.bytes;
        if self.edits.is_empty() {
            return Ok(vec![DeltaSegment::Unchanged { offset: 0, len: root.len() }]);
        }
        let mut probe = root;
        let tag = read_packed_i32(&mut probe)?;
        if tid::is_user_type(tag) {
            return self.changes_user_type(root, probe);
        }
        match tid::classify(tag).map_err(Error::from)? {
            Family::SparseArray | Family::UniformSparseArray => self.changes_sparse_array(tag, root, probe),
            _ => Err(Error::NavigationError("patch edits are only supported for user-type and sparse-array roots")),
        }
    }

    fn changes_user_type(&self, root: &'a [u8], mut probe: &'a [u8]) -> Result<Vec<DeltaSegment>> {
        let mut segments = Vec::new();
        read_packed_i32(&mut probe)?; // version id
        let header_end = root.len() - probe.len();
        segments.push(DeltaSegment::Unchanged { offset: 0, len: header_end });

        loop {
            let index_start = root.len() - probe.len();
            let idx = read_packed_i32(&mut probe)?;
            let index_end = root.len() - probe.len();
            if idx == -1 {
                segments.push(DeltaSegment::Unchanged {
                    offset: index_start,
                    len: root.len() - index_start,
                });
                return Ok(Self::coalesced(segments));
            }
            segments.push(DeltaSegment::Unchanged {
                offset: index_start,
                len: index_end - index_start,
            });
            let value_start = probe;
            skip_value(&mut probe)?;
            let value_start_offset = root.len() - value_start.len();
            let value_end_offset = root.len() - probe.len();
            match self.edits.get(&idx) {
                Some(replacement) => segments.push(DeltaSegment::Replaced(replacement.clone())),
                None => segments.push(DeltaSegment::Unchanged {
                    offset: value_start_offset,
                    len: value_end_offset - value_start_offset,
                }),
            }
        }
    }

    /// Walks a sparse array's `(index, value)` entries, splicing in any
    /// staged edit whose index falls between two existing entries (or
    /// before the `-1` terminator) as a brand new entry, and replacing the
    /// value of an edit whose index already exists — the tie-break that
    /// lets a patch both overwrite a present sparse index and introduce an
    /// absent one in the same pass.
    fn changes_sparse_array(&self, tag: i32, root: &'a [u8], mut probe: &'a [u8]) -> Result<Vec<DeltaSegment>> {
        let mut segments = Vec::new();
        if matches!(tid::classify(tag).map_err(Error::from)?, Family::UniformSparseArray) {
            read_packed_i32(&mut probe)?; // element tag
        }
        let header_end = root.len() - probe.len();
        segments.push(DeltaSegment::Unchanged { offset: 0, len: header_end });

        let mut pending = self.edits.iter().peekable();
        loop {
            let index_start = root.len() - probe.len();
            let idx = read_packed_i32(&mut probe)?;
            while let Some((&edit_idx, _)) = pending.peek() {
                if idx != -1 && edit_idx >= idx {
                    break;
                }
                let (edit_idx, encoded) = pending.next().expect("just peeked");
                segments.push(Self::spliced_entry(*edit_idx, encoded));
            }
            let index_end = root.len() - probe.len();
            if idx == -1 {
                segments.push(DeltaSegment::Unchanged {
                    offset: index_start,
                    len: root.len() - index_start,
                });
                return Ok(Self::coalesced(segments));
            }
            segments.push(DeltaSegment::Unchanged {
                offset: index_start,
                len: index_end - index_start,
            });
            let value_start = probe;
            skip_value(&mut probe)?;
            let value_start_offset = root.len() - value_start.len();
            let value_end_offset = root.len() - probe.len();
            match self.edits.get(&idx) {
                Some(replacement) => segments.push(DeltaSegment::Replaced(replacement.clone())),
                None => segments.push(DeltaSegment::Unchanged {
                    offset: value_start_offset,
                    len: value_end_offset - value_start_offset,
                }),
            }
        }
    }

    fn spliced_entry(index: i32, encoded: &[u8]) -> DeltaSegment {
        let mut bytes = Vec::with_capacity(5 + encoded.len());
        write_packed_i32(&mut bytes, index).expect("writing to a Vec cannot fail");
        bytes.extend_from_slice(encoded);
        DeltaSegment::Replaced(bytes)
    }

    fn coalesced(segments: Vec<DeltaSegment>) -> Vec<DeltaSegment> {
        segments
            .into_iter()
            .coalesce(|a, b| match (a, b) {
                (DeltaSegment::Unchanged { offset: o1, len: l1 }, DeltaSegment::Unchanged { offset: o2, len: l2 })
                    if o1 + l1 == o2 =>
                {
                    Ok(DeltaSegment::Unchanged { offset: o1, len: l1 + l2 })
                }
                (a, b) => Err((a, b)),
            })
            .collect()
    }

    /// Reassembles the patched value into one owned buffer.
    pub fn apply_changes(&self) -> Result<Vec<u8>> {
        let root = self.root.bytes;
        let mut out = Vec::with_capacity(root.len());
        for segment in self.changes()? {
            match segment {
                DeltaSegment::Unchanged { offset, len } => out.extend_from_slice(&root[offset..offset + len]),
                DeltaSegment::Replaced(bytes) => out.extend_from_slice(&bytes),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::PofWriter;

    fn sample_array() -> Vec<u8> {
        let ctx = Context::new();
        let mut buf = Vec::new();
        {
            let mut writer = PofWriter::new(&mut buf, ctx);
            writer.write_array(&[10i32, 20, 30]).unwrap();
        }
        buf
    }

    #[test]
    fn navigates_to_an_array_element() {
        let bytes = sample_array();
        let root = PofValue::open(&bytes, Context::new());
        let child = root.child(1).unwrap().expect("index 1 present");
        assert_eq!(child.value().unwrap(), Value::Int(20));
    }

    #[test]
    fn sparse_array_hole_is_none() {
        let ctx = Context::new();
        let mut buf = Vec::new();
        {
            let mut writer = PofWriter::new(&mut buf, ctx.clone());
            let mut entries = std::collections::BTreeMap::new();
            entries.insert(0, 1i32);
            entries.insert(5, 2i32);
            writer.write_sparse_array(&entries).unwrap();
        }
        let root = PofValue::open(&buf, ctx);
        assert!(root.child(2).unwrap().is_none());
        assert_eq!(root.child(5).unwrap().unwrap().value().unwrap(), Value::Int(2));
    }

    #[test]
    fn patch_replaces_one_property_and_leaves_others_untouched() {
        let ctx = Context::new();
        let mut buf = Vec::new();
        {
            let mut writer = PofWriter::new(&mut buf, ctx.clone());
            writer
                .write_user_type(1, 0, |frame| {
                    frame.write_property(0, &1i32)?;
                    frame.write_property(1, &2i32)
                })
                .unwrap();
        }
        let root = PofValue::open(&buf, ctx.clone());
        let mut patch = PofPatch::new(root);
        let mut replacement = Vec::new();
        {
            let mut writer = PofWriter::new(&mut replacement, ctx.clone());
            writer.write_int32(99).unwrap();
        }
        patch.set_property(1, replacement).unwrap();
        let patched = patch.apply_changes().unwrap();

        let mut reader = PofReader::new(&patched, ctx);
        let value = reader.read_value().unwrap();
        match value {
            Value::UserType { properties, .. } => {
                assert_eq!(properties, vec![(0, Value::Int(1)), (1, Value::Int(99))]);
            }
            other => panic!("expected UserType, got {other:?}"),
        }
    }

    #[test]
    fn unedited_patch_reassembles_byte_identical_for_any_root_kind() {
        let bytes = sample_array();
        let root = PofValue::open(&bytes, Context::new());
        let patch = PofPatch::new(root);
        assert_eq!(patch.apply_changes().unwrap(), bytes);
    }

    #[test]
    fn patch_splices_a_new_entry_into_a_sparse_array() {
        let ctx = Context::new();
        let mut buf = Vec::new();
        {
            let mut writer = PofWriter::new(&mut buf, ctx.clone());
            let mut entries = std::collections::BTreeMap::new();
            entries.insert(0, 1i32);
            entries.insert(5, 2i32);
            writer.write_sparse_array(&entries).unwrap();
        }
        let root = PofValue::open(&buf, ctx.clone());
        let mut patch = PofPatch::new(root);
        let mut replacement = Vec::new();
        {
            let mut writer = PofWriter::new(&mut replacement, ctx.clone());
            writer.write_int32(42).unwrap();
        }
        patch.set_property(3, replacement).unwrap();
        let patched = patch.apply_changes().unwrap();

        let mut reader = PofReader::new(&patched, ctx);
        match reader.read_value().unwrap() {
            Value::SparseArray(entries) => {
                assert_eq!(entries.get(&0), Some(&Value::Int(1)));
                assert_eq!(entries.get(&3), Some(&Value::Int(42)));
                assert_eq!(entries.get(&5), Some(&Value::Int(2)));
            }
            other => panic!("expected SparseArray, got {other:?}"),
        }
    }

    #[test]
    fn patch_replaces_an_existing_sparse_array_entry() {
        let ctx = Context::new();
        let mut buf = Vec::new();
        {
            let mut writer = PofWriter::new(&mut buf, ctx.clone());
            let mut entries = std::collections::BTreeMap::new();
            entries.insert(0, 1i32);
            entries.insert(5, 2i32);
            writer.write_sparse_array(&entries).unwrap();
        }
        let root = PofValue::open(&buf, ctx.clone());
        let mut patch = PofPatch::new(root);
        let mut replacement = Vec::new();
        {
            let mut writer = PofWriter::new(&mut replacement, ctx.clone());
            writer.write_int32(77).unwrap();
        }
        patch.set_property(5, replacement).unwrap();
        let patched = patch.apply_changes().unwrap();

        let mut reader = PofReader::new(&patched, ctx);
        match reader.read_value().unwrap() {
            Value::SparseArray(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries.get(&0), Some(&Value::Int(1)));
                assert_eq!(entries.get(&5), Some(&Value::Int(77)));
            }
            other => panic!("expected SparseArray, got {other:?}"),
        }
    }
}
