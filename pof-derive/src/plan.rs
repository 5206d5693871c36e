//! Shared property-index planning used by both the encode and decode
//! codegen modules, so the two derives agree on indices without sharing
//! macro-expansion state.

use crate::attribute::FieldAttrs;

/// The resolved property index (or `None` if `#[pof(skip)]`) plus the raw
/// parsed attributes for one field, in declaration order.
pub struct FieldPlan {
    pub index: Option<i32>,
    pub attrs: FieldAttrs,
}

/// Assigns each non-skipped binding an explicit-or-sequential property
/// index starting at `start` (0 for a plain struct; 1 for an enum variant,
/// since index 0 there carries the variant discriminant), panicking on a
/// duplicate explicit index.
pub fn plan_fields(variant: &synstructure::VariantInfo, start: i32) -> Vec<FieldPlan> {
    let mut used = std::collections::BTreeSet::new();
    let mut next_auto = start;
    variant
        .bindings()
        .iter()
        .map(|binding| {
            let attrs = FieldAttrs::parse_binding(binding);
            if attrs.skip {
                return FieldPlan { index: None, attrs };
            }
            let index = attrs.index.unwrap_or(next_auto);
            next_auto += 1;
            if !used.insert(index) {
                panic!("duplicate POF property index {index} in derived type");
            }
            FieldPlan {
                index: Some(index),
                attrs,
            }
        })
        .collect()
}
