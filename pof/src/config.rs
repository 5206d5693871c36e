//! The configuration surface: a declarative list of native-type to
//! registry-id mappings that bootstraps a [`Context`] in one call, instead
//! of many individual [`Context::register`] calls scattered through setup
//! code.

use crate::context::Context;
use crate::error::Result;
use crate::reflect::Reflected;

/// One entry of a [`TypeMappingTable`]. Built with [`TypeMapping::of`];
/// registration itself is deferred until [`TypeMappingTable::build`] runs
/// against a concrete [`Context`].
pub struct TypeMapping {
    type_id: i32,
    name: &'static str,
    register: fn(&Context, i32, &'static str) -> Result<()>,
}

impl TypeMapping {
    /// Declares that `T` should register under `type_id`, named `name`.
    pub fn of<T: Reflected + 'static>(type_id: i32, name: &'static str) -> Self {
        TypeMapping {
            type_id,
            name,
            register: |ctx, id, name| ctx.register::<T>(id, name),
        }
    }
}

/// An ordered table of type mappings, applied to a fresh [`Context`] in one
/// call.
#[derive(Default)]
pub struct TypeMappingTable {
    entries: Vec<TypeMapping>,
    auto_index: Option<bool>,
    allow_interfaces: Option<bool>,
    allow_subclasses: Option<bool>,
    enable_references: Option<bool>,
    default_serializer: Option<i32>,
}

impl TypeMappingTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mapping entry, applied in the order added.
    pub fn with_mapping(mut self, mapping: TypeMapping) -> Self {
        self.entries.push(mapping);
        self
    }

    /// Overrides the built context's auto-indexing policy; unset, the
    /// context keeps [`Context::new`]'s default (enabled).
    pub fn with_auto_index(mut self, enabled: bool) -> Self {
        self.auto_index = Some(enabled);
        self
    }

    /// Overrides the built context's [`Context::with_allow_interfaces`]
    /// policy; unset, the context keeps its default (disabled).
    pub fn with_allow_interfaces(mut self, enabled: bool) -> Self {
        self.allow_interfaces = Some(enabled);
        self
    }

    /// Overrides the built context's [`Context::with_allow_subclasses`]
    /// policy; unset, the context keeps its default (disabled).
    pub fn with_allow_subclasses(mut self, enabled: bool) -> Self {
        self.allow_subclasses = Some(enabled);
        self
    }

    /// Overrides the built context's [`Context::with_enable_references`]
    /// policy; unset, the context keeps its default (disabled).
    pub fn with_enable_references(mut self, enabled: bool) -> Self {
        self.enable_references = Some(enabled);
        self
    }

    /// Sets the built context's [`Context::with_default_serializer`] type id.
    pub fn with_default_serializer(mut self, type_id: i32) -> Self {
        self.default_serializer = Some(type_id);
        self
    }

    /// Builds a fresh [`Context`] and registers every entry against it, in
    /// table order. Fails on the first entry that can't register (a
    /// duplicate id, a duplicate native type, or a missing explicit index
    /// while auto-indexing is disabled).
    pub fn build(&self) -> Result<Context> {
        let mut ctx = Context::new();
        if let Some(enabled) = self.auto_index {
            ctx = ctx.with_auto_index(enabled);
        }
        if let Some(enabled) = self.allow_interfaces {
            ctx = ctx.with_allow_interfaces(enabled);
        }
        if let Some(enabled) = self.allow_subclasses {
            ctx = ctx.with_allow_subclasses(enabled);
        }
        if let Some(enabled) = self.enable_references {
            ctx = ctx.with_enable_references(enabled);
        }
        if let Some(type_id) = self.default_serializer {
            ctx = ctx.with_default_serializer(type_id);
        }
        for entry in &self.entries {
            (entry.register)(&ctx, entry.type_id, entry.name)?;
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::AttributeMeta;

    struct Widget;
    impl Reflected for Widget {
        fn metadata() -> &'static [AttributeMeta] {
            &[]
        }
    }

    struct Gadget;
    impl Reflected for Gadget {
        fn metadata() -> &'static [AttributeMeta] {
            &[AttributeMeta {
                name: "power",
                index: 0,
                explicit_index: false,
            }]
        }
    }

    #[test]
    fn builds_a_context_from_a_table() {
        let ctx = TypeMappingTable::new()
            .with_mapping(TypeMapping::of::<Widget>(42, "Widget"))
            .build()
            .unwrap();
        assert!(ctx.is_registered(42));
        assert_eq!(ctx.type_id_of::<Widget>().unwrap(), 42);
    }

    #[test]
    fn auto_index_disabled_is_fine_for_a_type_with_no_implicit_fields() {
        let result = TypeMappingTable::new()
            .with_auto_index(false)
            .with_mapping(TypeMapping::of::<Widget>(42, "Widget"))
            .build();
        assert!(result.is_ok(), "Widget has no fields, so there's nothing to require an explicit index");
    }

    #[test]
    fn auto_index_disabled_rejects_a_type_relying_on_it() {
        let result = TypeMappingTable::new()
            .with_auto_index(false)
            .with_mapping(TypeMapping::of::<Gadget>(43, "Gadget"))
            .build();
        assert!(matches!(result, Err(crate::error::Error::MissingIndex("power"))));
    }
}
