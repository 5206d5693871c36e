//! The context & type registry: a cheaply-cloneable handle mapping a
//! user-type id to a native Rust type (and back), plus the registry-wide
//! policies ([`Context::with_auto_index`], [`Context::with_allow_interfaces`],
//! [`Context::with_allow_subclasses`], [`Context::with_enable_references`],
//! [`Context::with_default_serializer`]) that registration and decode-time
//! tag resolution are checked against.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::reflect::Reflected;

/// How many hops [`Registry::subtype_chain_matches`] will walk up a
/// subclass chain before giving up — a generous bound against an
/// accidentally-cyclic `register_subtype_of` chain, not a real depth limit.
const MAX_SUBTYPE_WALK: usize = 64;

#[derive(Default)]
struct Registry {
    native_to_id: HashMap<TypeId, i32>,
    id_to_native: HashMap<i32, TypeId>,
    id_to_name: HashMap<i32, &'static str>,
    auto_index: bool,
    allow_interfaces: bool,
    allow_subclasses: bool,
    enable_references: bool,
    default_serializer: Option<i32>,
    /// Native subclass -> native supertype, populated by
    /// [`Context::register_subtype_of`].
    supertypes: HashMap<TypeId, TypeId>,
    /// Native type -> the native interfaces it implements, populated by
    /// [`Context::register_interface`].
    interfaces: HashMap<TypeId, Vec<TypeId>>,
}

impl Registry {
    /// Walks `actual`'s `supertypes` chain looking for `target`, up to
    /// [`MAX_SUBTYPE_WALK`] hops.
    fn subtype_chain_matches(&self, actual: TypeId, target: TypeId) -> bool {
        let mut current = actual;
        for _ in 0..MAX_SUBTYPE_WALK {
            match self.supertypes.get(&current) {
                Some(&parent) if parent == target => return true,
                Some(&parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

/// A cheaply-cloneable handle to a shared type registry.
///
/// Every [`crate::writer::PofWriter`]/[`crate::reader::PofReader`] carries a
/// `Context`; cloning a `Context` clones the `Arc`, not the registry
/// contents, so the same registry can back many concurrent streams.
#[derive(Clone)]
pub struct Context {
    inner: Arc<RwLock<Registry>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A fresh, empty registry with auto-indexing enabled.
    pub fn new() -> Self {
        Context {
            inner: Arc::new(RwLock::new(Registry {
                auto_index: true,
                ..Registry::default()
            })),
        }
    }

    /// Enables or disables registry-wide auto-assigned property indices.
    /// Types whose `#[derive(PofSerialize)]` metadata has any field without
    /// an explicit `#[pof(index = ..)]` fail [`Context::register`] once
    /// this is `false`.
    pub fn with_auto_index(self, enabled: bool) -> Self {
        self.inner.write().expect("registry lock poisoned").auto_index = enabled;
        self
    }

    /// Whether this registry currently permits auto-assigned indices.
    pub fn auto_index_enabled(&self) -> bool {
        self.inner.read().expect("registry lock poisoned").auto_index
    }

    /// Enables or disables resolving a wire tag against a registered
    /// interface of the requested type, in addition to an exact match.
    pub fn with_allow_interfaces(self, enabled: bool) -> Self {
        self.inner.write().expect("registry lock poisoned").allow_interfaces = enabled;
        self
    }

    /// Whether interface fallback resolution is currently enabled.
    pub fn allow_interfaces_enabled(&self) -> bool {
        self.inner.read().expect("registry lock poisoned").allow_interfaces
    }

    /// Enables or disables resolving a wire tag against a registered
    /// subtype's supertype chain, in addition to an exact match.
    pub fn with_allow_subclasses(self, enabled: bool) -> Self {
        self.inner.write().expect("registry lock poisoned").allow_subclasses = enabled;
        self
    }

    /// Whether subclass fallback resolution is currently enabled.
    pub fn allow_subclasses_enabled(&self) -> bool {
        self.inner.read().expect("registry lock poisoned").allow_subclasses
    }

    /// Enables or disables stream-wide reference sharing: when enabled, the
    /// blanket [`crate::reflect::PofEncode`] impl for a reflected type wraps
    /// every value in a `T_IDENTITY`/`T_REFERENCE` pair keyed by its
    /// address, so writing the same `&T` twice only encodes its body once.
    pub fn with_enable_references(self, enabled: bool) -> Self {
        self.inner.write().expect("registry lock poisoned").enable_references = enabled;
        self
    }

    /// Whether stream-wide reference sharing is currently enabled.
    pub fn enable_references_enabled(&self) -> bool {
        self.inner.read().expect("registry lock poisoned").enable_references
    }

    /// Sets the type id consulted by [`Context::type_id_of`] when a native
    /// type has no registration of its own — a fallback serializer for
    /// otherwise-unregistered types, rather than an immediate
    /// [`Error::UnregisteredNativeType`].
    pub fn with_default_serializer(self, type_id: i32) -> Self {
        self.inner.write().expect("registry lock poisoned").default_serializer = Some(type_id);
        self
    }

    /// The registry's current fallback serializer type id, if any.
    pub fn default_serializer(&self) -> Option<i32> {
        self.inner.read().expect("registry lock poisoned").default_serializer
    }

    /// Records that native type `T` is a subtype of native type `Super`,
    /// for [`Context::with_allow_subclasses`] fallback resolution. Rust has
    /// no runtime class hierarchy to inspect, so this relationship has to
    /// be declared explicitly.
    pub fn register_subtype_of<T: 'static, Super: 'static>(&self) {
        let mut reg = self.inner.write().expect("registry lock poisoned");
        reg.supertypes.insert(TypeId::of::<T>(), TypeId::of::<Super>());
    }

    /// Records that native type `T` implements native interface `Iface`,
    /// for [`Context::with_allow_interfaces`] fallback resolution.
    pub fn register_interface<T: 'static, Iface: 'static>(&self) {
        let mut reg = self.inner.write().expect("registry lock poisoned");
        reg.interfaces.entry(TypeId::of::<T>()).or_default().push(TypeId::of::<Iface>());
    }

    /// Registers `T` under `type_id`, failing if either side is already
    /// claimed, or if `T` relies on auto-indexing while this registry has
    /// it disabled.
    pub fn register<T: Reflected + 'static>(&self, type_id: i32, name: &'static str) -> Result<()> {
        if !self.auto_index_enabled() {
            if let Some(missing) = T::metadata().iter().find(|m| !m.explicit_index) {
                return Err(Error::MissingIndex(missing.name));
            }
        }
        let mut reg = self.inner.write().expect("registry lock poisoned");
        let native = TypeId::of::<T>();
        if reg.id_to_native.contains_key(&type_id) {
            return Err(Error::DuplicateTypeId(type_id));
        }
        if reg.native_to_id.contains_key(&native) {
            return Err(Error::DuplicateNativeType);
        }
        reg.native_to_id.insert(native, type_id);
        reg.id_to_native.insert(type_id, native);
        reg.id_to_name.insert(type_id, name);
        tracing::debug!(type_id, name, "registered user type");
        Ok(())
    }

    /// Resolves `T`'s registered type id, falling back to
    /// [`Context::with_default_serializer`]'s type id if `T` itself isn't
    /// registered.
    pub fn type_id_of<T: 'static>(&self) -> Result<i32> {
        let reg = self.inner.read().expect("registry lock poisoned");
        if let Some(&id) = reg.native_to_id.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        reg.default_serializer
            .ok_or_else(|| Error::UnregisteredNativeType(core::any::type_name::<T>()))
    }

    /// The human-readable name a type id was registered under, if any.
    pub fn name_of(&self, type_id: i32) -> Option<&'static str> {
        self.inner.read().expect("registry lock poisoned").id_to_name.get(&type_id).copied()
    }

    /// Whether `id` names a type registered in this context.
    pub fn is_registered(&self, id: i32) -> bool {
        self.inner.read().expect("registry lock poisoned").id_to_native.contains_key(&id)
    }

    /// True if `T` is unregistered (decode may proceed without a tag
    /// check), registered under exactly `id`, or — when
    /// [`Context::with_allow_subclasses`]/[`Context::with_allow_interfaces`]
    /// permit it — `id` names a registered subtype or implementing type of
    /// `T`.
    pub(crate) fn type_id_matches<T: 'static>(&self, id: i32) -> bool {
        let reg = self.inner.read().expect("registry lock poisoned");
        let target = match reg.native_to_id.get(&TypeId::of::<T>()) {
            Some(&registered) => {
                if registered == id {
                    return true;
                }
                TypeId::of::<T>()
            }
            None => return true,
        };
        let Some(&actual_native) = reg.id_to_native.get(&id) else {
            return false;
        };
        if reg.allow_subclasses && reg.subtype_chain_matches(actual_native, target) {
            return true;
        }
        if reg.allow_interfaces {
            if let Some(ifaces) = reg.interfaces.get(&actual_native) {
                if ifaces.contains(&target) {
                    return true;
                }
            }
        }
        false
    }
}

impl core::fmt::Debug for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::AttributeMeta;

    struct Foo;
    impl Reflected for Foo {
        fn metadata() -> &'static [AttributeMeta] {
            &[]
        }
    }

    #[test]
    fn register_and_resolve() {
        let ctx = Context::new();
        ctx.register::<Foo>(10, "Foo").unwrap();
        assert_eq!(ctx.type_id_of::<Foo>().unwrap(), 10);
        assert!(ctx.is_registered(10));
    }

    #[test]
    fn duplicate_id_rejected() {
        let ctx = Context::new();
        ctx.register::<Foo>(10, "Foo").unwrap();
        struct Bar;
        impl Reflected for Bar {
            fn metadata() -> &'static [AttributeMeta] {
                &[]
            }
        }
        assert!(matches!(ctx.register::<Bar>(10, "Bar"), Err(Error::DuplicateTypeId(10))));
    }

    struct Animal;
    impl Reflected for Animal {
        fn metadata() -> &'static [AttributeMeta] {
            &[]
        }
    }

    struct Dog;
    impl Reflected for Dog {
        fn metadata() -> &'static [AttributeMeta] {
            &[]
        }
    }

    struct Shape;
    impl Reflected for Shape {
        fn metadata() -> &'static [AttributeMeta] {
            &[]
        }
    }

    #[test]
    fn subclass_fallback_requires_opt_in() {
        let ctx = Context::new().with_allow_subclasses(true);
        ctx.register::<Animal>(1, "Animal").unwrap();
        ctx.register::<Dog>(2, "Dog").unwrap();
        ctx.register_subtype_of::<Dog, Animal>();

        assert!(ctx.type_id_matches::<Animal>(2), "Dog's tag should satisfy an Animal-typed read");
        assert!(!ctx.type_id_matches::<Dog>(1), "subtype fallback is one-directional");

        let strict = Context::new();
        strict.register::<Animal>(1, "Animal").unwrap();
        strict.register::<Dog>(2, "Dog").unwrap();
        strict.register_subtype_of::<Dog, Animal>();
        assert!(!strict.type_id_matches::<Animal>(2), "disabled without with_allow_subclasses");
    }

    #[test]
    fn interface_fallback_requires_opt_in() {
        let ctx = Context::new().with_allow_interfaces(true);
        ctx.register::<Shape>(1, "Shape").unwrap();
        ctx.register::<Dog>(2, "Dog").unwrap();
        ctx.register_interface::<Dog, Shape>();

        assert!(ctx.type_id_matches::<Shape>(2));

        let strict = Context::new();
        strict.register::<Shape>(1, "Shape").unwrap();
        strict.register::<Dog>(2, "Dog").unwrap();
        strict.register_interface::<Dog, Shape>();
        assert!(!strict.type_id_matches::<Shape>(2));
    }

    #[test]
    fn default_serializer_is_a_fallback_not_an_override() {
        let ctx = Context::new().with_default_serializer(99);
        ctx.register::<Foo>(10, "Foo").unwrap();
        assert_eq!(ctx.type_id_of::<Foo>().unwrap(), 10, "a registered type keeps its own id");

        struct Unregistered;
        impl Reflected for Unregistered {
            fn metadata() -> &'static [AttributeMeta] {
                &[]
            }
        }
        assert_eq!(ctx.type_id_of::<Unregistered>().unwrap(), 99);

        let no_fallback = Context::new();
        assert!(no_fallback.type_id_of::<Unregistered>().is_err());
    }
}
