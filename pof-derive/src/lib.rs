//! Derive macros for the reflection/annotation serializer: property
//! index planning, `#[pof(..)]` attribute parsing, and the codegen that
//! drives a `UserTypeWriter`/`UserTypeReader` in index order.

#![deny(unused_must_use, unsafe_code, unused_crate_dependencies, missing_docs)]

extern crate proc_macro;
mod attribute;
mod deserialize;
mod plan;
mod serialize;

use self::{deserialize::deserialize_derive, serialize::serialize_derive};

synstructure::decl_derive!(
    [PofSerialize, attributes(pof)] =>
    /// Derives `pof::reflect::PofEncodeFields` and `pof::reflect::Reflected`
    /// for the given `struct` or `enum`.
    serialize_derive
);
synstructure::decl_derive!(
    [PofDeserialize, attributes(pof)] =>
    /// Derives `pof::reflect::PofDecodeFields` for the given `struct` or
    /// `enum`.
    deserialize_derive
);
