//! Engine-level error taxonomy: wraps the wire-level errors from
//! `pof_types` and adds the registry/navigator/identity failure modes.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// The engine's complete error taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A wire-level failure: bad tag, truncated body, packed-int overflow,
    /// incompatible read family, or out-of-order property index.
    #[error(transparent)]
    Wire(#[from] pof_types::Error),

    /// A type id was not registered and no fallback (subtype/interface)
    /// resolved it.
    #[error("unknown type id {0}")]
    UnknownType(i32),

    /// A native Rust type was asked for its registry id before being
    /// registered in this context.
    #[error("native type {0} is not registered in this context")]
    UnregisteredNativeType(&'static str),

    /// Two registry entries claimed the same type id.
    #[error("type id {0} is already registered")]
    DuplicateTypeId(i32),

    /// Two registry entries claimed the same native type under different,
    /// incompatible ids.
    #[error("native type is already registered under a different type id")]
    DuplicateNativeType,

    /// A navigation path descended past a terminal value, or an array/
    /// collection index was out of range under non-sparse semantics.
    #[error("navigation error: {0}")]
    NavigationError(&'static str),

    /// A `REFERENCE(n)` was read before the matching `IDENTITY(n)` was seen
    /// in the same stream.
    #[error("unresolved identity {0}")]
    UnresolvedIdentity(i32),

    /// A mutation was staged on a cursor positioned over a `REFERENCE`; the
    /// caller must mutate the identity's origin cursor instead.
    #[error("cannot stage a mutation on a reference cursor; mutate the identity origin")]
    AmbiguousMutation,

    /// Reflection metadata built without an explicit `#[pof(index = ..)]`
    /// while auto-indexing is disabled.
    #[error("attribute {0:?} has no explicit index and auto-indexing is disabled")]
    MissingIndex(&'static str),
}

impl Error {
    /// Shorthand for the common "unexpected tag while decoding" failure.
    pub fn malformed(msg: &'static str) -> Self {
        Error::Wire(pof_types::Error::MalformedStream(msg))
    }
}
