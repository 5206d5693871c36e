use thiserror::Error;

/// Result alias for wire-level POF operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Wire-level error taxonomy shared by the packed integer codec, the
/// primitive reader/writer and the type-id space.
///
/// Higher layers (registry, navigator, identity table) add their own
/// variants on top of this in `pof::Error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Corrupt tag, truncated body, or a packed integer whose continuation
    /// run overflows the target width or runs past the end of the source.
    #[error("malformed stream: {0}")]
    MalformedStream(&'static str),

    /// The tag read from the stream is incompatible with the requested read
    /// method (e.g. asking for a string where an int was written), and no
    /// lossless narrowing conversion applies.
    #[error("type mismatch: expected {expected}, found tag {found}")]
    TypeMismatch {
        /// Name of the family the caller requested.
        expected: &'static str,
        /// The raw type tag actually found.
        found: i32,
    },

    /// A user-type property write/read used a non-increasing or negative
    /// index.
    #[error("invalid property order: index {index} is not greater than the last-written index {last}")]
    InvalidOrder {
        /// The offending index.
        index: i32,
        /// The previously written/read index (-1 if none yet).
        last: i32,
    },

    /// A reserved type id (`T_INT128`, `T_FLOAT128`, `T_DECIMAL64`,
    /// `T_DECIMAL128`) was encountered. These are part of the closed wire
    /// format but are not implemented; conformant readers reject them
    /// rather than silently narrowing.
    #[error("unsupported reserved type id {0}")]
    NotSupported(i32),
}
