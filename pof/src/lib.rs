//! The Portable Object Format (POF) engine.
//!
//! Four layers, each built directly on the one below:
//!
//! - [`writer`]/[`reader`] — the primitive tag-and-body codec over
//!   `pof_types`'s packed integers and type-id space.
//! - [`user_type`]/[`reflect`] — property-indexed frames and the
//!   derive-generated glue that turns a `struct`/`enum` into a user type,
//!   plus [`identity`] for shared-reference sharing and [`evolvable`] for
//!   forward-compatible re-encoding.
//! - [`context`] — the type registry a stream's user types are resolved
//!   against.
//! - [`navigator`]/[`facade`] — zero-copy path navigation and
//!   patch-and-reassemble mutation over an already-encoded blob, and the
//!   thin consumer-facing query surface built on top.
//!
//! [`value::Value`] is the dynamic tree these layers hand back when a
//! caller has no static Rust type to decode into.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod evolvable;
pub mod facade;
pub mod identity;
pub mod navigator;
pub mod reader;
pub mod reflect;
pub mod skip;
pub mod user_type;
pub mod value;
pub mod writer;

pub use config::{TypeMapping, TypeMappingTable};
pub use context::Context;
pub use error::{Error, Result};
pub use evolvable::Evolvable;
pub use facade::PofFacade;
pub use navigator::{DeltaSegment, PofPatch, PofValue};
pub use reader::PofReader;
pub use reflect::{PofDecode, PofDecodeBody, PofDecodeFields, PofEncode, PofEncodeBody, PofEncodeFields, Reflected};
pub use value::{Bytes, Map, Value};
pub use writer::PofWriter;

pub use pof_derive::{PofDeserialize, PofSerialize};
