//! Wire-format primitives for the Portable Object Format (POF) engine.
//!
//! This crate has no notion of a type registry, a navigator, or identity
//! sharing — it only knows how to read and write the packed integer codec,
//! classify type tags, and carry source-preserving temporal values. The
//! `pof` crate builds the rest of the engine on top of these primitives.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod error;
pub mod io;
pub mod packed;
pub mod raw_time;
pub mod type_id;

pub use error::{Error, Result};
pub use io::{PofSink, PofSource};
