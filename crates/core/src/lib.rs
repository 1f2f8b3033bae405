//! Asteria Core: leaf data shared across the runtime and compiler.
//!
//! This crate holds only pieces with no cyclic dependency on the rest of
//! the engine — [`Fault`]/[`ErrorKind`], [`SourceLocation`], and the
//! implementation-defined limits spec §9 requires to be explicit. The
//! `Value`/`Variable`/`Reference`/`Context`/AIR graph is mutually
//! recursive (a function Value captures a Context which holds References
//! which root at Variables which hold Values) and therefore lives in a
//! single crate, `asteria-runtime`, one level up.

pub mod error;
pub mod limits;
pub mod source_location;

pub use error::{ErrorKind, Fault, Result};
pub use source_location::SourceLocation;
