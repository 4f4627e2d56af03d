//! Shared types for rxpath
//!
//! This crate provides the tagged value model that flows through rxpath
//! streams, together with the keys and paths used to address nested
//! locations inside those values.

pub mod path;
pub mod value;

pub use path::{Key, Path, Symbol};
pub use value::{Function, Map, NativeFn, Value};
