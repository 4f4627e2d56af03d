//! Error types for rxpath

use crate::overrides::Member;
use rxpath_types::{Key, Path};
use thiserror::Error;

/// Copy-on-write failures
///
/// Every variant carries the path of the value that could not be written
/// through. A failed write leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    /// A nullish value sits where a container is needed
    #[error("cannot write through missing value at {path}")]
    MissingIntermediate { path: Path },

    /// A scalar or callable sits where a container is needed
    #[error("cannot write into {type_name} at {path}")]
    NotAContainer {
        path: Path,
        type_name: &'static str,
    },

    /// Array writes may replace an element or append one past the end
    #[error("index {index} is out of bounds for array of length {len} at {path}")]
    IndexOutOfBounds { path: Path, index: usize, len: usize },

    /// Symbols never address data, and arrays take numeric keys only
    #[error("key {key} cannot address a {container} at {path}")]
    InvalidKey {
        path: Path,
        key: Key,
        container: &'static str,
    },
}

/// Top-level rxpath error
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Constructor given something that is not a recognized source
    #[error("source should be Observable, Subject, or BehaviorSubject, got {type_name}")]
    InvalidSource { type_name: &'static str },

    /// Structural update failed
    #[error("write failed: {0}")]
    Write(#[from] AccessError),

    /// No override handles this member at this node
    #[error("{member} is not supported at {path}")]
    Unsupported { member: Member, path: Path },
}

/// Result type using ProxyError
pub type Result<T> = std::result::Result<T, ProxyError>;
