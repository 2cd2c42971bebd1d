//! Error types for the scene-graph library.
//!
//! Structural node operations report misuse through `bool`/`Option` returns and
//! a `tracing` diagnostic. File-level operations (cache and VRML I/O) return
//! [`Result`] so corruption and I/O failures propagate to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scene-graph file operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Target exists and overwriting was not requested
    #[error("File exists and overwrite is disabled: {0}")]
    FileExists(PathBuf),

    /// Target path exists but is not a regular file
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Malformed "(...)" header field
    #[error("Invalid header at byte {offset}: {msg}")]
    InvalidHeader { offset: u64, msg: String },

    /// Cache version tag is not the one this library writes
    #[error("Unsupported cache version: {0}")]
    UnsupportedVersion(String),

    /// Plugin tag check refused the cache
    #[error("Plugin tag rejected: {0}")]
    PluginTagRejected(String),

    /// File is truncated
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Malformed "[...]" node tag
    #[error("Invalid node tag at byte {offset}: {msg}")]
    InvalidTag { offset: u64, msg: String },

    /// Node tag names a different type than the schema expects
    #[error("Type mismatch at byte {offset}: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: String,
        actual: String,
        offset: u64,
    },

    /// Payload content is inconsistent (bad flag combination, absurd count)
    #[error("Invalid data at byte {offset}: {msg}")]
    InvalidData { offset: u64, msg: String },

    /// Bare tag reference names a node that was not read before it
    #[error("Unresolved reference '{name}' at byte {offset}")]
    UnresolvedReference { name: String, offset: u64 },

    /// Node id is dangling or has the wrong type for the operation
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// Write operation failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid node error.
    pub fn invalid_node(msg: impl Into<String>) -> Self {
        Self::InvalidNode(msg.into())
    }

    /// Create an invalid tag error at the given offset.
    pub fn invalid_tag(offset: u64, msg: impl Into<String>) -> Self {
        Self::InvalidTag { offset, msg: msg.into() }
    }
}

/// Result type alias for scene-graph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::UnresolvedReference { name: "COORD_3".into(), offset: 120 };
        assert!(e.to_string().contains("COORD_3"));
        assert!(e.to_string().contains("120"));

        let e = Error::TypeMismatch {
            expected: "FACE".into(),
            actual: "APP".into(),
            offset: 7,
        };
        assert!(e.to_string().contains("FACE"));
        assert!(e.to_string().contains("APP"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
