/*!
Error types for the refgraph persistence engine.
*/

use crate::ids::RefId;
use thiserror::Error;

/// Result type used throughout refgraph.
pub type Result<T> = std::result::Result<T, PersistError>;

/// Errors that can occur while writing or reading a bean document.
///
/// Every variant aborts the current operation. Conditions that only degrade a
/// single object (an unregistered class, for instance) are reported through
/// logging and `Option` results instead of this type.
#[derive(Error, Debug)]
pub enum PersistError {
    /// I/O errors on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression/decompression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Body digest mismatch
    #[error("Integrity check failed: expected hash {expected}, got {actual}")]
    IntegrityCheckFailed { expected: String, actual: String },

    /// Malformed document envelope or item
    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    /// A reference id of zero was passed to a binding operation
    #[error("Object references are broken: reference id cannot be 0")]
    ZeroRefId,

    /// A reference points at an object or root that was never registered
    #[error("Object references are broken: {0}")]
    BrokenReference(String),

    /// `get()` re-entered on a bean that is still materializing its object
    #[error("Recursive get() on bean {bean} (ref id {ref_id})")]
    ReentrantGet { bean: &'static str, ref_id: RefId },

    /// The reference id counter cannot advance any further
    #[error("Reference id counter overflow")]
    IdOverflow,

    /// The requested format version has no registered driver
    #[error("Version {0} is not supported")]
    UnknownVersion(String),

    /// A class needed for materialization has no registered bean class
    #[error("Class {0} is not registered")]
    UnregisteredClass(String),

    /// A bean was handed an object of a different class than it adapts
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Operation not allowed in the current session state
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Logging or metrics setup failed
    #[error("Observability error: {0}")]
    Observability(String),
}

impl PersistError {
    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new invalid format error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a new broken reference error
    pub fn broken_reference<S: Into<String>>(msg: S) -> Self {
        Self::BrokenReference(msg.into())
    }

    /// Create a new invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }
}
