//! Error types for atlas-reply
//!
//! Two layers:
//! - [`DecodeError`]: failures raised while turning a reply into typed values
//! - [`AtlasError`]: unified error for transport, framing and admin operations

use thiserror::Error;

/// Result type alias using AtlasError
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Result type alias for the decode pipeline
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Failure while decoding one reply
///
/// Any decode error aborts the whole reply: a misaligned cursor would corrupt
/// every element after it, so there is no partial recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A raw value's wire type does not match what the decoder expects
    #[error("wire shape mismatch{}: expected {expected}, got {actual}", describe_position(.position))]
    WireShape {
        /// Element position within the enclosing aggregate, if known
        position: Option<usize>,
        expected: &'static str,
        actual: &'static str,
    },

    /// Collected element count is incompatible with the expected grouping
    #[error("arity mismatch: expected a multiple of {group} elements, got {actual}")]
    Arity { group: usize, actual: usize },

    /// The server returned an error reply in place of data
    #[error("server error{}: {message}", describe_position(.position))]
    Protocol {
        position: Option<usize>,
        message: String,
    },
}

impl DecodeError {
    /// Wire shape mismatch without a position yet
    pub fn wire_shape(expected: &'static str, actual: &'static str) -> Self {
        DecodeError::WireShape {
            position: None,
            expected,
            actual,
        }
    }

    /// Server error reply without a position yet
    pub fn protocol(message: impl Into<String>) -> Self {
        DecodeError::Protocol {
            position: None,
            message: message.into(),
        }
    }

    /// Stamp the element position, keeping the innermost one if already set
    pub fn at(self, position: usize) -> Self {
        match self {
            DecodeError::WireShape {
                position: None,
                expected,
                actual,
            } => DecodeError::WireShape {
                position: Some(position),
                expected,
                actual,
            },
            DecodeError::Protocol {
                position: None,
                message,
            } => DecodeError::Protocol {
                position: Some(position),
                message,
            },
            other => other,
        }
    }

    /// Position of the failing element, if the error carries one
    pub fn position(&self) -> Option<usize> {
        match self {
            DecodeError::WireShape { position, .. } | DecodeError::Protocol { position, .. } => {
                *position
            }
            DecodeError::Arity { .. } => None,
        }
    }
}

fn describe_position(position: &Option<usize>) -> String {
    match position {
        Some(p) => format!(" at position {}", p),
        None => String::new(),
    }
}

/// Unified error type for atlas-reply operations
#[derive(Debug, Error)]
pub enum AtlasError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Decode Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Reply decoded fine but carries a value the operation cannot accept
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    /// Wire framing violation (bad type byte, oversized bulk, bad length)
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
