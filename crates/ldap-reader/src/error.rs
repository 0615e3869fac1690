//! Reader error types
//!
//! Every failure surfaced by the reader maps to one of four kinds:
//! connection, protocol, state, or validation.

use thiserror::Error;

/// Error that can occur while connecting, binding, or paging through results.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The connection handle could not be initialized.
    #[error("connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A gateway call returned a non-success status.
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        /// Result code reported by the gateway, when one exists.
        code: Option<u32>,
    },

    /// The operation is not valid in the current session or cursor state.
    #[error("invalid state: {message}")]
    State { message: String },

    /// Caller-supplied data violates a constraint.
    #[error("validation failed: {message}")]
    Validation { message: String },
}

impl ReaderError {
    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ReaderError::Connection { .. } => "CONNECTION_ERROR",
            ReaderError::Protocol { .. } => "PROTOCOL_ERROR",
            ReaderError::State { .. } => "STATE_ERROR",
            ReaderError::Validation { .. } => "VALIDATION_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        ReaderError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ReaderError::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a protocol error without a result code.
    pub fn protocol(message: impl Into<String>) -> Self {
        ReaderError::Protocol {
            message: message.into(),
            code: None,
        }
    }

    /// Create a state error.
    pub fn state(message: impl Into<String>) -> Self {
        ReaderError::State {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ReaderError::Validation {
            message: message.into(),
        }
    }

    pub fn is_state(&self) -> bool {
        matches!(self, ReaderError::State { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ReaderError::Validation { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, ReaderError::Protocol { .. })
    }
}

/// Failure reported by a [`DirectoryConnection`](crate::gateway::DirectoryConnection).
///
/// `message` carries the gateway's diagnostic text verbatim.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub code: Option<u32>,
    pub message: String,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl From<GatewayError> for ReaderError {
    fn from(err: GatewayError) -> Self {
        ReaderError::Protocol {
            message: err.message,
            code: err.code,
        }
    }
}

/// Result type for reader operations.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
