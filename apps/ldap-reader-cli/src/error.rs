//! CLI error types and exit codes

use ldap_reader::ReaderError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 3: Connection error
/// - 4: Validation error
/// - 5: Server (protocol or state) error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Connection failed: {0}\n\nTroubleshooting:\n  - Check the server URI and port\n  - Verify TLS settings (--starttls, ldaps://)")]
    ConnectionFailed(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConnectionFailed(_) => 3,
            CliError::Validation(_) => 4,
            CliError::Server(_) => 5,
            CliError::Io(_) => 1,
        }
    }
}

impl From<ReaderError> for CliError {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::Connection { .. } => CliError::ConnectionFailed(err.to_string()),
            ReaderError::Validation { .. } => CliError::Validation(err.to_string()),
            ReaderError::Protocol { .. } | ReaderError::State { .. } => {
                CliError::Server(err.to_string())
            }
        }
    }
}
