//! Error types for the quest pipeline and CLI.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the pipeline and CLI surface.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller violated a precondition (e.g. an unaligned cipher buffer).
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// A path the CLI was asked to read does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A path the CLI was asked to write could not be created.
    #[error("cannot create file: {0}")]
    CannotCreate(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more `.bin`/`.dat` validator flags survived recovery.
    #[error("validation failed for {context}: {flags}")]
    ValidationFailed {
        /// What was being validated (filename or table index).
        context: String,
        /// Human-readable flag names that survived recovery.
        flags: String,
    },

    /// Underlying structural model or container codec error.
    #[error("format error: {0}")]
    Format(#[from] psoq_formats::Error),
}
