//! Error types for PC cipher operations.

use thiserror::Error;

/// Result type for cipher operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur while keying or applying the PC cipher.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// Buffer length was not a multiple of the cipher's 4-byte unit size.
    #[error("buffer length {0} is not 4-byte aligned")]
    Unaligned(usize),
}
