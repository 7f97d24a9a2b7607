//! Error types for PRS compression and decompression

use thiserror::Error;

/// Result type for PRS operations
pub type Result<T> = std::result::Result<T, Error>;

/// PRS codec error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Input too short to be a valid PRS stream (minimum 3 bytes)
    #[error("malformed PRS input: {0}")]
    MalformedInput(String),

    /// Stream ended before an end marker was found, or a token read past
    /// the available source bytes.
    #[error("truncated PRS stream at source offset {offset}")]
    Truncated {
        /// Byte offset into the compressed source where truncation occurred
        offset: usize,
    },

    /// Decompressed output would exceed the caller-provided bound.
    #[error("PRS decompressed size exceeds bound: {actual} > {bound}")]
    SizeOverflow {
        /// Size that would have been produced
        actual: usize,
        /// Bound the caller supplied
        bound: usize,
    },
}
