//! Error types shared by the bin/dat structural model and the QST
//! container codec.

use thiserror::Error;

/// Result type for `psoq-formats` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or building quest data.
#[derive(Error, Debug)]
pub enum Error {
    /// Data violates a format invariant not covered by a recovery heuristic.
    #[error("malformed quest data: {0}")]
    MalformedInput(String),

    /// Stream ended while more data was expected.
    #[error("truncated quest data at offset {offset}: {context}")]
    Truncated {
        /// Byte offset at which the stream ran out.
        offset: usize,
        /// What the reader was attempting to read.
        context: String,
    },

    /// A QST record's `pkt_id` did not match any known header or chunk id.
    #[error("unknown QST packet id: {0:#04x}")]
    UnknownPacketId(u8),

    /// A QST record's `pkt_size` field did not match its record kind.
    #[error("impossible QST packet size: expected {expected}, got {actual}")]
    ImpossiblePacketSize {
        /// Size the record kind requires.
        expected: u16,
        /// Size actually declared.
        actual: u16,
    },

    /// A chunk referenced a filename no header record announced.
    #[error("QST chunk references unannounced filename {0:?}")]
    UnannouncedFilename(String),

    /// A chunk's declared `size` exceeds the 1024-byte data region.
    #[error("QST chunk size {actual} exceeds data region for {filename:?}")]
    ChunkSizeExceedsDeclared {
        /// Filename the chunk belongs to.
        filename: String,
        /// Declared chunk byte count.
        actual: u32,
    },

    /// A file's reassembled byte count did not match its header's `size`.
    #[error("QST file {filename:?} reassembled to {actual} bytes, header declared {declared}")]
    SizeMismatch {
        /// Filename the mismatch occurred for.
        filename: String,
        /// Bytes actually reassembled.
        actual: usize,
        /// Bytes declared by the header record.
        declared: usize,
    },

    /// PRS compression/decompression failed.
    #[error("PRS codec error: {0}")]
    Prs(#[from] psoq_prs::Error),

    /// Stream cipher operation failed.
    #[error("cipher error: {0}")]
    Crypto(#[from] psoq_crypto::CryptoError),

    /// Binary layout read/write failed.
    #[error("binary layout error: {0}")]
    BinRw(#[from] binrw::Error),
}
