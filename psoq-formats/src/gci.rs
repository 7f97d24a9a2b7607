//! Gamecube memory-card (`.gci`) outer-record extraction boundary.
//!
//! Decrypting a `.gci` save requires a per-player key this toolkit does
//! not, and will not, attempt to guess or derive (spec.md §1 Non-goals).
//! This module only names the boundary: a caller who already has that
//! key and has performed extraction elsewhere can hand this crate the
//! resulting bin/dat bytes through the normal pipeline entry points.

/// A source of extracted `.gci` outer-record payload bytes.
///
/// Implementations own the memory-card envelope format and any
/// per-player decryption; this trait exists purely as a documented seam,
/// with no default implementation and no decryption logic anywhere in
/// this crate.
pub trait GciRecordSource {
    /// The error type an implementation's extraction can fail with.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Extract the raw payload bytes (typically a compressed `.bin` or
    /// `.dat`) from a `.gci` outer record.
    fn extract(&self, record: &[u8]) -> Result<Vec<u8>, Self::Error>;
}
