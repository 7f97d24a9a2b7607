//! PRS compression codec.
//!
//! PRS is a byte-oriented LZ77 variant used throughout Phantasy Star
//! Online's Gamecube-era file formats. A PRS stream interleaves literal
//! bytes and back-references with a bitstream of control bits: each
//! control bit says whether the next token is a literal byte (1) or a
//! back-reference / end marker (0), read least-significant-bit first out
//! of bytes that are themselves written into the stream ahead of the
//! tokens they govern.

mod bits;
mod compress;
mod decompress;
mod error;

pub use compress::compress;
pub use decompress::{decompress, decompress_bounded, decompress_size};
pub use error::{Error, Result};
