//! Text-encoding boundary for `.bin` string fields.
//!
//! The Gamecube edition stores quest names and descriptions as Shift-JIS,
//! NUL-padded to a fixed byte width. Converting that to and from UTF-8 is
//! explicitly out of scope for this crate (spec.md §1): this trait lets a
//! caller plug in a real Shift-JIS codec while the core only ever handles
//! raw fixed-width byte arrays.

/// Converts between a fixed-width, NUL-padded byte field and a `String`.
pub trait TextCodec {
    /// Decode a NUL-padded byte field into a string, stopping at the
    /// first NUL (or the field width, whichever comes first).
    fn decode(&self, bytes: &[u8]) -> String;

    /// Encode `value` into a NUL-padded byte field of exactly `width`
    /// bytes, truncating if `value` doesn't fit.
    fn encode(&self, value: &str, width: usize) -> Vec<u8>;
}

/// A trivial Latin-1 codec. Round-trips ASCII correctly; anything outside
/// the Latin-1 range is lossy. Not a substitute for real Shift-JIS
/// handling — intended only as a default for callers that don't need
/// faithful Japanese text (tests, tooling smoke tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct Latin1Codec;

impl TextCodec for Latin1Codec {
    fn decode(&self, bytes: &[u8]) -> String {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        bytes[..end].iter().map(|&b| b as char).collect()
    }

    fn encode(&self, value: &str, width: usize) -> Vec<u8> {
        let mut out = vec![0u8; width];
        for (slot, ch) in out.iter_mut().zip(value.chars()) {
            *slot = if (ch as u32) < 256 { ch as u8 } else { b'?' };
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_round_trips_ascii() {
        let codec = Latin1Codec;
        let encoded = codec.encode("Forest Quest", 32);
        assert_eq!(encoded.len(), 32);
        assert_eq!(codec.decode(&encoded), "Forest Quest");
    }

    #[test]
    fn latin1_decode_stops_at_nul() {
        let codec = Latin1Codec;
        let mut bytes = vec![b'h', b'i', 0, b'x', b'x'];
        bytes.resize(8, 0);
        assert_eq!(codec.decode(&bytes), "hi");
    }
}
