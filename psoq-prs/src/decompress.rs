//! PRS decompression: a straight bit-driven interpreter over the token
//! stream produced by [`crate::compress::compress`], per spec §4.2.

use crate::bits::BitReader;
use crate::error::{Error, Result};

/// Default ceiling on decompressed size when the caller has no better
/// bound in mind. Quest bytecode and dialogue tables are well under this
/// in practice; a corrupt or hostile stream that would exceed it is
/// rejected rather than left to exhaust memory.
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 64 * 1024 * 1024;

/// Decompress `input`, rejecting streams whose decompressed size would
/// exceed [`DEFAULT_MAX_OUTPUT_SIZE`].
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    decompress_bounded(input, DEFAULT_MAX_OUTPUT_SIZE)
}

/// Decompress `input`, failing with [`Error::SizeOverflow`] as soon as the
/// growing output would exceed `max_output` bytes. This bound is checked
/// incrementally so a hostile stream cannot force an unbounded allocation
/// before the check fires.
pub fn decompress_bounded(input: &[u8], max_output: usize) -> Result<Vec<u8>> {
    if input.len() < 3 {
        return Err(Error::MalformedInput(format!(
            "PRS stream must be at least 3 bytes, got {}",
            input.len()
        )));
    }

    let mut output = Vec::new();
    let mut reader = BitReader::new(input);

    loop {
        if reader.get_bit()? {
            let byte = reader.read_byte()?;
            push_byte(&mut output, byte, max_output)?;
            continue;
        }

        if reader.get_bit()? {
            let b1 = reader.read_byte()?;
            let b2 = reader.read_byte()?;
            if b1 == 0 && b2 == 0 {
                break;
            }
            let combined = u16::from(b1) | (u16::from(b2) << 8);
            let offset = ((u32::from(combined) >> 3) | 0xFFFF_E000) as i32;
            let length_field = combined & 0x7;
            let length = if length_field == 0 {
                usize::from(reader.read_byte()?) + 1
            } else {
                usize::from(length_field) + 2
            };
            copy_match(&mut output, offset, length, max_output)?;
        } else {
            let high = reader.get_bit()?;
            let low = reader.get_bit()?;
            let adjust = (u8::from(high) << 1) | u8::from(low);
            let length = usize::from(adjust) + 2;
            let byte = reader.read_byte()?;
            let offset = (u32::from(byte) | 0xFFFF_FF00) as i32;
            copy_match(&mut output, offset, length, max_output)?;
        }
    }

    Ok(output)
}

/// Walk `input`'s token stream exactly as [`decompress_bounded`] does, but
/// track only the length a real decompression would reach rather than
/// materializing any bytes. Back-references are validated against that
/// notional cursor the same way `copy_match` validates them against a real
/// buffer's length, so a malformed back-reference is rejected here too.
pub fn decompress_size(input: &[u8], max_output: usize) -> Result<usize> {
    if input.len() < 3 {
        return Err(Error::MalformedInput(format!(
            "PRS stream must be at least 3 bytes, got {}",
            input.len()
        )));
    }

    let mut len = 0usize;
    let mut reader = BitReader::new(input);

    loop {
        if reader.get_bit()? {
            reader.read_byte()?;
            advance(&mut len, 1, max_output)?;
            continue;
        }

        if reader.get_bit()? {
            let b1 = reader.read_byte()?;
            let b2 = reader.read_byte()?;
            if b1 == 0 && b2 == 0 {
                break;
            }
            let combined = u16::from(b1) | (u16::from(b2) << 8);
            let offset = ((u32::from(combined) >> 3) | 0xFFFF_E000) as i32;
            let length_field = combined & 0x7;
            let length = if length_field == 0 {
                usize::from(reader.read_byte()?) + 1
            } else {
                usize::from(length_field) + 2
            };
            check_offset(len, offset)?;
            advance(&mut len, length, max_output)?;
        } else {
            let high = reader.get_bit()?;
            let low = reader.get_bit()?;
            let adjust = (u8::from(high) << 1) | u8::from(low);
            let length = usize::from(adjust) + 2;
            let byte = reader.read_byte()?;
            let offset = (u32::from(byte) | 0xFFFF_FF00) as i32;
            check_offset(len, offset)?;
            advance(&mut len, length, max_output)?;
        }
    }

    Ok(len)
}

fn advance(len: &mut usize, amount: usize, max_output: usize) -> Result<()> {
    if *len + amount > max_output {
        return Err(Error::SizeOverflow {
            actual: *len + amount,
            bound: max_output,
        });
    }
    *len += amount;
    Ok(())
}

fn check_offset(len: usize, offset: i32) -> Result<()> {
    let src_index = len as isize + offset as isize;
    if src_index < 0 || src_index as usize >= len {
        return Err(Error::MalformedInput(format!(
            "back-reference offset {offset} out of range at output length {len}"
        )));
    }
    Ok(())
}

fn push_byte(output: &mut Vec<u8>, byte: u8, max_output: usize) -> Result<()> {
    if output.len() + 1 > max_output {
        return Err(Error::SizeOverflow {
            actual: output.len() + 1,
            bound: max_output,
        });
    }
    output.push(byte);
    Ok(())
}

fn copy_match(output: &mut Vec<u8>, offset: i32, length: usize, max_output: usize) -> Result<()> {
    if output.len() + length > max_output {
        return Err(Error::SizeOverflow {
            actual: output.len() + length,
            bound: max_output,
        });
    }
    for _ in 0..length {
        let src_index = output.len() as isize + offset as isize;
        if src_index < 0 || src_index as usize >= output.len() {
            return Err(Error::MalformedInput(format!(
                "back-reference offset {offset} out of range at output length {}",
                output.len()
            )));
        }
        let byte = output[src_index as usize];
        output.push(byte);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::compress;

    #[test]
    fn rejects_stream_shorter_than_three_bytes() {
        assert!(matches!(
            decompress(&[0x00, 0x00]),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn rejects_truncated_literal() {
        // literal control bit set (1), then no byte follows
        let err = decompress(&[0x01]).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }) || matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn size_bound_rejects_oversized_output() {
        let input = vec![0xAAu8; 1024];
        let compressed = compress(&input);
        let err = decompress_bounded(&compressed, 16).unwrap_err();
        assert!(matches!(err, Error::SizeOverflow { .. }));
    }

    #[test]
    fn sixteen_byte_round_trip() {
        let input: Vec<u8> = (0..16u8).collect();
        let compressed = compress(&input);
        let output = decompress(&compressed).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn decompress_size_matches_decompress_for_a_run() {
        let input = vec![0xAAu8; 1024];
        let compressed = compress(&input);
        let size = decompress_size(&compressed, DEFAULT_MAX_OUTPUT_SIZE).unwrap();
        assert_eq!(size, input.len());
    }

    #[test]
    fn decompress_size_rejects_same_inputs_as_decompress() {
        assert!(matches!(
            decompress_size(&[0x00, 0x00], DEFAULT_MAX_OUTPUT_SIZE),
            Err(Error::MalformedInput(_))
        ));

        let input = vec![0xAAu8; 1024];
        let compressed = compress(&input);
        let err = decompress_size(&compressed, 16).unwrap_err();
        assert!(matches!(err, Error::SizeOverflow { .. }));
    }
}
