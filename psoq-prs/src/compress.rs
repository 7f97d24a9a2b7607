//! PRS compression: greedy longest-match LZ77 search over an 8176-byte
//! lookback window, per spec §4.1.

use crate::bits::BitWriter;

const MAX_WINDOW: usize = 0x1FF0;
const MAX_MATCH_LEN: usize = 255;

/// Compress `input` into a PRS stream.
///
/// Output capacity is bounded above by `len + (len >> 3) + 1 + 2` bytes
/// (one control bit worst case per literal, plus the trailing end marker).
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut writer = BitWriter::new();
    let mut pos = 0usize;

    while pos < input.len() {
        match find_longest_match(input, pos) {
            Some((match_pos, length)) => {
                let offset = match_pos as isize - pos as isize; // negative
                emit_match(&mut writer, offset, length);
                pos += length;
            }
            None => {
                emit_literal(&mut writer, input[pos]);
                pos += 1;
            }
        }
    }

    emit_eof(&mut writer);
    writer.finish()
}

fn emit_literal(writer: &mut BitWriter, byte: u8) {
    writer.put_bit(true);
    writer.put_byte(byte);
}

fn emit_match(writer: &mut BitWriter, offset: isize, length: usize) {
    if offset >= -255 && length <= 5 {
        // short back-reference
        writer.put_bit(false);
        writer.put_bit(false);
        let adj = (length - 2) as u8;
        writer.put_bit((adj >> 1) & 1 != 0);
        writer.put_bit(adj & 1 != 0);
        writer.put_byte((offset as i32 & 0xFF) as u8);
        return;
    }

    writer.put_bit(false);
    writer.put_bit(true);
    let offset = offset as i32;
    if (3..=9).contains(&length) {
        let len_field = (length - 2) as u8;
        let b1 = (((offset << 3) & 0xF8) as u8) | (len_field & 0x07);
        let b2 = ((offset >> 5) & 0xFF) as u8;
        writer.put_byte(b1);
        writer.put_byte(b2);
    } else {
        let b1 = ((offset << 3) & 0xF8) as u8;
        let b2 = ((offset >> 5) & 0xFF) as u8;
        writer.put_byte(b1);
        writer.put_byte(b2);
        writer.put_byte((length - 1) as u8);
    }
}

fn emit_eof(writer: &mut BitWriter) {
    writer.put_bit(false);
    writer.put_bit(true);
    writer.put_byte(0);
    writer.put_byte(0);
}

/// Find the longest match ending strictly before `pos`, scanning backward
/// from `pos - 3` down to the window floor. Returns `(match_start, length)`.
fn find_longest_match(input: &[u8], pos: usize) -> Option<(usize, usize)> {
    if pos < 3 {
        return None;
    }
    let window_floor = pos.saturating_sub(MAX_WINDOW).max(1);
    let mut best: Option<(usize, usize)> = None;

    let mut y = pos - 3;
    loop {
        let max_len = (input.len() - pos).min(MAX_MATCH_LEN).min(pos - y);
        if max_len >= 3 {
            let mut len = 0;
            while len < max_len && input[y + len] == input[pos + len] {
                len += 1;
            }
            if len >= 3 {
                let better = match best {
                    None => true,
                    Some((_, best_len)) => len > best_len,
                };
                if better {
                    best = Some((y, len));
                    if len >= MAX_MATCH_LEN {
                        break;
                    }
                }
            }
        }
        if y == window_floor {
            break;
        }
        y -= 1;
    }

    best
}
