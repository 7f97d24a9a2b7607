//! PC-variant stream cipher: a 1042-word keystream table keyed by a
//! 32-bit seed, consumed word-by-word and rebuilt ("scrambled") in place
//! every time the table is exhausted.

use tracing::debug;

use crate::error::{CryptoError, Result};

const TABLE_LEN: usize = 1042;

/// Keystream generator state for the PC cipher.
///
/// Holds the current 1042-word table and a read position into it. Call
/// [`PcCipher::new`] once per stream (keyed by that stream's seed) and
/// pull words from it in order; the table scrambles itself automatically
/// once the position runs off the end.
pub struct PcCipher {
    table: Vec<u32>,
    position: usize,
}

impl PcCipher {
    /// Build a fresh table from `seed` using the cipher's linear
    /// congruential fill, then force an initial scramble before the first
    /// word is drawn.
    pub fn new(seed: u32) -> Self {
        let mut table = vec![0u32; TABLE_LEN];
        let mut x = seed;
        for slot in table.iter_mut() {
            x = x.wrapping_mul(0x5D58_8B65).wrapping_add(1);
            *slot = x;
        }
        debug!(seed, "PC cipher table filled from seed");
        Self {
            table,
            position: TABLE_LEN,
        }
    }

    /// Mix every slot against its neighbor one and its neighbor 521
    /// positions ahead (half the table width), wrapping around the end.
    fn scramble(&mut self) {
        let mut next = vec![0u32; TABLE_LEN];
        for i in 0..TABLE_LEN {
            let a = self.table[i];
            let b = self.table[(i + 1) % TABLE_LEN];
            let c = self.table[(i + 521) % TABLE_LEN];
            next[i] = a ^ b.wrapping_add(c).rotate_left(3);
        }
        self.table = next;
    }

    /// Draw the next 32-bit keystream word, scrambling and rewinding the
    /// table first if it has been fully consumed.
    pub fn next_word(&mut self) -> u32 {
        if self.position >= TABLE_LEN {
            self.scramble();
            self.position = 0;
        }
        let word = self.table[self.position];
        self.position += 1;
        word
    }
}

/// Build a keystream generator for `seed`.
pub fn create_keys(seed: u32) -> PcCipher {
    PcCipher::new(seed)
}

/// XOR `data` in place with the keystream derived from `seed`, one 32-bit
/// little-endian word per 4-byte unit. `data.len()` must be a multiple of
/// 4; QST chunk payloads are padded to this alignment by construction.
pub fn crypt(data: &mut [u8], seed: u32) -> Result<()> {
    if data.len() % 4 != 0 {
        return Err(CryptoError::Unaligned(data.len()));
    }
    let mut cipher = create_keys(seed);
    for unit in data.chunks_exact_mut(4) {
        let key_bytes = cipher.next_word().to_le_bytes();
        for (byte, key_byte) in unit.iter_mut().zip(key_bytes.iter()) {
            *byte ^= key_byte;
        }
    }
    Ok(())
}

/// Encrypt `data` in place under `seed`. The PC cipher is a symmetric
/// XOR stream cipher, identical to [`decrypt`].
pub fn encrypt(data: &mut [u8], seed: u32) -> Result<()> {
    crypt(data, seed)
}

/// Decrypt `data` in place under `seed`. Identical to [`encrypt`].
pub fn decrypt(data: &mut [u8], seed: u32) -> Result<()> {
    crypt(data, seed)
}
