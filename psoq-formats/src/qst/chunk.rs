//! The 1056-byte QST chunk record carrying up to 1024 bytes of payload
//! data per record.

use binrw::{BinRead, BinResult, BinWrite};
use std::io::{Read, Seek, Write};

use crate::qst::header::decode_nul_padded;

/// `pkt_id` for an online (unencrypted) data chunk.
pub const PKT_ID_ONLINE_CHUNK: u8 = 0x13;
/// `pkt_id` for a download/offline (encrypted) data chunk.
pub const PKT_ID_DOWNLOAD_CHUNK: u8 = 0xA7;
/// Fixed on-disk size of a chunk record.
pub const CHUNK_RECORD_SIZE: u16 = 1056;
/// Size of the fixed data region within a chunk record.
pub const CHUNK_DATA_SIZE: usize = 1024;

/// One data chunk record. `size` is the number of meaningful bytes at the
/// front of `data`; the rest of `data` is zero padding.
///
/// The eight trailing bytes unaccounted for by the fields spec.md lists
/// (1 + 1 + 2 + 16 + 1024 + 4 = 1048, while the fixed record size is
/// 1056) are carried here as `_reserved`, following spec.md §9's general
/// policy for fields with no known semantics: preserve on read, zero on
/// write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QstChunk {
    /// 0x13 (online) or 0xA7 (download).
    pub pkt_id: u8,
    /// Per-file sequence counter, starting at 0 and wrapping modulo 256.
    pub pkt_flags: u8,
    /// Always 1056.
    pub pkt_size: u16,
    /// Base filename this chunk belongs to, NUL-padded, 16 bytes.
    pub filename: [u8; 16],
    /// Fixed 1024-byte data region; only the first `size` bytes are used.
    pub data: [u8; CHUNK_DATA_SIZE],
    /// Number of meaningful bytes in `data`.
    pub size: u32,
    _reserved: [u8; 8],
}

impl QstChunk {
    /// Build a chunk from a `<= 1024`-byte slice, zero-padding the rest
    /// of the data region.
    pub fn new(pkt_id: u8, pkt_flags: u8, filename: [u8; 16], payload: &[u8]) -> Self {
        assert!(payload.len() <= CHUNK_DATA_SIZE, "chunk payload too large");
        let mut data = [0u8; CHUNK_DATA_SIZE];
        data[..payload.len()].copy_from_slice(payload);
        Self {
            pkt_id,
            pkt_flags,
            pkt_size: CHUNK_RECORD_SIZE,
            filename,
            data,
            size: payload.len() as u32,
            _reserved: [0u8; 8],
        }
    }

    /// Decode [`Self::filename`] up to its first NUL.
    pub fn filename_str(&self) -> String {
        decode_nul_padded(&self.filename)
    }

    /// The meaningful slice of `data`, i.e. `data[..size]`.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }
}

impl BinRead for QstChunk {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pkt_id = u8::read_options(reader, endian, ())?;
        let pkt_flags = u8::read_options(reader, endian, ())?;
        let pkt_size = u16::read_options(reader, endian, ())?;
        let mut filename = [0u8; 16];
        reader.read_exact(&mut filename)?;
        let mut data = [0u8; CHUNK_DATA_SIZE];
        reader.read_exact(&mut data)?;
        let size = u32::read_options(reader, endian, ())?;
        let mut reserved = [0u8; 8];
        reader.read_exact(&mut reserved)?;

        Ok(Self {
            pkt_id,
            pkt_flags,
            pkt_size,
            filename,
            data,
            size,
            _reserved: reserved,
        })
    }
}

impl BinWrite for QstChunk {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.pkt_id.write_options(writer, endian, ())?;
        self.pkt_flags.write_options(writer, endian, ())?;
        self.pkt_size.write_options(writer, endian, ())?;
        writer.write_all(&self.filename)?;
        writer.write_all(&self.data)?;
        self.size.write_options(writer, endian, ())?;
        writer.write_all(&[0u8; 8])?;
        Ok(())
    }
}

impl binrw::meta::ReadEndian for QstChunk {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}

impl binrw::meta::WriteEndian for QstChunk {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}
