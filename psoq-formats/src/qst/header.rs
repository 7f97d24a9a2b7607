//! The 60-byte QST file header record, one per logical file in a quest.

use binrw::{BinRead, BinResult, BinWrite};
use std::io::{Read, Seek, Write};

/// `pkt_id` for an online (unencrypted) file header.
pub const PKT_ID_ONLINE_HEADER: u8 = 0x44;
/// `pkt_id` for a download/offline (encrypted) file header.
pub const PKT_ID_DOWNLOAD_HEADER: u8 = 0xA6;
/// Fixed on-disk size of a header record.
pub const HEADER_RECORD_SIZE: u16 = 60;

/// One file header record: announces a filename and its total payload
/// size ahead of the chunk records that carry the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QstFileHeader {
    /// 0x44 (online) or 0xA6 (download).
    pub pkt_id: u8,
    /// Unspecified semantics; preserved on read, zero on write.
    pub pkt_flags: u8,
    /// Always 60.
    pub pkt_size: u16,
    /// Quest title, Shift-JIS NUL-padded, 32 bytes.
    pub name: [u8; 32],
    /// Unspecified semantics; preserved on read, zero on write.
    pub unused: u16,
    /// Unspecified semantics; preserved on read, zero on write.
    pub flags: u16,
    /// Base filename (with extension), NUL-padded, 16 bytes.
    pub filename: [u8; 16],
    /// Total byte length of the payload stream that follows in chunks.
    pub size: u32,
}

impl QstFileHeader {
    /// Decode [`Self::filename`] up to its first NUL as a `String`,
    /// assuming ASCII/Latin-1 content (quest filenames are not
    /// Shift-JIS in practice).
    pub fn filename_str(&self) -> String {
        decode_nul_padded(&self.filename)
    }

    /// `true` if this is a download/offline header (`pkt_id == 0xA6`).
    pub fn is_download(&self) -> bool {
        self.pkt_id == PKT_ID_DOWNLOAD_HEADER
    }
}

pub(crate) fn decode_nul_padded(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

pub(crate) fn encode_nul_padded<const N: usize>(value: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = value.as_bytes();
    let len = bytes.len().min(N);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

impl BinRead for QstFileHeader {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pkt_id = u8::read_options(reader, endian, ())?;
        let pkt_flags = u8::read_options(reader, endian, ())?;
        let pkt_size = u16::read_options(reader, endian, ())?;
        let mut name = [0u8; 32];
        reader.read_exact(&mut name)?;
        let unused = u16::read_options(reader, endian, ())?;
        let flags = u16::read_options(reader, endian, ())?;
        let mut filename = [0u8; 16];
        reader.read_exact(&mut filename)?;
        let size = u32::read_options(reader, endian, ())?;

        Ok(Self {
            pkt_id,
            pkt_flags,
            pkt_size,
            name,
            unused,
            flags,
            filename,
            size,
        })
    }
}

impl BinWrite for QstFileHeader {
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
        writer.write_all(&self.name)?;
        self.unused.write_options(writer, endian, ())?;
        self.flags.write_options(writer, endian, ())?;
        writer.write_all(&self.filename)?;
        self.size.write_options(writer, endian, ())?;
        Ok(())
    }
}

impl binrw::meta::ReadEndian for QstFileHeader {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}

impl binrw::meta::WriteEndian for QstFileHeader {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}
