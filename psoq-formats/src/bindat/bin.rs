//! The decompressed `.bin` header: a fixed 468-byte record directly
//! followed by bytecode (`object_code`).

use binrw::{BinRead, BinResult, BinWrite};
use std::io::{Read, Seek, Write};

use crate::error::{Error, Result};

const HEADER_SIZE: u32 = 468;

/// The `.bin` header. String fields are kept as raw fixed-width,
/// NUL-padded byte arrays; decoding them (Shift-JIS in the original game
/// data) is left to a [`crate::text_codec::TextCodec`] implementation
/// supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinHeader {
    /// Must equal 468; offset of `object_code` within the decompressed image.
    pub object_code_offset: u32,
    /// Start of the function offset table within the decompressed image.
    pub function_offset_table_offset: u32,
    /// Declared total size of the decompressed image.
    pub bin_size: u32,
    /// Conventionally 0xFFFFFFFF; semantics otherwise undocumented.
    pub reserved_ffffffff: u32,
    /// 0 for online-delivered quests, 1 for quests the client must find on
    /// a memory card.
    pub download_flag: u8,
    /// Undocumented; preserved verbatim.
    pub unknown: u8,
    /// Raw low byte of the ambiguous quest-number/episode field.
    pub quest_number_low: u8,
    /// Raw high byte of the ambiguous quest-number/episode field.
    pub quest_number_high: u8,
    /// Shift-JIS, NUL-padded, 32 bytes.
    pub name: [u8; 32],
    /// Shift-JIS, NUL-padded, 128 bytes.
    pub short_description: [u8; 128],
    /// Shift-JIS, NUL-padded, 288 bytes.
    pub long_description: [u8; 288],
}

impl BinHeader {
    /// Interpret the ambiguous quest-number field as `(quest_number,
    /// episode)` bytes, per spec §9.
    pub fn as_u8_episode(&self) -> (u8, u8) {
        (self.quest_number_low, self.quest_number_high)
    }

    /// Interpret the ambiguous quest-number field as a single `u16`, per
    /// spec §9. Reports include both interpretations; the core does not
    /// decide which is correct.
    pub fn as_u16(&self) -> u16 {
        u16::from_le_bytes([self.quest_number_low, self.quest_number_high])
    }

    /// `true` when `name` has no bytes before its first NUL (or is entirely
    /// NUL), i.e. the `EMPTY_NAME` condition.
    pub fn name_is_empty(&self) -> bool {
        self.name.first().copied().unwrap_or(0) == 0
    }
}

impl BinRead for BinHeader {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let object_code_offset = u32::read_options(reader, endian, ())?;
        let function_offset_table_offset = u32::read_options(reader, endian, ())?;
        let bin_size = u32::read_options(reader, endian, ())?;
        let reserved_ffffffff = u32::read_options(reader, endian, ())?;
        let download_flag = u8::read_options(reader, endian, ())?;
        let unknown = u8::read_options(reader, endian, ())?;
        let quest_number_low = u8::read_options(reader, endian, ())?;
        let quest_number_high = u8::read_options(reader, endian, ())?;

        let mut name = [0u8; 32];
        reader.read_exact(&mut name)?;
        let mut short_description = [0u8; 128];
        reader.read_exact(&mut short_description)?;
        let mut long_description = [0u8; 288];
        reader.read_exact(&mut long_description)?;

        Ok(Self {
            object_code_offset,
            function_offset_table_offset,
            bin_size,
            reserved_ffffffff,
            download_flag,
            unknown,
            quest_number_low,
            quest_number_high,
            name,
            short_description,
            long_description,
        })
    }
}

impl BinWrite for BinHeader {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.object_code_offset.write_options(writer, endian, ())?;
        self.function_offset_table_offset
            .write_options(writer, endian, ())?;
        self.bin_size.write_options(writer, endian, ())?;
        self.reserved_ffffffff.write_options(writer, endian, ())?;
        self.download_flag.write_options(writer, endian, ())?;
        self.unknown.write_options(writer, endian, ())?;
        self.quest_number_low.write_options(writer, endian, ())?;
        self.quest_number_high.write_options(writer, endian, ())?;
        writer.write_all(&self.name)?;
        writer.write_all(&self.short_description)?;
        writer.write_all(&self.long_description)?;
        Ok(())
    }
}

impl binrw::meta::ReadEndian for BinHeader {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}

impl binrw::meta::WriteEndian for BinHeader {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}

/// Bitflag set describing violations found by [`validate_bin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinValidationFlags {
    value: u32,
}

impl BinValidationFlags {
    /// `object_code_offset` is not 468.
    pub const BAD_OBJECT_CODE_OFFSET: u32 = 0x01;
    /// Declared `bin_size` is smaller than the actual decompressed length.
    pub const BIN_SIZE_SMALLER: u32 = 0x02;
    /// Declared `bin_size` is larger than the actual decompressed length.
    pub const BIN_SIZE_LARGER: u32 = 0x04;
    /// `name` has no bytes before its first NUL.
    pub const EMPTY_NAME: u32 = 0x08;
    /// The high byte of the quest-number field exceeds 1, suggesting the
    /// u16 interpretation is the correct one.
    pub const UNEXPECTED_EPISODE: u32 = 0x10;

    /// An empty flag set.
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Check whether `flag` is set.
    pub const fn has(&self, flag: u32) -> bool {
        (self.value & flag) != 0
    }

    /// Set `flag`.
    pub fn set(&mut self, flag: u32) {
        self.value |= flag;
    }

    /// Clear `flag`.
    pub fn clear(&mut self, flag: u32) {
        self.value &= !flag;
    }

    /// `true` when no flags are set.
    pub const fn is_empty(&self) -> bool {
        self.value == 0
    }

    /// Raw bit value, for reporting.
    pub const fn bits(&self) -> u32 {
        self.value
    }
}

/// Validate a decompressed `.bin` header against its decompressed image
/// length. Pure: depends only on its inputs, no mutation.
pub fn validate_bin(header: &BinHeader, actual_len: usize) -> BinValidationFlags {
    let mut flags = BinValidationFlags::new();

    if header.object_code_offset != HEADER_SIZE {
        flags.set(BinValidationFlags::BAD_OBJECT_CODE_OFFSET);
    }

    let declared = header.bin_size as usize;
    if declared < actual_len {
        flags.set(BinValidationFlags::BIN_SIZE_SMALLER);
    } else if declared > actual_len {
        flags.set(BinValidationFlags::BIN_SIZE_LARGER);
    }

    if header.name_is_empty() {
        flags.set(BinValidationFlags::EMPTY_NAME);
    }

    if header.quest_number_high > 1 {
        flags.set(BinValidationFlags::UNEXPECTED_EPISODE);
    }

    flags
}

/// Apply the documented recovery heuristics for `.bin` validation flags,
/// mutating `buffer` (the decompressed image) as needed, and return the
/// flag set with recovered flags cleared. Does not touch `EMPTY_NAME`,
/// which has no defined recovery and is expected to surface as a
/// validation failure upstream.
pub fn handle_bin_validation_issues(
    header: &BinHeader,
    buffer: &mut Vec<u8>,
    mut flags: BinValidationFlags,
) -> BinValidationFlags {
    if flags.has(BinValidationFlags::BIN_SIZE_SMALLER) {
        buffer.truncate(header.bin_size as usize);
        flags.clear(BinValidationFlags::BIN_SIZE_SMALLER);
    }

    if flags.has(BinValidationFlags::BIN_SIZE_LARGER)
        && buffer.len() + 1 == header.bin_size as usize
    {
        buffer.push(0);
        flags.clear(BinValidationFlags::BIN_SIZE_LARGER);
    }

    if flags.has(BinValidationFlags::UNEXPECTED_EPISODE) {
        flags.clear(BinValidationFlags::UNEXPECTED_EPISODE);
    }

    flags
}

/// Parse a `.bin` header from the front of `data`.
pub fn read_bin_header(data: &[u8]) -> Result<BinHeader> {
    if data.len() < HEADER_SIZE as usize {
        return Err(Error::Truncated {
            offset: data.len(),
            context: "bin header".to_string(),
        });
    }
    let mut cursor = binrw::io::Cursor::new(data);
    let header = BinHeader::read(&mut cursor)?;
    Ok(header)
}

/// Serialize `header` back to its 468-byte on-disk form.
pub fn write_bin_header(header: &BinHeader) -> Result<Vec<u8>> {
    let mut cursor = binrw::io::Cursor::new(Vec::with_capacity(HEADER_SIZE as usize));
    header.write(&mut cursor)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BinHeader {
        BinHeader {
            object_code_offset: 468,
            function_offset_table_offset: 500,
            bin_size: 600,
            reserved_ffffffff: 0xFFFF_FFFF,
            download_flag: 0,
            unknown: 0,
            quest_number_low: 1,
            quest_number_high: 0,
            name: {
                let mut n = [0u8; 32];
                n[0] = b'Q';
                n
            },
            short_description: [0u8; 128],
            long_description: [0u8; 288],
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let header = sample_header();
        let bytes = write_bin_header(&header).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE as usize);
        let parsed = read_bin_header(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn validate_clean_header() {
        let header = sample_header();
        let flags = validate_bin(&header, 600);
        assert!(flags.is_empty());
    }

    #[test]
    fn validate_flags_bad_offset_and_empty_name() {
        let mut header = sample_header();
        header.object_code_offset = 0;
        header.name = [0u8; 32];
        let flags = validate_bin(&header, 600);
        assert!(flags.has(BinValidationFlags::BAD_OBJECT_CODE_OFFSET));
        assert!(flags.has(BinValidationFlags::EMPTY_NAME));
    }

    #[test]
    fn bin_size_larger_off_by_one_recovers() {
        let mut header = sample_header();
        header.bin_size = 601;
        let mut buffer = vec![0u8; 600];
        let flags = validate_bin(&header, buffer.len());
        assert!(flags.has(BinValidationFlags::BIN_SIZE_LARGER));

        let recovered = handle_bin_validation_issues(&header, &mut buffer, flags);
        assert!(!recovered.has(BinValidationFlags::BIN_SIZE_LARGER));
        assert_eq!(buffer.len(), 601);

        let revalidated = validate_bin(&header, buffer.len());
        assert!(revalidated.is_empty());
    }

    #[test]
    fn bin_size_smaller_truncates() {
        let mut header = sample_header();
        header.bin_size = 590;
        let mut buffer = vec![0u8; 600];
        let flags = validate_bin(&header, buffer.len());
        let recovered = handle_bin_validation_issues(&header, &mut buffer, flags);
        assert!(!recovered.has(BinValidationFlags::BIN_SIZE_SMALLER));
        assert_eq!(buffer.len(), 590);
    }

    #[test]
    fn unexpected_episode_recovers() {
        let mut header = sample_header();
        header.quest_number_high = 5;
        let flags = validate_bin(&header, 600);
        assert!(flags.has(BinValidationFlags::UNEXPECTED_EPISODE));
        let mut buffer = vec![0u8; 600];
        let recovered = handle_bin_validation_issues(&header, &mut buffer, flags);
        assert!(!recovered.has(BinValidationFlags::UNEXPECTED_EPISODE));
        assert_eq!(header.as_u16(), u16::from_le_bytes([1, 5]));
    }
}
