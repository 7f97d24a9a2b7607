//! The decompressed `.dat` file: a walk of typed, 16-byte-header tables
//! terminated by an all-zero sentinel header.

use binrw::{BinRead, BinResult, BinWrite};
use std::io::{Read, Seek, Write};
use tracing::warn;

use crate::error::{Error, Result};

const TABLE_HEADER_SIZE: usize = 16;
const OBJECT_RECORD_SIZE: usize = 68;
const NPC_RECORD_SIZE: usize = 72;

const TYPE_OBJECT: u32 = 1;
const TYPE_NPC: u32 = 2;
const TYPE_WAVE: u32 = 3;
const TYPE_CHALLENGE_SPAWN: u32 = 4;
const TYPE_CHALLENGE: u32 = 5;

/// The 16-byte header preceding every table body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatTableHeader {
    /// Table kind; 1=Object, 2=NPC, 3=Wave, 4=Challenge spawn, 5=Challenge.
    pub table_type: u32,
    /// Declared table size (conventionally `table_body_size - 16`, see I4).
    pub table_size: u32,
    /// Area index this table belongs to.
    pub area: u32,
    /// Size in bytes of the body following this header.
    pub table_body_size: u32,
}

impl DatTableHeader {
    /// `true` for the all-zero sentinel that terminates a `.dat` file.
    pub fn is_sentinel(&self) -> bool {
        self.table_type == 0 && self.table_size == 0 && self.area == 0 && self.table_body_size == 0
    }
}

impl BinRead for DatTableHeader {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        Ok(Self {
            table_type: u32::read_options(reader, endian, ())?,
            table_size: u32::read_options(reader, endian, ())?,
            area: u32::read_options(reader, endian, ())?,
            table_body_size: u32::read_options(reader, endian, ())?,
        })
    }
}

impl BinWrite for DatTableHeader {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.table_type.write_options(writer, endian, ())?;
        self.table_size.write_options(writer, endian, ())?;
        self.area.write_options(writer, endian, ())?;
        self.table_body_size.write_options(writer, endian, ())?;
        Ok(())
    }
}

impl binrw::meta::ReadEndian for DatTableHeader {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}

impl binrw::meta::WriteEndian for DatTableHeader {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}

/// One typed table, with its header's `area` carried alongside for
/// reporting. Record layouts beyond fixed sizes are undocumented upstream;
/// Object and NPC bodies are split into fixed-width records, the
/// remaining kinds are kept as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatTable {
    /// Type 1: array of 68-byte object records.
    Object { area: u32, records: Vec<[u8; OBJECT_RECORD_SIZE]> },
    /// Type 2: array of 72-byte NPC records.
    Npc { area: u32, records: Vec<[u8; NPC_RECORD_SIZE]> },
    /// Type 3: opaque body.
    Wave { area: u32, body: Vec<u8> },
    /// Type 4: opaque body.
    ChallengeSpawn { area: u32, body: Vec<u8> },
    /// Type 5: opaque body.
    Challenge { area: u32, body: Vec<u8> },
    /// A declared type whose body could not be decoded as that type's
    /// fixed-width records (e.g. an Object table whose body length isn't
    /// a multiple of 68), or any type outside 1-5. `table_type` is
    /// preserved verbatim rather than reassigned, so reporting and
    /// round-tripping never silently relabel it.
    Raw { table_type: u32, area: u32, body: Vec<u8> },
}

impl DatTable {
    /// The area this table is scoped to.
    pub fn area(&self) -> u32 {
        match self {
            DatTable::Object { area, .. }
            | DatTable::Npc { area, .. }
            | DatTable::Wave { area, .. }
            | DatTable::ChallengeSpawn { area, .. }
            | DatTable::Challenge { area, .. }
            | DatTable::Raw { area, .. } => *area,
        }
    }

    /// The numeric table type this variant was decoded from.
    pub fn table_type(&self) -> u32 {
        match self {
            DatTable::Object { .. } => TYPE_OBJECT,
            DatTable::Npc { .. } => TYPE_NPC,
            DatTable::Wave { .. } => TYPE_WAVE,
            DatTable::ChallengeSpawn { .. } => TYPE_CHALLENGE_SPAWN,
            DatTable::Challenge { .. } => TYPE_CHALLENGE,
            DatTable::Raw { table_type, .. } => *table_type,
        }
    }

    fn body_bytes(&self) -> Vec<u8> {
        match self {
            DatTable::Object { records, .. } => records.iter().flatten().copied().collect(),
            DatTable::Npc { records, .. } => records.iter().flatten().copied().collect(),
            DatTable::Wave { body, .. }
            | DatTable::ChallengeSpawn { body, .. }
            | DatTable::Challenge { body, .. }
            | DatTable::Raw { body, .. } => body.clone(),
        }
    }
}

/// An ordered sequence of tables, the in-memory form of a decompressed
/// `.dat` file (the trailing sentinel header is implicit, not stored).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatFile {
    pub tables: Vec<DatTable>,
}

/// Bitflag set describing violations found by [`validate_dat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatValidationFlags {
    value: u32,
}

impl DatValidationFlags {
    /// A non-sentinel header's `table_type` exceeds 5.
    pub const BAD_TYPE: u32 = 0x01;
    /// A non-sentinel header's `table_size + 16 != table_body_size`.
    pub const TABLE_BODY_SIZE_MISMATCH: u32 = 0x02;
    /// An all-zero header appears before the buffer end.
    pub const EMPTY_TABLE_MIDFILE: u32 = 0x04;
    /// An all-zero header appears exactly at the buffer end (informational).
    pub const EOF_EMPTY_TABLE: u32 = 0x08;
    /// A type-1 (Object) or type-2 (NPC) table's body length is not an
    /// exact multiple of that type's fixed record size, so it decodes as
    /// [`DatTable::Raw`] instead of typed records.
    pub const RECORD_ALIGNMENT_MISMATCH: u32 = 0x10;

    pub const fn new() -> Self {
        Self { value: 0 }
    }

    pub const fn has(&self, flag: u32) -> bool {
        (self.value & flag) != 0
    }

    pub fn set(&mut self, flag: u32) {
        self.value |= flag;
    }

    pub fn clear(&mut self, flag: u32) {
        self.value &= !flag;
    }

    pub const fn is_empty(&self) -> bool {
        self.value == 0
    }

    pub const fn bits(&self) -> u32 {
        self.value
    }
}

/// Walk `buf`'s table headers without decoding bodies, collecting
/// validation flags. Pure: does not mutate `buf`. Stops at the first
/// sentinel header or at the buffer end, matching the decoder's walk so
/// validation and parsing never disagree about where the file ends.
pub fn validate_dat(buf: &[u8]) -> DatValidationFlags {
    let mut flags = DatValidationFlags::new();
    let mut offset = 0usize;

    while offset + TABLE_HEADER_SIZE <= buf.len() {
        let header = match read_header(buf, offset) {
            Some(h) => h,
            None => break,
        };

        if header.is_sentinel() {
            if offset + TABLE_HEADER_SIZE == buf.len() {
                flags.set(DatValidationFlags::EOF_EMPTY_TABLE);
            } else {
                flags.set(DatValidationFlags::EMPTY_TABLE_MIDFILE);
            }
            break;
        }

        if header.table_type > 5 {
            flags.set(DatValidationFlags::BAD_TYPE);
        }
        if header.table_size + 16 != header.table_body_size {
            flags.set(DatValidationFlags::TABLE_BODY_SIZE_MISMATCH);
        }
        let body_len = header.table_body_size as usize;
        let misaligned = match header.table_type {
            TYPE_OBJECT => body_len % OBJECT_RECORD_SIZE != 0,
            TYPE_NPC => body_len % NPC_RECORD_SIZE != 0,
            _ => false,
        };
        if misaligned {
            flags.set(DatValidationFlags::RECORD_ALIGNMENT_MISMATCH);
        }

        offset += TABLE_HEADER_SIZE + header.table_body_size as usize;
    }

    flags
}

fn read_header(buf: &[u8], offset: usize) -> Option<DatTableHeader> {
    let slice = buf.get(offset..offset + TABLE_HEADER_SIZE)?;
    let mut cursor = binrw::io::Cursor::new(slice);
    DatTableHeader::read(&mut cursor).ok()
}

/// Parse `buf` into a [`DatFile`], stopping at the first sentinel header.
/// Tables whose body can't be evenly split into fixed-width records (a
/// `TABLE_BODY_SIZE_MISMATCH` condition) are kept as opaque bytes rather
/// than rejected outright, so reporting can still show what was there.
pub fn read_dat(buf: &[u8]) -> Result<DatFile> {
    let mut tables = Vec::new();
    let mut offset = 0usize;

    loop {
        if offset + TABLE_HEADER_SIZE > buf.len() {
            return Err(Error::Truncated {
                offset,
                context: "dat table header".to_string(),
            });
        }
        let header = read_header(buf, offset).ok_or_else(|| Error::MalformedInput(
            format!("unreadable dat table header at offset {offset}"),
        ))?;
        offset += TABLE_HEADER_SIZE;

        if header.is_sentinel() {
            break;
        }

        let body_len = header.table_body_size as usize;
        let body = buf.get(offset..offset + body_len).ok_or(Error::Truncated {
            offset,
            context: "dat table body".to_string(),
        })?;
        offset += body_len;

        tables.push(decode_table(&header, body));
    }

    if offset != buf.len() {
        warn!(offset, total = buf.len(), "dat buffer has trailing bytes after sentinel");
    }

    Ok(DatFile { tables })
}

fn decode_table(header: &DatTableHeader, body: &[u8]) -> DatTable {
    match header.table_type {
        TYPE_OBJECT if body.len() % OBJECT_RECORD_SIZE == 0 => DatTable::Object {
            area: header.area,
            records: body
                .chunks_exact(OBJECT_RECORD_SIZE)
                .map(|chunk| chunk.try_into().unwrap())
                .collect(),
        },
        TYPE_NPC if body.len() % NPC_RECORD_SIZE == 0 => DatTable::Npc {
            area: header.area,
            records: body
                .chunks_exact(NPC_RECORD_SIZE)
                .map(|chunk| chunk.try_into().unwrap())
                .collect(),
        },
        TYPE_WAVE => DatTable::Wave { area: header.area, body: body.to_vec() },
        TYPE_CHALLENGE_SPAWN => DatTable::ChallengeSpawn { area: header.area, body: body.to_vec() },
        TYPE_CHALLENGE => DatTable::Challenge { area: header.area, body: body.to_vec() },
        other => DatTable::Raw { table_type: other, area: header.area, body: body.to_vec() },
    }
}

/// Serialize `file` back into a `.dat` buffer, appending the trailing
/// all-zero sentinel header.
pub fn write_dat(file: &DatFile) -> Vec<u8> {
    let mut out = Vec::new();
    for table in &file.tables {
        let body = table.body_bytes();
        let header = DatTableHeader {
            table_type: table.table_type(),
            table_size: body.len() as u32,
            area: table.area(),
            table_body_size: body.len() as u32 + 16,
        };
        let mut cursor = binrw::io::Cursor::new(Vec::with_capacity(TABLE_HEADER_SIZE));
        header.write(&mut cursor).expect("fixed-size header write cannot fail");
        out.extend_from_slice(&cursor.into_inner());
        out.extend_from_slice(&body);
    }
    out.extend_from_slice(&[0u8; TABLE_HEADER_SIZE]);
    out
}

/// Apply the documented recovery for `.dat` validation flags: a mid-file
/// zero header is treated as end-of-file and everything after it is
/// truncated. `BAD_TYPE` and `TABLE_BODY_SIZE_MISMATCH` have no defined
/// recovery and are left for the caller to surface as failures.
pub fn handle_dat_validation_issues(buf: &mut Vec<u8>, mut flags: DatValidationFlags) -> DatValidationFlags {
    if flags.has(DatValidationFlags::EMPTY_TABLE_MIDFILE) {
        let mut offset = 0usize;
        while offset + TABLE_HEADER_SIZE <= buf.len() {
            if let Some(header) = read_header(buf, offset) {
                if header.is_sentinel() {
                    buf.truncate(offset + TABLE_HEADER_SIZE);
                    break;
                }
                offset += TABLE_HEADER_SIZE + header.table_body_size as usize;
            } else {
                break;
            }
        }
        flags.clear(DatValidationFlags::EMPTY_TABLE_MIDFILE);
        flags.set(DatValidationFlags::EOF_EMPTY_TABLE);
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentinel() -> [u8; TABLE_HEADER_SIZE] {
        [0u8; TABLE_HEADER_SIZE]
    }

    fn table_bytes(table_type: u32, area: u32, body: &[u8]) -> Vec<u8> {
        let header = DatTableHeader {
            table_type,
            table_size: body.len() as u32,
            area,
            table_body_size: body.len() as u32 + 16,
        };
        let mut cursor = binrw::io::Cursor::new(Vec::new());
        header.write(&mut cursor).unwrap();
        let mut out = cursor.into_inner();
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn empty_file_is_just_sentinel() {
        let buf = sentinel().to_vec();
        let file = read_dat(&buf).unwrap();
        assert!(file.tables.is_empty());
        assert!(validate_dat(&buf).has(DatValidationFlags::EOF_EMPTY_TABLE));
    }

    #[test]
    fn round_trips_object_table() {
        let body = vec![0x11u8; OBJECT_RECORD_SIZE * 3];
        let mut buf = table_bytes(TYPE_OBJECT, 2, &body);
        buf.extend_from_slice(&sentinel());

        let file = read_dat(&buf).unwrap();
        assert_eq!(file.tables.len(), 1);
        match &file.tables[0] {
            DatTable::Object { area, records } => {
                assert_eq!(*area, 2);
                assert_eq!(records.len(), 3);
            }
            other => panic!("unexpected table {other:?}"),
        }

        let rebuilt = write_dat(&file);
        assert_eq!(rebuilt, buf);
    }

    #[test]
    fn bad_type_flag() {
        let buf = table_bytes(9, 0, &[]);
        let mut buf_with_eof = buf.clone();
        buf_with_eof.extend_from_slice(&sentinel());
        let flags = validate_dat(&buf_with_eof);
        assert!(flags.has(DatValidationFlags::BAD_TYPE));
    }

    #[test]
    fn table_body_size_mismatch_flag() {
        let header = DatTableHeader {
            table_type: TYPE_WAVE,
            table_size: 4,
            area: 0,
            table_body_size: 100, // inconsistent with table_size + 16
        };
        let mut cursor = binrw::io::Cursor::new(Vec::new());
        header.write(&mut cursor).unwrap();
        let mut buf = cursor.into_inner();
        buf.extend_from_slice(&[0u8; 100]);
        buf.extend_from_slice(&sentinel());

        let flags = validate_dat(&buf);
        assert!(flags.has(DatValidationFlags::TABLE_BODY_SIZE_MISMATCH));
    }

    #[test]
    fn misaligned_object_body_flags_and_preserves_type() {
        // table_type 1 (Object), but 69 bytes doesn't divide by OBJECT_RECORD_SIZE (68)
        let header = DatTableHeader {
            table_type: TYPE_OBJECT,
            table_size: 69,
            area: 0,
            table_body_size: 85,
        };
        let mut cursor = binrw::io::Cursor::new(Vec::new());
        header.write(&mut cursor).unwrap();
        let mut buf = cursor.into_inner();
        buf.extend_from_slice(&[0xCCu8; 69]);
        buf.extend_from_slice(&sentinel());

        let flags = validate_dat(&buf);
        assert!(flags.has(DatValidationFlags::RECORD_ALIGNMENT_MISMATCH));

        let file = read_dat(&buf).unwrap();
        match &file.tables[0] {
            DatTable::Raw { table_type, area, body } => {
                assert_eq!(*table_type, TYPE_OBJECT);
                assert_eq!(*area, 0);
                assert_eq!(body.len(), 69);
            }
            other => panic!("expected Raw, got {other:?}"),
        }
        assert_eq!(file.tables[0].table_type(), TYPE_OBJECT);

        // round-trips without relabeling the declared type
        let rebuilt = write_dat(&file);
        assert_eq!(rebuilt, buf);
    }

    #[test]
    fn mid_file_zero_header_recovers() {
        let mut buf = table_bytes(TYPE_WAVE, 0, &[0xAAu8; 4]);
        buf.extend_from_slice(&sentinel()); // mid-file zero header
        buf.extend_from_slice(&table_bytes(TYPE_WAVE, 1, &[0xBBu8; 4])); // trailing garbage
        buf.extend_from_slice(&sentinel());

        let flags = validate_dat(&buf);
        assert!(flags.has(DatValidationFlags::EMPTY_TABLE_MIDFILE));

        let mut mutable = buf.clone();
        let recovered = handle_dat_validation_issues(&mut mutable, flags);
        assert!(!recovered.has(DatValidationFlags::EMPTY_TABLE_MIDFILE));

        let revalidated = validate_dat(&mutable);
        assert!(!revalidated.has(DatValidationFlags::EMPTY_TABLE_MIDFILE));
        assert!(revalidated.has(DatValidationFlags::EOF_EMPTY_TABLE));
    }
}
