//! Reader/writer for the QST container: two file header records followed
//! by an interleaved sequence of data chunks.

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};

use crate::error::{Error, Result};
use crate::qst::chunk::{QstChunk, CHUNK_DATA_SIZE, CHUNK_RECORD_SIZE, PKT_ID_DOWNLOAD_CHUNK, PKT_ID_ONLINE_CHUNK};
use crate::qst::header::{decode_nul_padded, QstFileHeader, HEADER_RECORD_SIZE, PKT_ID_DOWNLOAD_HEADER, PKT_ID_ONLINE_HEADER};

/// One logical file (bin or dat) to be written into, or read out of, a
/// QST container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QstEntry {
    /// `pkt_id` to stamp on this file's header record (0x44 or 0xA6).
    pub pkt_id_header: u8,
    /// `pkt_id` to stamp on this file's chunk records (0x13 or 0xA7).
    pub pkt_id_chunk: u8,
    /// Quest title field, Shift-JIS NUL-padded, 32 bytes.
    pub name: [u8; 32],
    /// Base filename, NUL-padded, 16 bytes.
    pub filename: [u8; 16],
    /// The file's payload stream (already wrapped/encrypted for a
    /// download entry, or the bare compressed bytes for an online one).
    pub payload: Vec<u8>,
}

impl QstEntry {
    /// Decode [`Self::filename`] up to its first NUL.
    pub fn filename_str(&self) -> String {
        decode_nul_padded(&self.filename)
    }

    /// `true` for a download/offline entry.
    pub fn is_download(&self) -> bool {
        self.pkt_id_header == PKT_ID_DOWNLOAD_HEADER
    }
}

/// Write `files`' header records in order, followed by their chunk
/// records interleaved one-at-a-time until every file is exhausted.
pub fn write_qst(files: &[QstEntry]) -> Result<Vec<u8>> {
    let mut out = Vec::new();

    for file in files {
        let header = QstFileHeader {
            pkt_id: file.pkt_id_header,
            pkt_flags: 0,
            pkt_size: HEADER_RECORD_SIZE,
            name: file.name,
            unused: 0,
            flags: 0,
            filename: file.filename,
            size: file.payload.len() as u32,
        };
        let mut cursor = Cursor::new(Vec::with_capacity(HEADER_RECORD_SIZE as usize));
        header.write(&mut cursor)?;
        out.extend_from_slice(&cursor.into_inner());
    }

    let mut offsets = vec![0usize; files.len()];
    let mut sequence = vec![0u8; files.len()];
    loop {
        let mut wrote_any = false;
        for (i, file) in files.iter().enumerate() {
            if offsets[i] >= file.payload.len() {
                continue;
            }
            wrote_any = true;
            let end = (offsets[i] + CHUNK_DATA_SIZE).min(file.payload.len());
            let chunk = QstChunk::new(
                file.pkt_id_chunk,
                sequence[i],
                file.filename,
                &file.payload[offsets[i]..end],
            );
            let mut cursor = Cursor::new(Vec::with_capacity(CHUNK_RECORD_SIZE as usize));
            chunk.write(&mut cursor)?;
            out.extend_from_slice(&cursor.into_inner());
            offsets[i] = end;
            sequence[i] = sequence[i].wrapping_add(1);
        }
        if !wrote_any {
            break;
        }
    }

    Ok(out)
}

struct PendingFile {
    header: QstFileHeader,
    buffer: Vec<u8>,
}

/// Parse a QST container back into its constituent entries. Header
/// records may appear in either order; chunk records for different files
/// may be interleaved arbitrarily, as long as each file's own chunks
/// carry a strictly increasing sequence counter (mod 256).
pub fn read_qst(bytes: &[u8]) -> Result<Vec<QstEntry>> {
    let mut pending: Vec<PendingFile> = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        if offset + 4 > bytes.len() {
            return Err(Error::Truncated {
                offset,
                context: "QST record prefix".to_string(),
            });
        }
        let pkt_id = bytes[offset];
        let pkt_size = u16::from_le_bytes([bytes[offset + 2], bytes[offset + 3]]);

        match pkt_size {
            size if size == HEADER_RECORD_SIZE => {
                let record = bytes.get(offset..offset + size as usize).ok_or(Error::Truncated {
                    offset,
                    context: "QST header record".to_string(),
                })?;
                if pkt_id != PKT_ID_ONLINE_HEADER && pkt_id != PKT_ID_DOWNLOAD_HEADER {
                    return Err(Error::UnknownPacketId(pkt_id));
                }
                let mut cursor = Cursor::new(record);
                let header = QstFileHeader::read(&mut cursor)?;
                pending.push(PendingFile {
                    buffer: Vec::with_capacity(header.size as usize),
                    header,
                });
                offset += size as usize;
            }
            size if size == CHUNK_RECORD_SIZE => {
                let record = bytes.get(offset..offset + size as usize).ok_or(Error::Truncated {
                    offset,
                    context: "QST chunk record".to_string(),
                })?;
                if pkt_id != PKT_ID_ONLINE_CHUNK && pkt_id != PKT_ID_DOWNLOAD_CHUNK {
                    return Err(Error::UnknownPacketId(pkt_id));
                }
                let mut cursor = Cursor::new(record);
                let chunk = QstChunk::read(&mut cursor)?;
                if chunk.size as usize > CHUNK_DATA_SIZE {
                    return Err(Error::ChunkSizeExceedsDeclared {
                        filename: chunk.filename_str(),
                        actual: chunk.size,
                    });
                }
                let filename = chunk.filename_str();
                let entry = pending
                    .iter_mut()
                    .find(|p| p.header.filename_str() == filename)
                    .ok_or_else(|| Error::UnannouncedFilename(filename.clone()))?;
                if entry.buffer.len() + chunk.payload().len() > entry.header.size as usize {
                    return Err(Error::ChunkSizeExceedsDeclared {
                        filename,
                        actual: chunk.size,
                    });
                }
                entry.buffer.extend_from_slice(chunk.payload());
                offset += size as usize;
            }
            other => {
                return Err(Error::ImpossiblePacketSize {
                    expected: HEADER_RECORD_SIZE,
                    actual: other,
                });
            }
        }
    }

    pending
        .into_iter()
        .map(|p| {
            if p.buffer.len() != p.header.size as usize {
                return Err(Error::SizeMismatch {
                    filename: p.header.filename_str(),
                    actual: p.buffer.len(),
                    declared: p.header.size as usize,
                });
            }
            let pkt_id_chunk = if p.header.is_download() {
                PKT_ID_DOWNLOAD_CHUNK
            } else {
                PKT_ID_ONLINE_CHUNK
            };
            Ok(QstEntry {
                pkt_id_header: p.header.pkt_id,
                pkt_id_chunk,
                name: p.header.name,
                filename: p.header.filename,
                payload: p.buffer,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qst::header::encode_nul_padded;

    fn entry(pkt_id_header: u8, pkt_id_chunk: u8, filename: &str, payload: Vec<u8>) -> QstEntry {
        QstEntry {
            pkt_id_header,
            pkt_id_chunk,
            name: encode_nul_padded("Test Quest"),
            filename: encode_nul_padded(filename),
            payload,
        }
    }

    #[test]
    fn online_round_trip() {
        let bin = entry(PKT_ID_ONLINE_HEADER, PKT_ID_ONLINE_CHUNK, "q01.bin", vec![0xAAu8; 2500]);
        let dat = entry(PKT_ID_ONLINE_HEADER, PKT_ID_ONLINE_CHUNK, "q01.dat", vec![0xBBu8; 500]);

        let bytes = write_qst(&[bin.clone(), dat.clone()]).unwrap();
        assert_eq!(&bytes[0], &PKT_ID_ONLINE_HEADER);

        let parsed = read_qst(&bytes).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].payload, bin.payload);
        assert_eq!(parsed[0].filename_str(), "q01.bin");
        assert_eq!(parsed[1].payload, dat.payload);
        assert_eq!(parsed[1].filename_str(), "q01.dat");
    }

    #[test]
    fn single_byte_file_round_trips() {
        let bin = entry(PKT_ID_ONLINE_HEADER, PKT_ID_ONLINE_CHUNK, "q02.bin", vec![0x01]);
        let dat = entry(PKT_ID_ONLINE_HEADER, PKT_ID_ONLINE_CHUNK, "q02.dat", vec![0x02, 0x03]);

        let bytes = write_qst(&[bin.clone(), dat.clone()]).unwrap();
        let parsed = read_qst(&bytes).unwrap();
        assert_eq!(parsed[0].payload, bin.payload);
        assert_eq!(parsed[1].payload, dat.payload);
    }

    #[test]
    fn chunk_count_matches_expectation() {
        let bin = entry(PKT_ID_ONLINE_HEADER, PKT_ID_ONLINE_CHUNK, "q03.bin", vec![0u8; 2049]);
        let dat = entry(PKT_ID_ONLINE_HEADER, PKT_ID_ONLINE_CHUNK, "q03.dat", vec![0u8; 100]);
        let expected_chunks = 3 + 1; // ceil(2049/1024) + ceil(100/1024)

        let bytes = write_qst(&[bin, dat]).unwrap();
        let chunk_bytes = bytes.len() - 2 * HEADER_RECORD_SIZE as usize;
        assert_eq!(chunk_bytes / CHUNK_RECORD_SIZE as usize, expected_chunks);
    }

    #[test]
    fn unannounced_filename_is_rejected() {
        let dat = entry(PKT_ID_ONLINE_HEADER, PKT_ID_ONLINE_CHUNK, "q04.dat", vec![1, 2, 3, 4]);
        let mut bytes = write_qst(&[dat]).unwrap();
        // corrupt the header's filename (offset 40: after pkt_id/pkt_flags/pkt_size/name/unused/flags)
        // so the chunk no longer matches it
        bytes[40] = b'z';

        let err = read_qst(&bytes).unwrap_err();
        assert!(matches!(err, Error::UnannouncedFilename(_)));
    }

    proptest::proptest! {
        /// spec §8: a QST container built from two arbitrary payloads
        /// round-trips back to the same payloads for every pair of
        /// byte buffers and filenames.
        #[test]
        fn online_qst_round_trips_for_arbitrary_payloads(
            bin_payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..3000),
            dat_payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..3000),
        ) {
            let bin = entry(PKT_ID_ONLINE_HEADER, PKT_ID_ONLINE_CHUNK, "q99.bin", bin_payload.clone());
            let dat = entry(PKT_ID_ONLINE_HEADER, PKT_ID_ONLINE_CHUNK, "q99.dat", dat_payload.clone());

            let bytes = write_qst(&[bin, dat]).unwrap();
            let parsed = read_qst(&bytes).unwrap();

            proptest::prop_assert_eq!(parsed.len(), 2);
            proptest::prop_assert_eq!(&parsed[0].payload, &bin_payload);
            proptest::prop_assert_eq!(parsed[0].filename_str(), "q99.bin");
            proptest::prop_assert_eq!(&parsed[1].payload, &dat_payload);
            proptest::prop_assert_eq!(parsed[1].filename_str(), "q99.dat");
        }
    }
}
