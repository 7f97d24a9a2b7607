//! QST container codec: fixed header/chunk records, interleaved framing,
//! and the download wrapper/encryption used by offline quests.

mod chunk;
mod container;
mod header;
mod wrapper;

pub use chunk::{QstChunk, CHUNK_DATA_SIZE, CHUNK_RECORD_SIZE, PKT_ID_DOWNLOAD_CHUNK, PKT_ID_ONLINE_CHUNK};
pub use container::{read_qst, write_qst, QstEntry};
pub use header::{QstFileHeader, HEADER_RECORD_SIZE, PKT_ID_DOWNLOAD_HEADER, PKT_ID_ONLINE_HEADER};
pub use wrapper::{build_offline_payload, extract_offline_payload, DownloadWrapper, WRAPPER_SIZE};
