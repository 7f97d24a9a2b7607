//! The 8-byte download wrapper prefixed to a download/offline quest's
//! compressed payload before encryption.

use binrw::{BinRead, BinResult, BinWrite};
use std::io::{Read, Seek, Write};

use crate::error::{Error, Result};

/// Fixed on-disk size of the wrapper.
pub const WRAPPER_SIZE: usize = 8;

/// The unencrypted 8-byte prefix of a download/offline payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadWrapper {
    /// `decompressed_size + 8`: the decompressed payload size plus this
    /// wrapper's own length.
    pub decompressed_size_plus_wrapper: u32,
    /// The seed the stream cipher was keyed with for this payload.
    pub crypt_key: u32,
}

impl BinRead for DownloadWrapper {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        Ok(Self {
            decompressed_size_plus_wrapper: u32::read_options(reader, endian, ())?,
            crypt_key: u32::read_options(reader, endian, ())?,
        })
    }
}

impl BinWrite for DownloadWrapper {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.decompressed_size_plus_wrapper
            .write_options(writer, endian, ())?;
        self.crypt_key.write_options(writer, endian, ())?;
        Ok(())
    }
}

impl binrw::meta::ReadEndian for DownloadWrapper {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}

impl binrw::meta::WriteEndian for DownloadWrapper {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::Endian(binrw::Endian::Little);
}

/// Build a download/offline payload: wrapper + encrypted compressed
/// bytes. `compressed` is zero-padded to a multiple of 4 before
/// encryption, per the cipher's alignment requirement; the wrapper
/// itself is never encrypted.
pub fn build_offline_payload(
    decompressed_size: u32,
    compressed: &[u8],
    crypt_key: u32,
) -> Result<Vec<u8>> {
    let mut payload = compressed.to_vec();
    let padding = (4 - payload.len() % 4) % 4;
    payload.extend(std::iter::repeat(0u8).take(padding));

    psoq_crypto::encrypt(&mut payload, crypt_key)?;

    let wrapper = DownloadWrapper {
        decompressed_size_plus_wrapper: decompressed_size + WRAPPER_SIZE as u32,
        crypt_key,
    };
    let mut cursor = binrw::io::Cursor::new(Vec::with_capacity(WRAPPER_SIZE + payload.len()));
    wrapper.write(&mut cursor)?;
    let mut out = cursor.into_inner();
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Split a reassembled download payload into its wrapper and the
/// decrypted compressed bytes (still possibly zero-padded to a multiple
/// of 4; PRS decompression stops at its own end marker regardless of
/// trailing padding).
pub fn extract_offline_payload(payload: &[u8]) -> Result<(DownloadWrapper, Vec<u8>)> {
    if payload.len() < WRAPPER_SIZE {
        return Err(Error::Truncated {
            offset: payload.len(),
            context: "download wrapper".to_string(),
        });
    }
    let mut cursor = binrw::io::Cursor::new(&payload[..WRAPPER_SIZE]);
    let wrapper = DownloadWrapper::read(&mut cursor)?;

    let mut body = payload[WRAPPER_SIZE..].to_vec();
    psoq_crypto::decrypt(&mut body, wrapper.crypt_key)?;

    Ok((wrapper, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_extract_round_trips() {
        let compressed = b"compressed quest bytes".to_vec();
        let wrapped = build_offline_payload(compressed.len() as u32, &compressed, 0xCAFEBABE).unwrap();

        let (wrapper, extracted) = extract_offline_payload(&wrapped).unwrap();
        assert_eq!(wrapper.crypt_key, 0xCAFEBABE);
        assert_eq!(
            wrapper.decompressed_size_plus_wrapper,
            compressed.len() as u32 + WRAPPER_SIZE as u32
        );
        assert_eq!(&extracted[..compressed.len()], &compressed[..]);
    }

    proptest::proptest! {
        /// spec §8: the random wrapper key must not affect round-trip
        /// equality of the decrypted payload, for every key and buffer.
        #[test]
        fn round_trips_for_arbitrary_key_and_payload(
            compressed in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..2000),
            crypt_key in proptest::prelude::any::<u32>(),
        ) {
            let wrapped = build_offline_payload(compressed.len() as u32, &compressed, crypt_key).unwrap();
            let (wrapper, extracted) = extract_offline_payload(&wrapped).unwrap();

            proptest::prop_assert_eq!(wrapper.crypt_key, crypt_key);
            proptest::prop_assert_eq!(&extracted[..compressed.len()], &compressed[..]);
        }
    }
}
