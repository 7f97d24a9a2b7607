//! PC-variant stream cipher used to encrypt download/offline QST packet
//! payloads.
//!
//! This is not the online-session cipher used for live network traffic;
//! only packet-ID recognition of that mode is in scope elsewhere in this
//! toolkit. This crate covers the table-driven cipher applied to
//! download-quest GCI and bin/dat payloads embedded in a QST container.

pub mod cipher;
pub mod error;

pub use cipher::{create_keys, decrypt, encrypt, PcCipher};
pub use error::{CryptoError, Result};
