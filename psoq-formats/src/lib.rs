//! Structural models and container codec for PSO Gamecube Episode I&II
//! quest data.
//!
//! This crate provides:
//! - Fixed-layout parsing and validation for decompressed `.bin`/`.dat`
//!   payloads ([`bindat`]).
//! - A reader/writer for the `.qst` container format, including the
//!   download wrapper and stream-cipher encryption ([`qst`]).
//! - Documented boundaries for the collaborators this crate deliberately
//!   does not implement: text-encoding conversion ([`text_codec`]) and
//!   memory-card outer-record extraction ([`gci`]).

pub mod bindat;
mod error;
pub mod gci;
pub mod qst;
pub mod text_codec;

pub use error::{Error, Result};
