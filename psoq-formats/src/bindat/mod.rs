//! Structural model for decompressed `.bin` and `.dat` quest payloads:
//! fixed header parsing, typed table walking, and validators that report
//! issues as flag sets rather than failing outright.

mod area;
mod bin;
mod dat;

pub use area::area_name;
pub use bin::{
    handle_bin_validation_issues, read_bin_header, validate_bin, write_bin_header, BinHeader,
    BinValidationFlags,
};
pub use dat::{
    handle_dat_validation_issues, read_dat, validate_dat, write_dat, DatFile, DatTable,
    DatTableHeader, DatValidationFlags,
};
