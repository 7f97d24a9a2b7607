//! Integration tests for the `psoq` command surface, exercising
//! `commands::convert`/`commands::info` against real files on disk.

use std::path::PathBuf;

use psoq::commands::convert::{self, ConvertFormat};
use psoq::commands::{info, OutputFormat};
use psoq_formats::bindat::{write_bin_header, write_dat, BinHeader, DatFile};
use tempfile::TempDir;

fn sample_bin() -> Vec<u8> {
    let header = BinHeader {
        object_code_offset: 468,
        function_offset_table_offset: 468,
        bin_size: 468,
        reserved_ffffffff: 0xFFFF_FFFF,
        download_flag: 0,
        unknown: 0,
        quest_number_low: 7,
        quest_number_high: 0,
        name: {
            let mut n = [0u8; 32];
            n[..4].copy_from_slice(b"Test");
            n
        },
        short_description: [0u8; 128],
        long_description: [0u8; 288],
    };
    write_bin_header(&header).unwrap()
}

fn sample_dat() -> Vec<u8> {
    write_dat(&DatFile::default())
}

#[test]
fn convert_raw_bindat_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let bin_in = dir.path().join("q01.bin");
    let dat_in = dir.path().join("q01.dat");
    std::fs::write(&bin_in, sample_bin()).unwrap();
    std::fs::write(&dat_in, sample_dat()).unwrap();

    let bin_out = dir.path().join("q01_out.bin");
    let dat_out = dir.path().join("q01_out.dat");
    convert::run(
        &[bin_in, dat_in],
        ConvertFormat::RawBindat,
        &[bin_out.clone(), dat_out.clone()],
    )
    .unwrap();

    assert_eq!(std::fs::read(&bin_out).unwrap(), sample_bin());
    assert_eq!(std::fs::read(&dat_out).unwrap(), sample_dat());
}

#[test]
fn convert_online_qst_then_info_reports_clean_quest() {
    let dir = TempDir::new().unwrap();
    let bin_in = dir.path().join("q02.bin");
    let dat_in = dir.path().join("q02.dat");
    std::fs::write(&bin_in, sample_bin()).unwrap();
    std::fs::write(&dat_in, sample_dat()).unwrap();

    let qst_out = dir.path().join("q02.qst");
    convert::run(
        &[bin_in, dat_in],
        ConvertFormat::OnlineQst,
        &[qst_out.clone()],
    )
    .unwrap();
    assert!(qst_out.exists());

    let report = info::run(&[qst_out]).unwrap();
    assert_eq!(report.quest_name, "Test");
    assert!(report.bin_validation_flags.is_empty());
    assert!(report.dat_validation_flags.is_empty());

    let rendered = info::render(&report, OutputFormat::Json).unwrap();
    assert!(rendered.contains("\"quest_name\""));
}

#[test]
fn convert_offline_qst_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let bin_in = dir.path().join("q03.bin");
    let dat_in = dir.path().join("q03.dat");
    std::fs::write(&bin_in, sample_bin()).unwrap();
    std::fs::write(&dat_in, sample_dat()).unwrap();

    let qst_out = dir.path().join("q03.qst");
    convert::run(
        &[bin_in.clone(), dat_in.clone()],
        ConvertFormat::OfflineQst,
        &[qst_out.clone()],
    )
    .unwrap();

    let bin_roundtrip = dir.path().join("q03_rt.bin");
    let dat_roundtrip = dir.path().join("q03_rt.dat");
    convert::run(
        &[qst_out],
        ConvertFormat::RawBindat,
        &[bin_roundtrip.clone(), dat_roundtrip.clone()],
    )
    .unwrap();

    assert_eq!(std::fs::read(bin_roundtrip).unwrap(), sample_bin());
    assert_eq!(std::fs::read(dat_roundtrip).unwrap(), sample_dat());
}

#[test]
fn missing_input_file_reports_error_without_panicking() {
    let dir = TempDir::new().unwrap();
    let missing: PathBuf = dir.path().join("does_not_exist.bin");
    let also_missing = dir.path().join("does_not_exist.dat");

    let err = info::run(&[missing, also_missing]).unwrap_err();
    assert!(matches!(err, psoq::Error::FileNotFound(_)));
}
