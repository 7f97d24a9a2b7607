//! `psoq convert` — normalize a quest source and re-frame it into one of
//! the four target formats.

use std::path::{Path, PathBuf};

use crate::{convert_to_offline_qst, convert_to_online_qst, convert_to_prs_bindat, convert_to_raw_bindat};
use crate::{Error, QuestSource, Result};

/// The four target formats `psoq convert` can produce.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ConvertFormat {
    /// Decompressed `.bin`/`.dat` pair.
    RawBindat,
    /// PRS-compressed `.bin`/`.dat` pair.
    PrsBindat,
    /// Online (unencrypted) `.qst` container.
    OnlineQst,
    /// Download/offline (encrypted) `.qst` container.
    OfflineQst,
}

/// Load `inputs`, convert to `format`, and write the result to `outputs`.
/// `outputs` has one path for qst targets, two (bin, dat) for bindat
/// targets.
pub fn run(inputs: &[PathBuf], format: ConvertFormat, outputs: &[PathBuf]) -> Result<()> {
    let source = load_source(inputs)?;

    match format {
        ConvertFormat::RawBindat | ConvertFormat::PrsBindat => {
            let (bin_path, dat_path) = expect_two(outputs)?;
            let (bin, dat) = match format {
                ConvertFormat::RawBindat => convert_to_raw_bindat(&source)?,
                ConvertFormat::PrsBindat => convert_to_prs_bindat(&source)?,
                _ => unreachable!(),
            };
            write_file(bin_path, &bin)?;
            write_file(dat_path, &dat)?;
        }
        ConvertFormat::OnlineQst | ConvertFormat::OfflineQst => {
            let qst_path = expect_one(outputs)?;
            let bytes = match format {
                ConvertFormat::OnlineQst => convert_to_online_qst(&source)?,
                ConvertFormat::OfflineQst => convert_to_offline_qst(&source)?,
                _ => unreachable!(),
            };
            write_file(qst_path, &bytes)?;
        }
    }

    Ok(())
}

fn load_source(inputs: &[PathBuf]) -> Result<QuestSource> {
    if inputs.len() == 1 {
        let bytes = read_file(&inputs[0])?;
        return QuestSource::from_qst(&bytes);
    }
    if inputs.len() == 2 {
        let (bin_path, dat_path) = order_bin_dat(inputs)?;
        let bin = read_file(bin_path)?;
        let dat = read_file(dat_path)?;
        return Ok(QuestSource::from_prs_bindat(
            filename_of(bin_path),
            filename_of(dat_path),
            bin,
            dat,
        ));
    }
    Err(Error::InvalidParams(format!(
        "expected 1 (.qst) or 2 (.bin + .dat) input paths, got {}",
        inputs.len()
    )))
}

fn order_bin_dat(inputs: &[PathBuf]) -> Result<(&Path, &Path)> {
    let a = inputs[0].as_path();
    let b = inputs[1].as_path();
    match (extension_of(a), extension_of(b)) {
        (Some("bin"), Some("dat")) => Ok((a, b)),
        (Some("dat"), Some("bin")) => Ok((b, a)),
        _ => Err(Error::InvalidParams(
            "expected one .bin and one .dat path".to_string(),
        )),
    }
}

fn expect_two(outputs: &[PathBuf]) -> Result<(&Path, &Path)> {
    match outputs {
        [a, b] => order_bin_dat_outputs(a, b),
        _ => Err(Error::InvalidParams(format!(
            "expected 2 output paths (.bin, .dat), got {}",
            outputs.len()
        ))),
    }
}

fn order_bin_dat_outputs<'a>(a: &'a Path, b: &'a Path) -> Result<(&'a Path, &'a Path)> {
    match (extension_of(a), extension_of(b)) {
        (Some("bin"), Some("dat")) => Ok((a, b)),
        (Some("dat"), Some("bin")) => Ok((b, a)),
        _ => Err(Error::InvalidParams(
            "expected one .bin and one .dat output path".to_string(),
        )),
    }
}

fn expect_one(outputs: &[PathBuf]) -> Result<&Path> {
    match outputs {
        [a] => Ok(a.as_path()),
        _ => Err(Error::InvalidParams(format!(
            "expected 1 output path (.qst), got {}",
            outputs.len()
        ))),
    }
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn filename_of(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.display().to_string())
        } else {
            Error::Io(err)
        }
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|err| Error::CannotCreate(format!("{}: {err}", path.display())))
}
