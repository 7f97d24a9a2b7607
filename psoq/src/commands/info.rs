//! `psoq info` — load a quest from either a `.bin`/`.dat` pair or a
//! `.qst` file and print a structured report.

use std::path::Path;

use tracing::info as log_info;

use crate::commands::OutputFormat;
use crate::{Error, QuestReport, QuestSource, Result};

/// Load whichever of `.bin`/`.dat` or `.qst` `inputs` names, and return
/// the resulting source plus its report.
pub fn run(inputs: &[impl AsRef<Path>]) -> Result<QuestReport> {
    let source = load_source(inputs)?;
    crate::info(&source)
}

fn load_source(inputs: &[impl AsRef<Path>]) -> Result<QuestSource> {
    if inputs.len() == 1 {
        let path = inputs[0].as_ref();
        log_info!(path = %path.display(), "loading qst");
        let bytes = read_file(path)?;
        return QuestSource::from_qst(&bytes);
    }

    if inputs.len() == 2 {
        let (bin_path, dat_path) = order_bin_dat(inputs)?;
        log_info!(bin = %bin_path.display(), dat = %dat_path.display(), "loading bin/dat pair");
        let bin = read_file(bin_path)?;
        let dat = read_file(dat_path)?;
        let bin_filename = filename_of(bin_path);
        let dat_filename = filename_of(dat_path);
        return Ok(QuestSource::from_prs_bindat(bin_filename, dat_filename, bin, dat));
    }

    Err(Error::InvalidParams(format!(
        "expected 1 (.qst) or 2 (.bin + .dat) input paths, got {}",
        inputs.len()
    )))
}

fn order_bin_dat<'a>(inputs: &'a [impl AsRef<Path>]) -> Result<(&'a Path, &'a Path)> {
    let a = inputs[0].as_ref();
    let b = inputs[1].as_ref();
    match (extension_of(a), extension_of(b)) {
        (Some("bin"), Some("dat")) => Ok((a, b)),
        (Some("dat"), Some("bin")) => Ok((b, a)),
        _ => Err(Error::InvalidParams(
            "expected one .bin and one .dat path".to_string(),
        )),
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

/// Render `report` as text or JSON, per `format`.
pub fn render(report: &QuestReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)
            .map_err(|err| Error::InvalidParams(err.to_string()))?),
        OutputFormat::Text => Ok(render_text(report)),
    }
}

fn render_text(report: &QuestReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} / {}\n", report.bin_filename, report.dat_filename));
    out.push_str(&format!("  name: {:?}\n", report.quest_name));
    out.push_str(&format!(
        "  quest number: u8+episode = {:?}, u16 = {}\n",
        report.quest_number_u8_episode, report.quest_number_u16
    ));
    out.push_str(&format!("  download flag: {}\n", report.download_flag));
    out.push_str(&format!(
        "  object_code_offset: {} (declared bin_size {}, actual {})\n",
        report.object_code_offset, report.declared_bin_size, report.actual_bin_size
    ));
    if report.bin_validation_flags.is_empty() {
        out.push_str("  bin validation: clean\n");
    } else {
        out.push_str(&format!("  bin validation: {}\n", report.bin_validation_flags.join(", ")));
    }
    out.push_str(&format!("  dat tables: {}\n", report.dat_tables.len()));
    for table in &report.dat_tables {
        out.push_str(&format!(
            "    type={} area={} ({}) records/bytes={}\n",
            table.table_type,
            table.area,
            table.area_name.unwrap_or("unknown"),
            table.record_count
        ));
    }
    if report.dat_validation_flags.is_empty() {
        out.push_str("  dat validation: clean\n");
    } else {
        out.push_str(&format!("  dat validation: {}\n", report.dat_validation_flags.join(", ")));
    }
    out
}
