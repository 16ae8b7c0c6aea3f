use crate::constants::EXPORT_FILE_NAME;
use crate::error::Result;
use crate::pipeline::NormalizedPolls;
use crate::types::{ChartPoint, SupportEntry};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Document written for the static dashboard: the canonical table listing
/// plus the chronological chart projection.
#[derive(Serialize)]
struct ExportDocument<'a> {
    #[serde(rename = "partySupport")]
    party_support: &'a [SupportEntry],
    #[serde(rename = "formattedForChart")]
    formatted_for_chart: &'a [ChartPoint],
}

/// Writes `party-support.json` under `output_dir`, creating the directory if
/// needed. Returns the path of the written file.
pub fn write_export(polls: &NormalizedPolls, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let document = ExportDocument {
        party_support: &polls.table,
        formatted_for_chart: &polls.chart,
    };
    let json = serde_json::to_string_pretty(&document)?;

    let output_path = output_dir.join(EXPORT_FILE_NAME);
    fs::write(&output_path, json)?;
    info!("Exported {} entries to {}", polls.table.len(), output_path.display());
    Ok(output_path)
}
