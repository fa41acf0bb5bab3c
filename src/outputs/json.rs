//! JSON dump of a run's extraction result.

use crate::models::ExtractionResult;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// File name of the structured dump inside a run folder.
pub const FULL_DATA_FILE: &str = "full_data.json";

/// Write `result` as pretty-printed JSON to `{run_folder}/full_data.json`.
///
/// Non-ASCII text is written verbatim.
#[instrument(level = "info", skip_all, fields(run_folder = %run_folder.display()))]
pub async fn write_full_data(
    result: &ExtractionResult,
    run_folder: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(result)?;
    let path = run_folder.join(FULL_DATA_FILE);
    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = result.articles.len(), "Wrote structured data");
    Ok(path)
}
