//! JSON output for result envelopes.
//!
//! Files are grouped by month, one per report:
//! `{json_output_dir}/{month}/{name}.json`.

use crate::utils::ensure_writable_dir;
use serde::Serialize;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `document` as pretty-printed JSON and return the path written.
///
/// The month directory is created if needed. An existing file with the same
/// name is overwritten.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, month = %month, name = %name))]
pub async fn write_envelope<T: Serialize>(
    document: &T,
    json_output_dir: &str,
    month: &str,
    name: &str,
) -> Result<String, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(document)?;

    let full_json_dir = format!("{}/{}", json_output_dir.trim_end_matches('/'), month);
    info!(%full_json_dir, "Ensuring JSON directory exists");
    if let Err(e) = ensure_writable_dir(&full_json_dir).await {
        error!(%full_json_dir, error = %e, "Failed to prepare JSON dir");
        return Err(e);
    }

    let output_json_filename = format!("{}/{}.json", full_json_dir, name);
    info!(path = %output_json_filename, "Writing JSON");
    fs::write(&output_json_filename, json).await?;
    info!(path = %output_json_filename, "Wrote JSON file");

    Ok(output_json_filename)
}
