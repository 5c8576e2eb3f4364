//! New York Times Archive API client.
//!
//! One `GET {base}/{year}/{month}.json?api-key=...` per call. The archive
//! embeds large `multimedia` blocks in every record; those are stripped
//! from the whole tree before the payload is handed back.

use super::ArchiveSource;
use super::trim::remove_key_recursive;
use crate::config::ArchiveConfig;
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

/// Why a month could not be fetched from the archive.
///
/// Any of these ends a pipeline run with a failure envelope carrying the
/// error's message.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Missing NYT_API_KEY environment variable")]
    MissingApiKey,

    #[error("Invalid archive URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request to NYT Archive failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to fetch NYT Archive (HTTP {status_code})")]
    Status { status_code: u16, raw: String },

    #[error("NYT Archive returned invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ArchiveError {
    /// HTTP status reported by the archive, if it answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ArchiveError::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Client for the monthly archive endpoint.
#[derive(Debug, Clone)]
pub struct NytArchive {
    client: Client,
    config: ArchiveConfig,
}

impl NytArchive {
    /// Wrap a shared HTTP client. The API key is checked per fetch, not here.
    pub fn new(client: Client, config: ArchiveConfig) -> Self {
        Self { client, config }
    }

    /// Build the endpoint URL for a month. The month is not range-checked.
    pub fn month_url(&self, year: i32, month: u32) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/{}/{}.json",
            self.config.base_url.trim_end_matches('/'),
            year,
            month
        ))
    }
}

impl ArchiveSource for NytArchive {
    #[instrument(level = "info", skip(self))]
    async fn fetch_month(&self, year: i32, month: u32) -> Result<Value, ArchiveError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ArchiveError::MissingApiKey)?;

        let url = self.month_url(year, month)?;
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .query(&[("api-key", api_key)])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status != StatusCode::OK {
            warn!(
                status = status.as_u16(),
                body = %truncate_for_log(&body, 300),
                "NYT Archive returned non-200"
            );
            return Err(ArchiveError::Status {
                status_code: status.as_u16(),
                raw: body,
            });
        }

        let mut payload: Value = serde_json::from_str(&body)?;
        remove_key_recursive(&mut payload, "multimedia");
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = body.len(),
            "Fetched NYT Archive month"
        );
        Ok(payload)
    }
}
