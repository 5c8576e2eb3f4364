//! Command-line interface definitions for Archive Overviews.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and endpoints can be provided via flags or environment
//! variables; they are global so they may appear before or after the
//! subcommand.

use crate::config::{
    DEFAULT_ARCHIVE_URL, DEFAULT_GENERATION_TIMEOUT_SECS, DEFAULT_GENERATION_URL, DEFAULT_IAM_URL,
    DEFAULT_MODEL_ID,
};
use crate::models::TabType;
use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Archive Overviews application.
///
/// # Examples
///
/// ```sh
/// # Daily overviews for January 2024
/// archive_overviews archive --year 2024 --month 1
///
/// # Monthly overview focused on a theme, saved under ./json
/// archive_overviews archive --year 2024 --month 1 --tab-type Monthly \
///     --custom-search "AI chips" --json-output-dir ./json
///
/// # Exercise the pipeline without credentials
/// FALLBACK_MODE=1 archive_overviews archive --year 2024 --month 1 --tab-type Weekly
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// New York Times API key
    #[arg(long, env = "NYT_API_KEY", hide_env_values = true, global = true)]
    pub nyt_api_key: Option<String>,

    /// Base URL of the NYT Archive API
    #[arg(long, env = "NYT_ARCHIVE_URL", default_value = DEFAULT_ARCHIVE_URL, global = true)]
    pub nyt_archive_url: String,

    /// IBM Cloud API key used to obtain a watsonx.ai bearer token
    #[arg(long, env = "WATSONX_API_KEY", hide_env_values = true, global = true)]
    pub watsonx_api_key: Option<String>,

    /// watsonx.ai project id
    #[arg(long, env = "WATSONX_PROJECT_ID", global = true)]
    pub watsonx_project_id: Option<String>,

    /// Model used for text generation
    #[arg(long, env = "WATSONX_MODEL_ID", default_value = DEFAULT_MODEL_ID, global = true)]
    pub watsonx_model_id: String,

    /// Text-generation endpoint, including its `version` query parameter
    #[arg(long, env = "WATSONX_URL", default_value = DEFAULT_GENERATION_URL, global = true)]
    pub watsonx_url: String,

    /// IBM Cloud IAM base URL
    #[arg(long, env = "IAM_URL", default_value = DEFAULT_IAM_URL, global = true)]
    pub iam_url: String,

    /// Seconds to wait for the generation call before giving up
    #[arg(long, env = "GENERATION_TIMEOUT_SECS", default_value_t = DEFAULT_GENERATION_TIMEOUT_SECS, global = true)]
    pub generation_timeout_secs: u64,

    /// Upper bound on generated tokens
    #[arg(long, default_value_t = 3000, global = true)]
    pub max_new_tokens: u32,

    /// Lower bound on generated tokens
    #[arg(long, default_value_t = 200, global = true)]
    pub min_new_tokens: u32,

    /// Directory containing the daily/weekly/monthly prompt templates
    #[arg(long, env = "PROMPTS_DIR", default_value = "prompts", global = true)]
    pub prompts_dir: PathBuf,

    /// Return canned example payloads instead of calling the archive and the model
    #[arg(long, env = "FALLBACK_MODE", value_parser = FalseyValueParser::new(), global = true)]
    pub fallback_mode: bool,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a month from the archive and generate overviews for it
    Archive {
        /// Archive year, e.g. 2024
        #[arg(long)]
        year: i32,

        /// Archive month (1-12)
        #[arg(long)]
        month: u32,

        /// Focus the model on topics matching this string
        #[arg(long, alias = "custom_search")]
        custom_search: Option<String>,

        /// Report granularity: Daily, Weekly or Monthly
        #[arg(long, default_value_t = TabType::Daily)]
        tab_type: TabType,

        /// Produce daily, weekly and monthly reports from one archive fetch
        #[arg(long, conflicts_with = "tab_type")]
        all: bool,

        /// Also write the JSON result under this directory
        #[arg(short, long)]
        json_output_dir: Option<String>,
    },
}
