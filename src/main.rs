//! # Archive Overviews
//!
//! Turns one month of New York Times archive metadata into daily, weekly or
//! monthly overviews using a hosted watsonx.ai text-generation model, and
//! prints the normalized JSON result.
//!
//! ## Usage
//!
//! ```sh
//! archive_overviews archive --year 2024 --month 1 --tab-type Weekly --custom-search "interest rates"
//! archive_overviews archive --year 2024 --month 1 --all -j ./json
//! FALLBACK_MODE=1 archive_overviews archive --year 2024 --month 1
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: CLI flags with environment-variable fallbacks, after
//!    loading an optional `.env` file
//! 2. **Pipeline**: template → archive fetch → trim → model call → normalize
//! 3. **Output**: the envelope goes to stdout and, optionally, to a JSON file
//!
//! Logs go to stderr so stdout stays a clean JSON document.

use clap::Parser;
use reqwest::Client;
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod archive;
mod cli;
mod config;
mod fallback;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod template;
mod utils;

use api::WatsonxClient;
use archive::NytArchive;
use cli::{Cli, Command};
use config::AppConfig;
use models::month_label;
use outputs::json;
use pipeline::Pipeline;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("archive_overviews starting up");

    match config::load_env_file(None) {
        Some(path) => info!(path = %path.display(), "Loaded .env file"),
        None => debug!("No .env file found"),
    }

    let args = Cli::parse();
    let config = AppConfig::from_cli(&args);
    debug!(?config.watsonx, prompts_dir = %config.pipeline.prompts_dir.display(), fallback_mode = config.pipeline.fallback_mode, "Loaded configuration");

    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let pipeline = Pipeline::new(
        config.pipeline,
        NytArchive::new(client.clone(), config.archive),
        WatsonxClient::new(client, config.watsonx),
    );

    match args.command {
        Command::Archive {
            year,
            month,
            custom_search,
            tab_type,
            all,
            json_output_dir,
        } => {
            let month_str = month_label(year, month);
            let (document, name) = if all {
                let report = pipeline
                    .run_combined(year, month, custom_search.as_deref())
                    .await;
                if let Some(ref e) = report.error {
                    warn!(error = %e, "Combined run returned an error result");
                }
                (serde_json::to_value(&report)?, "combined")
            } else {
                let envelope = pipeline
                    .run(year, month, custom_search.as_deref(), tab_type)
                    .await;
                if envelope.is_failure() {
                    warn!(tab_type = %tab_type, "Pipeline returned a failure envelope");
                }
                (serde_json::to_value(&envelope)?, tab_type.slug())
            };

            println!("{}", serde_json::to_string_pretty(&document)?);

            if let Some(dir) = json_output_dir {
                let path = json::write_envelope(&document, &dir, &month_str, name).await?;
                info!(%path, "Saved result");
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        "archive_overviews finished"
    );

    Ok(())
}
