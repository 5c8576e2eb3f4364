//! Explicit runtime configuration.
//!
//! Everything the pipeline needs from the environment is resolved once, at
//! startup, into the plain values below. Components receive their config
//! at construction and never look at process state afterwards.

use crate::cli::Cli;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ARCHIVE_URL: &str = "https://api.nytimes.com/svc/archive/v1";
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";
pub const DEFAULT_GENERATION_URL: &str =
    "https://eu-de.ml.cloud.ibm.com/ml/v1/text/generation?version=2023-05-29";
pub const DEFAULT_MODEL_ID: &str = "ibm/granite-3-3-8b-instruct";
/// Upper bound on a single generation request, in seconds.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

/// Settings for the NYT Archive fetcher.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

/// Settings for the watsonx.ai text-generation client.
#[derive(Clone)]
pub struct WatsonxConfig {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub model_id: String,
    pub generation_url: String,
    pub iam_url: String,
    /// Upper bound on the generation call. The token exchange is unbounded.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for WatsonxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatsonxConfig")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("model_id", &self.model_id)
            .field("generation_url", &self.generation_url)
            .field("iam_url", &self.iam_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Decoding parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub min_new_tokens: u32,
    pub decoding_method: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 3000,
            min_new_tokens: 200,
            decoding_method: "greedy".to_string(),
        }
    }
}

/// Settings for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding `daily_prompt.txt`, `weekly_prompt.txt` and `monthly_prompt.txt`.
    pub prompts_dir: PathBuf,
    /// Skip the archive and the model and return canned example payloads.
    pub fallback_mode: bool,
    pub generation: GenerationParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prompts_dir: PathBuf::from("prompts"),
            fallback_mode: false,
            generation: GenerationParams::default(),
        }
    }
}

/// All component configs, resolved from the command line and environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub archive: ArchiveConfig,
    pub watsonx: WatsonxConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            archive: ArchiveConfig {
                api_key: cli.nyt_api_key.clone(),
                base_url: cli.nyt_archive_url.clone(),
            },
            watsonx: WatsonxConfig {
                api_key: cli.watsonx_api_key.clone(),
                project_id: cli.watsonx_project_id.clone(),
                model_id: cli.watsonx_model_id.clone(),
                generation_url: cli.watsonx_url.clone(),
                iam_url: cli.iam_url.clone(),
                request_timeout: Duration::from_secs(cli.generation_timeout_secs),
            },
            pipeline: PipelineConfig {
                prompts_dir: cli.prompts_dir.clone(),
                fallback_mode: cli.fallback_mode,
                generation: GenerationParams {
                    max_new_tokens: cli.max_new_tokens,
                    min_new_tokens: cli.min_new_tokens,
                    ..GenerationParams::default()
                },
            },
        }
    }
}

/// Load `KEY=value` pairs from a `.env` file into the process environment.
///
/// With no `path`, the file is looked up from the working directory
/// upwards. Variables that are already set keep their values, and a missing
/// or unreadable file is not an error.
///
/// # Returns
///
/// The path of the file that was loaded, if any.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenv::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenv::dotenv().ok(),
    }
}
