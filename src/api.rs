//! Text-generation API interaction (IBM watsonx.ai).
//!
//! Every generation is two sequential requests: an IAM token exchange,
//! then the generation call with that bearer token. Failures are returned
//! as [`GenerationError`] values carrying the upstream status and body;
//! nothing is retried.
//!
//! # Architecture
//!
//! - [`TextGenerator`]: Core trait the pipeline talks to
//! - [`WatsonxClient`]: The live implementation over `reqwest`

use crate::config::{GenerationParams, WatsonxConfig};
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Why a generation request produced no text.
///
/// Only [`GenerationError::MissingCredentials`] stops a pipeline run; every
/// other variant is turned into data with [`GenerationError::to_payload`].
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Missing watsonx.ai credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("watsonx.ai returned HTTP {status_code}")]
    Status { status_code: u16, body: Value },

    #[error("Request to watsonx.ai failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("watsonx.ai returned invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IAM token response did not contain an access_token")]
    MissingToken,
}

impl GenerationError {
    /// The error as the JSON object handed to the normalizer.
    ///
    /// Status failures become `{error: <body>, status_code}`; everything else
    /// is a request-level failure tagged `kind: "request"`.
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        match self {
            GenerationError::Status { status_code, body } => {
                payload.insert("error".into(), body.clone());
                payload.insert("status_code".into(), json!(status_code));
            }
            other => {
                payload.insert("error".into(), json!(other.to_string()));
                payload.insert("kind".into(), json!("request"));
            }
        }
        payload
    }
}

/// Something that turns a prompt into generated text.
pub trait TextGenerator {
    /// Fail fast, before any request, if the generator cannot run at all.
    fn ensure_configured(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    /// Send `prompt` to the model and return the generated text.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The rendered template with the archive payload appended
    /// * `params` - Decoding parameters for this request
    ///
    /// # Returns
    ///
    /// The generated text, or a [`GenerationError`] describing the failure.
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    input: &'a str,
    parameters: GenerationParameters<'a>,
    model_id: &'a str,
    project_id: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationParameters<'a> {
    decoding_method: &'a str,
    max_new_tokens: u32,
    min_new_tokens: u32,
}

/// Live watsonx.ai client.
#[derive(Debug, Clone)]
pub struct WatsonxClient {
    client: Client,
    config: WatsonxConfig,
}

impl WatsonxClient {
    /// Wrap a shared HTTP client. No request is made until [`TextGenerator::generate`].
    pub fn new(client: Client, config: WatsonxConfig) -> Self {
        Self { client, config }
    }

    fn credentials(&self) -> Result<(&str, &str), GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingCredentials("WATSONX_API_KEY"))?;
        let project_id = self
            .config
            .project_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(GenerationError::MissingCredentials("WATSONX_PROJECT_ID"))?;
        Ok((api_key, project_id))
    }

    /// Exchange the static API key for a short-lived bearer token.
    #[instrument(level = "info", skip_all)]
    async fn iam_token(&self, api_key: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/identity/token",
            self.config.iam_url.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(url)
            .form(&[("apikey", api_key), ("grant_type", IAM_GRANT_TYPE)])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "IAM token exchange failed");
            return Err(status_error(status.as_u16(), &text));
        }
        let token: TokenResponse = serde_json::from_str(&text)?;
        token.access_token.ok_or(GenerationError::MissingToken)
    }
}

/// Body of a failed response: its JSON if it has any, else `{raw: text}`.
fn status_error(status_code: u16, text: &str) -> GenerationError {
    let body = serde_json::from_str::<Value>(text).unwrap_or_else(|_| json!({ "raw": text }));
    GenerationError::Status { status_code, body }
}

/// Pull `results[0].generated_text` out of a generation response, falling
/// back to the whole response pretty-printed.
pub fn extract_generated_text(result: &Value) -> String {
    match result
        .get("results")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("generated_text"))
        .and_then(Value::as_str)
    {
        Some(text) => text.trim().to_string(),
        None => serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string()),
    }
}

impl TextGenerator for WatsonxClient {
    fn ensure_configured(&self) -> Result<(), GenerationError> {
        self.credentials().map(|_| ())
    }

    #[instrument(level = "info", skip_all, fields(model = %self.config.model_id, prompt_chars = prompt.len()))]
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let (api_key, project_id) = self.credentials()?;
        let t0 = Instant::now();
        let token = self.iam_token(api_key).await?;

        let body = GenerationRequest {
            input: prompt,
            parameters: GenerationParameters {
                decoding_method: &params.decoding_method,
                max_new_tokens: params.max_new_tokens,
                min_new_tokens: params.min_new_tokens,
            },
            model_id: &self.config.model_id,
            project_id,
        };

        let resp = self
            .client
            .post(&self.config.generation_url)
            .bearer_auth(token)
            .json(&body)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let elapsed_ms = t0.elapsed().as_millis() as u64;
        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                elapsed_ms,
                body = %truncate_for_log(&text, 300),
                "Generation call failed"
            );
            return Err(status_error(status.as_u16(), &text));
        }

        let result: Value = serde_json::from_str(&text)?;
        let generated = extract_generated_text(&result);
        info!(elapsed_ms, chars = generated.len(), "Generation succeeded");
        debug!(preview = %truncate_for_log(&generated, 300), "Generated text");
        Ok(generated)
    }
}
