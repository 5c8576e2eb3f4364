//! Pipeline orchestration: archive → trim → prompt → model → normalize.
//!
//! A run moves through these stages, strictly in order:
//!
//! 1. **Fallback check**: with `fallback_mode` on, return canned data at once
//! 2. **Readiness**: the generator must have credentials before anything goes out
//! 3. **Render template**: read the tab's prompt file and fill `{custom_search}`
//! 4. **Fetch archive**: one call to the [`ArchiveSource`]
//! 5. **Trim**: drop off-topic sections and heavy fields
//! 6. **Build prompt**: append the trimmed payload as `DATA_JSON`
//! 7. **Call model**: one call to the [`TextGenerator`]
//! 8. **Normalize**: parse, classify and coerce into the tab's shape
//!
//! Failures in stages 2–6 end the run with a failure envelope. Model-call
//! failures are data: their error object travels through normalization and
//! lands under the expected key. [`Pipeline::run`] never panics and never
//! returns an error.

use crate::api::{GenerationError, TextGenerator};
use crate::archive::trim::{payload_stats, trim_archive_payload};
use crate::archive::{ArchiveError, ArchiveSource};
use crate::config::PipelineConfig;
use crate::fallback;
use crate::models::{
    CombinedReport, EnvelopeData, Metadata, NormalizedOverview, OutputSource, ReportMetadata,
    ResultEnvelope, TabType, month_label,
};
use crate::normalize::{ParsedModelOutput, parse_model_output, validate};
use crate::template::{self, PromptContext, TemplateError};
use chrono::Utc;
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// A failure that ends a run before the model's answer is normalized.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Configuration(GenerationError),

    #[error("Failed to serialize archive payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append the trimmed archive payload to a rendered prompt.
pub fn make_prompt(rendered: &str, archive: &Value) -> Result<String, serde_json::Error> {
    Ok(format!(
        "{rendered}\n\nDATA_JSON\n{}\n",
        serde_json::to_string(archive)?
    ))
}

fn metadata(tab: TabType, model_output_type: &str, source: OutputSource) -> Metadata {
    Metadata {
        model_output_type: model_output_type.to_string(),
        expected_key: tab.expected_key().to_string(),
        processing_time: Utc::now().to_rfc3339(),
        source,
    }
}

fn fallback_envelope(month: String, tab: TabType) -> ResultEnvelope {
    ResultEnvelope {
        month,
        tab_type: tab,
        data: EnvelopeData::Success {
            expected_key: tab.expected_key(),
            overview: fallback::overview_for(tab),
            metadata: metadata(tab, "fallback", OutputSource::Fallback),
        },
    }
}

/// One configured pipeline. Cheap to share; holds no per-run state.
#[derive(Debug)]
pub struct Pipeline<A, G> {
    config: PipelineConfig,
    archive: A,
    generator: G,
}

impl<A, G> Pipeline<A, G>
where
    A: ArchiveSource,
    G: TextGenerator,
{
    /// Assemble a pipeline from its configuration and its two outbound seams.
    pub fn new(config: PipelineConfig, archive: A, generator: G) -> Self {
        Self {
            config,
            archive,
            generator,
        }
    }

    /// Produce the envelope for one tab of one month.
    #[instrument(level = "info", skip(self, custom_search))]
    pub async fn run(
        &self,
        year: i32,
        month: u32,
        custom_search: Option<&str>,
        tab: TabType,
    ) -> ResultEnvelope {
        let month_str = month_label(year, month);
        if self.config.fallback_mode {
            info!("Fallback mode enabled; returning example payload");
            return fallback_envelope(month_str, tab);
        }

        let t0 = Instant::now();
        match self.try_run(year, month, custom_search, tab).await {
            Ok((overview, model_output_type)) => {
                info!(
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    model_output_type,
                    is_error = overview.is_error(),
                    "Pipeline complete"
                );
                ResultEnvelope {
                    month: month_str,
                    tab_type: tab,
                    data: EnvelopeData::Success {
                        expected_key: tab.expected_key(),
                        overview,
                        metadata: metadata(tab, model_output_type, OutputSource::Model),
                    },
                }
            }
            Err(e) => {
                error!(error = %e, "Pipeline failed");
                ResultEnvelope::failure(month_str, tab, e.to_string())
            }
        }
    }

    /// Produce all three reports from a single archive fetch.
    #[instrument(level = "info", skip(self, custom_search))]
    pub async fn run_combined(
        &self,
        year: i32,
        month: u32,
        custom_search: Option<&str>,
    ) -> CombinedReport {
        let mut report = CombinedReport {
            month: month_label(year, month),
            metadata: ReportMetadata {
                processing_time: String::new(),
                source: OutputSource::Model,
            },
            error: None,
            daily_overviews: None,
            weekly_overviews: None,
            monthly_overview: None,
        };

        if self.config.fallback_mode {
            info!("Fallback mode enabled; returning example payloads");
            report.metadata.source = OutputSource::Fallback;
            report.daily_overviews = Some(fallback::overview_for(TabType::Daily));
            report.weekly_overviews = Some(fallback::overview_for(TabType::Weekly));
            report.monthly_overview = Some(fallback::overview_for(TabType::Monthly));
            report.metadata.processing_time = Utc::now().to_rfc3339();
            return report;
        }

        let outcome = self.try_run_combined(year, month, custom_search).await;
        report.metadata.processing_time = Utc::now().to_rfc3339();
        match outcome {
            Ok([daily, weekly, monthly]) => {
                report.daily_overviews = Some(daily);
                report.weekly_overviews = Some(weekly);
                report.monthly_overview = Some(monthly);
            }
            Err(e) => {
                error!(error = %e, "Combined pipeline failed");
                report.error = Some(e.to_string());
            }
        }
        report
    }

    async fn try_run(
        &self,
        year: i32,
        month: u32,
        custom_search: Option<&str>,
        tab: TabType,
    ) -> Result<(NormalizedOverview, &'static str), PipelineError> {
        self.generator
            .ensure_configured()
            .map_err(PipelineError::Configuration)?;
        let rendered = self.render_template(tab, custom_search).await?;
        let archive = self.fetch_trimmed(year, month).await?;
        let prompt = make_prompt(&rendered, &archive)?;
        self.generate_and_normalize(&prompt, tab).await
    }

    async fn try_run_combined(
        &self,
        year: i32,
        month: u32,
        custom_search: Option<&str>,
    ) -> Result<[NormalizedOverview; 3], PipelineError> {
        self.generator
            .ensure_configured()
            .map_err(PipelineError::Configuration)?;

        let daily_template = self.render_template(TabType::Daily, custom_search).await?;
        let weekly_template = self.render_template(TabType::Weekly, custom_search).await?;
        let monthly_template = self.render_template(TabType::Monthly, custom_search).await?;
        let archive = self.fetch_trimmed(year, month).await?;

        let (daily, _) = self
            .generate_and_normalize(&make_prompt(&daily_template, &archive)?, TabType::Daily)
            .await?;
        let (weekly, _) = self
            .generate_and_normalize(&make_prompt(&weekly_template, &archive)?, TabType::Weekly)
            .await?;
        let (monthly, _) = self
            .generate_and_normalize(&make_prompt(&monthly_template, &archive)?, TabType::Monthly)
            .await?;
        Ok([daily, weekly, monthly])
    }

    async fn render_template(
        &self,
        tab: TabType,
        custom_search: Option<&str>,
    ) -> Result<String, TemplateError> {
        let mut variables = PromptContext::new();
        variables.insert(
            "custom_search".to_string(),
            custom_search.unwrap_or_default().to_string(),
        );
        let path = self.config.prompts_dir.join(tab.template_file());
        template::render(path, &variables).await
    }

    async fn fetch_trimmed(&self, year: i32, month: u32) -> Result<Value, ArchiveError> {
        let mut archive = self
            .archive
            .fetch_month(year, month)
            .await
            .inspect_err(|e| warn!(status_code = e.status_code(), error = %e, "Archive fetch failed"))?;
        trim_archive_payload(&mut archive);
        if let Some((hits, len_chars)) = payload_stats(&archive) {
            info!(hits, len_chars, "Trimmed archive payload");
        }
        Ok(archive)
    }

    async fn generate_and_normalize(
        &self,
        prompt: &str,
        tab: TabType,
    ) -> Result<(NormalizedOverview, &'static str), PipelineError> {
        let parsed = match self.generator.generate(prompt, &self.config.generation).await {
            Ok(text) => parse_model_output(&text, tab.expected_key()),
            Err(e @ GenerationError::MissingCredentials(_)) => {
                return Err(PipelineError::Configuration(e));
            }
            Err(e) => {
                warn!(error = %e, "Generation failed; passing error through");
                ParsedModelOutput::Error(e.to_payload())
            }
        };
        let kind = parsed.kind();
        Ok((validate(parsed, tab), kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationParams;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::path::Path;
    use tempfile::TempDir;

    struct StubArchive {
        status: Option<u16>,
        calls: Cell<usize>,
    }

    impl StubArchive {
        fn ok() -> Self {
            Self {
                status: None,
                calls: Cell::new(0),
            }
        }

        fn failing(status_code: u16) -> Self {
            Self {
                status: Some(status_code),
                calls: Cell::new(0),
            }
        }
    }

    impl ArchiveSource for StubArchive {
        async fn fetch_month(&self, _year: i32, _month: u32) -> Result<Value, ArchiveError> {
            self.calls.set(self.calls.get() + 1);
            match self.status {
                Some(status_code) => Err(ArchiveError::Status {
                    status_code,
                    raw: "Too Many Requests".into(),
                }),
                None => Ok(json!({"response": {"docs": [
                    {"section_name": "Business", "abstract": "Rates hold steady.",
                     "headline": {"main": "Rates hold", "kicker": "Markets"},
                     "web_url": "https://www.nytimes.com/a", "byline": {"original": "By A"}},
                    {"section_name": "Arts", "abstract": "A gallery opens."},
                    {"section_name": "Technology", "abstract": "Chip exports slow."}
                ]}})),
            }
        }
    }

    struct StubGenerator {
        configured: bool,
        responses: RefCell<VecDeque<Result<String, GenerationError>>>,
        prompts: RefCell<Vec<String>>,
    }

    impl StubGenerator {
        fn replying(responses: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                configured: true,
                responses: RefCell::new(responses.into()),
                prompts: RefCell::new(Vec::new()),
            }
        }

        fn unconfigured() -> Self {
            Self {
                configured: false,
                ..Self::replying(vec![])
            }
        }
    }

    impl TextGenerator for StubGenerator {
        fn ensure_configured(&self) -> Result<(), GenerationError> {
            if self.configured {
                Ok(())
            } else {
                Err(GenerationError::MissingCredentials("WATSONX_API_KEY"))
            }
        }

        async fn generate(
            &self,
            prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, GenerationError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn prompts_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for tab in TabType::ALL {
            std::fs::write(
                dir.path().join(tab.template_file()),
                format!(
                    "{tab} report. Focus on {{custom_search}}.\nReturn {{\"{}\": []}}",
                    tab.expected_key()
                ),
            )
            .unwrap();
        }
        dir
    }

    fn pipeline(
        dir: &Path,
        fallback_mode: bool,
        archive: StubArchive,
        generator: StubGenerator,
    ) -> Pipeline<StubArchive, StubGenerator> {
        let config = PipelineConfig {
            prompts_dir: dir.to_path_buf(),
            fallback_mode,
            generation: GenerationParams::default(),
        };
        Pipeline::new(config, archive, generator)
    }

    #[tokio::test]
    async fn test_daily_run_produces_envelope() {
        let dir = prompts_dir();
        let reply = r#"{"daily_overviews":[{"date":"2024-01-04","overview":"...","topics":[]}]}"#;
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::ok(),
            StubGenerator::replying(vec![Ok(reply.into())]),
        );

        let envelope = p.run(2024, 1, None, TabType::Daily).await;
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["month"], "2024-01");
        assert_eq!(value["tabType"], "Daily");
        assert_eq!(
            value["data"]["daily_overviews"],
            json!([{"date": "2024-01-04", "overview": "...", "topics": []}])
        );
        assert_eq!(value["data"]["_metadata"]["model_output_type"], "array");
        assert_eq!(value["data"]["_metadata"]["expected_key"], "daily_overviews");
        assert_eq!(value["data"]["_metadata"]["source"], "model");
        assert_eq!(p.archive.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_monthly_list_is_unwrapped() {
        let dir = prompts_dir();
        let reply = r#"[{"overview":"January in brief","topics":[{"title":"Rates","relevance":"HIGH"}]}]"#;
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::ok(),
            StubGenerator::replying(vec![Ok(reply.into())]),
        );

        let value = serde_json::to_value(p.run(2024, 1, None, TabType::Monthly).await).unwrap();
        let monthly = &value["data"]["monthly_overview"];
        assert_eq!(monthly["overview"], "January in brief");
        assert_eq!(monthly["topics"][0]["relevance"], "high");
        assert_eq!(monthly["topics"][0]["tags"], json!([]));
    }

    #[tokio::test]
    async fn test_archive_failure_becomes_failure_envelope() {
        let dir = prompts_dir();
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::failing(429),
            StubGenerator::replying(vec![]),
        );

        let envelope = p.run(2024, 1, None, TabType::Weekly).await;
        assert!(envelope.is_failure());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "month": "2024-01",
                "tabType": "Weekly",
                "data": {"error": "Failed to fetch NYT Archive (HTTP 429)", "daily_overviews": []}
            })
        );
        assert!(p.generator.prompts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_mode_skips_network() {
        let dir = prompts_dir();
        let p = pipeline(
            dir.path(),
            true,
            StubArchive::ok(),
            StubGenerator::replying(vec![]),
        );

        let envelope = p.run(2030, 12, Some("ignored"), TabType::Weekly).await;
        let EnvelopeData::Success {
            overview, metadata, ..
        } = &envelope.data
        else {
            panic!("expected success");
        };
        assert_eq!(overview, &NormalizedOverview::Weekly(fallback::weekly()));
        assert_eq!(metadata.source, OutputSource::Fallback);
        assert_eq!(metadata.model_output_type, "fallback");
        assert_eq!(envelope.month, "2030-12");
        assert_eq!(p.archive.calls.get(), 0);
        assert!(p.generator.prompts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_missing_template_fails_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::ok(),
            StubGenerator::replying(vec![]),
        );

        let envelope = p.run(2024, 1, None, TabType::Daily).await;
        let EnvelopeData::Failure { error } = &envelope.data else {
            panic!("expected failure");
        };
        assert!(error.contains("daily_prompt.txt"));
        assert!(error.contains("was not found"));
        assert_eq!(p.archive.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_generation_status_error_lands_under_expected_key() {
        let dir = prompts_dir();
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::ok(),
            StubGenerator::replying(vec![Err(GenerationError::Status {
                status_code: 401,
                body: json!({"errors": [{"code": "authentication_token_expired"}]}),
            })]),
        );

        let value = serde_json::to_value(p.run(2024, 1, None, TabType::Daily).await).unwrap();
        let data = &value["data"];
        assert_eq!(data["daily_overviews"]["status_code"], 401);
        assert_eq!(
            data["daily_overviews"]["error"]["errors"][0]["code"],
            "authentication_token_expired"
        );
        assert_eq!(data["_metadata"]["model_output_type"], "error");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_fetch() {
        let dir = prompts_dir();
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::ok(),
            StubGenerator::unconfigured(),
        );

        let envelope = p.run(2024, 1, None, TabType::Monthly).await;
        let EnvelopeData::Failure { error } = &envelope.data else {
            panic!("expected failure");
        };
        assert!(error.contains("WATSONX_API_KEY"));
        assert_eq!(p.archive.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_prompt_carries_search_and_trimmed_archive() {
        let dir = prompts_dir();
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::ok(),
            StubGenerator::replying(vec![Ok("[]".into())]),
        );

        p.run(2024, 1, Some("interest rates"), TabType::Daily).await;
        let prompts = p.generator.prompts.borrow();
        assert_eq!(prompts.len(), 1);
        let prompt = &prompts[0];
        assert!(prompt.starts_with("Daily report. Focus on interest rates."));
        assert!(prompt.contains("{\"daily_overviews\": []}"));
        assert!(prompt.contains("\n\nDATA_JSON\n"));
        assert!(prompt.contains("Rates hold steady."));
        assert!(prompt.contains("Chip exports slow."));
        assert!(!prompt.contains("A gallery opens."));
        assert!(!prompt.contains("Markets"));
        assert!(!prompt.contains("By A"));
    }

    #[tokio::test]
    async fn test_malformed_output_keeps_raw_text() {
        let dir = prompts_dir();
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::ok(),
            StubGenerator::replying(vec![Ok("Sorry, I cannot help with that.".into())]),
        );

        let value = serde_json::to_value(p.run(2024, 1, None, TabType::Weekly).await).unwrap();
        let weekly = &value["data"]["weekly_overviews"];
        assert!(weekly["error"].as_str().unwrap().starts_with("JSON parse error"));
        assert_eq!(weekly["raw_text"], "Sorry, I cannot help with that.");
    }

    #[tokio::test]
    async fn test_combined_run_fetches_once() {
        let dir = prompts_dir();
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::ok(),
            StubGenerator::replying(vec![
                Ok(r#"{"daily_overviews": [{"date": "2024-01-02"}]}"#.into()),
                Ok(r#"{"weekly_overviews": [{"week": "2024-01-01 to 2024-01-07"}]}"#.into()),
                Ok(r#"{"monthly_overview": {"overview": "Quiet month"}}"#.into()),
            ]),
        );

        let report = p.run_combined(2024, 1, Some("housing")).await;
        assert_eq!(p.archive.calls.get(), 1);
        assert_eq!(p.generator.prompts.borrow().len(), 3);
        assert!(report.error.is_none());

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["_metadata"]["source"], "model");
        assert_eq!(value["daily_overviews"][0]["date"], "2024-01-02");
        assert_eq!(value["weekly_overviews"][0]["week"], "2024-01-01 to 2024-01-07");
        assert_eq!(value["monthly_overview"]["overview"], "Quiet month");
    }

    #[tokio::test]
    async fn test_combined_run_marks_fallback_source() {
        let dir = prompts_dir();
        let p = pipeline(
            dir.path(),
            true,
            StubArchive::ok(),
            StubGenerator::replying(vec![]),
        );

        let report = p.run_combined(2024, 1, None).await;
        assert_eq!(report.metadata.source, OutputSource::Fallback);
        assert_eq!(report.monthly_overview, Some(NormalizedOverview::Monthly(fallback::monthly())));
        assert_eq!(p.archive.calls.get(), 0);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["_metadata"]["source"], "fallback");
        assert!(!value["_metadata"]["processing_time"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_combined_run_reports_archive_failure() {
        let dir = prompts_dir();
        let p = pipeline(
            dir.path(),
            false,
            StubArchive::failing(500),
            StubGenerator::replying(vec![]),
        );

        let report = p.run_combined(2024, 1, None).await;
        assert_eq!(
            report.error.as_deref(),
            Some("Failed to fetch NYT Archive (HTTP 500)")
        );
        assert!(report.daily_overviews.is_none());
    }
}
