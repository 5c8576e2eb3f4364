//! Data models for normalized overviews and the result envelope.
//!
//! This module defines the core data structures handed back to clients:
//! - [`TabType`]: Which report the caller asked for (daily, weekly, monthly)
//! - [`Topic`], [`DailyOverview`], [`WeeklyOverview`], [`MonthlyOverview`]:
//!   The coerced, schema-conformant shapes produced from model output
//! - [`NormalizedOverview`]: One of the three shapes, or a passed-through error
//! - [`ResultEnvelope`]: The final `{month, tabType, data}` document
//!
//! Archive records are deliberately left as [`serde_json::Value`]; only the
//! fields we filter on are ever inspected.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The report granularity requested by a client.
///
/// Each variant knows the top-level key the model is told to emit and the
/// prompt template that asks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TabType {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl TabType {
    /// All report types, in the order a combined run executes them.
    pub const ALL: [TabType; 3] = [TabType::Daily, TabType::Weekly, TabType::Monthly];

    /// The top-level JSON key the model is instructed to produce.
    pub fn expected_key(self) -> &'static str {
        match self {
            TabType::Daily => "daily_overviews",
            TabType::Weekly => "weekly_overviews",
            TabType::Monthly => "monthly_overview",
        }
    }

    /// File name of the prompt template for this report type.
    pub fn template_file(self) -> &'static str {
        match self {
            TabType::Daily => "daily_prompt.txt",
            TabType::Weekly => "weekly_prompt.txt",
            TabType::Monthly => "monthly_prompt.txt",
        }
    }

    /// Lowercase name, used for output file names.
    pub fn slug(self) -> &'static str {
        match self {
            TabType::Daily => "daily",
            TabType::Weekly => "weekly",
            TabType::Monthly => "monthly",
        }
    }
}

impl fmt::Display for TabType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TabType::Daily => "Daily",
            TabType::Weekly => "Weekly",
            TabType::Monthly => "Monthly",
        };
        f.write_str(name)
    }
}

impl FromStr for TabType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(TabType::Daily),
            "weekly" => Ok(TabType::Weekly),
            "monthly" => Ok(TabType::Monthly),
            other => Err(format!(
                "unknown tab type '{other}' (expected Daily, Weekly or Monthly)"
            )),
        }
    }
}

/// How strongly a topic bears on the requested focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    #[default]
    Low,
    Medium,
    High,
}

impl Relevance {
    /// Case-insensitive match; anything unrecognised is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Relevance::Low),
            "medium" => Some(Relevance::Medium),
            "high" => Some(Relevance::High),
            _ => None,
        }
    }
}

/// A single topic surfaced by the model for a day, week or month.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Topic {
    /// Short headline for the topic.
    pub title: String,
    /// One or two sentences explaining the topic.
    pub summary: String,
    /// Free-form tags assigned by the model.
    pub tags: Vec<String>,
    /// Link to a representative archive article.
    pub url: String,
    /// Relevance to the requested focus.
    pub relevance: Relevance,
}

/// Overview of a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyOverview {
    /// The day, as emitted by the model (normally `YYYY-MM-DD`).
    pub date: String,
    pub overview: String,
    pub topics: Vec<Topic>,
}

/// Overview of a single week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyOverview {
    /// The week label, as emitted by the model (e.g. `2024-01-01 to 2024-01-07`).
    pub week: String,
    pub overview: String,
    pub topics: Vec<Topic>,
}

/// Overview of the whole month.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthlyOverview {
    pub overview: String,
    pub topics: Vec<Topic>,
}

/// Model output after shape validation.
///
/// `Error` carries the upstream or parse-failure object verbatim so clients
/// can see exactly what went wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedOverview {
    Daily(Vec<DailyOverview>),
    Weekly(Vec<WeeklyOverview>),
    Monthly(MonthlyOverview),
    Error(Map<String, Value>),
}

impl NormalizedOverview {
    pub fn is_error(&self) -> bool {
        matches!(self, NormalizedOverview::Error(_))
    }
}

/// Where the payload under `data` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSource {
    /// Generated live by the text-generation model.
    Model,
    /// Hand-authored example returned in fallback mode.
    Fallback,
}

/// Bookkeeping attached to every successful envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    /// Shape of the parsed model output (`object`, `array`, `error`, `empty`)
    /// or `fallback`.
    pub model_output_type: String,
    pub expected_key: String,
    /// RFC 3339 UTC timestamp taken when processing finished.
    pub processing_time: String,
    pub source: OutputSource,
}

/// The `data` member of a [`ResultEnvelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeData {
    /// Serialized as `{<expected_key>: overview, "_metadata": metadata}`.
    Success {
        expected_key: &'static str,
        overview: NormalizedOverview,
        metadata: Metadata,
    },
    /// Serialized as `{"error": message, "daily_overviews": []}`.
    Failure { error: String },
}

impl Serialize for EnvelopeData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            EnvelopeData::Success {
                expected_key,
                overview,
                metadata,
            } => {
                map.serialize_entry(*expected_key, overview)?;
                map.serialize_entry("_metadata", metadata)?;
            }
            EnvelopeData::Failure { error } => {
                map.serialize_entry("error", error)?;
                map.serialize_entry("daily_overviews", &[] as &[Value])?;
            }
        }
        map.end()
    }
}

/// The document returned for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    /// The requested month as `YYYY-MM`.
    pub month: String,
    #[serde(rename = "tabType")]
    pub tab_type: TabType,
    pub data: EnvelopeData,
}

impl ResultEnvelope {
    pub fn failure(month: String, tab_type: TabType, error: impl Into<String>) -> Self {
        Self {
            month,
            tab_type,
            data: EnvelopeData::Failure {
                error: error.into(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.data, EnvelopeData::Failure { .. })
    }
}

/// Bookkeeping attached to a [`CombinedReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    /// RFC 3339 UTC timestamp taken when processing finished.
    pub processing_time: String,
    pub source: OutputSource,
}

/// All three reports for a month, generated from a single archive fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedReport {
    pub month: String,
    #[serde(rename = "_metadata")]
    pub metadata: ReportMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_overviews: Option<NormalizedOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_overviews: Option<NormalizedOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_overview: Option<NormalizedOverview>,
}

/// Format a year/month pair as `YYYY-MM`.
pub fn month_label(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}
