//! Shape validation and field-by-field coercion.
//!
//! [`validate`] is total: whatever the model produced, the result has the
//! shape the requested tab promises (a list for daily/weekly, a single
//! object for monthly), or is the error object passed through untouched.

use super::ParsedModelOutput;
use crate::models::{
    DailyOverview, MonthlyOverview, NormalizedOverview, Relevance, TabType, Topic, WeeklyOverview,
};
use serde_json::{Map, Value};

/// Overview text used when an item has none.
pub const DEFAULT_OVERVIEW: &str = "No overview available.";

type Object = Map<String, Value>;

/// Coerce a classified model payload into the shape `tab` promises.
///
/// # Arguments
///
/// * `parsed` - The classified output of the parse stage
/// * `tab` - The requested report granularity
///
/// # Returns
///
/// A list of days or weeks, a single monthly overview, or the error object
/// unchanged. Never panics, whatever the input.
pub fn validate(parsed: ParsedModelOutput, tab: TabType) -> NormalizedOverview {
    if let ParsedModelOutput::Error(error) = parsed {
        return NormalizedOverview::Error(error);
    }
    match tab {
        TabType::Monthly => NormalizedOverview::Monthly(monthly(parsed)),
        TabType::Daily => NormalizedOverview::Daily(
            object_items(parsed)
                .iter()
                .map(|item| DailyOverview {
                    date: string_field(item, "date").unwrap_or_default(),
                    overview: overview_field(item),
                    topics: topics_field(item),
                })
                .collect(),
        ),
        TabType::Weekly => NormalizedOverview::Weekly(
            object_items(parsed)
                .iter()
                .map(|item| WeeklyOverview {
                    week: string_field(item, "week").unwrap_or_default(),
                    overview: overview_field(item),
                    topics: topics_field(item),
                })
                .collect(),
        ),
    }
}

fn monthly(parsed: ParsedModelOutput) -> MonthlyOverview {
    let item = match parsed {
        ParsedModelOutput::Single(map) => Some(map),
        ParsedModelOutput::Sequence(items) => match items.into_iter().next() {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        },
        ParsedModelOutput::Error(_) | ParsedModelOutput::Empty => None,
    };
    match item {
        Some(item) => MonthlyOverview {
            overview: overview_field(&item),
            topics: topics_field(&item),
        },
        None => MonthlyOverview::default(),
    }
}

/// The list items of a daily/weekly payload; a lone object counts as a
/// one-element list and non-object entries are dropped.
fn object_items(parsed: ParsedModelOutput) -> Vec<Object> {
    match parsed {
        ParsedModelOutput::Sequence(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        ParsedModelOutput::Single(map) => vec![map],
        ParsedModelOutput::Error(_) | ParsedModelOutput::Empty => Vec::new(),
    }
}

/// Strings as-is, numbers and booleans stringified, anything else absent.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_field(item: &Object, key: &str) -> Option<String> {
    item.get(key).and_then(scalar_string)
}

fn overview_field(item: &Object) -> String {
    string_field(item, "overview").unwrap_or_else(|| DEFAULT_OVERVIEW.to_string())
}

fn topics_field(item: &Object) -> Vec<Topic> {
    match item.get("topics") {
        Some(Value::Array(topics)) => topics
            .iter()
            .filter_map(Value::as_object)
            .map(coerce_topic)
            .collect(),
        _ => Vec::new(),
    }
}

/// Build a [`Topic`] from one model-supplied object.
///
/// Missing text fields become empty strings, non-list `tags` become an
/// empty list and an unrecognised `relevance` becomes `low`.
pub fn coerce_topic(topic: &Object) -> Topic {
    let tags = match topic.get("tags") {
        Some(Value::Array(tags)) => tags.iter().filter_map(scalar_string).collect(),
        _ => Vec::new(),
    };
    Topic {
        title: string_field(topic, "title").unwrap_or_default(),
        summary: string_field(topic, "summary").unwrap_or_default(),
        tags,
        url: string_field(topic, "url").unwrap_or_default(),
        relevance: topic
            .get("relevance")
            .and_then(Value::as_str)
            .and_then(Relevance::parse)
            .unwrap_or_default(),
    }
}
