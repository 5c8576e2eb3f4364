//! Turning raw generated text into a JSON value.
//!
//! Three attempts, cheapest first: a strict parse, extraction of a
//! `RESPONSE:`-marked block, and a strict parse of the repaired text.

use super::repair::repair;
use crate::utils::{looks_truncated, truncate_chars, truncate_for_log};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// Marker some models put before the JSON they were asked for.
pub const RESPONSE_MARKER: &str = "RESPONSE:";

/// How much of the model text is echoed back when parsing fails.
pub const RAW_TEXT_LIMIT: usize = 1000;

/// Terminal result when no stage could produce JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    /// Parser message from the final attempt.
    pub message: String,
    /// The original text, cut to [`RAW_TEXT_LIMIT`] characters.
    pub raw_text: String,
}

impl ParseFailure {
    /// `{error: "JSON parse error: ...", raw_text: ...}`
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(
            "error".into(),
            json!(format!("JSON parse error: {}", self.message)),
        );
        payload.insert("raw_text".into(), json!(self.raw_text));
        payload
    }
}

/// Parse generated text, repairing it if needed.
pub fn parse_model_text(text: &str) -> Result<Value, ParseFailure> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if trimmed.contains(RESPONSE_MARKER) || trimmed.starts_with('}') {
        if let Some(block) = extract_marked_block(trimmed) {
            match serde_json::from_str::<Value>(&block) {
                Ok(value) => {
                    debug!("Parsed marked response block");
                    return Ok(value);
                }
                Err(e) => debug!(error = %e, "Marked response block did not parse"),
            }
        }
    }

    let repaired = repair(trimmed);
    serde_json::from_str::<Value>(&repaired).map_err(|e| {
        warn!(
            error = %e,
            truncated = looks_truncated(&e),
            preview = %truncate_for_log(trimmed, 300),
            "Model output is not valid JSON after repair"
        );
        ParseFailure {
            message: e.to_string(),
            raw_text: truncate_chars(text, RAW_TEXT_LIMIT),
        }
    })
}

/// Collect lines from the first `{` up to the first line that contains a
/// `}` and ends with one.
///
/// Returns `None` if no `{` appears or the block never closes.
pub fn extract_marked_block(text: &str) -> Option<String> {
    let mut collected: Vec<&str> = Vec::new();
    for line in text.lines() {
        if collected.is_empty() {
            let Some(start) = line.find('{') else {
                continue;
            };
            collected.push(&line[start..]);
        } else {
            collected.push(line);
        }
        if line.trim_end().ends_with('}') {
            return Some(collected.join("\n"));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_path_matches_direct_parse() {
        let samples = [
            r#"{"daily_overviews": [{"date": "2024-01-04", "overview": "x", "topics": []}]}"#,
            r#"[{"week": "1"}, {"week": "2"}]"#,
            "  {\"monthly_overview\": {\"overview\": \"m\"}}\n",
            "\"just a string\"",
            "42",
        ];
        for text in samples {
            let direct: Value = serde_json::from_str(text.trim()).unwrap();
            assert_eq!(parse_model_text(text).unwrap(), direct);
        }
    }

    #[test]
    fn test_response_marker_block() {
        let text = "Thinking about the data...\nRESPONSE:\n{\"monthly_overview\": {\"overview\": \"m\", \"topics\": []}}\nEND";
        let value = parse_model_text(text).unwrap();
        assert_eq!(value["monthly_overview"]["overview"], "m");
    }

    #[test]
    fn test_stray_leading_brace() {
        let text = "}\n{\"weekly_overviews\": []}";
        let value = parse_model_text(text).unwrap();
        assert_eq!(value, json!({"weekly_overviews": []}));
    }

    #[test]
    fn test_extract_marked_block_spans_lines() {
        let text = "RESPONSE: {\n  \"a\": {\n    \"b\": 1\n  },\n  \"c\": 2\n}\ntrailing";
        assert_eq!(
            extract_marked_block(text).unwrap(),
            "{\n  \"a\": {\n    \"b\": 1\n  },\n  \"c\": 2\n}"
        );
        assert_eq!(extract_marked_block("RESPONSE: none here"), None);
        assert_eq!(extract_marked_block("RESPONSE: {\"open\": 1"), None);
    }

    #[test]
    fn test_marker_block_stops_early_then_repair_recovers() {
        // The inner "}" line closes the marked block too soon; repair takes over.
        let text = "RESPONSE:\n{\n  \"monthly_overview\": {\n    \"overview\": \"m\",\n    \"topics\": [],\n  }\n}";
        let value = parse_model_text(text).unwrap();
        assert_eq!(value, json!({"monthly_overview": {"overview": "m", "topics": []}}));
    }

    #[test]
    fn test_repairs_trailing_commas_and_adjacent_objects() {
        let text = "```json\n{\"daily_overviews\": [{\"date\": \"2024-01-04\",}{\"date\": \"2024-01-05\"},]}\n```";
        let value = parse_model_text(text).unwrap();
        assert_eq!(
            value,
            json!({"daily_overviews": [{"date": "2024-01-04"}, {"date": "2024-01-05"}]})
        );
    }

    #[test]
    fn test_duplicate_keys_keep_single_value() {
        let text = "Result: {\"overview\": \"first\", \"overview\": \"second\",}";
        let value = parse_model_text(text).unwrap();
        assert_eq!(value, json!({"overview": "first"}));
    }

    #[test]
    fn test_unrepairable_text_yields_failure_payload() {
        let text = format!("I could not find anything {}", "x".repeat(2000));
        let failure = parse_model_text(&text).unwrap_err();
        assert_eq!(failure.raw_text.chars().count(), RAW_TEXT_LIMIT);
        assert!(text.starts_with(&failure.raw_text));

        let payload = failure.to_payload();
        assert!(
            payload["error"]
                .as_str()
                .unwrap()
                .starts_with("JSON parse error: ")
        );
        assert_eq!(payload["raw_text"], json!(failure.raw_text));
    }
}
