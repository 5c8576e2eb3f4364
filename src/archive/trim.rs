//! Field removal and section allow-listing for archive payloads.
//!
//! The model only needs enough of each record to place it in time and say
//! what it was about. Everything else is dropped here, in place, before the
//! payload is serialized into the prompt.

use serde_json::Value;
use tracing::debug;

/// Sections kept for the model. Records from any other section are dropped.
pub const ALLOWED_SECTIONS: [&str; 4] = ["Business", "Job Market", "Real Estate", "Technology"];

/// Record fields removed before prompting.
pub const DROPPED_FIELDS: [&str; 15] = [
    "byline",
    "type_of_material",
    "_id",
    "word_count",
    "keywords",
    "document_type",
    "uri",
    "snippet",
    "headline",
    "source",
    "lead_paragraph",
    "news_desk",
    "subsection_name",
    "print_section",
    "print_page",
];

/// Decorative sub-fields stripped from a surviving `headline` object.
pub const HEADLINE_SUBFIELDS: [&str; 6] = [
    "kicker",
    "content_kicker",
    "print_headline",
    "name",
    "seo",
    "sub",
];

/// Remove every occurrence of `key` from objects anywhere in `value`.
pub fn remove_key_recursive(value: &mut Value, key: &str) {
    match value {
        Value::Object(map) => {
            map.remove(key);
            for child in map.values_mut() {
                remove_key_recursive(child, key);
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                remove_key_recursive(child, key);
            }
        }
        _ => {}
    }
}

fn is_allowed(doc: &Value) -> bool {
    doc.get("section_name")
        .and_then(Value::as_str)
        .is_some_and(|section| ALLOWED_SECTIONS.contains(&section))
}

/// Trim `payload.response.docs` in place.
///
/// Payloads without that layout are left untouched. Running this twice is
/// the same as running it once.
pub fn trim_archive_payload(payload: &mut Value) {
    let Some(docs) = payload
        .get_mut("response")
        .and_then(|response| response.get_mut("docs"))
        .and_then(Value::as_array_mut)
    else {
        debug!("Archive payload has no response.docs array; leaving as is");
        return;
    };

    let before = docs.len();
    docs.retain(|doc| doc.is_object() && is_allowed(doc));

    for doc in docs.iter_mut() {
        let Some(record) = doc.as_object_mut() else {
            continue;
        };
        for field in DROPPED_FIELDS {
            record.remove(field);
        }
        if let Some(headline) = record.get_mut("headline").and_then(Value::as_object_mut) {
            for field in HEADLINE_SUBFIELDS {
                headline.remove(field);
            }
        }
    }

    debug!(before, after = docs.len(), "Trimmed archive docs");
}

/// Number of docs and the character length of the serialized docs array.
///
/// Returns `None` when the payload has no `response.docs` array.
pub fn payload_stats(payload: &Value) -> Option<(usize, usize)> {
    let docs = payload.get("response")?.get("docs")?;
    let hits = docs.as_array()?.len();
    let len_chars = docs.to_string().chars().count();
    Some((hits, len_chars))
}
