//! Small helpers shared across the crate.
//!
//! - character-safe truncation, for log previews and the `raw_text` echoed
//!   back when model output cannot be parsed
//! - EOF detection on `serde_json` errors, to flag output cut off by the
//!   token limit
//! - a write probe for the JSON output directory

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Keep at most `max` characters of `s`.
///
/// Counts Unicode scalar values, never splitting a multi-byte character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Shorten `s` to `max` characters for a log line, noting how many bytes
/// were cut.
///
/// ```ignore
/// assert_eq!(truncate_for_log("abc", 10), "abc");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        head
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// True when parsing stopped at end of input, the usual sign of a
/// generation cut off by `max_new_tokens`.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    e.classify() == serde_json::error::Category::Eof
}

/// Create `path` if missing and check that a file can be written there.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe = Path::new(path).join(".write_probe");
    fs::write(&probe, b"").await?;
    fs::remove_file(&probe).await?;
    debug!("Output directory is writable");
    Ok(())
}
