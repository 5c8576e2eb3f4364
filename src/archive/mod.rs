//! News archive access and payload trimming.
//!
//! # Submodules
//!
//! - [`nyt`]: Fetches one month of article metadata from the NYT Archive API
//! - [`trim`]: Drops heavy fields and off-topic sections before prompting
//!
//! The orchestrator only depends on the [`ArchiveSource`] trait, so any
//! source that yields the `{response: {docs: [...]}}` layout can feed it.

use serde_json::Value;

pub mod nyt;
pub mod trim;

pub use nyt::{ArchiveError, NytArchive};

/// A source of monthly archive payloads.
pub trait ArchiveSource {
    /// Fetch the raw payload for `year`/`month`.
    ///
    /// Failures come back as [`ArchiveError`] values; implementors never panic.
    async fn fetch_month(&self, year: i32, month: u32) -> Result<Value, ArchiveError>;
}
