//! Output files for pipeline results.
//!
//! # Submodules
//!
//! - [`json`]: Writes result envelopes and combined reports as JSON files
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2024-01/
//!     ├── daily.json
//!     ├── weekly.json
//!     ├── monthly.json
//!     └── combined.json
//! ```

pub mod json;
