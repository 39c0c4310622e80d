//! Data shaping for the terminal views.
//!
//! ## Submodules
//!
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "5s", "500ms")
//! - [`entries`]: Folds photos, comments and likes into per-entry rows
//! - [`export`]: The diagnostics report written by `e` and `--export`
//! - [`history`]: Publish counter history for the sync sparkline

pub mod duration;
pub mod entries;
pub mod export;
pub mod history;

pub use entries::{build_rows, EntryRow};
pub use export::{DiagnosticsReport, MapStatus};
pub use history::PublishHistory;
