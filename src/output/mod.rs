//! Output formatting module
//!
//! Renders request results, scenario reports and run summaries.

mod formatter;

pub use formatter::{write_csv, write_summary_to_file, OutputFormat, ResultFormatter};
