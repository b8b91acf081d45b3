//! Results storage module
//!
//! Persists finished runs and exports them for other tools.

mod storage;

pub use storage::{EnvironmentInfo, ExportFormat, ResultsStorage, RunInfo, StoredRun};
