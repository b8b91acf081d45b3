//! SDK Conformance - replay-driven conformance testing for cloud SDK clients
//!
//! Replays recorded request batches against a generated SDK client and hands
//! every outcome to an external validator.
//!
//! ## Features
//!
//! - Retry policy for tests with deterministic, bounded backoff
//! - Recorded batch loading with zero-value defaults and unknown-field policy
//! - Operation gating and endpoint/region client dispatch
//! - Pagination replay with a page ceiling
//! - Per-request panic isolation, cancellation and deadlines
//! - Bounded parallel execution across operations
//! - Table, JSON and CSV reports plus stored runs
//!
//! ## Usage
//!
//! ```ignore
//! let harness = Harness::from_config(&config, provider, None)?;
//! let report = harness
//!     .runner()
//!     .run_paginated(&spec, &factory, |client, ctx, request| async move {
//!         client.list_widgets(&ctx, request).await
//!     })
//!     .await?;
//! println!("{report}");
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod gate;
pub mod loader;
pub mod models;
pub mod output;
pub mod pagination;
pub mod registry;
pub mod results;
pub mod retry;
pub mod sdk;
pub mod testing_service;
pub mod utils;

pub use config::{ClientTarget, ConfigError, HarnessConfig, TestingConfig};
pub use error::{BoxError, HarnessError, StoreError};
pub use executor::{Harness, ParallelExecutor, RunSettings, ScenarioRunner};
pub use loader::{load_requests, LoadError, TypedRequestInfo, UnknownFieldPolicy};
pub use models::{OperationKey, OperationSpec, RequestResult, RunSummary, ScenarioReport};
pub use retry::{retry_policy_for_tests, RetryPolicy};
pub use sdk::{ExecutionContext, ServiceError};
