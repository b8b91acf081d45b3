//! Harness context
//!
//! Everything a scenario needs besides the operation itself: the three
//! collaborators, credentials, the testing target and run settings. All
//! of it is shared read-only between concurrently running scenarios.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::Dispatch;

use super::runner::ScenarioRunner;
use crate::config::{HarnessConfig, TestingConfig};
use crate::loader::UnknownFieldPolicy;
use crate::pagination::DEFAULT_MAX_PAGES;
use crate::registry::{DirectoryReferenceStore, ManifestRegistry};
use crate::retry::{retry_policy_for_tests, RetryPolicy};
use crate::sdk::{
    ConfigurationProvider, ExecutionContext, OperationRegistry, ReferenceDataStore, Validator,
};
use crate::testing_service::TestingServiceClient;
use crate::utils::{log_sink, LogLevel};

/// Run-wide switches
#[derive(Clone, Copy, Debug)]
pub struct RunSettings {
    /// Install a fresh retry policy on every request
    pub retries_enabled: bool,
    pub unknown_fields: UnknownFieldPolicy,
    pub max_pages: usize,
    /// Policy constructor used when retries are enabled
    pub retry_policy: fn() -> RetryPolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            retries_enabled: false,
            unknown_fields: UnknownFieldPolicy::default(),
            max_pages: DEFAULT_MAX_PAGES,
            retry_policy: retry_policy_for_tests,
        }
    }
}

impl RunSettings {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            retries_enabled: config.retries_enabled,
            unknown_fields: config.unknown_fields,
            max_pages: config.max_pages,
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, enabled: bool) -> Self {
        self.retries_enabled = enabled;
        self
    }

    pub fn with_retry_policy(mut self, factory: fn() -> RetryPolicy) -> Self {
        self.retry_policy = factory;
        self
    }

    pub fn with_unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fresh policy for one request, `None` when retries are off
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retries_enabled.then(self.retry_policy)
    }
}

/// Shared context for running scenarios
#[derive(Clone)]
pub struct Harness {
    registry: Arc<dyn OperationRegistry>,
    store: Arc<dyn ReferenceDataStore>,
    validator: Arc<dyn Validator>,
    provider: Arc<dyn ConfigurationProvider>,
    testing: TestingConfig,
    settings: RunSettings,
    log_sink: Option<Dispatch>,
}

impl Harness {
    pub fn new(
        registry: Arc<dyn OperationRegistry>,
        store: Arc<dyn ReferenceDataStore>,
        validator: Arc<dyn Validator>,
        provider: Arc<dyn ConfigurationProvider>,
    ) -> Self {
        Self {
            registry,
            store,
            validator,
            provider,
            testing: TestingConfig::default(),
            settings: RunSettings::default(),
            log_sink: None,
        }
    }

    /// Build a harness from configuration
    ///
    /// Local manifest and reference directory take precedence over the
    /// testing service. The validator comes from `validator` or, failing
    /// that, from the testing service.
    pub fn from_config(
        config: &HarnessConfig,
        provider: Arc<dyn ConfigurationProvider>,
        validator: Option<Arc<dyn Validator>>,
    ) -> Result<Self> {
        config.validate()?;

        let service = match &config.testing_service.url {
            Some(_) => Some(
                TestingServiceClient::from_config(&config.testing_service)
                    .context("Failed to create testing service client")?,
            ),
            None => None,
        };

        Self::from_config_with_service(config, provider, validator, service)
    }

    /// Like [`Harness::from_config`], but with a testing service client the
    /// host already prepared, e.g. one whose session was started
    pub fn from_config_with_service(
        config: &HarnessConfig,
        provider: Arc<dyn ConfigurationProvider>,
        validator: Option<Arc<dyn Validator>>,
        service: Option<TestingServiceClient>,
    ) -> Result<Self> {
        config.validate()?;
        let service = service.map(Arc::new);

        let registry: Arc<dyn OperationRegistry> = match (&config.registry_manifest, &service) {
            (Some(path), _) => Arc::new(
                ManifestRegistry::load(path)
                    .with_context(|| format!("Failed to load manifest {}", path.display()))?,
            ),
            (None, Some(service)) => service.clone(),
            (None, None) => anyhow::bail!("No operation registry configured"),
        };

        let store: Arc<dyn ReferenceDataStore> = match (&config.reference_dir, &service) {
            (Some(dir), _) => Arc::new(DirectoryReferenceStore::new(dir)),
            (None, Some(service)) => service.clone(),
            (None, None) => anyhow::bail!("No reference data store configured"),
        };

        let validator: Arc<dyn Validator> = match (validator, &service) {
            (Some(validator), _) => validator,
            (None, Some(service)) => service.clone(),
            (None, None) => anyhow::bail!("No validator configured"),
        };

        let level = LogLevel::from_str(&config.log_level).unwrap_or(LogLevel::Info);

        Ok(Self::new(registry, store, validator, provider)
            .with_testing_config(config.testing.clone())
            .with_settings(RunSettings::from_config(config))
            .with_log_sink(log_sink(level)))
    }

    /// Use `client` as registry, reference store and validator
    ///
    /// The client is taken by value so its session can be started first.
    pub fn with_testing_service(mut self, client: TestingServiceClient) -> Self {
        let client = Arc::new(client);
        self.registry = client.clone();
        self.store = client.clone();
        self.validator = client;
        self
    }

    pub fn with_testing_config(mut self, testing: TestingConfig) -> Self {
        self.testing = testing;
        self
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Route scenario logs to `dispatch` instead of the global subscriber
    pub fn with_log_sink(mut self, dispatch: Dispatch) -> Self {
        self.log_sink = Some(dispatch);
        self
    }

    pub fn registry(&self) -> &dyn OperationRegistry {
        self.registry.as_ref()
    }

    pub fn store(&self) -> &dyn ReferenceDataStore {
        self.store.as_ref()
    }

    pub fn validator(&self) -> &dyn Validator {
        self.validator.as_ref()
    }

    pub fn provider(&self) -> &dyn ConfigurationProvider {
        self.provider.as_ref()
    }

    pub fn testing(&self) -> &TestingConfig {
        &self.testing
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn log_sink(&self) -> Option<&Dispatch> {
        self.log_sink.as_ref()
    }

    /// Runner with a context that is never done
    pub fn runner(&self) -> ScenarioRunner {
        ScenarioRunner::new(self.clone(), ExecutionContext::background())
    }

    /// Runner whose calls observe `ctx`
    pub fn runner_with_context(&self, ctx: ExecutionContext) -> ScenarioRunner {
        ScenarioRunner::new(self.clone(), ctx)
    }
}
