use tracing::debug;

use crate::config::{ClientTarget, TestingConfig};
use crate::error::HarnessError;
use crate::models::OperationSpec;
use crate::sdk::{ClientFactory, ConfigurationProvider, ServiceClient};

/// Build the client for `spec` and point it at the configured target
///
/// The configuration is checked before the factory runs, so a missing
/// target never constructs a client.
pub fn create_client_for_operation<C, F>(
    spec: &OperationSpec,
    factory: &F,
    provider: &dyn ConfigurationProvider,
    config: &TestingConfig,
) -> Result<C, HarnessError>
where
    C: ServiceClient,
    F: ClientFactory<C> + ?Sized,
{
    let target = config.target()?;

    let mut client =
        factory
            .create(provider, config)
            .map_err(|source| HarnessError::ClientConstruction {
                key: spec.key.clone(),
                kind: spec.client_kind.clone(),
                source,
            })?;

    match &target {
        ClientTarget::Endpoint(endpoint) => client.set_host(endpoint),
        ClientTarget::Region(region) => client.set_region(region),
    }

    debug!(operation = %spec, host = client.host(), "Client ready");
    Ok(client)
}
