//! Operation gate and client dispatch

mod dispatch;

use tracing::debug;

use crate::error::HarnessError;
use crate::models::OperationKey;
use crate::sdk::OperationRegistry;

pub use dispatch::create_client_for_operation;

/// Ask the registry whether `key` takes part in this run
///
/// Only a registry failure is an error; unknown operations are disabled.
pub async fn is_enabled(
    registry: &dyn OperationRegistry,
    key: &OperationKey,
) -> Result<bool, HarnessError> {
    let enabled = registry
        .is_enabled(key)
        .await
        .map_err(|source| HarnessError::Gate {
            key: key.clone(),
            source,
        })?;
    debug!(operation = %key, enabled, "Gate checked");
    Ok(enabled)
}
