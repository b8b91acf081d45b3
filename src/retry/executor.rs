//! SDK-side retry loop
//!
//! Clients call [`execute`] with the policy found on the request. Without
//! a policy the operation runs exactly once.

use std::future::Future;
use thiserror::Error;
use tracing::debug;

use super::policy::{Attempt, RetryPolicy};
use crate::sdk::{ContextError, ErrorKind, ExecutionContext, ServiceError};

/// Final failure of a retried operation
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// Last attempt failed and the policy declined another
    #[error("{0}")]
    Operation(E),

    /// Context ended during an attempt or a backoff sleep
    #[error("{0}")]
    Context(ContextError),
}

impl<E> RetryError<E> {
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            RetryError::Operation(err) => Some(err),
            RetryError::Context(_) => None,
        }
    }

    pub fn is_context(&self) -> bool {
        matches!(self, RetryError::Context(_))
    }
}

impl<E: ServiceError> ServiceError for RetryError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            RetryError::Operation(err) => err.kind(),
            RetryError::Context(err) => err.kind(),
        }
    }
}

/// Run `op` under `policy`, sleeping between attempts through `ctx`
pub async fn execute<T, E, F, Fut>(
    ctx: &ExecutionContext,
    policy: Option<&RetryPolicy>,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: ServiceError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut number = 0u32;
    loop {
        number += 1;
        let err = match ctx.run(op()).await.map_err(RetryError::Context)? {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let kind = err.kind();
        let attempt = Attempt {
            number,
            error: Some(&kind),
        };
        let Some(policy) = policy.filter(|p| p.should_retry(&attempt)) else {
            return Err(RetryError::Operation(err));
        };

        let delay = policy.next_delay(number);
        debug!(attempt = number, error = %kind, ?delay, "Retrying after transient error");
        ctx.run(tokio::time::sleep(delay))
            .await
            .map_err(RetryError::Context)?;
    }
}
