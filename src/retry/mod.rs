//! Retry policies and the SDK-side retry loop

mod executor;
mod policy;
mod token;

pub use executor::{execute, RetryError};
pub use policy::{
    backoff_delay, is_transient, no_retry_policy, retry_policy_for_tests, Attempt, RetryPolicy,
    DEFAULT_MAX_ATTEMPTS,
};
pub use token::{retry_token, RETRY_TOKEN_LEN};
