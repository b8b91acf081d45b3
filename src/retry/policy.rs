//! Retry policies
//!
//! A policy is a should-retry predicate over the last attempt, a delay
//! function over the attempt number, and an attempt ceiling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::sdk::ErrorKind;

/// Default attempt ceiling for conformance runs
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(16);
const MAX_JITTER_MS: u64 = 250;
// mixes the attempt number into the jitter seed
const JITTER_SEED: u64 = 0x5eed_c0de_0000_0000;

/// Last attempt as seen by the should-retry predicate
#[derive(Clone, Copy, Debug)]
pub struct Attempt<'a> {
    /// 1-based attempt number
    pub number: u32,
    /// Failure class, `None` when the attempt succeeded
    pub error: Option<&'a ErrorKind>,
}

type Predicate = Arc<dyn Fn(&Attempt<'_>) -> bool + Send + Sync>;
type DelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Retry specification attached to a request
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    should_retry: Predicate,
    next_delay: DelayFn,
}

impl RetryPolicy {
    pub fn new<P, D>(max_attempts: u32, should_retry: P, next_delay: D) -> Self
    where
        P: Fn(&Attempt<'_>) -> bool + Send + Sync + 'static,
        D: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            should_retry: Arc::new(should_retry),
            next_delay: Arc::new(next_delay),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt should follow `attempt`
    ///
    /// Always false once the ceiling is reached or the attempt succeeded.
    pub fn should_retry(&self, attempt: &Attempt<'_>) -> bool {
        attempt.error.is_some()
            && attempt.number < self.max_attempts
            && (self.should_retry)(attempt)
    }

    /// Delay to wait after attempt `number` fails
    pub fn next_delay(&self, number: u32) -> Duration {
        (self.next_delay)(number)
    }

    /// Upper bound on total sleeping across all attempts
    pub fn max_total_delay(&self) -> Duration {
        (1..self.max_attempts).map(|n| self.next_delay(n)).sum()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Policy for conformance testing
///
/// Retries connection failures, timeouts, throttling, 5xx responses and
/// errors the SDK marks retryable. Semantic failures are final.
pub fn retry_policy_for_tests() -> RetryPolicy {
    RetryPolicy::new(DEFAULT_MAX_ATTEMPTS, is_transient, backoff_delay)
}

/// Single attempt, never retries
pub fn no_retry_policy() -> RetryPolicy {
    RetryPolicy::new(1, |_| false, |_| Duration::ZERO)
}

/// Classification used by [`retry_policy_for_tests`]
pub fn is_transient(attempt: &Attempt<'_>) -> bool {
    match attempt.error {
        None => false,
        Some(ErrorKind::Connection | ErrorKind::Timeout) => true,
        Some(ErrorKind::Service {
            retryable: Some(retryable),
            ..
        }) => *retryable,
        Some(ErrorKind::Service { status, .. }) => *status == 429 || *status >= 500,
        Some(ErrorKind::Cancelled | ErrorKind::Client | ErrorKind::Other) => false,
    }
}

/// Capped exponential backoff with jitter derived from the attempt number
pub fn backoff_delay(number: u32) -> Duration {
    let exponent = number.saturating_sub(1).min(16);
    let base = BASE_DELAY.saturating_mul(1 << exponent);
    let mut rng = StdRng::seed_from_u64(JITTER_SEED ^ u64::from(number));
    let jitter = Duration::from_millis(rng.random_range(0..=MAX_JITTER_MS));
    (base + jitter).min(MAX_DELAY)
}
