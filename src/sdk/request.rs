//! Request and response seams
//!
//! Requests carry a retry-policy slot the harness fills before each call.
//! List operations additionally expose their page cursor.

use crate::retry::RetryPolicy;

/// Request value accepted by a service client
pub trait SdkRequest: Send {
    fn retry_policy(&self) -> Option<&RetryPolicy>;

    fn set_retry_policy(&mut self, policy: Option<RetryPolicy>);

    /// Idempotency token, for operations that accept one
    fn retry_token(&self) -> Option<&str> {
        None
    }

    /// No-op for operations without a retry token
    fn set_retry_token(&mut self, _token: String) {}

    fn accepts_retry_token(&self) -> bool {
        false
    }
}

/// Request of a paginated list operation
pub trait PaginatedRequest: SdkRequest + Clone {
    /// Overwrite the page cursor
    fn set_page(&mut self, page: Option<String>);
}

/// Response of a paginated list operation
pub trait PaginatedResponse {
    /// Cursor of the next page; `None` or empty means no more pages
    fn next_page(&self) -> Option<&str>;

    fn has_next_page(&self) -> bool {
        self.next_page().is_some_and(|token| !token.is_empty())
    }
}
