//! Idempotency tokens for mutating operations

use rand::distr::Alphanumeric;
use rand::Rng;

pub const RETRY_TOKEN_LEN: usize = 30;

/// Fresh random token, so a retried create is applied at most once
pub fn retry_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RETRY_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = retry_token();
        assert_eq!(token.len(), RETRY_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_differ() {
        assert_ne!(retry_token(), retry_token());
    }
}
