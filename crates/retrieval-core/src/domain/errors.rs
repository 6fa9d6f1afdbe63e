//! Domain error types
//!
//! Construction-time validation failures for domain entities. Distinct from
//! [`crate::domain::execution::ErrorCategory`], which classifies the outcome
//! of an *execution* rather than a constructor argument.

use thiserror::Error;

/// Errors that can occur while constructing or validating domain entities
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Generic validation failure
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// A pattern string (path or filename) was empty
    #[error("pattern must not be empty: {0}")]
    EmptyPattern(String),

    /// A date token appeared where the authority portion of a URL was expected
    #[error("date token not allowed in host/authority: {0}")]
    TokenInAuthority(String),

    /// A cron expression failed to parse
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    /// A timezone identifier did not resolve
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// An HTTPS base URL failed validation (scheme, length)
    #[error("invalid HTTPS base URL: {0}")]
    InvalidBaseUrl(String),

    /// A string field exceeded its maximum length
    #[error("field '{field}' exceeds max length {max}: got {actual}")]
    FieldTooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    /// `maxRedirects` was outside the allowed 0-10 range
    #[error("max_redirects must be between 0 and 10, got {0}")]
    InvalidMaxRedirects(u8),

    /// A `clientId` was empty
    #[error("client id must not be empty")]
    EmptyClientId,

    /// ID parsing error
    #[error("invalid id format: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::EmptyPattern("filePathPattern".to_string());
        assert_eq!(err.to_string(), "pattern must not be empty: filePathPattern");
    }

    #[test]
    fn test_error_equality() {
        let a = DomainError::InvalidCron("* * *".to_string());
        let b = DomainError::InvalidCron("* * *".to_string());
        let c = DomainError::InvalidCron("other".to_string());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
