//! Directory error types.
//!
//! `NotFound` is a distinguished, expected condition: the reconciliation
//! core recovers from it at per-member granularity. Every other variant is
//! an unclassified failure that aborts the enclosing job.

use thiserror::Error;

/// Errors that can occur against the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The requested entity does not exist (member left, unknown guild, ...).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity ("guild", "member", "role").
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Credentials were rejected or lack the required permission.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The directory answered with an unexpected status.
    #[error("directory API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The directory's response could not be decoded.
    #[error("malformed directory response: {message}")]
    Decode { message: String },
}

impl DirectoryError {
    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Create an API status error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a network error with an underlying cause.
    pub fn network(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Whether this is the distinguished not-found condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(DirectoryError::not_found("member", 42).is_not_found());
        assert!(!DirectoryError::api(500, "boom").is_not_found());
        assert!(!DirectoryError::authentication("bad token").is_not_found());
    }

    #[test]
    fn test_display() {
        let err = DirectoryError::not_found("member", 42);
        assert_eq!(err.to_string(), "member not found: 42");

        let err = DirectoryError::api(502, "bad gateway");
        assert!(err.to_string().contains("502"));
    }
}
