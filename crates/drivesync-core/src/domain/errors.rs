//! Domain error types

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Path is not within the sync source
    #[error("Path not within sync root: {0}")]
    PathNotInSyncRoot(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidPath("relative/path".to_string());
        assert_eq!(err.to_string(), "Invalid path: relative/path");

        let err = DomainError::InvalidRemoteId("bad id".to_string());
        assert_eq!(err.to_string(), "Invalid remote ID: bad id");

        let err = DomainError::PathNotInSyncRoot("/etc/passwd".to_string());
        assert_eq!(err.to_string(), "Path not within sync root: /etc/passwd");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidRemoteId("x".to_string());
        let err2 = DomainError::InvalidRemoteId("x".to_string());
        let err3 = DomainError::InvalidPath("x".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
