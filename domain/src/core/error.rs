//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Empty model reply")]
    EmptyReply,
}

impl DomainError {
    /// Shorthand for a blank required field.
    pub fn blank(field: &str) -> Self {
        DomainError::InvalidArgument(format!("{} must not be empty", field))
    }

    /// Check if this error was caused by caller input
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, DomainError::InvalidArgument(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_error_display() {
        let error = DomainError::blank("personaId");
        assert_eq!(error.to_string(), "Invalid argument: personaId must not be empty");
    }

    #[test]
    fn test_is_invalid_argument_check() {
        assert!(DomainError::blank("message").is_invalid_argument());
        assert!(!DomainError::EmptyReply.is_invalid_argument());
    }
}
