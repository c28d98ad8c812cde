//! # Error Types
//!
//! Errors shared by every crate in the workspace. Crate-specific failures
//! (cache, repository, search) live next to the code that raises them.

use thiserror::Error;

use crate::validation::ValidationFailures;

/// A write was rejected because one or more fields failed validation.
///
/// Structural: the caller fixes the input and resubmits. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed:\n{failures}")]
pub struct ValidationError {
    /// Every failure found, in schema order.
    pub failures: ValidationFailures,
}

impl ValidationError {
    pub fn new(failures: ValidationFailures) -> Self {
        Self { failures }
    }
}

/// Errors in lifecycle state handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Attempted transition is not allowed from the current state.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// A stored state string does not name a known state.
    #[error("unknown lifecycle state: {0:?}")]
    UnknownState(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationFailure;

    #[test]
    fn test_validation_error_display_includes_failures() {
        let err = ValidationError::new(ValidationFailures::from(vec![
            ValidationFailure::empty("Name"),
        ]));
        assert_eq!(err.to_string(), "validation failed:\n  Name: must not be empty");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = StateError::InvalidTransition {
            from: "draft".into(),
            to: "draft".into(),
        };
        assert_eq!(err.to_string(), "invalid transition from draft to draft");
    }
}
