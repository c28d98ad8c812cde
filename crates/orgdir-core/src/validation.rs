//! # Validation Failures
//!
//! A write is rejected with every failure found, not just the first one, so
//! the editor can fix all fields in one round trip.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason attached to a mandatory field that has no usable value.
pub const MUST_NOT_BE_EMPTY: &str = "must not be empty";

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Property title for category attributes, field name for the
    /// organization's own columns (`title`, `schedules`).
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Failure for a mandatory field left empty.
    pub fn empty(field: impl Into<String>) -> Self {
        Self::new(field, MUST_NOT_BE_EMPTY)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {}: {}", self.field, self.reason)
    }
}

/// Ordered collection of validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationFailures {
    failures: Vec<ValidationFailure>,
}

impl ValidationFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: ValidationFailure) {
        self.failures.push(failure);
    }

    /// Append all failures of `other`, keeping their order.
    pub fn extend(&mut self, other: ValidationFailures) {
        self.failures.extend(other.failures);
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Whether some failure names `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.failures.iter().any(|f| f.field == field)
    }

    pub fn into_inner(self) -> Vec<ValidationFailure> {
        self.failures
    }
}

impl From<Vec<ValidationFailure>> for ValidationFailures {
    fn from(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }
}

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_one_failure_per_line() {
        let failures = ValidationFailures::from(vec![
            ValidationFailure::empty("Name"),
            ValidationFailure::new("schedules", "at least one schedule is required"),
        ]);
        assert_eq!(
            failures.to_string(),
            "  Name: must not be empty\n  schedules: at least one schedule is required"
        );
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut a = ValidationFailures::from(vec![ValidationFailure::empty("title")]);
        a.extend(ValidationFailures::from(vec![ValidationFailure::empty("Name")]));
        let fields: Vec<_> = a.failures().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, ["title", "Name"]);
        assert!(a.mentions("Name"));
        assert!(!a.mentions("Color"));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let failures = ValidationFailures::from(vec![ValidationFailure::empty("Name")]);
        let json = serde_json::to_value(&failures).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "field": "Name", "reason": "must not be empty" }])
        );
    }
}
