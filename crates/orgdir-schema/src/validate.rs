//! # Mandatory Attribute Validation
//!
//! Runs inline on the write path, before anything is persisted. A non-empty
//! result is a structural rejection: the caller fixes the input and
//! resubmits.
//!
//! ## Rules
//!
//! - Definitions are visited in `row_order`; failures come out in that order.
//! - A mandatory property with no value row, or whose value `is_empty()`,
//!   produces one failure keyed by the property title.
//! - Optional properties never fail.
//! - `show_on_public` is irrelevant: hidden mandatory properties still gate.
//! - Values whose property is not in the schema (removed from the category
//!   after being set) are ignored.
//! - At most one value row per property. [`AttributeValidator::duplicates`]
//!   reports every property submitted twice, in or out of the schema.

use std::collections::{HashMap, HashSet};

use orgdir_core::{PropertyId, ValidationError, ValidationFailure, ValidationFailures};

use crate::property::CategorySchema;
use crate::value::AttributeValue;

pub const DUPLICATE_VALUE: &str = "has more than one value";

/// Checks attribute values against a category schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeValidator;

impl AttributeValidator {
    pub fn new() -> Self {
        Self
    }

    /// Collect every mandatory property left empty.
    pub fn validate(&self, schema: &CategorySchema, values: &[AttributeValue]) -> ValidationFailures {
        let by_property = index_by_property(values);

        let failures: Vec<ValidationFailure> = schema
            .mandatory()
            .filter(|def| {
                by_property
                    .get(&def.id)
                    .map_or(true, |value| value.is_empty())
            })
            .map(|def| ValidationFailure::empty(def.title.clone()))
            .collect();

        if !failures.is_empty() {
            tracing::debug!(
                category = %schema.category_id(),
                failures = failures.len(),
                "mandatory attributes missing"
            );
        }
        ValidationFailures::from(failures)
    }

    /// One failure per property carrying more than one value row, keyed by
    /// the property title, or `property <id>` when the schema lacks it.
    pub fn duplicates(&self, schema: &CategorySchema, values: &[AttributeValue]) -> ValidationFailures {
        let mut seen = HashSet::with_capacity(values.len());
        let mut reported = HashSet::new();
        let mut failures = ValidationFailures::new();
        for value in values {
            let id = value.property_id;
            if !seen.insert(id) && reported.insert(id) {
                let field = schema
                    .find(id)
                    .map_or_else(|| format!("property {id}"), |def| def.title.clone());
                failures.push(ValidationFailure::new(field, DUPLICATE_VALUE));
            }
        }
        failures
    }

    /// Like [`validate`](Self::validate), but as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` carrying every failure if any mandatory
    /// property is empty.
    pub fn check(&self, schema: &CategorySchema, values: &[AttributeValue]) -> Result<(), ValidationError> {
        let failures = self.validate(schema, values);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(failures))
        }
    }
}

/// First value row per property. Saves reject duplicates up front, so
/// later rows only appear when validating a record in isolation.
pub(crate) fn index_by_property(values: &[AttributeValue]) -> HashMap<PropertyId, &AttributeValue> {
    let mut map = HashMap::with_capacity(values.len());
    for value in values {
        map.entry(value.property_id).or_insert(value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyDefinition;
    use crate::value::{RawValue, NOT_SPECIFIED};
    use orgdir_core::{AttributeValueId, CategoryId, OrganizationId, MUST_NOT_BE_EMPTY};
    use proptest::prelude::*;

    fn def(id: i64, title: &str, order: i32, public: bool, mandatory: bool) -> PropertyDefinition {
        PropertyDefinition {
            id: PropertyId(id),
            category_id: CategoryId(1),
            title: title.to_string(),
            row_order: order,
            show_on_public: public,
            mandatory,
        }
    }

    fn text(id: i64, property: i64, s: &str) -> AttributeValue {
        AttributeValue::new(
            AttributeValueId(id),
            OrganizationId(1),
            PropertyId(property),
            Some(RawValue::text(s)),
        )
    }

    fn cafe_schema() -> CategorySchema {
        CategorySchema::new(
            CategoryId(1),
            vec![def(1, "Name", 1, true, true), def(2, "Color", 2, true, false)],
        )
    }

    #[test]
    fn test_blank_mandatory_fails_then_passes_when_filled() {
        let validator = AttributeValidator::new();
        let failures = validator.validate(&cafe_schema(), &[text(1, 1, "")]);
        assert_eq!(
            failures.failures(),
            [ValidationFailure::new("Name", MUST_NOT_BE_EMPTY)]
        );

        let failures = validator.validate(&cafe_schema(), &[text(1, 1, "Cafe")]);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_missing_row_counts_as_empty() {
        let failures = AttributeValidator::new().validate(&cafe_schema(), &[]);
        assert!(failures.mentions("Name"));
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_not_specified_sentinel_is_empty() {
        let failures = AttributeValidator::new().validate(&cafe_schema(), &[text(1, 1, NOT_SPECIFIED)]);
        assert!(failures.mentions("Name"));
    }

    #[test]
    fn test_optional_never_fails() {
        let failures =
            AttributeValidator::new().validate(&cafe_schema(), &[text(1, 1, "Cafe"), text(2, 2, "")]);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_hidden_mandatory_still_gates() {
        let schema = CategorySchema::new(CategoryId(1), vec![def(5, "Tax number", 1, false, true)]);
        let failures = AttributeValidator::new().validate(&schema, &[]);
        assert!(failures.mentions("Tax number"));
    }

    #[test]
    fn test_orphaned_values_ignored() {
        let failures = AttributeValidator::new()
            .validate(&cafe_schema(), &[text(1, 1, "Cafe"), text(9, 99, "")]);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_empty_schema_is_permissive() {
        let schema = CategorySchema::empty(CategoryId(7));
        assert!(AttributeValidator::new().check(&schema, &[]).is_ok());
    }

    #[test]
    fn test_failures_follow_row_order() {
        let schema = CategorySchema::new(
            CategoryId(1),
            vec![def(2, "Phone", 20, true, true), def(1, "Name", 10, true, true)],
        );
        let failures = AttributeValidator::new().validate(&schema, &[]);
        let fields: Vec<_> = failures.failures().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, ["Name", "Phone"]);
    }

    #[test]
    fn test_duplicate_rows_reported_once_per_property() {
        let values = [
            text(1, 1, "Cafe"),
            text(2, 1, "Bar"),
            text(3, 1, "Pub"),
            text(4, 2, "Blue"),
            text(5, 99, "x"),
            text(6, 99, "y"),
        ];
        let failures = AttributeValidator::new().duplicates(&cafe_schema(), &values);
        assert_eq!(
            failures.failures(),
            [
                ValidationFailure::new("Name", DUPLICATE_VALUE),
                ValidationFailure::new("property 99", DUPLICATE_VALUE),
            ]
        );
        assert!(AttributeValidator::new()
            .duplicates(&cafe_schema(), &[text(1, 1, "Cafe"), text(2, 2, "Blue")])
            .is_empty());
    }

    #[test]
    fn test_check_returns_validation_error() {
        let err = AttributeValidator::new().check(&cafe_schema(), &[]).unwrap_err();
        assert_eq!(err.failures.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_every_empty_mandatory_is_reported(
            props in proptest::collection::vec((any::<bool>(), any::<bool>(), prop::option::of("[a-z ]{0,4}")), 0..12)
        ) {
            let defs: Vec<_> = props
                .iter()
                .enumerate()
                .map(|(i, (public, mandatory, _))| {
                    def(i as i64, &format!("P{i}"), (props.len() - i) as i32, *public, *mandatory)
                })
                .collect();
            let values: Vec<_> = props
                .iter()
                .enumerate()
                .filter_map(|(i, (_, _, v))| v.as_ref().map(|s| text(i as i64, i as i64, s)))
                .collect();
            let schema = CategorySchema::new(CategoryId(1), defs);
            let failures = AttributeValidator::new().validate(&schema, &values);

            for (i, (_, mandatory, v)) in props.iter().enumerate() {
                let empty = v.as_ref().map_or(true, |s| s.trim().is_empty());
                let reported = failures.mentions(&format!("P{i}"));
                prop_assert_eq!(reported, *mandatory && empty);
            }
        }
    }
}
