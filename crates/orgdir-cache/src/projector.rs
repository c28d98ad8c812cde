//! # Denormalized Projection
//!
//! Two separate renderings of an organization's attribute values:
//!
//! 1. **Dynamic fields**: schema-filtered and schema-ordered. Only
//!    definitions with `show_on_public`, in `row_order`, mapping the property
//!    title to the rendered value. Properties without a value row (or with
//!    no raw value) are skipped, never emitted as `null`. This is what gets
//!    published to `dynamicFields:{orgId}`.
//!
//! 2. **Pretty blob**: unfiltered, keyed by attribute value id, mapping to
//!    each value's JSON rendering, in the order the values were given. Used
//!    for display only.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use orgdir_core::PropertyId;
use orgdir_schema::{AttributeValue, CategorySchema};

/// Ordered property title → rendered value mapping.
///
/// Serializes as a JSON object whose key order is the insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicFields {
    entries: Vec<(String, String)>,
}

impl DynamicFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced title keeps its original position.
    pub fn insert(&mut self, title: impl Into<String>, value: impl Into<String>) {
        let title = title.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(t, _)| *t == title) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((title, value)),
        }
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, v)| v.as_str())
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compact JSON object, keys in insertion order.
    pub fn to_json(&self) -> String {
        // Serializing (String, String) pairs into a JSON string cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse a published blob.
    pub fn from_json(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(blob)
    }
}

impl Serialize for DynamicFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (title, value) in &self.entries {
            map.serialize_entry(title, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DynamicFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = DynamicFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object of property titles to rendered values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = DynamicFields::new();
                while let Some((title, value)) = access.next_entry::<String, String>()? {
                    fields.insert(title, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// Both renderings of one organization's attribute values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub fields: DynamicFields,
    pub pretty: String,
}

/// Builds projections from a category schema and attribute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenormalizedProjector;

impl DenormalizedProjector {
    pub fn new() -> Self {
        Self
    }

    pub fn project(&self, schema: &CategorySchema, values: &[AttributeValue]) -> Projection {
        Projection {
            fields: self.dynamic_fields(schema, values),
            pretty: self.pretty_values(values),
        }
    }

    /// Public properties in `row_order`, title → rendered value.
    pub fn dynamic_fields(&self, schema: &CategorySchema, values: &[AttributeValue]) -> DynamicFields {
        let mut by_property: HashMap<PropertyId, &AttributeValue> = HashMap::new();
        for value in values {
            by_property.entry(value.property_id).or_insert(value);
        }

        let mut fields = DynamicFields::new();
        for def in schema.public() {
            let rendered = by_property
                .get(&def.id)
                .and_then(|value| value.rendered_value());
            if let Some(rendered) = rendered {
                fields.insert(def.title.clone(), rendered);
            }
        }
        fields
    }

    /// `{"<valueId>":<pretty>,...}` over every value, unfiltered.
    pub fn pretty_values(&self, values: &[AttributeValue]) -> String {
        let parts: Vec<String> = values
            .iter()
            .map(|v| format!("{}:{}", Value::String(v.id.to_string()), v.pretty_view()))
            .collect();
        format!("{{{}}}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgdir_core::{AttributeValueId, CategoryId, OrganizationId};
    use orgdir_schema::{ListItem, PropertyDefinition, RawValue};
    use proptest::prelude::*;

    fn def(id: i64, title: &str, order: i32, public: bool) -> PropertyDefinition {
        PropertyDefinition {
            id: PropertyId(id),
            category_id: CategoryId(1),
            title: title.to_string(),
            row_order: order,
            show_on_public: public,
            mandatory: false,
        }
    }

    fn value(id: i64, property: i64, raw: Option<RawValue>) -> AttributeValue {
        AttributeValue::new(AttributeValueId(id), OrganizationId(1), PropertyId(property), raw)
    }

    #[test]
    fn test_fields_follow_row_order_and_public_flag() {
        let schema = CategorySchema::new(
            CategoryId(1),
            vec![
                def(3, "Color", 3, true),
                def(1, "Name", 1, true),
                def(2, "Internal code", 2, false),
            ],
        );
        let values = vec![
            value(10, 3, Some(RawValue::text("Blue"))),
            value(11, 2, Some(RawValue::text("X-1"))),
            value(12, 1, Some(RawValue::text("Cafe"))),
        ];
        let fields = DenormalizedProjector::new().dynamic_fields(&schema, &values);
        let titles: Vec<_> = fields.titles().collect();
        assert_eq!(titles, ["Name", "Color"]);
        assert_eq!(fields.get("Name"), Some("Cafe"));
        assert_eq!(fields.get("Internal code"), None);
    }

    #[test]
    fn test_missing_values_are_skipped_not_null() {
        let schema = CategorySchema::new(
            CategoryId(1),
            vec![def(1, "Name", 1, true), def(2, "Color", 2, true)],
        );
        let values = vec![value(10, 1, None)];
        let fields = DenormalizedProjector::new().dynamic_fields(&schema, &values);
        assert!(fields.is_empty());
        assert_eq!(fields.to_json(), "{}");
    }

    #[test]
    fn test_orphaned_values_not_projected() {
        let schema = CategorySchema::new(CategoryId(1), vec![def(1, "Name", 1, true)]);
        let values = vec![
            value(10, 1, Some(RawValue::text("Cafe"))),
            value(11, 99, Some(RawValue::text("ghost"))),
        ];
        let fields = DenormalizedProjector::new().dynamic_fields(&schema, &values);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_json_keeps_schema_order() {
        let schema = CategorySchema::new(
            CategoryId(1),
            vec![def(1, "Zeta", 1, true), def(2, "Alpha", 2, true)],
        );
        let values = vec![
            value(10, 1, Some(RawValue::text("z"))),
            value(11, 2, Some(RawValue::Number(3.0))),
        ];
        let fields = DenormalizedProjector::new().dynamic_fields(&schema, &values);
        assert_eq!(fields.to_json(), r#"{"Zeta":"z","Alpha":"3"}"#);
        assert_eq!(DynamicFields::from_json(&fields.to_json()).unwrap(), fields);
    }

    #[test]
    fn test_pretty_blob_is_unfiltered_and_keyed_by_value_id() {
        let values = vec![
            value(12, 1, Some(RawValue::text("Cafe"))),
            value(13, 99, Some(RawValue::List(vec![ListItem::new(1, "Wi-Fi")]))),
            value(14, 2, None),
        ];
        let pretty = DenormalizedProjector::new().pretty_values(&values);
        assert_eq!(pretty, r#"{"12":"Cafe","13":["Wi-Fi"],"14":null}"#);
    }

    #[test]
    fn test_pretty_blob_empty() {
        assert_eq!(DenormalizedProjector::new().pretty_values(&[]), "{}");
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(DynamicFields::from_json("[1,2]").is_err());
        assert!(DynamicFields::from_json(r#"{"a":1}"#).is_err());
    }

    proptest! {
        #[test]
        fn prop_projection_is_exactly_public_with_value_in_order(
            props in proptest::collection::vec((any::<bool>(), any::<bool>(), -50i32..50), 0..12)
        ) {
            let defs: Vec<_> = props
                .iter()
                .enumerate()
                .map(|(i, (public, _, order))| def(i as i64, &format!("P{i}"), *order, *public))
                .collect();
            let values: Vec<_> = props
                .iter()
                .enumerate()
                .filter(|(_, (_, has_value, _))| *has_value)
                .map(|(i, _)| value(100 + i as i64, i as i64, Some(RawValue::text(format!("v{i}")))))
                .collect();
            let schema = CategorySchema::new(CategoryId(1), defs);
            let fields = DenormalizedProjector::new().dynamic_fields(&schema, &values);

            let expected: Vec<String> = schema
                .definitions()
                .iter()
                .filter(|d| d.show_on_public && props[d.id.get() as usize].1)
                .map(|d| d.title.clone())
                .collect();
            let actual: Vec<String> = fields.titles().map(str::to_string).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
