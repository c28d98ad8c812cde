//! # Attribute Values
//!
//! An `AttributeValue` is the concrete value one organization holds for one
//! property. The raw value is a tagged union over the supported shapes, and
//! each tag has exactly one rendering rule.
//!
//! | Tag         | Rendered                         | Pretty (JSON)        |
//! |-------------|----------------------------------|----------------------|
//! | `Text`      | the text                         | string               |
//! | `Number`    | `42`, `42.5` (no trailing `.0`)  | number               |
//! | `List`      | titles joined with `, `          | array of titles      |
//! | `Hierarchy` | root→leaf titles joined with ` / ` | array of titles    |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use orgdir_core::{AttributeValueId, ListItemId, OrganizationId, PropertyId};

/// Placeholder editors submit for "no value". Treated as empty.
pub const NOT_SPECIFIED: &str = "not specified";

/// A selectable item of a list or hierarchical list property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: ListItemId,
    pub title: String,
}

impl ListItem {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id: ListItemId(id),
            title: title.into(),
        }
    }
}

/// The stored value of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawValue {
    /// Free text.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Multi-select over a flat list.
    List(Vec<ListItem>),
    /// Path through a hierarchical list, root first.
    Hierarchy(Vec<ListItem>),
}

impl RawValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Human-readable rendering.
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => render_number(*n),
            Self::List(items) => join_titles(items, ", "),
            Self::Hierarchy(path) => join_titles(path, " / "),
        }
    }

    /// JSON rendering used by the compact display blob.
    pub fn pretty(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::List(items) | Self::Hierarchy(items) => Value::Array(
                items
                    .iter()
                    .map(|i| Value::String(i.title.clone()))
                    .collect(),
            ),
        }
    }
}

fn render_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

fn join_titles(items: &[ListItem], sep: &str) -> String {
    items
        .iter()
        .map(|i| i.title.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}

/// One (organization, property) value row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub id: AttributeValueId,
    pub organization_id: OrganizationId,
    pub property_id: PropertyId,
    /// `None` when the editor submitted nothing.
    #[serde(default)]
    pub raw: Option<RawValue>,
}

impl AttributeValue {
    pub fn new(
        id: AttributeValueId,
        organization_id: OrganizationId,
        property_id: PropertyId,
        raw: Option<RawValue>,
    ) -> Self {
        Self {
            id,
            organization_id,
            property_id,
            raw,
        }
    }

    /// Human-readable value, `None` when no raw value is stored.
    pub fn rendered_value(&self) -> Option<String> {
        self.raw.as_ref().map(RawValue::render)
    }

    /// Absent, blank, or the "not specified" placeholder.
    pub fn is_empty(&self) -> bool {
        match self.rendered_value() {
            None => true,
            Some(rendered) => {
                let trimmed = rendered.trim();
                trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_SPECIFIED)
            }
        }
    }

    /// JSON rendering of the value; `null` when absent.
    pub fn pretty_view(&self) -> Value {
        self.raw.as_ref().map(RawValue::pretty).unwrap_or(Value::Null)
    }

    /// Ids of selected flat-list items.
    pub fn list_item_ids(&self) -> Vec<ListItemId> {
        match &self.raw {
            Some(RawValue::List(items)) => items.iter().map(|i| i.id).collect(),
            _ => Vec::new(),
        }
    }

    /// Ids of every node on the selected hierarchy path.
    pub fn hierarchy_item_ids(&self) -> Vec<ListItemId> {
        match &self.raw {
            Some(RawValue::Hierarchy(path)) => path.iter().map(|i| i.id).collect(),
            _ => Vec::new(),
        }
    }
}
