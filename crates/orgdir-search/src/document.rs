//! Search document mapping.
//!
//! The searchable text is every non-empty rendered attribute value of the
//! organization. It is not filtered by the category schema and its order
//! carries no meaning for the indexer.

use serde::{Deserialize, Serialize};

use orgdir_core::{CategoryId, LifecycleState, ListItemId, OrganizationId};
use orgdir_schema::AttributeValue;
use orgdir_state::Organization;

/// One organization as submitted to the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: OrganizationId,
    pub title: String,
    pub searchable_text: Vec<String>,
    pub state: LifecycleState,
    pub category_id: CategoryId,
    /// Selected multi-select items, for filtering.
    pub list_item_ids: Vec<ListItemId>,
    /// Every node on selected hierarchy paths, for filtering.
    pub hierarchy_item_ids: Vec<ListItemId>,
}

impl SearchDocument {
    /// Case-insensitive substring match over title and searchable text.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        std::iter::once(&self.title)
            .chain(&self.searchable_text)
            .any(|text| text.to_lowercase().contains(&needle))
    }
}

/// Maps organizations to search documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchDocumentBuilder;

impl SearchDocumentBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn to_document(&self, org: &Organization, values: &[AttributeValue]) -> SearchDocument {
        let searchable_text = values
            .iter()
            .filter(|v| !v.is_empty())
            .filter_map(AttributeValue::rendered_value)
            .collect();

        let mut list_item_ids: Vec<ListItemId> =
            values.iter().flat_map(AttributeValue::list_item_ids).collect();
        list_item_ids.sort();
        list_item_ids.dedup();

        let mut hierarchy_item_ids: Vec<ListItemId> = values
            .iter()
            .flat_map(AttributeValue::hierarchy_item_ids)
            .collect();
        hierarchy_item_ids.sort();
        hierarchy_item_ids.dedup();

        SearchDocument {
            id: org.id,
            title: org.title.clone(),
            searchable_text,
            state: org.state,
            category_id: org.category_id,
            list_item_ids,
            hierarchy_item_ids,
        }
    }
}
