//! Search index capability and its in-memory implementation.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::Serialize;

use orgdir_core::OrganizationId;

use crate::document::SearchDocument;
use crate::query::SearchQuery;

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub documents: Vec<SearchDocument>,
    /// Matches across all pages.
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

impl SearchPage {
    pub fn page_count(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page)
    }
}

/// The external full-text indexer, as seen by the write path.
pub trait SearchIndex: Send + Sync {
    /// Insert or replace the document for its organization.
    fn index(&self, document: SearchDocument);

    /// Removing an absent document is not an error.
    fn remove(&self, id: OrganizationId);

    fn search(&self, query: &SearchQuery) -> SearchPage;
}

/// Process-local index; results are ordered by organization id.
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    documents: RwLock<BTreeMap<OrganizationId, SearchDocument>>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: OrganizationId) -> Option<SearchDocument> {
        self.documents.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl SearchIndex for MemorySearchIndex {
    fn index(&self, document: SearchDocument) {
        tracing::debug!(org = %document.id, "indexing search document");
        self.documents.write().insert(document.id, document);
    }

    fn remove(&self, id: OrganizationId) {
        tracing::debug!(org = %id, "removing search document");
        self.documents.write().remove(&id);
    }

    fn search(&self, query: &SearchQuery) -> SearchPage {
        let documents = self.documents.read();
        let matching: Vec<&SearchDocument> =
            documents.values().filter(|d| query.matches(d)).collect();
        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(query.offset())
            .take(query.per_page)
            .cloned()
            .collect();
        SearchPage {
            documents: page,
            total,
            page: query.page,
            per_page: query.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgdir_core::{CategoryId, LifecycleState};

    fn doc(id: i64, state: LifecycleState) -> SearchDocument {
        SearchDocument {
            id: OrganizationId(id),
            title: format!("Org {id}"),
            searchable_text: Vec::new(),
            state,
            category_id: CategoryId(1),
            list_item_ids: Vec::new(),
            hierarchy_item_ids: Vec::new(),
        }
    }

    #[test]
    fn test_index_replaces_and_remove_is_idempotent() {
        let index = MemorySearchIndex::new();
        index.index(doc(1, LifecycleState::Draft));
        index.index(doc(1, LifecycleState::Published));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(OrganizationId(1)).unwrap().state, LifecycleState::Published);
        index.remove(OrganizationId(1));
        index.remove(OrganizationId(1));
        assert!(index.is_empty());
    }

    #[test]
    fn test_pagination() {
        let index = MemorySearchIndex::new();
        for id in 1..=65 {
            index.index(doc(id, LifecycleState::Published));
        }
        index.index(doc(100, LifecycleState::Draft));

        let query = SearchQuery {
            page: 3,
            state: Some(LifecycleState::Published),
            ..Default::default()
        };
        let page = index.search(&query);
        assert_eq!(page.total, 65);
        assert_eq!(page.page_count(), 3);
        assert_eq!(page.documents.len(), 5);
        assert_eq!(page.documents[0].id, OrganizationId(61));
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let index = MemorySearchIndex::new();
        index.index(doc(1, LifecycleState::Published));
        let query = SearchQuery {
            page: 9,
            ..Default::default()
        };
        let page = index.search(&query);
        assert!(page.documents.is_empty());
        assert_eq!(page.total, 1);
    }
}
