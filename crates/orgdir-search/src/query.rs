//! # Search Query
//!
//! Request parameters arrive as loosely-typed strings. Blank ids are
//! dropped silently; anything else that is not an id is a [`QueryError`].
//!
//! Filter semantics:
//!
//! - `category_id` must match exactly when given.
//! - List-item ids and hierarchy-item ids are separate namespaces. When
//!   either filter is given, a document matches if its list items meet
//!   `list_item_ids` or its hierarchy items meet `hierarchy_item_ids`.
//! - `text` is a case-insensitive substring match over title and values.

use serde::{Deserialize, Serialize};

use orgdir_core::{CategoryId, LifecycleState, ListItemId};

use crate::document::SearchDocument;
use crate::error::QueryError;

pub const DEFAULT_PER_PAGE: usize = 30;

/// Raw parameters as received from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub text: Option<String>,
    pub category_id: Option<String>,
    pub list_items: Vec<String>,
    pub hierarchy_items: Vec<String>,
    pub page: Option<String>,
}

/// A validated search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub category_id: Option<CategoryId>,
    pub list_item_ids: Vec<ListItemId>,
    pub hierarchy_item_ids: Vec<ListItemId>,
    /// 1-based.
    pub page: usize,
    pub per_page: usize,
    /// Restrict to this lifecycle state; public search uses `Published`.
    pub state: Option<LifecycleState>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            category_id: None,
            list_item_ids: Vec::new(),
            hierarchy_item_ids: Vec::new(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            state: None,
        }
    }
}

fn parse_id<T: std::str::FromStr>(param: &'static str, raw: &str) -> Result<Option<T>, QueryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some).map_err(|_| QueryError::InvalidId {
        param,
        value: raw.to_string(),
    })
}

fn parse_ids(param: &'static str, raw: &[String]) -> Result<Vec<ListItemId>, QueryError> {
    let mut ids = Vec::new();
    for value in raw {
        ids.extend(parse_id::<ListItemId>(param, value)?);
    }
    ids.sort();
    ids.dedup();
    Ok(ids)
}

fn intersects(carried: &[ListItemId], wanted: &[ListItemId]) -> bool {
    carried.iter().any(|id| wanted.contains(id))
}

impl SearchQuery {
    /// Public search: published organizations only.
    pub fn from_params(params: &SearchParams) -> Result<Self, QueryError> {
        let category_id = match &params.category_id {
            Some(raw) => parse_id::<CategoryId>("category_id", raw)?,
            None => None,
        };

        let list_item_ids = parse_ids("list_items", &params.list_items)?;
        let hierarchy_item_ids = parse_ids("hierarchy_items", &params.hierarchy_items)?;

        let page = match params.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(QueryError::InvalidPage(raw.to_string())),
            },
        };

        let text = params
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Self {
            text,
            category_id,
            list_item_ids,
            hierarchy_item_ids,
            page,
            per_page: DEFAULT_PER_PAGE,
            state: Some(LifecycleState::Published),
        })
    }

    pub fn matches(&self, doc: &SearchDocument) -> bool {
        if let Some(state) = self.state {
            if doc.state != state {
                return false;
            }
        }
        if let Some(category) = self.category_id {
            if doc.category_id != category {
                return false;
            }
        }
        if !self.list_item_ids.is_empty() || !self.hierarchy_item_ids.is_empty() {
            let hit = intersects(&doc.list_item_ids, &self.list_item_ids)
                || intersects(&doc.hierarchy_item_ids, &self.hierarchy_item_ids);
            if !hit {
                return false;
            }
        }
        match &self.text {
            Some(text) => doc.matches_text(text),
            None => true,
        }
    }

    /// Number of documents to skip for the requested page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}
