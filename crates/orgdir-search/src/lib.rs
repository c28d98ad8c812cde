//! # orgdir-search
//!
//! What the organization directory hands to its full-text indexer, and the
//! filters it queries with.
//!
//! - [`SearchDocumentBuilder`] maps an organization and its attribute values
//!   to a [`SearchDocument`].
//! - [`SearchQuery`] is parsed from raw request parameters.
//! - [`SearchIndex`] is the indexer capability; [`MemorySearchIndex`] is the
//!   process-local implementation.

pub mod document;
pub mod error;
pub mod index;
pub mod query;

pub use document::{SearchDocument, SearchDocumentBuilder};
pub use error::QueryError;
pub use index::{MemorySearchIndex, SearchIndex, SearchPage};
pub use query::{SearchParams, SearchQuery, DEFAULT_PER_PAGE};
