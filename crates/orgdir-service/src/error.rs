//! Service and repository errors.

use thiserror::Error;

use orgdir_cache::CacheError;
use orgdir_core::{OrganizationId, StateError, ValidationError};
use orgdir_search::QueryError;

/// Failure of the relational store.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row refers to an organization that is not stored.
    #[error("organization {0} is not stored")]
    UnknownOrganization(OrganizationId),

    /// A stored row could not be turned back into domain types.
    #[error("organization {id}: stored row is invalid: {reason}")]
    InvalidRow { id: OrganizationId, reason: String },
}

/// Errors surfaced by [`crate::OrganizationService`].
///
/// Cache failures on the write path are tolerated and reported through the
/// sync report; `Cache` only comes out of the self-healing read.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("organization {0} not found")]
    NotFound(OrganizationId),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Query(#[from] QueryError),
}
