//! # orgdir-service: Organization Write Path
//!
//! Ties the engine together: a save is validated against the organization's
//! own columns and its category schema, persisted to the relational store,
//! then published to the cache and the search index. Destroy reverses it.
//!
//! - `config.rs`: `ServiceConfig` from environment variables.
//! - `repository.rs`: `OrganizationRepository` with in-memory and Postgres
//!   implementations.
//! - `service.rs`: `OrganizationService`.

pub mod config;
pub mod error;
pub mod repository;
pub mod service;

pub use config::{ConfigError, ServiceConfig};
pub use error::{RepositoryError, ServiceError};
pub use repository::{
    connect_repository, MemoryRepository, OrganizationRecord, OrganizationRepository, PgRepository,
};
pub use service::{validate_record, OrganizationService};
