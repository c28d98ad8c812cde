//! # orgdir-cache: Denormalized Cache Synchronization
//!
//! The relational store is the source of truth. This crate keeps three
//! read-optimized records per organization in an external key/value store:
//!
//! | Record              | Key                       | Shape |
//! |---------------------|---------------------------|-------|
//! | dynamic fields      | `dynamicFields:{orgId}`   | JSON object, property title → rendered value |
//! | user listing        | `{userId}:listings`       | hash, orgId → JSON listing entry |
//! | autocomplete place  | `autocomplete:{orgId}`    | hash of title/url/thumbnail/longitude/latitude |
//!
//! ## Guarantees
//!
//! - Publishing never rolls back the primary write. Store failures and
//!   timeouts are logged, counted, and reported, not propagated.
//! - The user listing is merged field-by-field; publishing one organization
//!   never overwrites the entries of the owner's other organizations.
//! - Reading dynamic fields heals a miss once (recompute, republish, re-read)
//!   and then gives up.
//!
//! ## Modules
//!
//! - `store.rs`: `CacheStore` capability and the in-memory implementation.
//! - `redis_store.rs`: Redis implementation over a `ConnectionManager`.
//! - `projector.rs`: `DenormalizedProjector`: schema-ordered title→value map
//!   plus the compact display blob.
//! - `records.rs`: listing and autocomplete record shapes.
//! - `sync.rs`: `CacheSynchronizer`.

pub mod error;
pub mod keys;
pub mod projector;
pub mod records;
pub mod redis_store;
pub mod store;
pub mod sync;

pub use error::CacheError;
pub use projector::{DenormalizedProjector, DynamicFields, Projection};
pub use records::{AutocompletePlace, ListingEntry};
pub use redis_store::RedisCacheStore;
pub use store::{CacheStore, MemoryCacheStore, StoredValue};
pub use sync::{CacheSynchronizer, RecordKind, SyncConfig, SyncReport};
