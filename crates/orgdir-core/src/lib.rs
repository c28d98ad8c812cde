//! # orgdir-core: Foundational Types for the Organization Directory
//!
//! Every other crate in the workspace depends on `orgdir-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `OrganizationId`, `CategoryId`,
//!    `PropertyId`, `AttributeValueId`, `UserId`, `CityId`, `ListItemId`.
//!    You cannot pass a `UserId` where an `OrganizationId` is expected, which
//!    matters because both end up interpolated into cache keys.
//!
//! 2. **One `LifecycleState` enum.** `draft`, `published`, `moderation`, with
//!    a stable wire form used by the cache records, the search index and the
//!    relational store alike.
//!
//! 3. **Structured validation failures.** `ValidationFailure` carries the
//!    offending field (property title or organization field) and a reason.
//!    Failures are collected, never short-circuited.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `orgdir-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod temporal;
pub mod validation;

pub use error::{StateError, ValidationError};
pub use identity::{
    AttributeValueId, CategoryId, CityId, ListItemId, OrganizationId, PropertyId, UserId,
};
pub use lifecycle::LifecycleState;
pub use temporal::Timestamp;
pub use validation::{ValidationFailure, ValidationFailures, MUST_NOT_BE_EMPTY};
