//! # orgdir-state: The Organization Aggregate
//!
//! - **Organization** (`organization.rs`): the directory entity, its
//!   lifecycle (`draft → moderation → published`, with reject and unpublish
//!   edges), the transition log, and structural validation (title present,
//!   at least one schedule).
//!
//! - **Place** (`place.rs`): `Address` with coordinates and weekly
//!   `Schedule`s.
//!
//! - **Service packs** (`service_pack.rs`): paid packs that unlock optional
//!   capabilities such as showing the logotype.
//!
//! - **Statistics** (`statistic.rs`): usage events recorded per organization.
//!
//! Transitions use an enum with validated moves rather than typestate: the
//! state is persisted as a string column and round-trips through the
//! relational store and the search index.

pub mod organization;
pub mod place;
pub mod service_pack;
pub mod statistic;

pub use organization::{Organization, TransitionRecord};
pub use place::{Address, Schedule};
pub use service_pack::{Capability, ServicePack};
pub use statistic::{Statistic, DEFAULT_STATISTIC_KIND};
