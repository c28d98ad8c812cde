//! # orgdir-schema: Category Property Schemas
//!
//! Each organization belongs to a category, and the category decides which
//! dynamic properties exist, in which order they are shown, whether they are
//! public, and whether they are mandatory.
//!
//! - **Property** (`property.rs`): `PropertyDefinition`, the per-category
//!   `CategorySchema` ordered by `row_order`, and the `CategorySchemaStore`
//!   lookup capability with in-memory and file-backed implementations.
//!
//! - **Value** (`value.rs`): `AttributeValue` and the tagged `RawValue` union
//!   with one rendering rule per tag.
//!
//! - **Validate** (`validate.rs`): `AttributeValidator`, which gates every
//!   write on the category's mandatory properties.
//!
//! ## Crate Policy
//!
//! - Pure data and pure functions. No I/O except the explicit file loader.
//! - A category without a schema is a valid, permissive state, never an error.

pub mod error;
pub mod property;
pub mod validate;
pub mod value;

pub use error::SchemaError;
pub use property::{
    CategorySchema, CategorySchemaStore, FileSchemaStore, MemorySchemaStore, PropertyDefinition,
};
pub use validate::{AttributeValidator, DUPLICATE_VALUE};
pub use value::{AttributeValue, ListItem, RawValue, NOT_SPECIFIED};
