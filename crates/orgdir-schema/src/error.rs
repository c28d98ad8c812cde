//! Errors raised while loading category schema files.

use thiserror::Error;

/// Error loading a category schema definition file.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The file could not be read.
    #[error("cannot read schema file '{path}': {source}")]
    Read {
        /// Path of the schema file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file is not valid YAML/JSON or does not match the expected shape.
    #[error("cannot parse schema file '{path}': {reason}")]
    Parse {
        /// Path of the schema file.
        path: String,
        /// Parser message.
        reason: String,
    },

    /// Two definitions in the file share a property id within one category.
    #[error("category {category} defines property {property} more than once")]
    DuplicateProperty {
        /// Offending category.
        category: i64,
        /// Duplicated property id.
        property: i64,
    },
}
