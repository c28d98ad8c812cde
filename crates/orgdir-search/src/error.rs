use thiserror::Error;

/// A search request parameter that cannot be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("parameter {param}: {value:?} is not a valid id")]
    InvalidId { param: &'static str, value: String },

    #[error("page must be a positive integer, got {0:?}")]
    InvalidPage(String),
}
