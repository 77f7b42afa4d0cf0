//! Error types for the projection crate.

use thiserror::Error;

/// Errors raised while building or querying area definitions.
#[derive(Error, Debug)]
pub enum AreaError {
    #[error("Area not found: {0}")]
    AreaNotFound(String),

    #[error("Invalid area definition '{area}': {message}")]
    InvalidArea { area: String, message: String },

    #[error("Invalid projection parameters: {0}")]
    InvalidProjection(String),

    #[error("Boundary of area '{0}' lies entirely outside the visible globe")]
    EmptyContour(String),

    #[error("Failed to read area catalog: {0}")]
    CatalogRead(#[from] std::io::Error),

    #[error("Failed to parse area catalog: {0}")]
    CatalogParse(#[from] serde_yaml::Error),
}

/// Result type for area operations.
pub type AreaResult<T> = std::result::Result<T, AreaError>;
