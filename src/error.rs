//! Error types for schema flattening

use thiserror::Error;

/// Result type for shape operations
pub type Result<T> = std::result::Result<T, ShapeError>;

/// Schema flattening errors
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("Schema structure error at {path}: expected `properties` on an object node")]
    MissingProperties { path: String },

    #[error("Schema structure error at {path}: expected `items` on an array node")]
    MissingItems { path: String },

    #[error("Schema structure error at {path}: node is not a JSON object")]
    NotAnObject { path: String },

    #[error("Invalid `{keyword}` at {path}: {value}")]
    InvalidConstraint {
        path: String,
        keyword: &'static str,
        value: String,
    },

    #[error("Maximum nesting depth {limit} exceeded at {path}")]
    DepthExceeded { path: String, limit: usize },

    #[error("Property {path} uses the reserved synthetic key name `{name}`")]
    ReservedProperty { path: String, name: String },

    #[error("Duplicate property {property} in {shape}: {first} and {second}")]
    DuplicateProperty {
        shape: String,
        property: String,
        first: String,
        second: String,
    },

    #[error("Configuration error: {0}")]
    MissingConfig(String),

    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl ShapeError {
    /// True for errors caused by the shape of the input document
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ShapeError::MissingProperties { .. }
                | ShapeError::MissingItems { .. }
                | ShapeError::NotAnObject { .. }
                | ShapeError::InvalidConstraint { .. }
                | ShapeError::DepthExceeded { .. }
                | ShapeError::ReservedProperty { .. }
                | ShapeError::DuplicateProperty { .. }
        )
    }
}
