//! # Parameter Errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors from building or reading the parameter document.
#[derive(Debug, Error)]
pub enum ParamError {
    /// A write was attempted after `finalize()`.
    #[error(
        "Tried to modify parameters after finalizing. Values shared between nodes \
         at runtime belong on a topic, not in the parameter store."
    )]
    Frozen,

    /// An explicitly requested parameter file could not be read.
    #[error("Parameter file {path} was requested but could not be read: {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A parameter file exists but is not valid JSON.
    #[error("Parameter file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No value at the requested key.
    #[error("Parameter not found: {key}")]
    NotFound { key: String },

    /// The value at the key has an unexpected shape.
    #[error("Parameter {key} has the wrong type: {source}")]
    Type {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key is empty or passes through a non-object value.
    #[error("Invalid parameter key: {key}")]
    InvalidKey { key: String },
}
