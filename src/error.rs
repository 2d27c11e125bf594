//! Error types, one enum per boundary.
//!
//! Run-level failures (`RpcError`, `ConfigError`, opening the store) abort a
//! sync run. Record-level failures (`MappingError`, `StoreError` on a single
//! write) are counted and the run continues.

use serde_json::Value;
use std::path::PathBuf;

/// Failures talking to the remote instance.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Credentials rejected or no usable uid returned.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Server unreachable, timed out, or answered with a non-success status.
    #[error("transport error calling {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The body was not a JSON-RPC envelope or the result had the wrong shape.
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// The server answered with a JSON-RPC error object.
    #[error("remote error: {message} data: {}", display_data(.data))]
    Remote { message: String, data: Option<Value> },
}

fn display_data(data: &Option<Value>) -> String {
    match data {
        Some(value) => value.to_string(),
        None => "null".to_string(),
    }
}

/// A remote record that cannot become a local contact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("record has no usable `id`")]
    MissingExternalId,

    #[error("record {external_id} has no `name`")]
    MissingName { external_id: String },
}

/// Local store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("contact not found: {0}")]
    NotFound(String),

    #[error("contact with external id {0} already exists")]
    Duplicate(String),

    #[error("invalid stored contact: {0}")]
    InvalidData(String),

    #[error("cannot prepare store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("connection parameters are not fully configured (missing: {})", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no platform config directory available")]
    NoConfigDir,
}

/// Why a scheduled run ended before reconciling.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Runtime unavailable or a panic caught at the trigger boundary.
    #[error("internal error: {0}")]
    Internal(String),
}
