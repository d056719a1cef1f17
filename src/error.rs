use thiserror::Error;

use crate::db::models::RelayMode;

/// Every expected failure of a device, relay or history operation.
///
/// Validation variants are produced before any store write is attempted.
/// `StorageFailure` wraps whatever the store reported and is never retried here.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("device not found: {0}")]
    NotFound(String),

    #[error("no readings found")]
    NoData,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid relay mode {0:?}, must be 'auto' or 'manual'")]
    InvalidMode(String),

    #[error("invalid relay status {0:?}, must be ON/OFF, TRUE/FALSE or 1/0")]
    InvalidStatus(String),

    #[error("cannot manually control relay in {current_mode} mode, switch to manual mode first")]
    ModeConflict { current_mode: RelayMode },

    #[error("no valid threshold parameters provided")]
    NoFieldsProvided,

    #[error("hours must be between 0.001 and 168, got {0}")]
    OutOfRange(f64),

    #[error("storage failure: {0}")]
    StorageFailure(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
