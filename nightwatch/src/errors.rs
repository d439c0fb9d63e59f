//! Structured error taxonomy for the observatory supervisor.
//!
//! Every fallible boundary in NIGHTWATCH returns one of these variants
//! rather than a bare `anyhow::Error`, so the orchestrator and the tool
//! executor can decide what to do with a failure (retry, alert, degrade)
//! without string matching.

use thiserror::Error;

/// Configuration-time failure. Fatal before startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("missing required field: {field}")]
    MissingRequired { field: String },

    #[error("failed to parse config: {reason}")]
    ParseError { reason: String },
}

/// Mount transport / connection failure (§4.A, §7 "Connection error").
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection to {target} failed: {reason}")]
    Failed { target: String, reason: String },

    #[error("connection to {target} was reset mid-exchange")]
    Reset { target: String },

    #[error("connection to {target} is faulted and must be reopened")]
    Faulted { target: String },
}

/// A device reports an unrecoverable condition (§7 "Device error").
#[derive(Debug, Error)]
#[error("device '{device}' error: {reason}")]
pub struct DeviceError {
    pub device: String,
    pub reason: String,
}

/// An operation exceeded its deadline (§7 "Device timeout").
#[derive(Debug, Error)]
#[error("operation '{operation}' on '{device}' timed out after {elapsed_ms}ms")]
pub struct DeviceTimeout {
    pub device: String,
    pub operation: String,
    pub elapsed_ms: u64,
}

/// A motion command was rejected because the safety monitor is unsafe.
#[derive(Debug, Error)]
#[error("vetoed: {}", .reasons.join("; "))]
pub struct SafetyVeto {
    pub reasons: Vec<String>,
}

/// Request failed parameter validation.
#[derive(Debug, Error)]
pub enum InvalidRequest {
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invalid or missing parameter: {field}")]
    InvalidParams { field: String },
}

/// An object name did not resolve in the catalog.
#[derive(Debug, Error)]
#[error("object '{0}' was not found in the catalog")]
pub struct CatalogMiss(pub String);

/// A malformed LX200 or Wyoming frame.
#[derive(Debug, Error)]
#[error("protocol error ({context}): {reason}")]
pub struct ProtocolError {
    pub context: String,
    pub reason: String,
}

/// The umbrella error type returned by library-level APIs that don't need
/// a specific taxonomy member (mirrors the teacher's `ManagerError::Other`
/// escape hatch for gradual typing).
#[derive(Debug, Error)]
pub enum NightwatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Timeout(#[from] DeviceTimeout),
    #[error(transparent)]
    Veto(#[from] SafetyVeto),
    #[error(transparent)]
    Invalid(#[from] InvalidRequest),
    #[error(transparent)]
    Catalog(#[from] CatalogMiss),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for NightwatchError {
    fn from(err: anyhow::Error) -> Self {
        NightwatchError::Other(err.to_string())
    }
}
