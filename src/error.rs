//! Error types for the TINETZ consumption forwarder.
//!
//! This module defines typed errors for the different stages of a run, so the
//! pipeline can tell fatal conditions (missing meter, unreachable store) apart
//! from conditions it recovers from locally (a malformed export line).

use thiserror::Error;

/// Result type alias using our custom error types.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type that encompasses all application errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// Customer portal communication errors
    #[error("portal error")]
    Portal(#[from] PortalError),

    /// InfluxDB storage errors
    #[error("storage error")]
    Storage(#[from] StorageError),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable parsing failed
    #[error("failed to parse environment variables: {0}")]
    EnvParse(String),

    /// Required configuration value is missing
    #[error("missing required configuration: {0}")]
    Missing(String),

    /// Configuration value is invalid
    #[error("invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Customer portal communication errors.
#[derive(Error, Debug)]
pub enum PortalError {
    /// HTTP request failed at the transport layer
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Portal answered with a non-success status
    #[error("server error (status {status}) on {endpoint}")]
    ServerError { status: u16, endpoint: String },

    /// Session operation called in the wrong stage
    #[error("'{operation}' is not allowed while the session is {stage}")]
    OutOfOrder {
        operation: &'static str,
        stage: String,
    },

    /// Configured contract label is not offered by the portal
    #[error("contract '{label}' not found, portal offers: {available:?}")]
    ContractNotFound {
        label: String,
        available: Vec<String>,
    },

    /// The analysis-init response carries no meter identifier
    #[error("meter UUID missing from analysis response with keys {keys:?}")]
    MeterUuidMissing { keys: Vec<String> },

    /// Response body could not be decoded
    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// Markup could not be processed
    #[error("markup parsing error")]
    Parse(#[from] ParseError),
}

/// Markup and export payload parsing errors.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Invalid CSS selector
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// Failed to parse a local timestamp
    #[error("failed to parse timestamp from '{text}': {message}")]
    Timestamp { text: String, message: String },

    /// Failed to parse a decimal value
    #[error("failed to parse value from '{text}': {message}")]
    Value { text: String, message: String },

    /// Data line with an unexpected number of fields
    #[error("malformed export line {line}: expected 3 fields, got {fields}")]
    MalformedLine { line: u64, fields: usize },
}

/// InfluxDB storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Store could not be reached
    #[error("failed to connect to InfluxDB at {url}: {message}")]
    ConnectionFailed { url: String, message: String },

    /// Existing-row lookup returned an unusable answer
    #[error("failed to query existing rows: {0}")]
    QueryFailed(String),

    /// Write operation failed
    #[error("failed to write {count} data points: {message}")]
    WriteFailed { count: usize, message: String },

    /// Invalid data point
    #[error("invalid data point: {0}")]
    InvalidDataPoint(String),
}

impl ConfigError {
    /// Creates a new environment parse error.
    pub fn env_parse(err: impl std::fmt::Display) -> Self {
        Self::EnvParse(err.to_string())
    }

    /// Creates a new missing configuration error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }

    /// Creates a new invalid configuration error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl PortalError {
    /// Creates a server error from an HTTP status.
    pub fn server_error(status: reqwest::StatusCode, endpoint: impl Into<String>) -> Self {
        Self::ServerError {
            status: status.as_u16(),
            endpoint: endpoint.into(),
        }
    }

    /// Creates an out-of-order session error.
    pub fn out_of_order(operation: &'static str, stage: impl std::fmt::Display) -> Self {
        Self::OutOfOrder {
            operation,
            stage: stage.to_string(),
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(endpoint: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            message: err.to_string(),
        }
    }
}

impl ParseError {
    /// Creates an invalid selector error.
    pub fn invalid_selector(selector: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: err.to_string(),
        }
    }

    /// Creates a timestamp parse error.
    pub fn timestamp(text: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Timestamp {
            text: text.into(),
            message: err.to_string(),
        }
    }

    /// Creates a value parse error.
    pub fn value(text: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Value {
            text: text.into(),
            message: err.to_string(),
        }
    }
}

impl StorageError {
    /// Creates a write failed error.
    pub fn write_failed(count: usize, err: impl std::fmt::Display) -> Self {
        Self::WriteFailed {
            count,
            message: err.to_string(),
        }
    }

    /// Creates a connection failed error.
    pub fn connection_failed(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::ConnectionFailed {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Whether the store itself was unreachable, as opposed to a rejected write.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. })
    }
}
