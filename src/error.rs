//! Error types for the telemetry pipeline.

use std::error::Error as StdError;
use std::fmt;
use std::result;

/// A specialized Result type for telemetry operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for telemetry operations.
///
/// The pipeline never aborts on a per-record failure: an `Append` or
/// `SensorDelivery` error is reported for that record and the pipeline
/// continues. Only `Initialization` is surfaced to the caller before
/// any tracking begins.
#[derive(Debug)]
pub enum Error {
    /// The durable store could not be opened or its schema created.
    Initialization(String),
    /// A single record write to the durable store failed.
    Append(String),
    /// A read-back query against the durable store failed.
    Query(String),
    /// A sensor collaborator failed to deliver a sample.
    SensorDelivery(String),
    /// Configuration errors
    Config(String),
    /// I/O errors
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Initialization(msg) => write!(f, "Storage initialization error: {}", msg),
            Error::Append(msg) => write!(f, "Append error: {}", msg),
            Error::Query(msg) => write!(f, "Query error: {}", msg),
            Error::SensorDelivery(msg) => write!(f, "Sensor delivery error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
