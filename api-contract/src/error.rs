use crate::schema::SchemaViolation;
use std::{io, sync};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error calling {url}: {cause}")]
    Network { url: String, cause: String },
    #[error("Unexpected status code: expected {expected}, got {actual}")]
    UnexpectedStatusCode { expected: u16, actual: u16 },
    #[error("Response violates schema {schema_id}:{}", format_violations(.violations))]
    SchemaValidation {
        schema_id: String,
        violations: Vec<SchemaViolation>,
    },
    #[error("No bundled schema named {0}")]
    SchemaNotFound(String),
    #[error("Schema {schema_id} is invalid: {message}")]
    InvalidSchema { schema_id: String, message: String },
    #[error("Invalid body: {0}")]
    InvalidBody(String),
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),
    #[error("Playback error: {0}")]
    Playback(String),
    #[error("The recording format is invalid")]
    InvalidMarkdownFormat,
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Logging failure: {0}")]
    LoggingFailure(String),
    #[error("IoError: {0}")]
    IoError(#[from] io::Error),
    #[error("The lock was poisoned")]
    PoisonedLock,
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Self {
        Error::PoisonedLock
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidBody(e.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderName> for Error {
    fn from(e: reqwest::header::InvalidHeaderName) -> Self {
        Error::InvalidHeader(e.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeader(e.to_string())
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("\n  - {}", violation))
        .collect()
}
