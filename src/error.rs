//! Error types for trello-dump
//!
//! This module provides the error handling vocabulary for the library:
//! - [`Error`] - the crate-wide error for remote calls, filesystem access and configuration
//! - [`Severity`] - how much a failure matters to the run (warning, error, critical)
//! - [`ExportError`] - an [`Error`] tagged with severity, the operation that failed and
//!   the board/card context it failed in
//!
//! Every remote call and filesystem write in the export pipeline is wrapped into an
//! [`ExportError`] before the caller decides whether to continue, skip or abort.

use std::fmt;
use thiserror::Error;

/// Result type alias for trello-dump operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for trello-dump
///
/// Each variant includes enough context to diagnose the failure from a log line.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "storage_dir")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (connection, timeout, body decoding)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The board API answered with a non-success status
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code returned by the API
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Remote resource not found (board, list, card, checklist)
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A URL could not be parsed or built
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The run was cancelled before this work started
    #[error("export cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error for the given key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// How much a failure matters to the export run
///
/// Ordered from least to most severe, so `Severity::Critical > Severity::Warning`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Recoverable or expected absence; logged, the run status is untouched
    Warning,
    /// A sub-resource fetch or write failed for one card; logged, skipped and tallied
    Error,
    /// Must be surfaced prominently; logged, tallied and marks the run as degraded
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// A classified failure inside the export pipeline
///
/// Carries the operation that failed ("write card description"), the context it failed
/// in ("card Groceries") and its [`Severity`]. The handler in
/// [`crate::exporter::report`] matches on the severity to decide what happens next.
#[derive(Debug, Error)]
#[error("{severity}: failed to {operation} ({context}): {source}")]
pub struct ExportError {
    /// What was being attempted, phrased as a verb ("get board cards")
    pub operation: &'static str,
    /// Which board/card/file the operation concerned
    pub context: String,
    /// Classification that drives the continuation policy
    pub severity: Severity,
    /// The underlying failure
    #[source]
    pub source: Error,
}

impl ExportError {
    /// Classify a failure with an explicit severity
    pub fn new(
        operation: &'static str,
        context: impl Into<String>,
        severity: Severity,
        source: impl Into<Error>,
    ) -> Self {
        Self {
            operation,
            context: context.into(),
            severity,
            source: source.into(),
        }
    }

    /// Shorthand for a [`Severity::Warning`] failure
    pub fn warning(
        operation: &'static str,
        context: impl Into<String>,
        source: impl Into<Error>,
    ) -> Self {
        Self::new(operation, context, Severity::Warning, source)
    }

    /// Shorthand for a [`Severity::Error`] failure
    pub fn error(
        operation: &'static str,
        context: impl Into<String>,
        source: impl Into<Error>,
    ) -> Self {
        Self::new(operation, context, Severity::Error, source)
    }

    /// Shorthand for a [`Severity::Critical`] failure
    pub fn critical(
        operation: &'static str,
        context: impl Into<String>,
        source: impl Into<Error>,
    ) -> Self {
        Self::new(operation, context, Severity::Critical, source)
    }

    /// Whether this failure stems from cancellation rather than a real fault
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, Error::Cancelled)
    }
}
