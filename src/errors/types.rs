//! Error type definitions for dramashort
//!
//! This module defines the error types used throughout the application,
//! split by the layer that raises them.

use thiserror::Error;

/// Top-level application error type
///
/// This enum represents all possible errors that can occur while serving a
/// request. It uses `thiserror` to provide automatic error trait
/// implementations and proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Upstream catalog errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Web layer errors
    #[error("Web error: {0}")]
    Web(#[from] WebError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Upstream catalog specific errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Non-success status from an upstream API
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Upstream body could not be decoded
    #[error("Parse error: {source_type} - {message}")]
    ParseError { source_type: String, message: String },

    /// Source name not known to this proxy
    #[error("Unknown source: {name}")]
    UnknownSource { name: String },
}

/// Web layer specific errors
#[derive(Error, Debug)]
pub enum WebError {
    /// Invalid request format
    #[error("Invalid request: {field} - {message}")]
    InvalidRequest { field: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl SourceError {
    pub fn parse<S: Into<String>, M: Into<String>>(source_type: S, message: M) -> Self {
        Self::ParseError {
            source_type: source_type.into(),
            message: message.into(),
        }
    }
}
