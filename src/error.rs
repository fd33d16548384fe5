//! Error handling for the pipedeck controller
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for pipedeck operations
#[derive(Error, Debug)]
pub enum PipedeckError {
    /// Errors reported by the pipeline agent (validation failures, bad payloads)
    #[error("Agent error: {0}")]
    Agent(String),

    /// Errors from the HTTP transport layer
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Errors related to settings loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors related to (de)serializing agent payloads
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipedeckError>,
    },
}

impl PipedeckError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipedeckError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for pipedeck operations
pub type Result<T> = std::result::Result<T, PipedeckError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
