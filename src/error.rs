//! Error handling for qudi-analysis
//!
//! This module defines the error type shared by the spectral engine, the
//! estimators, the solver seam and the configuration layer, plus a Result
//! alias used throughout the crate.

use thiserror::Error;

/// Main error type for qudi-analysis operations
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// All x-values coincide after duplicate pruning, or the input is too
    /// short to estimate anything from
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// Malformed input such as mismatched x/y lengths
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A model parameter was looked up that the parameter set does not hold
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// The least-squares solver could not produce a result
    #[error("Solver error: {0}")]
    Solver(String),

    /// A fit was requested by a name that is not in the catalog
    #[error("Unknown fit: {0}")]
    UnknownFit(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors while reading measurement data
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a degenerate-input error
    pub fn is_degenerate(&self) -> bool {
        match self {
            AnalysisError::DegenerateInput(_) => true,
            AnalysisError::WithContext { source, .. } => source.is_degenerate(),
            _ => false,
        }
    }
}

/// Result type alias for qudi-analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

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
