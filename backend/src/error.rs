//! Error types for the CWR generation and validation pipeline.
//!
//! This module defines one error type per layer:
//!
//! - [`SchemaError`] - Record layout lookups and layout invariants
//! - [`EncodeError`] - Rendering a record into a fixed-width line
//! - [`ComposeError`] - Building transactions from work rows
//! - [`ConfigError`] - Loading the business configuration
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Validator problems are not errors: they are reported as
//! [`crate::models::Finding`]s.

use thiserror::Error;

use crate::parser::CsvError;

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors from the schema registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No layout registered for this record type.
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// A layout breaks its own invariants (overlap, out of bounds, ...).
    #[error("Invalid layout for [{record}]: {message}")]
    InvalidLayout { record: String, message: String },
}

// =============================================================================
// Encoding Errors
// =============================================================================

/// Errors while rendering a record into a line.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// No layout registered for this record type.
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// A value does not fit its field. Lines are never truncated.
    #[error(
        "Field overflow in [{record}] field '{field}': value '{value}' is {actual} chars, limit is {limit}{}",
        context_suffix(.context)
    )]
    FieldOverflow {
        record: String,
        field: String,
        value: String,
        actual: usize,
        limit: usize,
        context: Option<String>,
    },
}

impl EncodeError {
    /// Attach work-level context (title, track number) to an overflow.
    pub fn in_context(self, ctx: impl Into<String>) -> Self {
        match self {
            EncodeError::FieldOverflow {
                record,
                field,
                value,
                actual,
                limit,
                context: None,
            } => EncodeError::FieldOverflow {
                record,
                field,
                value,
                actual,
                limit,
                context: Some(ctx.into()),
            },
            other => other,
        }
    }
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(ctx) => format!(" (in {})", ctx),
        None => String::new(),
    }
}

// =============================================================================
// Composition Errors
// =============================================================================

/// Errors while composing transactions. All of them abort the run.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A record could not be encoded.
    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),

    /// A publisher has no agreement identifier and the policy is strict.
    #[error("No agreement ID for publisher '{publisher}' (slot {slot}) on work '{work}'")]
    UnresolvedAgreement {
        publisher: String,
        work: String,
        slot: u8,
    },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading the business configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Config IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("Config JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The document does not match the configuration schema.
    #[error("Config does not match schema: {errors:?}")]
    SchemaError { errors: Vec<String> },

    /// Required environment variable not set.
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    /// Invalid field value.
    #[error("Invalid value for config field '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::pipeline::generate_from_csv`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Composition error (overflow, unresolved agreement).
    #[error("Generation halted: {0}")]
    Compose(#[from] ComposeError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No row of the sheet looks like a header row.
    #[error("Schema not recognized: no header row found in the first {0} rows")]
    HeaderNotFound(usize),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for schema lookups.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for encoding.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Result type for composition.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn overflow() -> EncodeError {
        EncodeError::FieldOverflow {
            record: "SPU".into(),
            field: "agreement".into(),
            value: "123456789012345".into(),
            actual: 15,
            limit: 14,
            context: None,
        }
    }

    #[test]
    fn test_error_conversion_chain() {
        // EncodeError -> ComposeError -> PipelineError
        let compose_err: ComposeError = overflow().into();
        let pipeline_err: PipelineError = compose_err.into();
        let msg = pipeline_err.to_string();
        assert!(msg.contains("SPU"));
        assert!(msg.contains("agreement"));

        let csv_err = CsvError::new(1, "Empty CSV file");
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("Empty"));
    }

    #[test]
    fn test_overflow_context() {
        let err = overflow().in_context("work 'VALID TITLE' (track 1)");
        let msg = err.to_string();
        assert!(msg.contains("123456789012345"));
        assert!(msg.contains("limit is 14"));
        assert!(msg.contains("VALID TITLE"));

        // Context is only attached once
        let err = err.in_context("other");
        assert!(!err.to_string().contains("other"));
    }

    #[test]
    fn test_unresolved_agreement_format() {
        let err = ComposeError::UnresolvedAgreement {
            publisher: "ACME MUSIC".into(),
            work: "MY SONG".into(),
            slot: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("ACME MUSIC"));
        assert!(msg.contains("slot 2"));
        assert!(msg.contains("MY SONG"));
    }
}
