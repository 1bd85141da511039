//! # cwrgen - CWR registration file generation and validation
//!
//! cwrgen turns catalogue CSV exports into Common Works Registration (CWR 2.2)
//! files for a publisher, and audits CWR files before they are delivered.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Composer   │────▶│  CWR lines  │
//! │  (ISO/UTF8) │     │ (auto-head) │     │ (schema+enc)│     │   (CRLF)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                                         ┌─────────────┐            │
//!                                         │  Validator  │◀───────────┘
//!                                         │ (own rules) │
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cwrgen::{generate_from_csv, BusinessConfig, GenerateOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BusinessConfig::from_file("config/business.example.json").unwrap();
//!     let result = generate_from_csv("export.csv".as_ref(), &config, GenerateOptions::default())
//!         .await
//!         .unwrap();
//!     println!("{}: {} works", result.file_name, result.file.transaction_count());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Field values and validation findings
//! - [`schema`] - Record layouts for the current and legacy eras
//! - [`encoder`] - Fixed-width line encoding
//! - [`compose`] - Work transactions and file envelope
//! - [`validation`] - Line and transaction audit
//! - [`config`] - Business configuration
//! - [`parser`] - CSV parsing with auto-detection
//! - [`pipeline`] - End-to-end generate and validate flows
//! - [`api`] - HTTP API server and log stream

// Core modules
pub mod error;
pub mod models;

// Codec
pub mod encoder;
pub mod schema;

// Composition
pub mod compose;

// Validation
pub mod validation;

// Configuration
pub mod config;

// Parsing
pub mod parser;

// Orchestration
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ComposeError, ConfigError, EncodeError, PipelineError, SchemaError, ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{FieldValues, Finding, FindingKind, Severity};

// =============================================================================
// Re-exports - Codec
// =============================================================================

pub use encoder::{encode_record, Encoder};
pub use schema::{Era, EraProfile, FieldSpec, RecordSpec, SchemaRegistry, CURRENT, LEGACY};

// =============================================================================
// Re-exports - Composition
// =============================================================================

pub use compose::{
    AgreementMap, AgreementPolicy, ComposedFile, Composer, TransactionSummary, WorkInput,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{ValidationReport, ValidationStats, Validator};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::BusinessConfig;

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    csv_to_json, decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv,
    parse_csv_file_auto, CsvError, ParseResult,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    generate_from_bytes, generate_from_csv, validate_bytes, validate_file, CsvInfo,
    GenerateOptions, GenerateResult, ValidateOptions,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, CsvMetadata, GenerateResponse, ValidateResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
