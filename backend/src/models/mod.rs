//! Domain models shared by the encoder, composer and validator.
//!
//! - [`FieldValues`] - Semantic field values for one record instance
//! - [`Severity`] - Finding severity (Warning, Error, Critical)
//! - [`FindingKind`] - What kind of defect a finding describes
//! - [`Finding`] - One located defect in a CWR file

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// Field Values
// =============================================================================

/// Semantic values for one record, keyed by field name.
///
/// Keys missing from the map render as empty before padding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValues(BTreeMap<String, Value>);

impl FieldValues {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

// =============================================================================
// Findings
// =============================================================================

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

/// Category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FindingKind {
    /// Line length does not match the record layout.
    MalformedLine,
    /// A micro-field does not match its pattern.
    PatternMismatch,
    /// A transaction is missing writers, publishers or recordings.
    StructuralIncomplete,
    /// An unconverted `NAN` leaked into the output.
    StraySentinel,
    /// A recording label differs from the expected catalog.
    CatalogMismatch,
    /// A publisher had no agreement identifier (lenient generation only).
    UnresolvedAgreement,
}

/// One located defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    /// 1-based physical line number.
    pub line: usize,
    pub message: String,
    /// The offending line, or empty for transaction-level findings.
    pub raw_content: String,
}

impl Finding {
    pub fn critical(
        kind: FindingKind,
        line: usize,
        message: impl Into<String>,
        raw_content: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Critical,
            kind,
            line,
            message: message.into(),
            raw_content: raw_content.into(),
        }
    }

    pub fn warning(kind: FindingKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            line,
            message: message.into(),
            raw_content: String::new(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}
