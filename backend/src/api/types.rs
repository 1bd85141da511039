//! REST API types for frontend integration.
//!
//! Every response carries a `jobId` and a `status` of `ready`, `warning`
//! or `error` so the frontend can branch without inspecting findings.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::compose::TransactionSummary;
use crate::models::Finding;
use crate::pipeline::{CsvInfo, GenerateResult};
use crate::validation::{ValidationReport, ValidationStats};

/// Response sent after a CSV upload has been turned into a CWR file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready" when self-validation is clean, "warning" otherwise
    pub status: String,

    /// Delivery file name
    pub file_name: String,

    /// CRLF file text
    pub content: String,

    pub transactions: Vec<TransactionSummary>,

    /// Agreement warnings raised while composing
    pub warnings: Vec<Finding>,

    /// Self-validation findings (empty when skipped)
    pub findings: Vec<Finding>,

    pub verified: bool,

    pub stats: Option<ValidationStats>,

    pub csv_info: CsvMetadata,
}

/// Response of a standalone validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub job_id: String,

    /// "ready" when clean, "warning" with warnings only, "error" on critical findings
    pub status: String,

    pub findings: Vec<Finding>,

    pub stats: ValidationStats,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    /// 1-based row of the discovered header
    pub header_row: Option<usize>,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<CsvInfo> for CsvMetadata {
    fn from(info: CsvInfo) -> Self {
        Self {
            encoding: info.encoding,
            delimiter: info.delimiter.to_string(),
            header_row: info.header_row.map(|row| row + 1),
            row_count: info.row_count,
            columns: info.headers,
        }
    }
}

impl From<GenerateResult> for GenerateResponse {
    fn from(result: GenerateResult) -> Self {
        let verified = result.is_verified();
        let (findings, stats) = match result.report {
            Some(report) => (report.findings, Some(report.stats)),
            None => (Vec::new(), None),
        };
        let status = if verified && result.file.warnings.is_empty() {
            "ready"
        } else {
            "warning"
        };

        GenerateResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            file_name: result.file_name,
            content: result.content,
            transactions: result.file.transactions,
            warnings: result.file.warnings,
            findings,
            verified,
            stats,
            csv_info: result.csv_info.into(),
        }
    }
}

impl From<ValidationReport> for ValidateResponse {
    fn from(report: ValidationReport) -> Self {
        let status = if report.has_critical() {
            "error"
        } else if report.is_clean() {
            "ready"
        } else {
            "warning"
        };

        ValidateResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            findings: report.findings,
            stats: report.stats,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "findings": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FindingKind;

    fn report(findings: Vec<Finding>) -> ValidationReport {
        ValidationReport {
            findings,
            stats: ValidationStats {
                lines_read: 14,
                transactions: 1,
            },
        }
    }

    #[test]
    fn test_validate_status() {
        let clean = ValidateResponse::from(report(vec![]));
        assert_eq!(clean.status, "ready");

        let warned = ValidateResponse::from(report(vec![Finding::warning(
            FindingKind::UnresolvedAgreement,
            4,
            "Missing agreement ID for: X",
        )]));
        assert_eq!(warned.status, "warning");

        let failed = ValidateResponse::from(report(vec![Finding::critical(
            FindingKind::MalformedLine,
            4,
            "Expected 166 chars, got 165",
            "SPU",
        )]));
        assert_eq!(failed.status, "error");
    }

    #[test]
    fn test_validate_response_json() {
        let json = serde_json::to_value(ValidateResponse::from(report(vec![]))).unwrap();
        assert_eq!(json["stats"]["linesRead"], 14);
        assert_eq!(json["jobId"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_csv_metadata_header_row_is_one_based() {
        let meta = CsvMetadata::from(CsvInfo {
            encoding: "utf-8".to_string(),
            delimiter: ';',
            headers: vec!["TITLE".to_string()],
            header_row: Some(0),
            row_count: 3,
        });
        assert_eq!(meta.header_row, Some(1));
        assert_eq!(meta.delimiter, ";");
    }

    #[test]
    fn test_error_response() {
        let json = error_response("No file provided");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "No file provided");
    }
}
