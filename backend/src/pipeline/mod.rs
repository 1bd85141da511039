//! High-level generate and validate flows.
//!
//! ```text
//! CSV bytes ─▶ parse (encoding, delimiter, header row) ─▶ compose ─▶ self-validate ─▶ .V22
//! .V22 bytes ─▶ decode ─▶ validate ─▶ findings
//! ```
//!
//! This is the only layer that logs; the codec, composer and validator are
//! pure.
//!
//! # Example
//!
//! ```rust,ignore
//! use cwrgen::pipeline::{generate_from_csv, GenerateOptions};
//! use cwrgen::config::BusinessConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BusinessConfig::from_env()?;
//!     let result = generate_from_csv("catalog.csv".as_ref(), &config, GenerateOptions::default()).await?;
//!     println!("{} works → {}", result.file.transaction_count(), result.file_name);
//!     Ok(())
//! }
//! ```

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::compose::{AgreementPolicy, ComposedFile, Composer};
use crate::config::BusinessConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::Finding;
use crate::parser::{
    decode_content, detect_encoding, parse_bytes_auto, CsvError, ParseResult, HEADER_SCAN_ROWS,
};
use crate::schema::Era;
use crate::validation::{ValidationReport, Validator};

/// How many findings or warnings are echoed to the log.
const LOG_PREVIEW: usize = 5;

/// Options for generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    pub era: Era,
    /// Override the era's default agreement policy.
    pub agreement_policy: Option<AgreementPolicy>,
    /// Catalog every REC label must match during self-validation.
    pub expected_catalog: Option<String>,
    /// File sequence number used in the delivery name (0 is read as 1).
    pub sequence: u32,
    pub skip_validation: bool,
    /// Header timestamp; the local time when absent.
    pub timestamp: Option<NaiveDateTime>,
}

/// Options for validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOptions {
    pub era: Era,
    pub expected_catalog: Option<String>,
}

/// CSV file information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub header_row: Option<usize>,
    pub row_count: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            header_row: parsed.header_row,
            row_count: parsed.records.len(),
        }
    }
}

/// Result of a generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResult {
    pub file: ComposedFile,
    /// CRLF text of the file.
    pub content: String,
    /// Delivery name, e.g. `CW260001LUM_319.V22`.
    pub file_name: String,
    /// Self-validation of the output, unless skipped.
    pub report: Option<ValidationReport>,
    pub csv_info: CsvInfo,
}

impl GenerateResult {
    /// True when self-validation ran and found nothing.
    pub fn is_verified(&self) -> bool {
        self.report.as_ref().is_some_and(ValidationReport::is_clean)
    }
}

/// Generate a CWR file from a CSV export on disk.
pub async fn generate_from_csv(
    path: &Path,
    config: &BusinessConfig,
    options: GenerateOptions,
) -> PipelineResult<GenerateResult> {
    log_info(format!("📖 Reading {}", path.display()));
    let bytes = tokio::fs::read(path).await?;
    generate_from_bytes(&bytes, config, options)
}

/// Generate a CWR file from CSV bytes.
pub fn generate_from_bytes(
    bytes: &[u8],
    config: &BusinessConfig,
    options: GenerateOptions,
) -> PipelineResult<GenerateResult> {
    log_info("Detecting encoding, separator and header row...");
    let parsed = parse_bytes_auto(bytes)?;
    generate_parsed(&parsed, config, options)
}

/// Generate from an already parsed sheet.
pub fn generate_parsed(
    parsed: &ParseResult,
    config: &BusinessConfig,
    options: GenerateOptions,
) -> PipelineResult<GenerateResult> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));

    let header_row = parsed.header_row.ok_or_else(|| {
        log_error("Schema not recognized: no header row found");
        PipelineError::HeaderNotFound(HEADER_SCAN_ROWS)
    })?;
    log_success(format!(
        "Header row {} ({} columns), {} data rows",
        header_row + 1,
        parsed.headers.len(),
        parsed.records.len()
    ));

    if parsed.records.is_empty() {
        return Err(CsvError::new(header_row + 2, "No data rows below the header").into());
    }

    log_info(format!("⚙️  Composing {} era transactions...", options.era));
    let mut composer = Composer::new(config, options.era);
    if let Some(policy) = options.agreement_policy {
        composer = composer.with_agreement_policy(policy);
    }

    let now = options.timestamp.unwrap_or_else(|| Local::now().naive_local());
    let file = composer.compose_rows(&parsed.records, now).map_err(|e| {
        log_error(format!("Generation halted: {}", e));
        e
    })?;

    log_success(format!(
        "{} works, {} lines",
        file.transaction_count(),
        file.line_count()
    ));
    log_findings("agreement warning(s)", &file.warnings);

    let content = file.to_text();

    let report = if options.skip_validation {
        log_info("(self-validation skipped)");
        None
    } else {
        log_info("✔️  Self-validating output...");
        let report = Validator::for_era(options.era).process(&content, options.expected_catalog.as_deref());
        log_report(&report);
        Some(report)
    };

    Ok(GenerateResult {
        file_name: config.output_file_name(now, options.sequence.max(1)),
        content,
        file,
        report,
        csv_info: CsvInfo::from(parsed),
    })
}

/// Validate a CWR file on disk.
pub async fn validate_file(path: &Path, options: ValidateOptions) -> PipelineResult<ValidationReport> {
    log_info(format!("📖 Reading {}", path.display()));
    let bytes = tokio::fs::read(path).await?;
    validate_bytes(&bytes, options)
}

/// Validate CWR bytes in any of the supported encodings.
pub fn validate_bytes(bytes: &[u8], options: ValidateOptions) -> PipelineResult<ValidationReport> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    log_success(format!("Detected encoding: {}", encoding));

    log_info(format!("🔍 Inspecting against {} rules...", options.era));
    let report = Validator::for_era(options.era).process(&content, options.expected_catalog.as_deref());
    log_report(&report);
    Ok(report)
}

/// Encode output text as Windows-1252.
///
/// Characters outside the code page become `?` so that every line keeps its
/// width.
pub fn encode_output(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let (encoded, _, unmappable) = encoding_rs::WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if unmappable {
            bytes.push(b'?');
        } else {
            bytes.extend_from_slice(&encoded);
        }
    }
    bytes
}

/// Write the generated file into `dir` under its delivery name.
pub async fn write_output(dir: &Path, result: &GenerateResult) -> PipelineResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&result.file_name);
    tokio::fs::write(&path, encode_output(&result.content)).await?;
    log_success(format!("Saved {}", path.display()));
    Ok(path)
}

fn log_report(report: &ValidationReport) {
    log_info_indent(
        format!(
            "{} lines read, {} transactions",
            report.stats.lines_read, report.stats.transactions
        ),
        1,
    );
    if report.is_clean() {
        log_success("Syntax valid");
    } else if report.stats.transactions == 0 && report.findings.is_empty() {
        log_warning("No transactions found");
    } else {
        log_findings("issue(s)", &report.findings);
    }
}

fn log_findings(what: &str, findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }
    log_warning(format!("{} {}", findings.len(), what));
    for finding in findings.iter().take(LOG_PREVIEW) {
        if finding.is_critical() {
            log_error(format!("Line {}: {}", finding.line, finding.message));
        } else {
            log_warning(format!("Line {}: {}", finding.line, finding.message));
        }
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::AgreementMap;
    use crate::error::ComposeError;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const EXPORT: &str = "\
SourceAudio export,,,,,,,,
TRACK: Title,TRACK: Number,TRACK: Duration,CODE: ISRC,ALBUM: Code,LIBRARY: Name,PUBLISHER:1: Name,PUBLISHER:1: Owner Performance Share %,WRITER:1: Last Name,WRITER:1: Owner Performance Share %,WRITER:1: Original Publisher
Night Drive,1,3:12,GBABC2600001,RC055,Red Cola,Pashalina Publishing,100,Smith,100,Pashalina Publishing
Day Break,2,205,GBABC2600002,RC055,Red Cola,Pashalina Publishing,100,Jones,100,Pashalina Publishing
";

    fn config() -> BusinessConfig {
        BusinessConfig::default().with_agreements(AgreementMap::new().with("PASHALINA", "4316161"))
    }

    fn options() -> GenerateOptions {
        GenerateOptions {
            timestamp: NaiveDate::from_ymd_opt(2026, 3, 9).and_then(|d| d.and_hms_opt(12, 0, 0)),
            expected_catalog: Some("RED COLA".into()),
            ..GenerateOptions::default()
        }
    }

    #[test]
    fn test_generate_and_self_validate() {
        let result = generate_from_bytes(EXPORT.as_bytes(), &config(), options()).unwrap();

        assert_eq!(result.file.transaction_count(), 2);
        assert_eq!(result.csv_info.header_row, Some(1));
        assert_eq!(result.file_name, "CW260001LUM_319.V22");
        assert!(result.is_verified(), "{:?}", result.report);
    }

    #[test]
    fn test_header_not_found() {
        let err = generate_from_bytes(b"a,b\n1,2\n", &config(), options()).unwrap_err();
        assert!(matches!(err, PipelineError::HeaderNotFound(20)));
    }

    #[test]
    fn test_unresolved_agreement_halts() {
        let err = generate_from_bytes(EXPORT.as_bytes(), &BusinessConfig::default(), options()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Compose(ComposeError::UnresolvedAgreement { .. })
        ));
    }

    #[test]
    fn test_lenient_override() {
        let options = GenerateOptions {
            agreement_policy: Some(AgreementPolicy::Lenient),
            ..options()
        };
        let result = generate_from_bytes(EXPORT.as_bytes(), &BusinessConfig::default(), options).unwrap();
        assert_eq!(result.file.warnings.len(), 2);
        // Blank PWR agreements are caught by self-validation
        assert!(!result.is_verified());
    }

    #[test]
    fn test_validate_bytes_latin1() {
        let result = generate_from_bytes(EXPORT.as_bytes(), &config(), options()).unwrap();
        let bytes = encode_output(&result.content);
        let report = validate_bytes(&bytes, ValidateOptions::default()).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.stats.transactions, 2);
    }

    #[test]
    fn test_encode_output_keeps_width() {
        assert_eq!(encode_output("SOCIÉTÉ"), b"SOCI\xC9T\xC9".to_vec());
        assert_eq!(encode_output("A漢B"), b"A?B".to_vec());
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("export.csv");
        tokio::fs::write(&csv_path, EXPORT).await.unwrap();

        let result = generate_from_csv(&csv_path, &config(), options()).await.unwrap();
        let out_dir = dir.path().join("OUTPUT_V22");
        let written = write_output(&out_dir, &result).await.unwrap();
        assert!(written.ends_with("CW260001LUM_319.V22"));

        let report = validate_file(&written, ValidateOptions::default()).await.unwrap();
        assert!(report.is_clean(), "{:?}", report.findings);
    }
}
