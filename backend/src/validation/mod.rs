//! CWR file validator.
//!
//! Re-parses a file line by line and runs two audits per line:
//!
//! 1. **Structure**: the line length and the micro-field patterns of the
//!    record type ([`rules`]).
//! 2. **Integrity**: a two-state machine (outside / inside a transaction)
//!    that checks every finished work has a writer, a publisher and, in the
//!    current era, both a `C` and a `D` recording.
//!
//! Lines are also scanned for a stray `NAN` token, and REC labels can be
//! checked against an expected catalog.
//!
//! Scanning stops at the first critical finding: one misaligned line would
//! otherwise produce a cascade of findings on every line after it.
//!
//! # Example
//!
//! ```rust,ignore
//! use cwrgen::validation::Validator;
//! use cwrgen::schema::Era;
//!
//! let report = Validator::for_era(Era::Current).process(&content, Some("RED COLA"));
//! for finding in &report.findings {
//!     println!("line {}: {}", finding.line, finding.message);
//! }
//! ```

pub mod rules;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{Finding, FindingKind};
use crate::schema::Era;

pub use rules::{LengthRule, RuleSet, CURRENT_RULES, LEGACY_RULES};

/// Tags that open a work transaction.
const OPENING_TAGS: [&str; 2] = ["NWR", "REV"];

/// Tags that close the group or the file.
const TRAILER_TAGS: [&str; 2] = ["GRT", "TRL"];

static STRAY_NAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNAN\b").expect("valid NAN pattern"));

/// Summary counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub lines_read: usize,
    pub transactions: usize,
}

/// Findings in file order plus counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    /// No findings and at least one transaction.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.stats.transactions > 0
    }

    pub fn has_critical(&self) -> bool {
        self.findings.iter().any(Finding::is_critical)
    }

    pub fn first_critical(&self) -> Option<&Finding> {
        self.findings.iter().find(|f| f.is_critical())
    }
}

/// Trackers of the transaction being scanned.
#[derive(Debug, Default)]
struct OpenWork {
    title: String,
    has_writer: bool,
    has_publisher: bool,
    sources: BTreeSet<String>,
}

/// Validates CWR text against one era's rule set.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    rules: &'static RuleSet,
}

impl Validator {
    pub fn new(rules: &'static RuleSet) -> Self {
        Self { rules }
    }

    pub fn for_era(era: Era) -> Self {
        match era {
            Era::Current => Self::new(&CURRENT_RULES),
            Era::Legacy => Self::new(&LEGACY_RULES),
        }
    }

    /// Validate a whole file. `expected_catalog`, when given, must match
    /// every REC label (case and spaces ignored).
    pub fn process(&self, content: &str, expected_catalog: Option<&str>) -> ValidationReport {
        let normalized = content.replace("\r\n", "\n");
        let lines: Vec<&str> = normalized
            .split('\n')
            .filter(|l| !l.trim().is_empty())
            .collect();

        let mut report = ValidationReport {
            findings: Vec::new(),
            stats: ValidationStats {
                lines_read: lines.len(),
                transactions: 0,
            },
        };

        let expected_catalog = expected_catalog.filter(|c| !c.trim().is_empty());
        let mut open: Option<OpenWork> = None;

        for (index, line) in lines.iter().enumerate() {
            let line_no = index + 1;
            if line.chars().count() < 3 {
                continue;
            }
            let tag: String = line.chars().take(3).collect();

            if let Some(finding) = self.audit_structure(&tag, line, line_no) {
                report.findings.push(finding);
                return report;
            }

            if tag == "REC" {
                if let Some(catalog) = expected_catalog {
                    if let Some(finding) = self.check_catalog(line, line_no, catalog) {
                        report.findings.push(finding);
                        return report;
                    }
                }
            }

            let opening = OPENING_TAGS.contains(&tag.as_str());
            if opening || TRAILER_TAGS.contains(&tag.as_str()) {
                if let Some(work) = open.take() {
                    if let Some(finding) = self.close_work(&tag, &work, line_no - 1) {
                        report.findings.push(finding);
                        return report;
                    }
                }
                if opening {
                    open = Some(OpenWork {
                        title: columns(line, self.rules.title_span).trim().to_string(),
                        ..OpenWork::default()
                    });
                    report.stats.transactions += 1;
                }
            }

            if let Some(work) = open.as_mut() {
                match tag.as_str() {
                    "SWR" => work.has_writer = true,
                    "SPU" => work.has_publisher = true,
                    "REC" => {
                        work.sources.insert(columns(line, self.rules.source_span));
                    }
                    _ => {}
                }
            }

            if let Some(finding) = self.check_stray_sentinel(&tag, line, line_no, opening) {
                report.findings.push(finding);
                return report;
            }
        }

        report
    }

    fn audit_structure(&self, tag: &str, line: &str, line_no: usize) -> Option<Finding> {
        let compiled = self.rules.get(tag)?;

        let len = line.chars().count();
        if !compiled.rule.length.accepts(len) {
            return Some(Finding::critical(
                FindingKind::MalformedLine,
                line_no,
                format!(
                    "HALT: [{}] Length Fail at Line {}. Expected {} chars, got {}.",
                    tag,
                    line_no,
                    compiled.rule.length.limit(),
                    len
                ),
                line,
            ));
        }

        compiled.patterns.iter().find_map(|(field, pattern)| {
            let segment = columns(line, (field.start, field.end));
            (!pattern.is_match(&segment)).then(|| {
                Finding::critical(
                    FindingKind::PatternMismatch,
                    line_no,
                    format!(
                        "HALT: [{}] Micro-Inspection Fail at Line {}, Column Index [{}:{}]. Field '{}' invalid. Found: '{}'",
                        tag, line_no, field.start, field.end, field.name, segment
                    ),
                    line,
                )
            })
        })
    }

    fn check_catalog(&self, line: &str, line_no: usize, expected: &str) -> Option<Finding> {
        let label = columns(line, self.rules.label_span);
        let label = label.trim();
        if compact_upper(label) == compact_upper(expected) {
            return None;
        }
        Some(Finding::critical(
            FindingKind::CatalogMismatch,
            line_no,
            format!(
                "HALT: [REC] Label Mismatch at Line {}: Found '{}', expected '{}'.",
                line_no, label, expected
            ),
            line,
        ))
    }

    fn close_work(&self, tag: &str, work: &OpenWork, line_no: usize) -> Option<Finding> {
        let problem = if !work.has_writer {
            "HAS NO WRITERS"
        } else if !work.has_publisher {
            "HAS NO PUBLISHERS"
        } else if self.rules.dual_recordings
            && !(work.sources.contains("C") && work.sources.contains("D"))
        {
            "IS MISSING DUAL REC RECORDS ('C' AND 'D')"
        } else {
            return None;
        };

        Some(Finding::critical(
            FindingKind::StructuralIncomplete,
            line_no,
            format!("HALT: [{}] WORK '{}' {}.", tag, work.title, problem),
            "",
        ))
    }

    fn check_stray_sentinel(&self, tag: &str, line: &str, line_no: usize, opening: bool) -> Option<Finding> {
        // Real titles may contain the word
        let scanned = if opening {
            blank_columns(line, self.rules.title_span)
        } else {
            line.to_string()
        };

        STRAY_NAN.is_match(&scanned).then(|| {
            Finding::critical(
                FindingKind::StraySentinel,
                line_no,
                format!(
                    "HALT: [{}] Syntax Fail: Standalone 'NAN' found in data field at Line {}.",
                    tag, line_no
                ),
                line,
            )
        })
    }
}

/// Characters in `[start, end)`, shorter if the line is.
fn columns(line: &str, (start, end): (usize, usize)) -> String {
    line.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn blank_columns(line: &str, (start, end): (usize, usize)) -> String {
    line.chars()
        .enumerate()
        .map(|(i, c)| if (start..end).contains(&i) { ' ' } else { c })
        .collect()
}

fn compact_upper(text: &str) -> String {
    text.to_uppercase().replace(' ', "")
}
