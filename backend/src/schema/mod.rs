//! Declarative record layouts for CWR files.
//!
//! Each record type (a 3-letter tag such as `NWR` or `SPU`) maps to a
//! [`RecordSpec`]: a fixed line width and an ordered list of [`FieldSpec`]s
//! with absolute offsets. Layouts are pure data: the encoder and the composer
//! never branch on a record tag to decide where bytes go.
//!
//! Two eras of the format coexist:
//!
//! - [`current`] - the hardened layout (fixed widths, trailing spaces kept)
//! - [`legacy`] - the earlier blueprint layout (right-trimmed lines)
//!
//! A whole table can be substituted by building a [`SchemaRegistry`] from
//! another `&'static [RecordSpec]`.
//!
//! # Example
//!
//! ```rust,ignore
//! use cwrgen::schema::{Era, CURRENT};
//!
//! let spu = CURRENT.lookup("SPU")?;
//! assert_eq!(spu.width, 166);
//! ```

pub mod current;
pub mod legacy;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::compose::{AgreementPolicy, DurationNotation, RecordingLayout};
use crate::error::{SchemaError, SchemaResult};

// =============================================================================
// Field Specification
// =============================================================================

/// How a field value is aligned inside its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Left-justified, padded on the right.
    Alphanumeric,
    /// Right-justified, padded on the left.
    Numeric,
}

/// One field of a record layout.
///
/// For constant fields `name` holds the literal that is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub start: usize,
    pub length: usize,
    pub kind: FieldKind,
    pub pad: char,
    pub constant: bool,
}

impl FieldSpec {
    /// A literal written as-is (left-justified, space padded).
    pub const fn constant(literal: &'static str, start: usize, length: usize) -> Self {
        Self {
            name: literal,
            start,
            length,
            kind: FieldKind::Alphanumeric,
            pad: ' ',
            constant: true,
        }
    }

    /// A variable text field, left-justified and space padded.
    pub const fn alpha(name: &'static str, start: usize, length: usize) -> Self {
        Self {
            name,
            start,
            length,
            kind: FieldKind::Alphanumeric,
            pad: ' ',
            constant: false,
        }
    }

    /// A variable numeric field, right-justified and zero padded.
    pub const fn numeric(name: &'static str, start: usize, length: usize) -> Self {
        Self {
            name,
            start,
            length,
            kind: FieldKind::Numeric,
            pad: '0',
            constant: false,
        }
    }

    /// Exclusive end offset.
    pub const fn end(&self) -> usize {
        self.start + self.length
    }
}

// =============================================================================
// Record Specification
// =============================================================================

/// Layout of one record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordSpec {
    pub tag: &'static str,
    pub width: usize,
    pub fields: &'static [FieldSpec],
}

impl RecordSpec {
    /// First field with this name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Extract the raw text of a named field from an encoded line.
    pub fn slice(&self, line: &str, name: &str) -> Option<String> {
        let field = self.field(name)?;
        Some(line.chars().skip(field.start).take(field.length).collect())
    }

    /// Check the layout invariants: every field fits in the width,
    /// no two fields overlap, and constant literals fit their slot.
    pub fn verify(&self) -> SchemaResult<()> {
        let invalid = |message: String| SchemaError::InvalidLayout {
            record: self.tag.to_string(),
            message,
        };

        let mut sorted: Vec<&FieldSpec> = self.fields.iter().collect();
        sorted.sort_by_key(|f| f.start);

        let mut cursor = 0;
        for field in sorted {
            if field.length == 0 {
                return Err(invalid(format!("field '{}' has zero length", field.name)));
            }
            if field.end() > self.width {
                return Err(invalid(format!(
                    "field '{}' ends at {} past width {}",
                    field.name,
                    field.end(),
                    self.width
                )));
            }
            if field.start < cursor {
                return Err(invalid(format!(
                    "field '{}' at {} overlaps previous field ending at {}",
                    field.name, field.start, cursor
                )));
            }
            if field.constant && field.name.trim().chars().count() > field.length {
                return Err(invalid(format!(
                    "constant '{}' does not fit {} chars",
                    field.name, field.length
                )));
            }
            cursor = field.end();
        }

        Ok(())
    }
}

// =============================================================================
// Schema Registry
// =============================================================================

/// Maps record tags to layouts. Built once, read-only afterwards.
#[derive(Debug)]
pub struct SchemaRegistry {
    name: &'static str,
    table: &'static [RecordSpec],
    index: HashMap<&'static str, &'static RecordSpec>,
}

impl SchemaRegistry {
    /// Build a registry from a static table.
    pub fn from_table(name: &'static str, table: &'static [RecordSpec]) -> Self {
        let index = table.iter().map(|spec| (spec.tag, spec)).collect();
        Self { name, table, index }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up the layout for a record tag.
    pub fn lookup(&self, tag: &str) -> SchemaResult<&'static RecordSpec> {
        self.index
            .get(tag)
            .copied()
            .ok_or_else(|| SchemaError::UnknownRecordType(tag.to_string()))
    }

    /// Layouts in table order.
    pub fn records(&self) -> impl Iterator<Item = &'static RecordSpec> {
        self.table.iter()
    }

    /// Verify every layout in the table.
    pub fn verify(&self) -> SchemaResult<()> {
        self.table.iter().try_for_each(RecordSpec::verify)
    }
}

/// The hardened layout.
pub static CURRENT: Lazy<SchemaRegistry> =
    Lazy::new(|| SchemaRegistry::from_table("current", current::RECORDS));

/// The earlier blueprint layout.
pub static LEGACY: Lazy<SchemaRegistry> =
    Lazy::new(|| SchemaRegistry::from_table("legacy", legacy::RECORDS));

// =============================================================================
// Eras
// =============================================================================

/// Format era. Selects a schema table together with its policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    #[default]
    Current,
    Legacy,
}

/// A schema table plus the policies that go with it.
#[derive(Debug, Clone, Copy)]
pub struct EraProfile {
    pub era: Era,
    pub registry: &'static SchemaRegistry,
    /// Right-trim trailing spaces from every encoded line.
    pub trim_trailing: bool,
    pub agreement_policy: AgreementPolicy,
    pub recordings: RecordingLayout,
    pub duration_notation: DurationNotation,
}

impl Era {
    pub fn profile(self) -> EraProfile {
        match self {
            Era::Current => EraProfile {
                era: self,
                registry: &CURRENT,
                trim_trailing: false,
                agreement_policy: AgreementPolicy::Strict,
                recordings: RecordingLayout::Dual,
                duration_notation: DurationNotation::Clock,
            },
            Era::Legacy => EraProfile {
                era: self,
                registry: &LEGACY,
                trim_trailing: true,
                agreement_policy: AgreementPolicy::Lenient,
                recordings: RecordingLayout::Single,
                duration_notation: DurationNotation::MinutesSeconds,
            },
        }
    }

    pub fn registry(self) -> &'static SchemaRegistry {
        self.profile().registry
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Era::Current => write!(f, "current"),
            Era::Legacy => write!(f, "legacy"),
        }
    }
}

impl FromStr for Era {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" | "v22" | "2.2" => Ok(Era::Current),
            "legacy" | "blueprint" => Ok(Era::Legacy),
            other => Err(format!("unknown era '{}' (expected 'current' or 'legacy')", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_layouts_are_consistent() {
        CURRENT.verify().unwrap();
    }

    #[test]
    fn test_legacy_layouts_are_consistent() {
        LEGACY.verify().unwrap();
    }

    #[test]
    fn test_current_widths() {
        let expected = [
            ("HDR", 108),
            ("GRH", 26),
            ("NWR", 145),
            ("SPU", 166),
            ("SPT", 58),
            ("SWR", 152),
            ("SWT", 52),
            ("PWR", 112),
            ("REC", 508),
            ("ORN", 160),
            ("GRT", 24),
            ("TRL", 24),
        ];
        for (tag, width) in expected {
            assert_eq!(CURRENT.lookup(tag).unwrap().width, width, "{}", tag);
        }
    }

    #[test]
    fn test_both_eras_cover_the_same_tags() {
        let current: Vec<&str> = CURRENT.records().map(|r| r.tag).collect();
        let legacy: Vec<&str> = LEGACY.records().map(|r| r.tag).collect();
        assert_eq!(current, legacy);
    }

    #[test]
    fn test_unknown_tag() {
        let err = CURRENT.lookup("XYZ").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRecordType(ref t) if t == "XYZ"));
    }

    #[test]
    fn test_verify_rejects_overlap() {
        static BAD: RecordSpec = RecordSpec {
            tag: "BAD",
            width: 10,
            fields: &[FieldSpec::constant("BAD", 0, 3), FieldSpec::alpha("x", 2, 4)],
        };
        assert!(matches!(BAD.verify(), Err(SchemaError::InvalidLayout { .. })));
    }

    #[test]
    fn test_verify_rejects_out_of_bounds() {
        static BAD: RecordSpec = RecordSpec {
            tag: "BAD",
            width: 5,
            fields: &[FieldSpec::numeric("n", 3, 4)],
        };
        assert!(BAD.verify().is_err());
    }

    #[test]
    fn test_era_parsing() {
        assert_eq!("current".parse::<Era>().unwrap(), Era::Current);
        assert_eq!("LEGACY".parse::<Era>().unwrap(), Era::Legacy);
        assert!("v21".parse::<Era>().is_err());
        assert_eq!(Era::default(), Era::Current);
    }

    #[test]
    fn test_era_profiles() {
        let current = Era::Current.profile();
        assert!(!current.trim_trailing);
        assert_eq!(current.agreement_policy, AgreementPolicy::Strict);
        assert_eq!(current.registry.name(), "current");

        let legacy = Era::Legacy.profile();
        assert!(legacy.trim_trailing);
        assert_eq!(legacy.agreement_policy, AgreementPolicy::Lenient);
        assert_eq!(legacy.recordings, RecordingLayout::Single);
    }
}
