//! Fixed-width record encoder.
//!
//! Renders one record instance (a tag plus [`FieldValues`]) into a line of
//! exactly the layout width:
//!
//! ```text
//! values ──▶ normalize ──▶ length check ──▶ pad ──▶ write at offset
//!            (trim, upper,   (overflow is      (numeric: right,
//!             NAN → empty)    an error)          alpha: left)
//! ```
//!
//! Values are never truncated. A value longer than its field yields
//! [`EncodeError::FieldOverflow`] and no line.

use serde_json::{Number, Value};

use crate::error::{EncodeError, EncodeResult};
use crate::models::FieldValues;
use crate::schema::{Era, FieldKind, FieldSpec, RecordSpec, SchemaRegistry};

/// Tokens produced by upstream missing-value encodings.
const MISSING_SENTINELS: [&str; 2] = ["NAN", "NONE"];

/// Encodes records against one schema table.
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'a> {
    registry: &'a SchemaRegistry,
    trim_trailing: bool,
}

impl<'a> Encoder<'a> {
    pub fn new(registry: &'a SchemaRegistry, trim_trailing: bool) -> Self {
        Self {
            registry,
            trim_trailing,
        }
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Encode one record into a line.
    pub fn encode(&self, tag: &str, values: &FieldValues) -> EncodeResult<String> {
        let spec = self
            .registry
            .lookup(tag)
            .map_err(|_| EncodeError::UnknownRecordType(tag.to_string()))?;

        let line = encode_record(spec, values)?;

        if self.trim_trailing {
            Ok(line.trim_end_matches(' ').to_string())
        } else {
            Ok(line)
        }
    }
}

impl Encoder<'static> {
    /// Encoder configured for an era's table and trailing-space policy.
    pub fn for_era(era: Era) -> Self {
        let profile = era.profile();
        Self::new(profile.registry, profile.trim_trailing)
    }
}

/// Encode against a single layout, always at full width.
pub fn encode_record(spec: &RecordSpec, values: &FieldValues) -> EncodeResult<String> {
    let mut buffer = vec![' '; spec.width];

    for field in spec.fields {
        let value = if field.constant {
            normalize_text(field.name)
        } else {
            values.get(field.name).map(normalize).unwrap_or_default()
        };

        let actual = value.chars().count();
        if actual > field.length {
            return Err(EncodeError::FieldOverflow {
                record: spec.tag.to_string(),
                field: field.name.to_string(),
                value,
                actual,
                limit: field.length,
                context: None,
            });
        }

        for (offset, ch) in pad(&value, field).chars().enumerate() {
            if let Some(slot) = buffer.get_mut(field.start + offset) {
                *slot = ch;
            }
        }
    }

    Ok(buffer.into_iter().collect())
}

/// Pad a value to its field width. The value must already fit.
pub fn pad(value: &str, field: &FieldSpec) -> String {
    let fill: String = std::iter::repeat(field.pad)
        .take(field.length.saturating_sub(value.chars().count()))
        .collect();

    match field.kind {
        FieldKind::Numeric => format!("{}{}", fill, value),
        FieldKind::Alphanumeric => format!("{}{}", value, fill),
    }
}

/// Canonical text of a scalar, before normalization.
///
/// Integral floats render without a fractional part (`1.0` → `"1"`).
pub fn canonical_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => number_text(n),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Trim, upper-case, and blank out missing-value sentinels.
pub fn normalize(value: &Value) -> String {
    normalize_text(&canonical_text(value))
}

pub fn normalize_text(text: &str) -> String {
    let upper = text.trim().to_uppercase();
    if is_missing_sentinel(&upper) {
        String::new()
    } else {
        upper
    }
}

/// True for `NAN` / `NONE` in any case.
pub fn is_missing_sentinel(text: &str) -> bool {
    let upper = text.trim().to_uppercase();
    MISSING_SENTINELS.contains(&upper.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CURRENT, LEGACY};
    use serde_json::json;

    static PROBE: RecordSpec = RecordSpec {
        tag: "TST",
        width: 16,
        fields: &[
            FieldSpec::constant("TST", 0, 3),
            FieldSpec::numeric("count", 3, 5),
            FieldSpec::alpha("code", 8, 5),
        ],
    };

    #[test]
    fn test_numeric_padding() {
        let line = encode_record(&PROBE, &FieldValues::new().with("count", "5")).unwrap();
        assert_eq!(&line[3..8], "00005");
    }

    #[test]
    fn test_alphanumeric_padding() {
        let line = encode_record(&PROBE, &FieldValues::new().with("code", "ab")).unwrap();
        assert_eq!(&line[8..13], "AB   ");
    }

    #[test]
    fn test_unwritten_positions_are_spaces() {
        let line = encode_record(&PROBE, &FieldValues::new()).unwrap();
        assert_eq!(line, "TST00000        ");
        assert_eq!(line.len(), 16);
    }

    #[test]
    fn test_width_invariant_for_every_current_record() {
        let encoder = Encoder::for_era(Era::Current);
        for spec in CURRENT.records() {
            let line = encoder.encode(spec.tag, &FieldValues::new()).unwrap();
            assert_eq!(line.chars().count(), spec.width, "{}", spec.tag);
            assert!(line.starts_with(spec.tag));
        }
    }

    #[test]
    fn test_width_invariant_with_values() {
        let encoder = Encoder::for_era(Era::Current);
        let values = FieldValues::new()
            .with("t_seq", 7)
            .with("rec_seq", 12)
            .with("title", "Société Générale")
            .with("label", "Red Cola");
        for tag in ["NWR", "REC", "ORN"] {
            let line = encoder.encode(tag, &values).unwrap();
            assert_eq!(line.chars().count(), CURRENT.lookup(tag).unwrap().width);
        }
    }

    #[test]
    fn test_overflow_is_an_error() {
        let encoder = Encoder::for_era(Era::Current);
        let title = "X".repeat(61);
        let err = encoder
            .encode("NWR", &FieldValues::new().with("title", title.as_str()))
            .unwrap_err();
        match err {
            EncodeError::FieldOverflow {
                record,
                field,
                actual,
                limit,
                ..
            } => {
                assert_eq!(record, "NWR");
                assert_eq!(field, "title");
                assert_eq!(actual, 61);
                assert_eq!(limit, 60);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_exact_fit_is_not_an_overflow() {
        let line = encode_record(&PROBE, &FieldValues::new().with("code", "ABCDE")).unwrap();
        assert_eq!(&line[8..13], "ABCDE");
    }

    #[test]
    fn test_overflow_on_numeric_field() {
        let err = encode_record(&PROBE, &FieldValues::new().with("count", 123456)).unwrap_err();
        assert!(matches!(err, EncodeError::FieldOverflow { ref field, .. } if field == "count"));
    }

    #[test]
    fn test_sentinels_render_empty() {
        let line = encode_record(&PROBE, &FieldValues::new().with("code", "nan")).unwrap();
        assert_eq!(&line[8..13], "     ");
        let line = encode_record(&PROBE, &FieldValues::new().with("code", " None ")).unwrap();
        assert_eq!(&line[8..13], "     ");
        assert_eq!(normalize(&Value::Null), "");
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize(&json!("  hello ")), "HELLO");
        assert_eq!(normalize(&json!(1.0)), "1");
        assert_eq!(normalize(&json!(12.5)), "12.5");
        assert_eq!(normalize(&json!(42)), "42");
        assert_eq!(normalize(&json!("NANO")), "NANO");
    }

    #[test]
    fn test_unknown_record_type() {
        let encoder = Encoder::for_era(Era::Current);
        let err = encoder.encode("ZZZ", &FieldValues::new()).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownRecordType(ref t) if t == "ZZZ"));
    }

    #[test]
    fn test_legacy_lines_are_trimmed() {
        let encoder = Encoder::for_era(Era::Legacy);
        let line = encoder
            .encode("ORN", &FieldValues::new().with("library", "Red Cola"))
            .unwrap();
        assert!(!line.ends_with(' '));
        assert!(line.ends_with("RED COLA"));
        assert!(line.chars().count() <= LEGACY.lookup("ORN").unwrap().width);
    }

    #[test]
    fn test_substituted_table() {
        static TABLE: &[RecordSpec] = &[RecordSpec {
            tag: "ABC",
            width: 6,
            fields: &[FieldSpec::constant("ABC", 0, 3), FieldSpec::numeric("n", 3, 3)],
        }];
        let registry = SchemaRegistry::from_table("probe", TABLE);
        let encoder = Encoder::new(&registry, false);
        assert_eq!(encoder.encode("ABC", &FieldValues::new().with("n", 7)).unwrap(), "ABC007");
    }
}
