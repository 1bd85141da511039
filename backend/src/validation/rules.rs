//! Audit rule tables.
//!
//! These tables are written independently of the encoder layouts in
//! [`crate::schema`]: a layout mistake must not be able to validate itself.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Expected line length of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    Exact(usize),
    /// Right-trimmed lines may be shorter.
    AtMost(usize),
}

impl LengthRule {
    pub fn accepts(&self, len: usize) -> bool {
        match *self {
            LengthRule::Exact(n) => len == n,
            LengthRule::AtMost(n) => len <= n,
        }
    }

    pub fn limit(&self) -> usize {
        match *self {
            LengthRule::Exact(n) | LengthRule::AtMost(n) => n,
        }
    }
}

/// A micro-field assertion: the `[start, end)` column span must match.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub start: usize,
    pub end: usize,
    pub pattern: &'static str,
}

/// Length and micro-field rules for one record type.
#[derive(Debug, Clone, Copy)]
pub struct RecordRule {
    pub tag: &'static str,
    pub length: LengthRule,
    pub fields: &'static [FieldRule],
}

const fn field(name: &'static str, start: usize, end: usize, pattern: &'static str) -> FieldRule {
    FieldRule {
        name,
        start,
        end,
        pattern,
    }
}

const NOT_BLANK: &str = r"\S";

static CURRENT_RECORDS: &[RecordRule] = &[
    RecordRule {
        tag: "HDR",
        length: LengthRule::Exact(108),
        fields: &[field("Version", 103, 108, r"^2\.200$")],
    },
    RecordRule {
        tag: "GRH",
        length: LengthRule::Exact(26),
        fields: &[
            field("Transaction Type", 3, 6, r"^NWR$"),
            field("Version", 11, 16, r"^02\.20$"),
        ],
    },
    RecordRule {
        tag: "NWR",
        length: LengthRule::Exact(145),
        fields: &[field("Origin", 142, 145, r"^ORI$")],
    },
    RecordRule {
        tag: "SPU",
        length: LengthRule::Exact(166),
        fields: &[
            field("Publisher Sequence", 11, 19, r"^\d{8}$"),
            field("SR Share & Refusal", 131, 138, r"^\d{5} N$"),
            field("Agreement Type", 164, 166, r"^PG$"),
        ],
    },
    RecordRule {
        tag: "SPT",
        length: LengthRule::Exact(58),
        fields: &[field("Territory", 50, 54, r"^\d{4}$")],
    },
    RecordRule {
        tag: "SWR",
        length: LengthRule::Exact(152),
        fields: &[field("IPI", 115, 126, r"^(\d{11}|\s{11})$")],
    },
    RecordRule {
        tag: "SWT",
        length: LengthRule::Exact(52),
        fields: &[],
    },
    RecordRule {
        tag: "PWR",
        length: LengthRule::Exact(112),
        fields: &[field("Submitter Agreement Number", 73, 87, NOT_BLANK)],
    },
    RecordRule {
        tag: "REC",
        length: LengthRule::Exact(508),
        fields: &[
            field("Source", 262, 263, r"^[CD]$"),
            field("Label", 445, 505, NOT_BLANK),
        ],
    },
    RecordRule {
        tag: "ORN",
        length: LengthRule::Exact(160),
        fields: &[field("Cut Number", 96, 100, r"^\d{4}$")],
    },
    RecordRule {
        tag: "GRT",
        length: LengthRule::Exact(24),
        fields: &[],
    },
    RecordRule {
        tag: "TRL",
        length: LengthRule::Exact(24),
        fields: &[],
    },
];

static LEGACY_RECORDS: &[RecordRule] = &[
    RecordRule {
        tag: "HDR",
        length: LengthRule::AtMost(108),
        fields: &[field("Version", 103, 106, r"^2\.2$")],
    },
    RecordRule {
        tag: "GRH",
        length: LengthRule::AtMost(26),
        fields: &[
            field("Transaction Type", 3, 6, r"^NWR$"),
            field("Version", 11, 16, r"^02\.20$"),
        ],
    },
    RecordRule {
        tag: "NWR",
        length: LengthRule::AtMost(145),
        fields: &[field("Origin", 142, 145, r"^ORI$")],
    },
    RecordRule {
        tag: "SPU",
        length: LengthRule::AtMost(184),
        fields: &[
            field("Publisher Sequence", 11, 19, r"^\d{8}$"),
            field("SR Share & Refusal", 131, 138, r"^\d{5} N$"),
            field("Agreement Type", 179, 181, r"^PG$"),
        ],
    },
    RecordRule {
        tag: "SPT",
        length: LengthRule::AtMost(58),
        fields: &[field("Territory", 50, 54, r"^\d{4}$")],
    },
    RecordRule {
        tag: "SWR",
        length: LengthRule::AtMost(152),
        fields: &[field("IPI", 115, 126, r"^(\d{11}|\s{11})$")],
    },
    RecordRule {
        tag: "SWT",
        length: LengthRule::AtMost(52),
        fields: &[],
    },
    RecordRule {
        tag: "PWR",
        length: LengthRule::AtMost(112),
        fields: &[field("Submitter Agreement Number", 73, 87, NOT_BLANK)],
    },
    RecordRule {
        tag: "REC",
        length: LengthRule::AtMost(350),
        fields: &[
            field("Source", 194, 196, r"^CD$"),
            field("Label", 297, 349, NOT_BLANK),
        ],
    },
    RecordRule {
        tag: "ORN",
        length: LengthRule::AtMost(160),
        fields: &[field("Cut Number", 96, 100, r"^\d{4}$")],
    },
    RecordRule {
        tag: "GRT",
        length: LengthRule::AtMost(24),
        fields: &[],
    },
    RecordRule {
        tag: "TRL",
        length: LengthRule::AtMost(24),
        fields: &[],
    },
];

/// A [`RecordRule`] with its patterns compiled.
#[derive(Debug)]
pub struct CompiledRule {
    pub rule: &'static RecordRule,
    pub patterns: Vec<(FieldRule, Regex)>,
}

/// All audit rules of one era plus the column spans the state machine reads.
#[derive(Debug)]
pub struct RuleSet {
    pub name: &'static str,
    rules: HashMap<&'static str, CompiledRule>,
    /// Work title on NWR/REV lines.
    pub title_span: (usize, usize),
    /// Recording source flag on REC lines.
    pub source_span: (usize, usize),
    /// Recording label on REC lines.
    pub label_span: (usize, usize),
    /// Require both a `C` and a `D` recording per work.
    pub dual_recordings: bool,
}

impl RuleSet {
    fn compile(name: &'static str, table: &'static [RecordRule]) -> Self {
        let rules = table
            .iter()
            .map(|rule| {
                let patterns = rule
                    .fields
                    .iter()
                    .map(|f| (*f, Regex::new(f.pattern).expect("valid audit pattern")))
                    .collect();
                (rule.tag, CompiledRule { rule, patterns })
            })
            .collect();

        Self {
            name,
            rules,
            title_span: (19, 79),
            source_span: (262, 263),
            label_span: (445, 505),
            dual_recordings: true,
        }
    }

    pub fn get(&self, tag: &str) -> Option<&CompiledRule> {
        self.rules.get(tag)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub static CURRENT_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet::compile("current", CURRENT_RECORDS));

pub static LEGACY_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    source_span: (194, 196),
    label_span: (297, 349),
    dual_recordings: false,
    ..RuleSet::compile("legacy", LEGACY_RECORDS)
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CURRENT, LEGACY};

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(CURRENT_RULES.len(), 12);
        assert_eq!(LEGACY_RULES.len(), 12);
    }

    #[test]
    fn test_rule_lengths_agree_with_layouts() {
        for (rules, registry) in [(&*CURRENT_RULES, &*CURRENT), (&*LEGACY_RULES, &*LEGACY)] {
            for spec in registry.records() {
                let rule = rules.get(spec.tag).unwrap();
                assert_eq!(rule.rule.length.limit(), spec.width, "{} {}", rules.name, spec.tag);
            }
        }
    }

    #[test]
    fn test_length_rule() {
        assert!(LengthRule::Exact(5).accepts(5));
        assert!(!LengthRule::Exact(5).accepts(4));
        assert!(LengthRule::AtMost(5).accepts(4));
        assert!(!LengthRule::AtMost(5).accepts(6));
    }

    #[test]
    fn test_share_refusal_pattern() {
        let spu = CURRENT_RULES.get("SPU").unwrap();
        let (_, re) = &spu.patterns[1];
        assert!(re.is_match("10000 N"));
        assert!(!re.is_match("10000N "));
    }

    #[test]
    fn test_not_blank_pattern() {
        let pwr = CURRENT_RULES.get("PWR").unwrap();
        let (_, re) = &pwr.patterns[0];
        assert!(re.is_match("4316161       "));
        assert!(!re.is_match("              "));
    }
}
