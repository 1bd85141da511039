//! Boundary adapter from loosely-named spreadsheet rows to [`WorkInput`].
//!
//! Spreadsheet exports name the same concept in several ways (`TRACK: Title`,
//! `Track Title`, `Title`). Each concept has an ordered alias list; the first
//! alias found as a case-insensitive substring of a column name wins, and
//! columns are tried in sheet order for each alias.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::encoder::{canonical_text, is_missing_sentinel};

/// Number of publisher and writer slots read from a row.
pub const PARTY_SLOTS: u8 = 3;

pub const TITLE_ALIASES: &[&str] = &["TRACK: Title", "Title", "Track Title"];
pub const TRACK_NUMBER_ALIASES: &[&str] = &["TRACK: Number", "Track Number"];
pub const ISWC_ALIASES: &[&str] = &["CODE: ISWC", "ISWC"];
pub const DURATION_ALIASES: &[&str] = &["TRACK: Duration", "Length", "Duration"];
pub const ISRC_ALIASES: &[&str] = &["CODE: ISRC", "ISRC"];
pub const CATALOG_ALIASES: &[&str] = &["ALBUM: Code", "Album Code", "Catalog"];
pub const LABEL_ALIASES: &[&str] = &["LIBRARY: Name", "Library", "LABEL: Name", "Label"];

/// One publisher slot of a work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublisherInput {
    /// 1-based slot in the source row.
    pub slot: u8,
    pub name: String,
    pub share: Option<String>,
    pub ipi: Option<String>,
}

/// One writer slot of a work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriterInput {
    pub slot: u8,
    pub last_name: String,
    pub first_name: Option<String>,
    pub share: Option<String>,
    pub ipi: Option<String>,
    /// Publisher this writer is signed to, matched by name.
    pub original_publisher: Option<String>,
}

/// Clean, already-keyed values of one work. `None` means absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkInput {
    pub title: Option<String>,
    pub track_number: Option<String>,
    pub iswc: Option<String>,
    pub duration: Option<String>,
    pub isrc: Option<String>,
    pub catalog: Option<String>,
    pub label: Option<String>,
    pub publishers: Vec<PublisherInput>,
    pub writers: Vec<WriterInput>,
}

impl WorkInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Read a spreadsheet row (a JSON object keyed by header).
    ///
    /// Non-object rows yield an empty input.
    pub fn from_row(row: &Value) -> Self {
        let Some(columns) = row.as_object() else {
            return Self::default();
        };

        let mut input = Self {
            title: find_col(columns, TITLE_ALIASES),
            track_number: find_col(columns, TRACK_NUMBER_ALIASES),
            iswc: find_col(columns, ISWC_ALIASES),
            duration: find_col(columns, DURATION_ALIASES),
            isrc: find_col(columns, ISRC_ALIASES),
            catalog: find_col(columns, CATALOG_ALIASES),
            label: find_col(columns, LABEL_ALIASES),
            ..Self::default()
        };

        for slot in 1..=PARTY_SLOTS {
            if let Some(name) = slot_col(columns, "PUBLISHER", slot, "Name") {
                input.publishers.push(PublisherInput {
                    slot,
                    name,
                    share: slot_col(columns, "PUBLISHER", slot, "Owner Performance Share %"),
                    ipi: slot_col(columns, "PUBLISHER", slot, "IPI"),
                });
            }
        }

        for slot in 1..=PARTY_SLOTS {
            if let Some(last_name) = slot_col(columns, "WRITER", slot, "Last Name") {
                input.writers.push(WriterInput {
                    slot,
                    last_name,
                    first_name: slot_col(columns, "WRITER", slot, "First Name"),
                    share: slot_col(columns, "WRITER", slot, "Owner Performance Share %"),
                    ipi: slot_col(columns, "WRITER", slot, "IPI"),
                    original_publisher: slot_col(columns, "WRITER", slot, "Original Publisher"),
                });
            }
        }

        input
    }

    pub fn with_publisher(mut self, name: &str, share: &str) -> Self {
        let slot = self.publishers.len() as u8 + 1;
        self.publishers.push(PublisherInput {
            slot,
            name: name.to_string(),
            share: Some(share.to_string()),
            ipi: None,
        });
        self
    }

    pub fn with_writer(mut self, last_name: &str, share: &str, original_publisher: &str) -> Self {
        let slot = self.writers.len() as u8 + 1;
        self.writers.push(WriterInput {
            slot,
            last_name: last_name.to_string(),
            share: Some(share.to_string()),
            original_publisher: Some(original_publisher.to_string()),
            ..WriterInput::default()
        });
        self
    }
}

/// Text of a cell, or `None` for blanks and missing-value sentinels.
pub fn cell_text(value: &Value) -> Option<String> {
    let text = canonical_text(value);
    let text = text.trim();
    if text.is_empty() || is_missing_sentinel(text) {
        None
    } else {
        Some(text.to_string())
    }
}

/// Value of the first column matching any alias, aliases in priority order.
pub fn find_col(columns: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        let needle = alias.to_uppercase();
        columns
            .iter()
            .find(|(name, _)| name.to_uppercase().contains(&needle))
            .and_then(|(_, value)| cell_text(value))
    })
}

/// Value of a party slot column.
///
/// Two exports exist: `PUBLISHER:1: Name` and `PUBLISHER 1 Company`. The
/// second uses its own suffixes for name, share and IPI.
pub fn slot_col(columns: &Map<String, Value>, base: &str, slot: u8, suffix: &str) -> Option<String> {
    let alternate = match suffix {
        "Name" if base == "PUBLISHER" => "Company",
        "Owner Performance Share %" => "Ownership Share",
        "IPI" => "CAE/IPI",
        other => other,
    };
    let colon_form = format!("{}:{}: {}", base, slot, suffix).to_uppercase();
    let spaced_form = format!("{} {} {}", base, slot, alternate).to_uppercase();

    columns
        .iter()
        .find(|(name, _)| {
            let upper = name.to_uppercase();
            upper.contains(&colon_form) || upper.contains(&spaced_form)
        })
        .and_then(|(_, value)| cell_text(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aliases_in_priority_order() {
        let row = json!({
            "ALBUM: Title": "Album Name",
            "TRACK: Title": "Track Name",
        });
        let input = WorkInput::from_row(&row);
        assert_eq!(input.title.as_deref(), Some("Track Name"));
    }

    #[test]
    fn test_alias_match_is_case_insensitive_substring() {
        let row = json!({ "my track number (ext)": 12, "LIBRARY: NAME": "Red Cola" });
        let input = WorkInput::from_row(&row);
        assert_eq!(input.track_number.as_deref(), Some("12"));
        assert_eq!(input.label.as_deref(), Some("Red Cola"));
    }

    #[test]
    fn test_sentinels_and_blanks_are_absent() {
        let row = json!({ "Title": "nan", "ISRC": "  ", "ISWC": null, "Duration": "None" });
        let input = WorkInput::from_row(&row);
        assert_eq!(input.title, None);
        assert_eq!(input.isrc, None);
        assert_eq!(input.iswc, None);
        assert_eq!(input.duration, None);
    }

    #[test]
    fn test_colon_slot_columns() {
        let row = json!({
            "TRACK: Title": "Song",
            "PUBLISHER:1: Name": "Lumina Publishing UK",
            "PUBLISHER:1: Owner Performance Share %": 100,
            "PUBLISHER:1: IPI": "1254514077",
            "WRITER:1: Last Name": "Smith",
            "WRITER:1: First Name": "Jo",
            "WRITER:1: Owner Performance Share %": "50",
            "WRITER:1: Original Publisher": "Lumina Publishing UK",
            "WRITER:2: Last Name": "",
        });
        let input = WorkInput::from_row(&row);
        assert_eq!(input.publishers.len(), 1);
        assert_eq!(input.publishers[0].slot, 1);
        assert_eq!(input.publishers[0].share.as_deref(), Some("100"));
        assert_eq!(input.writers.len(), 1);
        assert_eq!(input.writers[0].first_name.as_deref(), Some("Jo"));
        assert_eq!(
            input.writers[0].original_publisher.as_deref(),
            Some("Lumina Publishing UK")
        );
    }

    #[test]
    fn test_spaced_slot_columns() {
        let row = json!({
            "PUBLISHER 2 Company": "Acme Music",
            "PUBLISHER 2 Ownership Share": "25",
            "PUBLISHER 2 CAE/IPI": "123",
            "WRITER 1 Last Name": "Doe",
        });
        let input = WorkInput::from_row(&row);
        assert_eq!(input.publishers.len(), 1);
        assert_eq!(input.publishers[0].slot, 2);
        assert_eq!(input.publishers[0].name, "Acme Music");
        assert_eq!(input.publishers[0].ipi.as_deref(), Some("123"));
        assert_eq!(input.writers[0].last_name, "Doe");
    }

    #[test]
    fn test_non_object_row() {
        assert_eq!(WorkInput::from_row(&json!([1, 2])), WorkInput::default());
    }
}
