//! Transaction composer.
//!
//! Turns a sequence of works into a complete CWR file:
//!
//! ```text
//! HDR ─ GRH ─┬─ NWR ─ (SPU SPU SPT)* ─ (SWR SWT PWR?)* ─ REC+ ─ ORN ─┬─ GRT ─ TRL
//!            └──────────────── one transaction per work ─────────────┘
//! ```
//!
//! Every record goes through the [`Encoder`], so any value that does not fit
//! its field halts the whole run with a [`ComposeError::Encode`] carrying the
//! work title and track number.
//!
//! # Example
//!
//! ```rust,ignore
//! use cwrgen::compose::{Composer, WorkInput};
//! use cwrgen::config::BusinessConfig;
//! use cwrgen::schema::Era;
//!
//! let config = BusinessConfig::from_env()?;
//! let work = WorkInput::new("My Song").with_publisher("ACME MUSIC", "100");
//! let file = Composer::new(&config, Era::Current).compose(&[work], now)?;
//! std::fs::write("out.V22", file.to_text())?;
//! ```

pub mod agreement;
pub mod derive;
pub mod input;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BusinessConfig;
use crate::encoder::Encoder;
use crate::error::{ComposeError, ComposeResult};
use crate::models::{FieldValues, Finding, FindingKind};
use crate::schema::{Era, EraProfile};

pub use agreement::{AgreementMap, AgreementPolicy};
pub use derive::DurationNotation;
pub use input::{PublisherInput, WorkInput, WriterInput};

use derive::{cut_number, format_share, normalize_iswc, normalize_label, pad_ipi, parse_duration};

/// Submitter's own publisher ID on sub-publisher records.
const SUB_PUBLISHER_ID: &str = "000000012";

/// Full ownership on the mechanical and sync splits.
const FULL_SHARE: &str = "10000";

/// Line terminator of the output file.
pub const LINE_END: &str = "\r\n";

/// How recordings of a work are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingLayout {
    /// One REC with source `C` and the catalog code, one with source `D`.
    Dual,
    /// A single REC with source `CD`.
    Single,
}

// =============================================================================
// Output
// =============================================================================

/// Where one work landed in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub t_seq: usize,
    pub title: String,
    /// 1-based line of the NWR record.
    pub line: usize,
    pub records: usize,
}

/// A fully composed file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposedFile {
    pub lines: Vec<String>,
    pub transactions: Vec<TransactionSummary>,
    /// Unresolved agreements under the lenient policy.
    pub warnings: Vec<Finding>,
}

impl ComposedFile {
    /// CRLF-joined text with a trailing terminator.
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join(LINE_END);
        text.push_str(LINE_END);
        text
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

// =============================================================================
// Composer
// =============================================================================

/// Composes works into a file for one era and one business configuration.
pub struct Composer<'a> {
    config: &'a BusinessConfig,
    profile: EraProfile,
    encoder: Encoder<'static>,
}

impl<'a> Composer<'a> {
    pub fn new(config: &'a BusinessConfig, era: Era) -> Self {
        let profile = era.profile();
        Self {
            config,
            encoder: Encoder::new(profile.registry, profile.trim_trailing),
            profile,
        }
    }

    /// Override the era's default agreement policy.
    pub fn with_agreement_policy(mut self, policy: AgreementPolicy) -> Self {
        self.profile.agreement_policy = policy;
        self
    }

    pub fn profile(&self) -> &EraProfile {
        &self.profile
    }

    /// Compose raw spreadsheet rows (see [`WorkInput::from_row`]).
    pub fn compose_rows(&self, rows: &[Value], now: NaiveDateTime) -> ComposeResult<ComposedFile> {
        let works: Vec<WorkInput> = rows.iter().map(WorkInput::from_row).collect();
        self.compose(&works, now)
    }

    /// Compose a whole file. `now` stamps the header. No works still yields
    /// the HDR/GRH/GRT/TRL envelope.
    pub fn compose(&self, works: &[WorkInput], now: NaiveDateTime) -> ComposeResult<ComposedFile> {
        let mut file = ComposedFile::default();
        let date = now.format("%Y%m%d").to_string();

        let header = FieldValues::new()
            .with("sender_ipi", self.config.header_ipi())
            .with("sender_name", self.config.sender_name.as_str())
            .with("creation_date", date.as_str())
            .with("creation_time", now.format("%H%M%S").to_string())
            .with("transmission_date", date.as_str());
        file.lines.push(self.encoder.encode("HDR", &header)?);
        file.lines.push(self.encoder.encode("GRH", &FieldValues::new())?);

        for (ordinal, work) in works.iter().enumerate() {
            self.compose_work(ordinal, work, &mut file)?;
        }

        let t_count = format!("{:08}", file.transactions.len());

        let group_lines = file.lines.len();
        let grt = FieldValues::new()
            .with("t_count", t_count.as_str())
            .with("r_count", format!("{:08}", group_lines));
        file.lines.push(self.encoder.encode("GRT", &grt)?);

        let total_lines = file.lines.len() + 1;
        let trl = FieldValues::new()
            .with("t_count", t_count.as_str())
            .with("r_count", format!("{:08}", total_lines));
        file.lines.push(self.encoder.encode("TRL", &trl)?);

        Ok(file)
    }

    fn compose_work(&self, ordinal: usize, work: &WorkInput, file: &mut ComposedFile) -> ComposeResult<()> {
        let title = work.title.clone().unwrap_or_else(|| "UNKNOWN".to_string());
        let work_id = work
            .track_number
            .clone()
            .unwrap_or_else(|| (ordinal + 1).to_string());
        let duration = parse_duration(
            work.duration.as_deref().unwrap_or_default(),
            self.profile.duration_notation,
        );

        let first_line = file.lines.len() + 1;
        let mut tx = TransactionWriter {
            encoder: &self.encoder,
            lines: &mut file.lines,
            t_seq: format!("{:08}", ordinal),
            rec_seq: 0,
            context: format!("work '{}' (track {})", title, work_id),
        };

        tx.emit(
            "NWR",
            FieldValues::new()
                .with("title", title.as_str())
                .with("work_id", work_id.as_str())
                .with("iswc", normalize_iswc(work.iswc.as_deref()))
                .with("duration", duration.as_str()),
        )?;

        // Publisher name (upper-cased) → (chain id, publisher id, agreement)
        let mut chains: Vec<(String, String, String, String)> = Vec::new();

        for publisher in &work.publishers {
            let name = publisher.name.trim();
            let agreement = match self.config.agreements.resolve(name) {
                Some(agreement) => agreement.to_string(),
                None => match self.profile.agreement_policy {
                    AgreementPolicy::Strict => {
                        return Err(ComposeError::UnresolvedAgreement {
                            publisher: name.to_string(),
                            work: title.clone(),
                            slot: publisher.slot,
                        })
                    }
                    AgreementPolicy::Lenient => {
                        file.warnings.push(Finding::warning(
                            FindingKind::UnresolvedAgreement,
                            tx.lines.len() + 1,
                            format!("Missing agreement ID for: {} (work '{}')", name, title),
                        ));
                        String::new()
                    }
                },
            };

            let chain_id = format!("{:02}", publisher.slot);
            let pub_id = format!("{:09}", publisher.slot);
            let pr_share = format_share(publisher.share.as_deref());

            tx.emit(
                "SPU",
                FieldValues::new()
                    .with("chain_id", chain_id.as_str())
                    .with("pub_id", pub_id.as_str())
                    .with("pub_name", name)
                    .with("role", "E")
                    .with("ipi", pad_ipi(publisher.ipi.as_deref()))
                    .with("pr_soc", "021")
                    .with("mr_soc", "021")
                    .with("pr_share", pr_share.as_str())
                    .with("mr_share", FULL_SHARE)
                    .with("sr_share", FULL_SHARE)
                    .with("agreement", agreement.as_str()),
            )?;

            tx.emit(
                "SPU",
                FieldValues::new()
                    .with("chain_id", chain_id.as_str())
                    .with("pub_id", SUB_PUBLISHER_ID)
                    .with("pub_name", self.config.sender_name.as_str())
                    .with("role", "SE")
                    .with("ipi", pad_ipi(Some(&self.config.sender_ipi)))
                    .with("pr_soc", "052")
                    .with("mr_soc", "033")
                    .with("sr_soc", "033")
                    .with("pr_share", "00000")
                    .with("mr_share", "00000")
                    .with("sr_share", "00000")
                    .with("agreement", agreement.as_str()),
            )?;

            tx.emit(
                "SPT",
                FieldValues::new()
                    .with("pub_id", SUB_PUBLISHER_ID)
                    .with("pr_share", pr_share.as_str())
                    .with("mr_share", FULL_SHARE)
                    .with("sr_share", FULL_SHARE)
                    .with("territory", self.config.territory.as_str()),
            )?;

            chains.push((name.to_uppercase(), chain_id, pub_id, agreement));
        }

        for writer in &work.writers {
            let writer_id = format!("{:09}", writer.slot);
            let share = format_share(writer.share.as_deref());

            tx.emit(
                "SWR",
                FieldValues::new()
                    .with("writer_id", writer_id.as_str())
                    .with("last_name", writer.last_name.as_str())
                    .with("first_name", writer.first_name.as_deref().unwrap_or_default())
                    .with("ipi", pad_ipi(writer.ipi.as_deref()))
                    .with("pr_soc", "021")
                    .with("mr_soc", "099")
                    .with("sr_soc", "099")
                    .with("pr_share", share.as_str())
                    .with("mr_share", "00000")
                    .with("sr_share", "00000"),
            )?;

            tx.emit(
                "SWT",
                FieldValues::new()
                    .with("writer_id", writer_id.as_str())
                    .with("pr_share", share.as_str())
                    .with("mr_share", "00000")
                    .with("sr_share", "00000"),
            )?;

            let original = writer
                .original_publisher
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_uppercase();
            if let Some((name, chain_id, pub_id, agreement)) =
                chains.iter().find(|(name, ..)| !original.is_empty() && *name == original)
            {
                tx.emit(
                    "PWR",
                    FieldValues::new()
                        .with("pub_id", pub_id.as_str())
                        .with("pub_name", name.as_str())
                        .with("agreement", agreement.as_str())
                        .with("writer_id", writer_id.as_str())
                        .with("chain_id", chain_id.as_str()),
                )?;
            }
        }

        let isrc = work.isrc.as_deref().unwrap_or_default();
        let catalog = work
            .catalog
            .as_deref()
            .unwrap_or(self.config.default_catalog.as_str());
        let label = normalize_label(work.label.as_deref().unwrap_or(self.config.default_label.as_str()));

        match self.profile.recordings {
            RecordingLayout::Dual => {
                for (source, cd_id) in [("C", catalog), ("D", "")] {
                    tx.emit(
                        "REC",
                        FieldValues::new()
                            .with("cd_id", cd_id)
                            .with("isrc", isrc)
                            .with("source", source)
                            .with("label", label.as_str()),
                    )?;
                }
            }
            RecordingLayout::Single => {
                tx.emit(
                    "REC",
                    FieldValues::new()
                        .with("cd_id", catalog)
                        .with("isrc", isrc)
                        .with("source", "CD")
                        .with("label", label.as_str())
                        .with("duration", duration.as_str()),
                )?;
            }
        }

        tx.emit(
            "ORN",
            FieldValues::new()
                .with("library", label.as_str())
                .with("cd_id", catalog)
                .with("cut_number", cut_number(&work_id, ordinal + 1))
                .with("label", label.as_str()),
        )?;

        let records = tx.rec_seq;
        file.transactions.push(TransactionSummary {
            t_seq: ordinal,
            title,
            line: first_line,
            records,
        });
        Ok(())
    }
}

/// Appends the records of one transaction, numbering them as it goes.
struct TransactionWriter<'e, 'l> {
    encoder: &'e Encoder<'static>,
    lines: &'l mut Vec<String>,
    t_seq: String,
    /// Sequence of the next record; the NWR itself is record 0.
    rec_seq: usize,
    context: String,
}

impl TransactionWriter<'_, '_> {
    fn emit(&mut self, tag: &str, values: FieldValues) -> ComposeResult<()> {
        let values = values
            .with("t_seq", self.t_seq.as_str())
            .with("rec_seq", format!("{:08}", self.rec_seq));

        let line = self
            .encoder
            .encode(tag, &values)
            .map_err(|e| e.in_context(self.context.as_str()))?;

        self.lines.push(line);
        self.rec_seq += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncodeError;
    use crate::schema::CURRENT;
    use chrono::NaiveDate;
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 30)
            .unwrap()
    }

    fn config() -> BusinessConfig {
        BusinessConfig::default()
            .with_agreements(AgreementMap::new().with("LUMINA PUBLISHING UK", "4316161"))
    }

    fn scenario_row() -> Value {
        json!({
            "TRACK: Title": "Valid Title",
            "TRACK: Number": 1,
            "CODE: ISWC": "T-123.456.789-0",
            "TRACK: Duration": "3:45",
            "PUBLISHER:1: Name": "LUMINA PUBLISHING UK",
            "PUBLISHER:1: Owner Performance Share %": 100,
            "PUBLISHER:1: IPI": "12345678901",
            "WRITER:1: Last Name": "SMITH",
            "WRITER:1: Owner Performance Share %": 100,
            "WRITER:1: IPI": "12345678901",
            "WRITER:1: Original Publisher": "LUMINA PUBLISHING UK",
            "ALBUM: Code": "RC055",
            "LIBRARY: Name": "LUMINA"
        })
    }

    fn lines_with<'f>(file: &'f ComposedFile, tag: &str) -> Vec<&'f String> {
        file.lines.iter().filter(|l| l.starts_with(tag)).collect()
    }

    #[test]
    fn test_single_work_record_sequence() {
        let config = config();
        let file = Composer::new(&config, Era::Current)
            .compose_rows(&[scenario_row()], now())
            .unwrap();

        let tags: Vec<&str> = file.lines.iter().map(|l| &l[..3]).collect();
        assert_eq!(
            tags,
            vec!["HDR", "GRH", "NWR", "SPU", "SPU", "SPT", "SWR", "SWT", "PWR", "REC", "REC", "ORN", "GRT", "TRL"]
        );
        for line in &file.lines {
            let spec = CURRENT.lookup(&line[..3]).unwrap();
            assert_eq!(line.chars().count(), spec.width, "{}", &line[..3]);
        }
    }

    #[test]
    fn test_scenario_field_values() {
        let config = config();
        let file = Composer::new(&config, Era::Current)
            .compose_rows(&[scenario_row()], now())
            .unwrap();

        let nwr = lines_with(&file, "NWR")[0];
        assert_eq!(&nwr[129..135], "034500");
        assert_eq!(&nwr[95..106], "T1234567890");
        assert_eq!(nwr[19..79].trim_end(), "VALID TITLE");

        let spu = lines_with(&file, "SPU");
        assert_eq!(&spu[0][115..120], "10000");
        assert_eq!(&spu[0][131..138], "10000 N");
        assert_eq!(spu[0][150..164].trim_end(), "4316161");
        assert_eq!(spu[1][150..164].trim_end(), "4316161");
        assert_eq!(&spu[1][76..78], "SE");

        let swr = lines_with(&file, "SWR")[0];
        assert_eq!(&swr[129..134], "10000");

        let pwr = lines_with(&file, "PWR")[0];
        assert!(pwr.contains("4316161"));
        assert_eq!(&pwr[110..112], "01");

        let rec = lines_with(&file, "REC");
        assert_eq!(&rec[0][262..263], "C");
        assert_eq!(rec[0][218..232].trim_end(), "RC055");
        assert_eq!(&rec[1][262..263], "D");
        assert_eq!(rec[1][218..232].trim_end(), "");
    }

    #[test]
    fn test_header_stamp() {
        let config = config();
        let file = Composer::new(&config, Era::Current)
            .compose_rows(&[scenario_row()], now())
            .unwrap();
        let hdr = &file.lines[0];
        assert_eq!(&hdr[5..14], "254514077");
        assert_eq!(&hdr[66..74], "20260309");
        assert_eq!(&hdr[74..80], "140530");
        assert_eq!(&hdr[103..108], "2.200");
    }

    #[test]
    fn test_sequence_numbers() {
        let config = config();
        let rows = vec![scenario_row(), scenario_row()];
        let file = Composer::new(&config, Era::Current).compose_rows(&rows, now()).unwrap();

        let nwr = lines_with(&file, "NWR");
        assert_eq!(&nwr[0][3..11], "00000000");
        assert_eq!(&nwr[1][3..11], "00000001");
        assert_eq!(&nwr[1][11..19], "00000000");

        // rec_seq restarts at 1 on the first record after each NWR
        let spu = lines_with(&file, "SPU");
        assert_eq!(&spu[0][11..19], "00000001");
        assert_eq!(&spu[2][3..11], "00000001");
        assert_eq!(&spu[2][11..19], "00000001");

        let orn = lines_with(&file, "ORN");
        assert_eq!(&orn[0][11..19], "00000009");
        assert_eq!(file.transactions[1].line, 13);
        assert_eq!(file.transactions[1].records, 10);
    }

    #[test]
    fn test_trailer_counts() {
        let config = config();
        let rows = vec![scenario_row(), scenario_row(), scenario_row()];
        let file = Composer::new(&config, Era::Current).compose_rows(&rows, now()).unwrap();

        let total = file.line_count();
        let grt = &file.lines[total - 2];
        let trl = &file.lines[total - 1];

        assert_eq!(&grt[8..16], "00000003");
        assert_eq!(grt[16..24].parse::<usize>().unwrap(), total - 2);
        assert_eq!(&trl[8..16], "00000003");
        assert_eq!(trl[16..24].parse::<usize>().unwrap(), total);
        assert_eq!(file.transaction_count(), 3);
    }

    #[test]
    fn test_crlf_output() {
        let config = config();
        let file = Composer::new(&config, Era::Current)
            .compose_rows(&[scenario_row()], now())
            .unwrap();
        let text = file.to_text();
        assert!(text.ends_with("\r\n"));
        assert_eq!(text.matches("\r\n").count(), file.line_count());
        assert!(!text.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_unresolved_agreement_halts_by_default() {
        let config = BusinessConfig::default();
        let err = Composer::new(&config, Era::Current)
            .compose_rows(&[scenario_row()], now())
            .unwrap_err();
        match err {
            ComposeError::UnresolvedAgreement { publisher, work, slot } => {
                assert_eq!(publisher, "LUMINA PUBLISHING UK");
                assert_eq!(work, "Valid Title");
                assert_eq!(slot, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_lenient_policy_warns_and_continues() {
        let config = BusinessConfig::default();
        let file = Composer::new(&config, Era::Current)
            .with_agreement_policy(AgreementPolicy::Lenient)
            .compose_rows(&[scenario_row()], now())
            .unwrap();

        assert_eq!(file.warnings.len(), 1);
        assert_eq!(file.warnings[0].kind, FindingKind::UnresolvedAgreement);
        assert_eq!(file.warnings[0].line, 4);
        let spu = lines_with(&file, "SPU");
        assert_eq!(spu[0][150..164].trim(), "");
    }

    #[test]
    fn test_overflow_carries_work_context() {
        let config = config();
        let mut row = scenario_row();
        row["TRACK: Title"] = json!("X".repeat(61));
        let err = Composer::new(&config, Era::Current)
            .compose_rows(&[row], now())
            .unwrap_err();

        match err {
            ComposeError::Encode(EncodeError::FieldOverflow { record, field, context, .. }) => {
                assert_eq!(record, "NWR");
                assert_eq!(field, "title");
                assert!(context.unwrap().contains("track 1"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_writer_without_matching_publisher_has_no_link() {
        let config = config();
        let mut row = scenario_row();
        row["WRITER:1: Original Publisher"] = json!("SOMEONE ELSE");
        let file = Composer::new(&config, Era::Current).compose_rows(&[row], now()).unwrap();
        assert!(lines_with(&file, "PWR").is_empty());
    }

    #[test]
    fn test_defaults_for_missing_values() {
        let config = config();
        let file = Composer::new(&config, Era::Current)
            .compose(&[WorkInput::default()], now())
            .unwrap();

        let nwr = lines_with(&file, "NWR")[0];
        assert_eq!(nwr[19..79].trim_end(), "UNKNOWN");
        assert_eq!(nwr[81..95].trim_end(), "1");
        assert_eq!(&nwr[129..135], "000000");

        let orn = lines_with(&file, "ORN")[0];
        assert_eq!(orn[22..82].trim_end(), "RED COLA");
        assert_eq!(orn[82..96].trim_end(), "RC055");
        assert_eq!(&orn[96..100], "0001");
    }

    #[test]
    fn test_label_spelling_corrected() {
        let config = config();
        let mut row = scenario_row();
        row["LIBRARY: Name"] = json!("RedCola");
        let file = Composer::new(&config, Era::Current).compose_rows(&[row], now()).unwrap();
        let rec = lines_with(&file, "REC")[0];
        assert_eq!(rec[445..505].trim_end(), "RED COLA");
    }

    #[test]
    fn test_legacy_era_single_recording() {
        let config = config();
        let file = Composer::new(&config, Era::Legacy)
            .compose_rows(&[scenario_row()], now())
            .unwrap();

        let rec = lines_with(&file, "REC");
        assert_eq!(rec.len(), 1);
        assert_eq!(&rec[0][194..196], "CD");
        assert_eq!(&rec[0][74..80], "000345");

        let spu = lines_with(&file, "SPU")[0];
        assert_eq!(spu[145..159].trim_end(), "4316161");
        assert_eq!(spu[165..179].trim_end(), "4316161");
        assert!(file.lines.iter().all(|l| !l.ends_with(' ')));
    }

    #[test]
    fn test_legacy_era_is_lenient_by_default() {
        let config = BusinessConfig::default();
        let file = Composer::new(&config, Era::Legacy)
            .compose_rows(&[scenario_row()], now())
            .unwrap();
        assert_eq!(file.warnings.len(), 1);
    }

    #[test]
    fn test_empty_input_yields_envelope() {
        let config = config();
        let file = Composer::new(&config, Era::Current).compose(&[], now()).unwrap();

        let tags: Vec<&str> = file.lines.iter().map(|l| &l[..3]).collect();
        assert_eq!(tags, vec!["HDR", "GRH", "GRT", "TRL"]);
        assert_eq!(file.transaction_count(), 0);
        assert!(file.transactions.is_empty());
        assert_eq!(&file.lines[2][8..16], "00000000");
    }

    #[test]
    fn test_duration_beyond_field_range() {
        let config = config();
        let mut row = scenario_row();
        row["TRACK: Duration"] = json!("125:30");
        let file = Composer::new(&config, Era::Current).compose_rows(&[row], now()).unwrap();

        let nwr = lines_with(&file, "NWR")[0];
        assert_eq!(&nwr[129..135], "000000");
        assert_eq!(nwr.chars().count(), CURRENT.lookup("NWR").unwrap().width);
    }
}
