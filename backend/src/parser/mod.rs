//! Spreadsheet export (CSV) to JSON rows, with encoding, delimiter and
//! header-row auto-detection.
//!
//! Catalogue exports often carry a few preamble lines (export date, account
//! name) above the real header. The header row is the first of the top
//! [`HEADER_SCAN_ROWS`] rows that mentions one of [`HEADER_MARKERS`]; rows
//! above it are dropped. Each data row becomes a JSON object keyed by header,
//! in column order.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Header cells that identify a track metadata export.
pub const HEADER_MARKERS: [&str; 4] = ["TRACK: TITLE", "SOURCEAUDIO ID", "TITLE", "LIBRARY: NAME"];

/// How many leading rows may hold the header.
pub const HEADER_SCAN_ROWS: usize = 20;

/// A sheet that cannot be turned into rows.
///
/// `row` is the 1-based sheet row, or 0 when the problem is not tied to one
/// (unreadable file, unknown encoding).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Row {row}: {message}")]
pub struct CsvError {
    pub row: usize,
    pub message: String,
}

impl CsvError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let row = err.position().map_or(0, |p| p.line() as usize);
        CsvError::new(row, err.to_string())
    }
}

/// A parsed sheet and what was detected on the way.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Data rows as JSON objects
    pub records: Vec<Value>,
    pub encoding: String,
    pub delimiter: char,
    /// Column headers, in sheet order
    pub headers: Vec<String>,
    /// 0-based row holding the headers, `None` if no marker was found
    /// (the first row is used then)
    pub header_row: Option<usize>,
}

/// Guess the character set of an export with chardet.
///
/// Spreadsheet exports are UTF-8 or a Western single-byte code page; the
/// single-byte guesses are folded into `windows-1252`.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            "windows-1252".to_string()
        }
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Latin-1 is decoded as Windows-1252, its superset.
pub fn decode_content(bytes: &[u8], encoding: &str) -> Result<String, CsvError> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).to_string())),
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            Ok(decoded.to_string())
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => Ok(enc.decode(bytes).0.to_string()),
            None => Err(CsvError::new(0, format!("Unsupported encoding: {}", other))),
        },
    }
}

/// Candidate separators, in tie-break order.
const SEPARATORS: [char; 4] = [';', ',', '\t', '|'];

/// Pick the separator that occurs most often on a single line among the
/// first [`HEADER_SCAN_ROWS`] lines (a preamble line may hold none).
pub fn detect_delimiter(content: &str) -> char {
    content
        .lines()
        .take(HEADER_SCAN_ROWS)
        .flat_map(|line| SEPARATORS.iter().map(move |&sep| (line.matches(sep).count(), sep)))
        .fold((0, ';'), |best, candidate| if candidate.0 > best.0 { candidate } else { best })
        .1
}

/// Read every record, ragged rows allowed, cells trimmed.
fn read_records<R: Read>(reader: R, delimiter: char) -> Result<Vec<StringRecord>, CsvError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

/// Index of the first leading row that mentions a header marker.
pub fn find_header_row(records: &[StringRecord]) -> Option<usize> {
    records.iter().take(HEADER_SCAN_ROWS).position(|record| {
        let joined = record.iter().collect::<Vec<_>>().join(" ").to_uppercase();
        HEADER_MARKERS.iter().any(|marker| joined.contains(marker))
    })
}

/// Turn the rows after `header_row` into JSON objects.
fn rows_to_json(records: &[StringRecord], header_row: usize) -> (Vec<String>, Vec<Value>) {
    let headers: Vec<String> = records[header_row].iter().map(str::to_string).collect();

    let rows = records[header_row + 1..]
        .iter()
        .map(|record| {
            let mut obj = Map::new();
            for (i, header) in headers.iter().enumerate() {
                // Keep the first of duplicated headers
                if obj.contains_key(header) {
                    continue;
                }
                let cell = record.get(i).unwrap_or("");
                obj.insert(header.clone(), Value::String(cell.to_string()));
            }
            Value::Object(obj)
        })
        .collect();

    (headers, rows)
}

/// Rows of CSV text whose first row is the header.
///
/// # Example
/// ```ignore
/// use cwrgen::csv_to_json;
///
/// let rows = csv_to_json("TRACK: Title;ISRC\nNight Drive;GBABC2600001", ';')?;
/// assert_eq!(rows[0]["ISRC"], "GBABC2600001");
/// ```
pub fn csv_to_json(csv: &str, delimiter: char) -> Result<Vec<Value>, CsvError> {
    parse_csv(csv.as_bytes(), delimiter)
}

/// Parse CSV from a reader into JSON objects; the first row is the header.
pub fn parse_csv<R: Read>(reader: R, delimiter: char) -> Result<Vec<Value>, CsvError> {
    let records = read_records(reader, delimiter)?;
    if records.is_empty() {
        return Err(CsvError::new(1, "Empty CSV file"));
    }
    Ok(rows_to_json(&records, 0).1)
}

/// Read an export from disk, detecting everything.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> Result<ParseResult, CsvError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| CsvError::new(0, format!("{} is unreadable: {}", path.display(), e)))?;
    parse_bytes_auto(&bytes)
}

/// Parse raw export bytes, detecting encoding, separator and header row.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<ParseResult, CsvError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    parse_string_with_metadata(&content, detect_delimiter(&content), encoding)
}

/// Parse CSV text with explicit delimiter, discovering the header row.
pub fn parse_string_with_metadata(
    content: &str,
    delimiter: char,
    encoding: String,
) -> Result<ParseResult, CsvError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let records = read_records(content.as_bytes(), delimiter)?;
    if records.is_empty() {
        return Err(CsvError::new(1, "Empty CSV file"));
    }

    let header_row = find_header_row(&records);
    let (headers, records) = rows_to_json(&records, header_row.unwrap_or(0));

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
        header_row,
    })
}
