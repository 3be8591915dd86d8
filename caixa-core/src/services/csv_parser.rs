//! CSV parser - turns statement bytes into header-keyed rows
//!
//! A bank template fixes delimiter, encoding and preamble length. When the
//! templated parse is structurally broken (reader error, no header, or a
//! header missing the template's required columns) the parser retries once
//! on the raw bytes with generic settings: UTF-8, no preamble, and a
//! detected delimiter.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{BankTemplate, DecimalMark, TextEncoding};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
/// Records inspected when guessing the delimiter
const DETECTION_SAMPLE: usize = 20;

/// Settings that actually produced a parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseProfile {
    pub delimiter: char,
    pub encoding: TextEncoding,
    pub decimal_mark: DecimalMark,
    pub used_fallback: bool,
}

/// One data row, values keyed by header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// Line number in the original file (1-based)
    pub line: u64,
    values: HashMap<String, String>,
}

impl CsvRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| v.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
    pub profile: ParseProfile,
}

impl ParsedCsv {
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }
}

/// Parse statement bytes, optionally with a bank template
///
/// Without a template (or with the generic one) the file is read as UTF-8
/// with a detected delimiter, comma when undecided.
pub fn parse_csv(bytes: &[u8], template: Option<&BankTemplate>) -> Result<ParsedCsv> {
    match template.filter(|t| !t.is_generic()) {
        None => {
            let text = decode(bytes, TextEncoding::Utf8).map_err(Error::parse)?;
            parse_generic(&text, TextEncoding::Utf8, DecimalMark::Dot, 0, false)
                .map_err(Error::parse)
        }
        Some(template) => parse_templated(bytes, template),
    }
}

fn parse_templated(bytes: &[u8], template: &BankTemplate) -> Result<ParsedCsv> {
    let text = decode(bytes, template.encoding).map_err(Error::parse)?;
    let (body, skipped) = drop_preamble(&text, template.skip_lines);

    let profile = ParseProfile {
        delimiter: template.delimiter,
        encoding: template.encoding,
        decimal_mark: template.decimal_mark,
        used_fallback: false,
    };

    let first_issue = match read_rows(body, template.delimiter_byte(), skipped) {
        Ok((headers, rows)) => match missing_column(&headers, &template.required_columns()) {
            None => {
                return Ok(ParsedCsv {
                    headers,
                    rows,
                    profile,
                })
            }
            Some(column) => format!("coluna obrigatória ausente: {column}"),
        },
        Err(issue) => issue,
    };

    tracing::warn!(
        template = template.id,
        issue = %first_issue,
        "templated parse failed, retrying with generic settings"
    );

    // The retry starts over from the raw bytes: no preamble is dropped and
    // UTF-8 is preferred. Bytes that are not UTF-8 keep the template's
    // encoding so a Latin-1 export with a wrong delimiter still reads.
    let (text, encoding) = match decode(bytes, TextEncoding::Utf8) {
        Ok(text) => (text, TextEncoding::Utf8),
        Err(_) => (
            decode(bytes, template.encoding).map_err(Error::parse)?,
            template.encoding,
        ),
    };
    parse_generic(&text, encoding, template.decimal_mark, 0, true).map_err(Error::parse)
}

fn parse_generic(
    text: &str,
    encoding: TextEncoding,
    decimal_mark: DecimalMark,
    line_offset: u64,
    used_fallback: bool,
) -> std::result::Result<ParsedCsv, String> {
    let delimiter = detect_delimiter(text);
    let (headers, rows) = read_rows(text, delimiter, line_offset)?;
    Ok(ParsedCsv {
        headers,
        rows,
        profile: ParseProfile {
            delimiter: delimiter as char,
            encoding,
            decimal_mark,
            used_fallback,
        },
    })
}

/// Read header and data rows; the error string is the first structural issue
fn read_rows(
    text: &str,
    delimiter: u8,
    line_offset: u64,
) -> std::result::Result<(Vec<String>, Vec<CsvRow>), String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err("cabeçalho não encontrado".to_string());
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        let line = record.position().map(|p| p.line()).unwrap_or(0) + line_offset;
        let row = CsvRow {
            line,
            values: headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect(),
        };
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok((headers, rows))
}

fn missing_column<'a>(headers: &[String], required: &[&'a str]) -> Option<&'a str> {
    required
        .iter()
        .copied()
        .find(|column| !headers.iter().any(|h| h == column))
}

/// Decode bytes; a UTF-8 BOM is always stripped
fn decode(bytes: &[u8], encoding: TextEncoding) -> std::result::Result<String, String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match encoding {
        TextEncoding::Utf8 => String::from_utf8(bytes.to_vec())
            .map_err(|_| "arquivo não está codificado em UTF-8".to_string()),
        // Every ISO-8859-1 byte is the code point of the same value
        TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Drop `skip` leading lines, returning the rest and how many were dropped
fn drop_preamble(text: &str, skip: usize) -> (&str, u64) {
    let mut rest = text;
    let mut dropped = 0;
    while dropped < skip {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => {
                rest = "";
                break;
            }
        }
        dropped += 1;
    }
    (rest, dropped as u64)
}

/// Pick the delimiter that yields a consistent multi-column layout
fn detect_delimiter(text: &str) -> u8 {
    DELIMITER_CANDIDATES
        .iter()
        .copied()
        .filter_map(|delimiter| consistent_width(text, delimiter).map(|w| (delimiter, w)))
        // max_by_key keeps the last maximum; reverse so earlier candidates win ties
        .rev()
        .max_by_key(|(_, width)| *width)
        .map(|(delimiter, _)| delimiter)
        .unwrap_or(b',')
}

fn consistent_width(text: &str, delimiter: u8) -> Option<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut width = None;
    for record in reader.records().take(DETECTION_SAMPLE) {
        let record = record.ok()?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        match width {
            None => width = Some(record.len()),
            Some(w) if w != record.len() => return None,
            Some(_) => {}
        }
    }
    width.filter(|w| *w > 1)
}
