//! Bank template entity - how one bank lays out its CSV export

use serde::Serialize;

/// Character encoding of a CSV export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    #[serde(rename = "UTF-8")]
    Utf8,
    #[serde(rename = "ISO-8859-1")]
    Latin1,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Latin1 => "ISO-8859-1",
        }
    }
}

/// Decimal separator used in amount columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalMark {
    /// `1,234.56`
    Dot,
    /// `1.234,56`
    Comma,
}

/// Column that explicitly states whether a row is a credit or a debit
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KindColumn {
    pub column: &'static str,
    /// Values (case-insensitive) that mark incoming money
    pub credit_markers: &'static [&'static str],
}

/// Header names of the columns the row mapper reads
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnMapping {
    pub date: &'static str,
    pub description: &'static str,
    pub amount: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<KindColumn>,
}

impl ColumnMapping {
    /// Columns a header row must contain for this mapping to apply
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![self.date, self.description, self.amount];
        if let Some(kind) = &self.kind {
            columns.push(kind.column);
        }
        columns
    }
}

/// Static description of one bank's CSV export
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub delimiter: char,
    pub encoding: TextEncoding,
    pub decimal_mark: DecimalMark,
    /// Preamble lines before the header row
    pub skip_lines: usize,
    pub date_formats: &'static [&'static str],
    /// `None` means columns are detected from the header (generic template)
    pub columns: Option<ColumnMapping>,
    /// Purchases come as positive amounts (credit card bills)
    pub invert_sign: bool,
}

impl BankTemplate {
    pub fn is_generic(&self) -> bool {
        self.columns.is_none()
    }

    /// Validation profile: columns the parsed header must contain
    pub fn required_columns(&self) -> Vec<&'static str> {
        self.columns
            .map(|c| c.required_columns())
            .unwrap_or_default()
    }

    /// Delimiter as a single CSV byte
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b','
        }
    }
}
