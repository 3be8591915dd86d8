//! Row mapper - parsed CSV rows to candidate transactions

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{BankTemplate, DecimalMark, ImportedTransaction, KindColumn, TransactionKind};
use crate::services::csv_parser::{CsvRow, ParsedCsv};
use crate::templates::generic_template;

const DATE_HEADERS: &[&str] = &["data", "date"];
const DESCRIPTION_HEADERS: &[&str] = &[
    "descrição",
    "descricao",
    "description",
    "histórico",
    "historico",
    "lançamento",
    "lancamento",
    "title",
];
const AMOUNT_HEADERS: &[&str] = &["valor", "amount"];
const EXTERNAL_ID_HEADERS: &[&str] = &["identificador", "id"];

/// A row that never became a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct MappingOutcome {
    pub transactions: Vec<ImportedTransaction>,
    pub skipped: Vec<SkippedRow>,
}

/// Header names resolved against the parsed file
#[derive(Debug)]
struct ResolvedColumns {
    date: String,
    description: String,
    amount: String,
    external_id: Option<String>,
    kind: Option<KindColumn>,
}

/// Map parsed rows to candidates owned by `account_id`
///
/// The template's own columns are used when the header carries them;
/// otherwise columns are detected by name.
pub fn map_rows(parsed: &ParsedCsv, template: &BankTemplate, account_id: Uuid) -> MappingOutcome {
    let Some(columns) = resolve_columns(parsed, template) else {
        return MappingOutcome {
            transactions: Vec::new(),
            skipped: parsed
                .rows
                .iter()
                .map(|row| SkippedRow {
                    line: row.line,
                    reason: "colunas de data, descrição e valor não identificadas".to_string(),
                })
                .collect(),
        };
    };

    let date_formats: Vec<&str> = template
        .date_formats
        .iter()
        .chain(generic_template().date_formats)
        .copied()
        .collect();

    let mut outcome = MappingOutcome::default();
    for row in &parsed.rows {
        match map_row(
            row,
            &columns,
            &date_formats,
            parsed.profile.decimal_mark,
            template.invert_sign,
            account_id,
        ) {
            Ok(tx) => outcome.transactions.push(tx),
            Err(reason) => outcome.skipped.push(SkippedRow {
                line: row.line,
                reason,
            }),
        }
    }
    outcome
}

fn map_row(
    row: &CsvRow,
    columns: &ResolvedColumns,
    date_formats: &[&str],
    decimal_mark: DecimalMark,
    invert_sign: bool,
    account_id: Uuid,
) -> std::result::Result<ImportedTransaction, String> {
    let raw_date = row.get(&columns.date).unwrap_or_default();
    let date = parse_date(raw_date, date_formats)
        .ok_or_else(|| format!("data inválida: '{raw_date}'"))?;

    let raw_amount = row.get(&columns.amount).unwrap_or_default();
    let mut amount = parse_amount(raw_amount, decimal_mark)
        .ok_or_else(|| format!("valor inválido: '{raw_amount}'"))?;
    if invert_sign {
        amount = -amount;
    }

    let kind = match &columns.kind {
        Some(kind_column) => {
            let marker = row.get(kind_column.column).unwrap_or_default().to_lowercase();
            if kind_column
                .credit_markers
                .iter()
                .any(|m| m.to_lowercase() == marker)
            {
                TransactionKind::Receita
            } else {
                TransactionKind::Despesa
            }
        }
        None if amount < Decimal::ZERO => TransactionKind::Despesa,
        None => TransactionKind::Receita,
    };

    let description = row.get(&columns.description).unwrap_or_default();
    let mut tx = ImportedTransaction::new(date, amount.abs(), description, account_id, kind);

    if let Some(external_id) = columns
        .external_id
        .as_deref()
        .and_then(|column| row.get(column))
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        tx = tx.with_external_id(external_id);
    }

    Ok(tx)
}

fn resolve_columns(parsed: &ParsedCsv, template: &BankTemplate) -> Option<ResolvedColumns> {
    if let Some(mapping) = &template.columns {
        if mapping.required_columns().iter().all(|c| parsed.has_column(c)) {
            return Some(ResolvedColumns {
                date: mapping.date.to_string(),
                description: mapping.description.to_string(),
                amount: mapping.amount.to_string(),
                external_id: mapping
                    .external_id
                    .filter(|c| parsed.has_column(c))
                    .map(str::to_string),
                kind: mapping.kind,
            });
        }
    }

    Some(ResolvedColumns {
        date: find_header(&parsed.headers, DATE_HEADERS)?,
        description: find_header(&parsed.headers, DESCRIPTION_HEADERS)?,
        amount: find_header(&parsed.headers, AMOUNT_HEADERS)?,
        external_id: find_header(&parsed.headers, EXTERNAL_ID_HEADERS),
        kind: None,
    })
}

/// Exact (case-insensitive) match first, then a whole-word prefix match
///
/// `Valor (R$)` matches `valor`, while `Idade` does not match `id`.
fn find_header(headers: &[String], candidates: &[&str]) -> Option<String> {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let exact = candidates
        .iter()
        .find_map(|c| lowered.iter().position(|h| h == c));
    let prefix = || {
        candidates
            .iter()
            .find_map(|c| lowered.iter().position(|h| starts_with_word(h, c)))
    };
    exact.or_else(prefix).map(|idx| headers[idx].clone())
}

fn starts_with_word(header: &str, word: &str) -> bool {
    header
        .strip_prefix(word)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|next| !next.is_alphanumeric())
}

fn parse_date(s: &str, formats: &[&str]) -> Option<NaiveDate> {
    let s = s.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse an amount honoring the decimal mark
///
/// Accepts currency symbols, `(10,00)` and trailing-minus `10,00-` negatives.
/// A final separator followed by one or two digits is always the decimal
/// point, so `-7.90` reads as cents even under a comma convention.
pub fn parse_amount(s: &str, decimal_mark: DecimalMark) -> Option<Decimal> {
    let s = s.trim();

    let (parenthesized, s) = match s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };

    let mut cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if let Some(rest) = cleaned.strip_suffix('-') {
        cleaned = format!("-{rest}");
    }

    let is_separator = |c: char| c == '.' || c == ',';
    let mark = match decimal_mark {
        DecimalMark::Comma => ',',
        DecimalMark::Dot => '.',
    };
    let decimal_idx = match cleaned.rfind(is_separator) {
        Some(idx) if (1..=2).contains(&(cleaned.len() - idx - 1)) => Some(idx),
        _ => cleaned.rfind(mark),
    };

    let normalized: String = cleaned
        .char_indices()
        .filter_map(|(idx, c)| match c {
            _ if Some(idx) == decimal_idx => Some('.'),
            '.' | ',' => None,
            c => Some(c),
        })
        .collect();

    let amount: Decimal = normalized.parse().ok()?;
    if parenthesized && amount > Decimal::ZERO {
        Some(-amount)
    } else {
        Some(amount)
    }
}
