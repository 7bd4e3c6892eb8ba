// 🏗️ Row Normalizer - Statement rows → classified transactions
// Locale-aware number/date parsing plus CSV statement reading

use crate::classifier::{Classification, Classifier};
use crate::error::RowError;
use crate::transaction::Transaction;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// CORE TYPES
// ============================================================================

/// RawRow - one statement line before normalization
///
/// All fields are text exactly as exported by the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub date: String,        // day/month/year, "/" or "-"
    pub description: String, // free text
    pub amount: String,      // "-45,50" (comma decimal, signed)
    pub balance: String,     // "1.234,56"

    /// Line in the source file, when the row came from one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
}

impl RawRow {
    pub fn new(date: &str, description: &str, amount: &str, balance: &str) -> Self {
        RawRow {
            date: date.to_string(),
            description: description.to_string(),
            amount: amount.to_string(),
            balance: balance.to_string(),
            line: None,
        }
    }

    /// Builder pattern: record the source line
    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }
}

/// Header names of the four columns in a statement export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub date: String,
    pub description: String,
    pub amount: String,
    pub balance: String,
}

impl Default for Columns {
    fn default() -> Self {
        Columns {
            date: "Data Movimento".to_string(),
            description: "Descrição".to_string(),
            amount: "Montante".to_string(),
            balance: "Saldo".to_string(),
        }
    }
}

// ============================================================================
// FIELD PARSING
// ============================================================================

/// Parse a signed amount with comma as decimal separator.
///
/// When a comma is present, dots are thousands separators. Whitespace
/// (including non-breaking spaces) is ignored.
pub fn parse_amount(text: &str) -> Result<f64, RowError> {
    parse_decimal("amount", text)
}

pub fn parse_balance(text: &str) -> Result<f64, RowError> {
    parse_decimal("balance", text)
}

fn parse_decimal(field: &'static str, text: &str) -> Result<f64, RowError> {
    let invalid = || RowError::InvalidNumber {
        field,
        value: text.to_string(),
    };

    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = if compact.contains(',') {
        compact.replace('.', "").replace(',', ".")
    } else {
        compact
    };

    // Digits with at most one decimal point; rejects "NaN", "inf", "1e5"
    let body = normalized
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(&normalized);
    let well_formed = body.chars().any(|c| c.is_ascii_digit())
        && body.chars().all(|c| c.is_ascii_digit() || c == '.')
        && body.matches('.').count() <= 1;

    if !well_formed {
        return Err(invalid());
    }

    // Digit runs beyond the f64 range parse to infinity
    let value = normalized.parse::<f64>().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }

    Ok(value)
}

/// Parse a statement date.
///
/// Accepts day/month/year with `/` or `-` separators (two-digit years are
/// taken as 20xx) and falls back to ISO `YYYY-MM-DD`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.trim().split(|c: char| c == '/' || c == '-').collect();
    if parts.len() != 3 {
        return None;
    }

    let numbers: Vec<u32> = parts
        .iter()
        .map(|p| p.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;

    let (year, month, day) = if parts[0].trim().len() == 4 {
        (numbers[0], numbers[1], numbers[2])
    } else {
        let year = if parts[2].trim().len() <= 2 {
            2000 + numbers[2]
        } else {
            numbers[2]
        };
        (year, numbers[1], numbers[0])
    };

    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Turn one raw row into a classified transaction.
///
/// An unparseable amount rejects the row. An unparseable balance only
/// drops the balance, since it is informational.
pub fn normalize(row: &RawRow, classifier: &Classifier) -> Result<Transaction, RowError> {
    let description = row.description.trim().to_uppercase();
    let amount = parse_amount(&row.amount)?;

    let balance = if row.balance.trim().is_empty() {
        None
    } else {
        match parse_balance(&row.balance) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(line = ?row.line, %err, "Ignoring unparseable balance");
                None
            }
        }
    };

    let Classification { category, entity } = classifier.classify(&description);

    Ok(Transaction::new(
        row.date.trim().to_string(),
        description,
        amount,
        balance,
        category,
        entity,
    ))
}

/// Row left out of a batch, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// 1-based position in the batch
    pub index: usize,
    pub line: Option<u64>,
    pub error: RowError,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRow>,
}

impl IngestReport {
    pub fn accepted_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Normalize a whole batch. Bad rows are reported, never abort the batch.
pub fn ingest<I>(rows: I, classifier: &Classifier) -> IngestReport
where
    I: IntoIterator<Item = RawRow>,
{
    let mut report = IngestReport::default();

    for (position, row) in rows.into_iter().enumerate() {
        match normalize(&row, classifier) {
            Ok(tx) => report.transactions.push(tx),
            Err(error) => {
                warn!(row = position + 1, line = ?row.line, %error, "Rejecting statement row");
                report.rejected.push(RejectedRow {
                    index: position + 1,
                    line: row.line,
                    error,
                });
            }
        }
    }

    info!(
        accepted = report.accepted_count(),
        rejected = report.rejected_count(),
        "Normalized statement batch"
    );

    report
}

// ============================================================================
// CSV STATEMENTS
// ============================================================================

/// Reads bank CSV exports with a header row.
///
/// The delimiter (`,`, `;` or tab) is detected from the header line.
#[derive(Debug, Clone, Default)]
pub struct StatementReader {
    columns: Columns,
}

impl StatementReader {
    pub fn new(columns: Columns) -> Self {
        StatementReader { columns }
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn read_path(&self, path: &Path) -> Result<Vec<RawRow>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        self.read(file)
            .with_context(|| format!("Failed to read statement {}", path.display()))
    }

    pub fn read<R: Read>(&self, mut reader: R) -> Result<Vec<RawRow>> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .context("Statement is not valid UTF-8 text")?;

        let content = content.trim_start_matches('\u{feff}');
        let delimiter = detect_delimiter(content);
        debug!(delimiter = %char::from(delimiter), "Reading CSV statement");

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let headers = csv_reader
            .headers()
            .context("Failed to read CSV header row")?
            .clone();

        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
                .ok_or_else(|| anyhow::anyhow!("Missing column {:?} in CSV header", name))
        };

        let date_idx = find(&self.columns.date)?;
        let description_idx = find(&self.columns.description)?;
        let amount_idx = find(&self.columns.amount)?;
        let balance_idx = find(&self.columns.balance)?;

        let mut rows = Vec::new();
        for (record_num, result) in csv_reader.records().enumerate() {
            let record = result
                .with_context(|| format!("Failed to parse CSV record {}", record_num + 1))?;

            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let field = |idx: usize| record.get(idx).unwrap_or("").to_string();
            // +2 because: 1-indexed + header row
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(record_num as u64 + 2);

            rows.push(RawRow {
                date: field(date_idx),
                description: field(description_idx),
                amount: field(amount_idx),
                balance: field(balance_idx),
                line: Some(line),
            });
        }

        Ok(rows)
    }
}

fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or("");

    [b';', b'\t', b',']
        .into_iter()
        .map(|d| (d, header.matches(d as char).count()))
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count > 0)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

// ============================================================================
// TESTS
// ============================================================================
