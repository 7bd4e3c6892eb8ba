// 🧾 Transaction - One classified bank-statement line
// Core value type shared by the normalizer, filters, aggregator and store

use crate::error::RecordError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

/// Direction of money movement, derived from the sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in (amount >= 0)
    Credit,

    /// Money going out (amount < 0)
    Debit,
}

impl TransactionType {
    /// Zero counts as a credit.
    pub fn from_amount(amount: f64) -> Self {
        if amount >= 0.0 {
            TransactionType::Credit
        } else {
            TransactionType::Debit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// Classified statement line.
///
/// `kind` is always consistent with the sign of `amount`: it is derived by
/// `new` and re-derived when a stored record is read back. `category` and
/// `entity` are assigned once at ingestion and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord")]
pub struct Transaction {
    /// Date text exactly as found in the statement (day/month/year)
    date: String,

    /// Upper-cased description, used as classifier input
    description: String,

    /// Signed amount; the sign is authoritative
    amount: f64,

    #[serde(rename = "type")]
    kind: TransactionType,

    /// Running balance, informational only
    balance: Option<f64>,

    category: String,

    entity: String,
}

/// Persisted shape of a transaction, checked before it becomes one.
///
/// A stored `type` is ignored; the sign of `amount` decides it.
#[derive(Deserialize)]
struct TransactionRecord {
    date: String,
    description: String,
    amount: f64,
    balance: Option<f64>,
    category: String,
    entity: String,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = RecordError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        if !record.amount.is_finite() {
            return Err(RecordError::NonFinite { field: "amount" });
        }
        if record.balance.is_some_and(|b| !b.is_finite()) {
            return Err(RecordError::NonFinite { field: "balance" });
        }
        if record.category.trim().is_empty() {
            return Err(RecordError::BlankLabel("category"));
        }
        if record.entity.trim().is_empty() {
            return Err(RecordError::BlankLabel("entity"));
        }

        Ok(Transaction::new(
            record.date,
            record.description,
            record.amount,
            record.balance,
            record.category,
            record.entity,
        ))
    }
}

impl Transaction {
    pub fn new(
        date: String,
        description: String,
        amount: f64,
        balance: Option<f64>,
        category: String,
        entity: String,
    ) -> Self {
        Transaction {
            date,
            description,
            amount,
            kind: TransactionType::from_amount(amount),
            balance,
            category,
            entity,
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn balance(&self) -> Option<f64> {
        self.balance
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn is_credit(&self) -> bool {
        self.kind == TransactionType::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.kind == TransactionType::Debit
    }

    /// Calendar date of the movement, `None` when the text is not a date.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        crate::parser::parse_date(&self.date)
    }
}

// ============================================================================
// TESTS
// ============================================================================
