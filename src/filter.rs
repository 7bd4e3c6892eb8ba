// 🔍 Filter Engine - Conjunctive predicates over a transaction collection
// Every supplied field must hold; absent fields impose no constraint

use crate::transaction::{Transaction, TransactionType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TYPE FILTER
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Credit,
    Debit,
}

impl TypeFilter {
    pub fn accepts(&self, kind: TransactionType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Credit => kind == TransactionType::Credit,
            TypeFilter::Debit => kind == TransactionType::Debit,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Ok(TypeFilter::All),
            "credit" => Ok(TypeFilter::Credit),
            "debit" => Ok(TypeFilter::Debit),
            other => Err(format!(
                "unknown transaction type {:?} (expected all, credit or debit)",
                other
            )),
        }
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeFilter::All => "all",
            TypeFilter::Credit => "credit",
            TypeFilter::Debit => "debit",
        })
    }
}

// ============================================================================
// FILTER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Inclusive lower bound
    pub date_from: Option<NaiveDate>,

    /// Inclusive upper bound, the whole day counts
    pub date_to: Option<NaiveDate>,

    /// Accepted categories; empty means any
    pub categories: BTreeSet<String>,

    pub kind: TypeFilter,

    /// Inclusive bounds on the signed amount
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,

    /// Case-insensitive substring of the description
    pub search: Option<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.categories.insert(category.to_string());
        self
    }

    pub fn with_kind(mut self, kind: TypeFilter) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_amount_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn with_search(mut self, text: &str) -> Self {
        self.search = Some(text.to_string());
        self
    }

    /// True when no field constrains anything.
    pub fn is_empty(&self) -> bool {
        self.date_from.is_none()
            && self.date_to.is_none()
            && self.categories.is_empty()
            && self.kind == TypeFilter::All
            && self.min_amount.is_none()
            && self.max_amount.is_none()
            && self.search_text().is_none()
    }

    fn search_text(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.matches_with(tx, self.search_text().as_deref())
    }

    fn matches_with(&self, tx: &Transaction, search: Option<&str>) -> bool {
        if self.date_from.is_some() || self.date_to.is_some() {
            // Undated rows cannot satisfy a date bound
            let Some(date) = tx.parsed_date() else {
                return false;
            };
            if self.date_from.is_some_and(|from| date < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| date > to) {
                return false;
            }
        }

        if !self.categories.is_empty() && !self.categories.contains(tx.category()) {
            return false;
        }

        if !self.kind.accepts(tx.kind()) {
            return false;
        }

        if self.min_amount.is_some_and(|min| tx.amount() < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| tx.amount() > max) {
            return false;
        }

        if let Some(needle) = search {
            if !tx.description().to_uppercase().contains(needle) {
                return false;
            }
        }

        true
    }

    /// Matching transactions in their original relative order.
    pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        let search = self.search_text();
        transactions
            .iter()
            .filter(|tx| self.matches_with(tx, search.as_deref()))
            .cloned()
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
