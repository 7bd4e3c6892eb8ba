//! Typed errors raised by the engine itself.
//!
//! File, CSV and configuration failures at the edges use `anyhow` with
//! context instead.

use thiserror::Error;

/// A statement row that could not be turned into a transaction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("invalid number in {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// A pattern table that could not be built.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("invalid pattern in {table} rule #{index} ({pattern:?}): {source}")]
    InvalidPattern {
        table: String,
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("fallback label for {0} must not be empty")]
    EmptyFallback(String),

    #[error("label for {table} rule #{index} must not be empty")]
    EmptyLabel { table: String, index: usize },
}

/// A stored transaction record that breaks the transaction invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("{0} must not be blank")]
    BlankLabel(&'static str),

    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
}
