// Finta - Core Library
// Statement normalization, classification, filtering and per-category totals

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod parser;
pub mod rules;
pub mod state;
pub mod transaction;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use aggregate::{available_categories, totals, totals_by_category, CategorySummary, Totals};
pub use classifier::{Classification, Classifier};
pub use config::Settings;
pub use db::{
    setup_database, KeyValueStore, MemoryStore, SqliteStore, TransactionRepository, STORAGE_KEY,
};
pub use error::{RecordError, RowError, RuleError};
pub use filter::{Filter, TypeFilter};
pub use parser::{
    ingest, normalize, parse_amount, parse_balance, parse_date, Columns, IngestReport, RawRow,
    RejectedRow, StatementReader,
};
pub use rules::{PatternTable, Rule, RulesConfig, TableConfig};
pub use state::{IngestOutcome, Ledger, StateStore};
pub use transaction::{Transaction, TransactionType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
