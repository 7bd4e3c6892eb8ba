// 🧭 State - Explicit state container + the ledger session built on it
// Collection is replaced wholesale by ingestion and emptied only by clear

use crate::aggregate::{self, CategorySummary, Totals};
use crate::classifier::Classifier;
use crate::db::{KeyValueStore, TransactionRepository};
use crate::filter::Filter;
use crate::parser::{self, RawRow, RejectedRow};
use crate::transaction::Transaction;
use tracing::info;

// ============================================================================
// STATE STORE
// ============================================================================

type Listener<T> = Box<dyn Fn(&T) + Send>;

/// Holds one value and notifies listeners, synchronously, after every
/// `replace`.
pub struct StateStore<T> {
    value: T,
    listeners: Vec<Listener<T>>,
}

impl<T> StateStore<T> {
    pub fn new(value: T) -> Self {
        StateStore {
            value,
            listeners: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn replace(&mut self, value: T) {
        self.value = value;
        for listener in &self.listeners {
            listener(&self.value);
        }
    }

    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&T) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }
}

impl<T: Default> Default for StateStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Result of one ingestion batch.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub accepted: usize,
    pub rejected: Vec<RejectedRow>,
    /// Whether the new collection reached the store
    pub saved: bool,
}

/// Classified collection, its persistence and the active filter.
pub struct Ledger<S: KeyValueStore> {
    classifier: Classifier,
    repository: TransactionRepository<S>,
    transactions: StateStore<Vec<Transaction>>,
    filter: Filter,
}

impl<S: KeyValueStore> Ledger<S> {
    /// Start a session with whatever the store already holds.
    pub fn open(store: S, classifier: Classifier) -> Self {
        let repository = TransactionRepository::new(store);
        let transactions = repository.load();
        info!(count = transactions.len(), "Opened ledger");

        Ledger {
            classifier,
            repository,
            transactions: StateStore::new(transactions),
            filter: Filter::default(),
        }
    }

    /// Classify a batch, replace the collection with it and persist it.
    pub fn ingest<I>(&mut self, rows: I) -> IngestOutcome
    where
        I: IntoIterator<Item = RawRow>,
    {
        let report = parser::ingest(rows, &self.classifier);
        let accepted = report.transactions.len();

        let saved = self.repository.save(&report.transactions);
        self.transactions.replace(report.transactions);

        info!(accepted, rejected = report.rejected.len(), saved, "Ingested statement");

        IngestOutcome {
            accepted,
            rejected: report.rejected,
            saved,
        }
    }

    /// Drop every transaction, persist the empty collection, reset filters.
    pub fn clear(&mut self) -> bool {
        let saved = self.repository.save(&[]);
        self.transactions.replace(Vec::new());
        self.clear_filter();

        info!(saved, "Cleared ledger");
        saved
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn clear_filter(&mut self) {
        self.filter = Filter::default();
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.transactions.get()
    }

    /// Transactions passing the active filter.
    pub fn filtered(&self) -> Vec<Transaction> {
        self.filter.apply(self.transactions())
    }

    /// Category summaries of the filtered transactions.
    pub fn summaries(&self) -> Vec<CategorySummary> {
        aggregate::totals_by_category(&self.filtered())
    }

    pub fn totals(&self) -> Totals {
        aggregate::totals(&self.filtered())
    }

    /// Categories present in the whole collection, ignoring the filter.
    pub fn available_categories(&self) -> Vec<String> {
        aggregate::available_categories(self.transactions())
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&Vec<Transaction>) + Send + 'static,
    {
        self.transactions.on_change(listener);
    }
}

// ============================================================================
// TESTS
// ============================================================================
