//! Finta CLI - classify and summarise bank statement exports
//!
//! Usage:
//!   finta import --file extrato.csv   Replace the stored collection
//!   finta list --category "..."       Show filtered transactions
//!   finta summary --from 01/08/2025   Per-category totals
//!   finta classify "PINGO DOCE"       Show how a description is labelled

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use finta::{Filter, Ledger, Settings, SqliteStore, TypeFilter};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Finta - Portuguese bank statement classifier
#[derive(Parser)]
#[command(name = "finta")]
#[command(about = "Classify bank statement rows and report per-category totals", long_about = None)]
#[command(version)]
struct Cli {
    /// Database path (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON rules file (overrides the config file)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV statement, replacing the stored transactions
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List transactions
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show totals per category
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List the categories present in the stored transactions
    Categories,

    /// Classify a single description without touching the database
    Classify { description: String },

    /// Remove every stored transaction
    Clear,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// First day to include (dd/mm/yyyy or yyyy-mm-dd)
    #[arg(long, value_parser = parse_date_arg)]
    from: Option<NaiveDate>,

    /// Last day to include (dd/mm/yyyy or yyyy-mm-dd)
    #[arg(long, value_parser = parse_date_arg)]
    to: Option<NaiveDate>,

    /// Category to include (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Transaction type: all, credit, debit
    #[arg(long = "type", default_value = "all")]
    kind: TypeFilter,

    /// Smallest signed amount
    #[arg(long, allow_hyphen_values = true, value_parser = parse_bound_arg)]
    min: Option<f64>,

    /// Largest signed amount
    #[arg(long, allow_hyphen_values = true, value_parser = parse_bound_arg)]
    max: Option<f64>,

    /// Text the description must contain
    #[arg(long)]
    search: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> Filter {
        let mut filter = Filter::new()
            .with_kind(self.kind)
            .with_amount_range(self.min, self.max);

        if let Some(from) = self.from {
            filter = filter.from_date(from);
        }
        if let Some(to) = self.to {
            filter = filter.to_date(to);
        }
        for category in &self.categories {
            filter = filter.with_category(category);
        }
        if let Some(search) = &self.search {
            filter = filter.with_search(search);
        }

        filter
    }
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    finta::parse_date(value).ok_or_else(|| format!("invalid date {:?}", value))
}

fn parse_bound_arg(value: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid amount {:?}", value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let settings = resolve_settings(&cli)?;
    debug!(db = %settings.db_path.display(), "Using database");

    match cli.command {
        Commands::Import { file } => cmd_import(&settings, &file),
        Commands::List { filter } => cmd_list(&settings, filter.into_filter()),
        Commands::Summary { filter } => cmd_summary(&settings, filter.into_filter()),
        Commands::Categories => cmd_categories(&settings),
        Commands::Classify { description } => cmd_classify(&settings, &description),
        Commands::Clear => cmd_clear(&settings),
    }
}

/// Config file first, then command-line overrides.
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;

    if let Some(db) = &cli.db {
        settings.db_path = db.clone();
    }
    if let Some(rules) = &cli.rules {
        settings.rules_path = Some(rules.clone());
    }

    Ok(settings)
}

fn open_ledger(settings: &Settings) -> Result<Ledger<SqliteStore>> {
    let classifier = settings.classifier()?;
    let store = SqliteStore::open(&settings.db_path)
        .with_context(|| format!("Cannot open ledger at {}", settings.db_path.display()))?;

    Ok(Ledger::open(store, classifier))
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_import(settings: &Settings, file: &Path) -> Result<()> {
    let rows = settings.reader().read_path(file)?;
    let mut ledger = open_ledger(settings)?;
    let outcome = ledger.ingest(rows);

    println!("📂 Imported {}", file.display());
    println!("   ✓ {} transactions classified", outcome.accepted);

    if !outcome.rejected.is_empty() {
        println!("   ⚠️  {} rows skipped:", outcome.rejected.len());
        for row in &outcome.rejected {
            match row.line {
                Some(line) => println!("      line {}: {}", line, row.error),
                None => println!("      row {}: {}", row.index, row.error),
            }
        }
    }

    if !outcome.saved {
        println!(
            "   ⚠️  Could not save to {}; data kept for this run only",
            settings.db_path.display()
        );
    }

    Ok(())
}

fn cmd_list(settings: &Settings, filter: Filter) -> Result<()> {
    let mut ledger = open_ledger(settings)?;
    if ledger.transactions().is_empty() {
        println!("No transactions found. Import some with:");
        println!("  finta import --file extrato.csv");
        return Ok(());
    }

    ledger.set_filter(filter);
    let transactions = ledger.filtered();

    println!();
    println!("📝 Transactions ({} of {})", transactions.len(), ledger.transactions().len());
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in &transactions {
        println!(
            "   {:<10}  {:>10.2}  {:<40}  {} · {}",
            tx.date(),
            tx.amount(),
            truncate(tx.description(), 40),
            tx.category(),
            tx.entity()
        );
    }

    Ok(())
}

fn cmd_summary(settings: &Settings, filter: Filter) -> Result<()> {
    let mut ledger = open_ledger(settings)?;
    ledger.set_filter(filter);

    let totals = ledger.totals();
    let rows = ledger.summaries();

    println!();
    println!("📊 Summary ({} transactions)", totals.count);
    println!("   ─────────────────────────────────────────────────────────────");

    for row in &rows {
        println!(
            "   {:<40}  {:>10.2}  {:>5.1}%  ({})",
            row.category, row.total, row.share, row.count
        );
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Credits: {:>10.2}", totals.credits);
    println!("   Debits:  {:>10.2}", totals.debits);
    println!("   Net:     {:>10.2}", totals.net);

    Ok(())
}

fn cmd_categories(settings: &Settings) -> Result<()> {
    let ledger = open_ledger(settings)?;

    for category in ledger.available_categories() {
        println!("{}", category);
    }

    Ok(())
}

fn cmd_classify(settings: &Settings, description: &str) -> Result<()> {
    let classifier = settings.classifier()?;
    let classification = classifier.classify(description);

    println!("🏷️  {}", description);
    println!("   Category: {}", classification.category);
    println!("   Entity:   {}", classification.entity);

    Ok(())
}

fn cmd_clear(settings: &Settings) -> Result<()> {
    let mut ledger = open_ledger(settings)?;
    let removed = ledger.transactions().len();

    if ledger.clear() {
        println!("🗑️  Removed {} transactions", removed);
    } else {
        println!("⚠️  Cleared for this run, but the database could not be updated");
    }

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_flags() {
        let cli = Cli::try_parse_from([
            "finta",
            "list",
            "--from",
            "01/08/2025",
            "--to",
            "2025-08-31",
            "--category",
            "food",
            "--category",
            "fuel",
            "--type",
            "debit",
            "--min",
            "-100",
            "--search",
            "lidl",
        ])
        .unwrap();

        let Commands::List { filter } = cli.command else {
            panic!("expected list");
        };
        let filter = filter.into_filter();

        assert_eq!(filter.date_from, NaiveDate::from_ymd_opt(2025, 8, 1));
        assert_eq!(filter.date_to, NaiveDate::from_ymd_opt(2025, 8, 31));
        assert_eq!(filter.categories.len(), 2);
        assert_eq!(filter.kind, TypeFilter::Debit);
        assert_eq!(filter.min_amount, Some(-100.0));
        assert_eq!(filter.search.as_deref(), Some("lidl"));
    }

    #[test]
    fn test_no_flags_is_empty_filter() {
        let cli = Cli::try_parse_from(["finta", "summary"]).unwrap();
        let Commands::Summary { filter } = cli.command else {
            panic!("expected summary");
        };

        assert!(filter.into_filter().is_empty());
    }

    #[test]
    fn test_bad_date_is_rejected() {
        assert!(Cli::try_parse_from(["finta", "list", "--from", "yesterday"]).is_err());
    }

    #[test]
    fn test_non_finite_bounds_are_rejected() {
        for value in ["NaN", "inf", "-inf", "ten"] {
            assert!(
                Cli::try_parse_from(["finta", "summary", "--min", value]).is_err(),
                "min {}",
                value
            );
            assert!(Cli::try_parse_from(["finta", "list", "--max", value]).is_err());
        }
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from(["finta", "categories", "--db", "other.db"]).unwrap();
        let settings = resolve_settings(&cli).unwrap();

        assert_eq!(settings.db_path, PathBuf::from("other.db"));
        assert!(settings.rules_path.is_none());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("PAGAMENTO SERVICOS", 10), "PAGAMENTO…");
    }
}
