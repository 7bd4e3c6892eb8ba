// 📊 Aggregator - Per-category totals for reporting
// One row per category present in the input, largest |net| first

use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,

    /// Sum of |amount| over debits
    pub debits: f64,

    /// Sum of amounts over credits
    pub credits: f64,

    /// Net signed total
    pub total: f64,

    pub count: usize,

    /// |total| as a percentage of the sum of |total| over all rows
    pub share: f64,
}

impl CategorySummary {
    fn empty(category: &str) -> Self {
        CategorySummary {
            category: category.to_string(),
            debits: 0.0,
            credits: 0.0,
            total: 0.0,
            count: 0,
            share: 0.0,
        }
    }

    fn add(&mut self, tx: &Transaction) {
        if tx.is_debit() {
            self.debits += tx.amount().abs();
        } else {
            self.credits += tx.amount();
        }
        self.total += tx.amount();
        self.count += 1;
    }
}

/// Group by assigned category and order by descending |total|.
///
/// Ties keep the order in which categories first appear in the input.
pub fn totals_by_category(transactions: &[Transaction]) -> Vec<CategorySummary> {
    let mut rows: Vec<CategorySummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for tx in transactions {
        let slot = *index.entry(tx.category()).or_insert_with(|| {
            rows.push(CategorySummary::empty(tx.category()));
            rows.len() - 1
        });
        rows[slot].add(tx);
    }

    let magnitude: f64 = rows.iter().map(|r| r.total.abs()).sum();
    if magnitude > 0.0 {
        for row in &mut rows {
            row.share = row.total.abs() / magnitude * 100.0;
        }
    }

    rows.sort_by(|a, b| b.total.abs().total_cmp(&a.total.abs()));
    rows
}

/// Overall figures for a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub credits: f64,
    pub debits: f64,
    pub net: f64,
    pub count: usize,
}

pub fn totals(transactions: &[Transaction]) -> Totals {
    transactions.iter().fold(Totals::default(), |mut acc, tx| {
        if tx.is_debit() {
            acc.debits += tx.amount().abs();
        } else {
            acc.credits += tx.amount();
        }
        acc.net += tx.amount();
        acc.count += 1;
        acc
    })
}

/// Distinct assigned categories, sorted.
pub fn available_categories(transactions: &[Transaction]) -> Vec<String> {
    transactions
        .iter()
        .map(|tx| tx.category().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn tx(amount: f64, category: &str) -> Transaction {
        Transaction::new(
            "01/08/2025".to_string(),
            "X".to_string(),
            amount,
            None,
            category.to_string(),
            "Outra".to_string(),
        )
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx(-10.0, "food"),
            tx(-50.0, "fuel"),
            tx(1500.0, "salary"),
            tx(-32.4, "food"),
            tx(5.0, "food"),
            tx(-45.0, "fuel"),
            tx(-0.6, "other"),
        ]
    }

    #[test]
    fn test_row_values() {
        let rows = totals_by_category(&sample());
        let food = rows.iter().find(|r| r.category == "food").unwrap();

        assert!((food.debits - 42.4).abs() < EPS);
        assert!((food.credits - 5.0).abs() < EPS);
        assert!((food.total - -37.4).abs() < EPS);
        assert_eq!(food.count, 3);
    }

    #[test]
    fn test_sorted_by_absolute_total_desc() {
        let rows = totals_by_category(&sample());
        let order: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();

        assert_eq!(order, vec!["salary", "fuel", "food", "other"]);
    }

    #[test]
    fn test_ties_keep_first_appearance() {
        let txs = vec![tx(-10.0, "b"), tx(10.0, "a"), tx(-10.0, "c")];
        let order: Vec<String> = totals_by_category(&txs)
            .into_iter()
            .map(|r| r.category)
            .collect();

        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_net_totals_sum_to_input() {
        let txs = sample();
        let rows = totals_by_category(&txs);

        let rows_sum: f64 = rows.iter().map(|r| r.total).sum();
        let input_sum: f64 = txs.iter().map(|t| t.amount()).sum();

        assert!((rows_sum - input_sum).abs() < EPS);
        assert_eq!(rows.iter().map(|r| r.count).sum::<usize>(), txs.len());
    }

    #[test]
    fn test_one_row_per_category() {
        let txs = sample();
        let rows = totals_by_category(&txs);

        let categories: BTreeSet<&str> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories.len(), rows.len());
        assert_eq!(
            categories,
            txs.iter().map(|t| t.category()).collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn test_shares_sum_to_hundred() {
        let rows = totals_by_category(&sample());
        let total: f64 = rows.iter().map(|r| r.share).sum();

        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_net_has_zero_share() {
        let rows = totals_by_category(&[tx(-5.0, "a"), tx(5.0, "a")]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total, 0.0);
        assert_eq!(rows[0].share, 0.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(totals_by_category(&[]).is_empty());
        assert_eq!(totals(&[]), Totals::default());
        assert!(available_categories(&[]).is_empty());
    }

    #[test]
    fn test_totals() {
        let t = totals(&sample());

        assert!((t.credits - 1505.0).abs() < EPS);
        assert!((t.debits - 138.0).abs() < EPS);
        assert!((t.net - 1367.0).abs() < EPS);
        assert_eq!(t.count, 7);
    }

    #[test]
    fn test_available_categories_sorted_distinct() {
        assert_eq!(
            available_categories(&sample()),
            vec!["food", "fuel", "other", "salary"]
        );
    }
}
