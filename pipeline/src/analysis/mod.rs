//! Read-only reductions over a cleaned table.
//!
//! - [`value_counts`] / [`shares`] - frequency tables
//! - [`report`] - the four research questions and their narrative
//! - [`summary`] - per-column type and null counts

pub mod report;
pub mod summary;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{as_text, Dataset};

pub use report::{CauseShare, HourlyDistribution, Impact, ResearchReport, TownFindings, TownRank};
pub use summary::{render_summary, summarize_columns, ColumnKind, ColumnSummary};

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub label: String,
    pub count: usize,
}

/// A count with its percentage of some total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

/// Frequency of each non-null value of `column`, most frequent first.
/// Equal counts are ordered by label.
pub fn value_counts(dataset: &Dataset, column: &str) -> Vec<Count> {
    let mut tally: BTreeMap<String, usize> = BTreeMap::new();
    for text in dataset.column(column).filter_map(as_text) {
        *tally.entry(text).or_default() += 1;
    }
    let mut counts: Vec<Count> = tally
        .into_iter()
        .map(|(label, count)| Count { label, count })
        .collect();
    // Stable sort keeps the BTreeMap's label order among ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// `count / total * 100`, zero for an empty total.
pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Attach percentages of `total` to each count.
pub fn shares(counts: &[Count], total: usize) -> Vec<Share> {
    counts
        .iter()
        .map(|c| Share {
            label: c.label.clone(),
            count: c.count,
            percent: percent(c.count, total),
        })
        .collect()
}

/// Number of distinct non-null values of `column`.
pub fn distinct_count(dataset: &Dataset, column: &str) -> usize {
    dataset
        .column(column)
        .filter_map(as_text)
        .collect::<BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn towns(values: &[Value]) -> Dataset {
        let mut ds = Dataset::new(vec!["town".into()]);
        for v in values {
            ds.push_row(vec![v.clone()]);
        }
        ds
    }

    #[test]
    fn test_value_counts_order() {
        let ds = towns(&[
            json!("HARTFORD"),
            json!("GROTON"),
            json!("ENFIELD"),
            json!("GROTON"),
            Value::Null,
            json!("ENFIELD"),
            json!("GROTON"),
        ]);
        let counts = value_counts(&ds, "town");
        let labels: Vec<&str> = counts.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["GROTON", "ENFIELD", "HARTFORD"]);
        assert_eq!(counts[0].count, 3);
    }

    #[test]
    fn test_value_counts_ties_by_label() {
        let ds = towns(&[json!("B"), json!("A"), json!("C"), json!("A"), json!("B")]);
        let labels: Vec<String> = value_counts(&ds, "town").into_iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_shares_sum_to_hundred() {
        let ds = towns(&[json!("A"), json!("B"), json!("B")]);
        let s = shares(&value_counts(&ds, "town"), ds.len());
        let total: f64 = s.iter().map(|x| x.percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let ds = towns(&[]);
        assert!(value_counts(&ds, "town").is_empty());
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(distinct_count(&ds, "town"), 0);
        assert!(value_counts(&ds, "missing").is_empty());
    }

    #[test]
    fn test_distinct_count_mixes_numbers_and_text() {
        let ds = towns(&[json!(2020), json!("2020"), json!(2021), Value::Null]);
        assert_eq!(distinct_count(&ds, "town"), 2);
    }
}
