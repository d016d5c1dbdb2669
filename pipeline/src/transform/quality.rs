//! Quality Filter: year window, imputation, Tukey fence, quality summary.
//!
//! The three mutating steps run in a fixed order (filter, impute, fence) and
//! each one sees only the rows the previous step kept.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::config::QualityConfig;
use crate::logs::{log_info_indent, log_success, log_warning};
use crate::models::{as_f64, as_i64, cell, columns, number_value, Dataset};

// =============================================================================
// Year window
// =============================================================================

/// Keep rows whose `release_year` lies in `[start_year, end_year]`.
///
/// A null year is outside every window. Returns the number of rows removed.
pub fn filter_timeframe(dataset: &mut Dataset, start_year: i32, end_year: i32) -> usize {
    let before = dataset.len();
    let (start, end) = (start_year as i64, end_year as i64);
    dataset.retain(|record| {
        as_i64(cell(record, columns::RELEASE_YEAR))
            .map(|year| start <= year && year <= end)
            .unwrap_or(false)
    });
    let removed = before - dataset.len();
    log_success(format!(
        "Filtered to {}-{}: {} records ({} removed)",
        start_year,
        end_year,
        dataset.len(),
        removed
    ));
    removed
}

// =============================================================================
// Imputation
// =============================================================================

/// Fill categorical nulls with `fill_value`, then numeric nulls with the
/// median of the rows still present.
pub fn handle_missing_values(dataset: &mut Dataset, config: &QualityConfig) {
    for column in &config.categorical_fill {
        if !dataset.has_column(column) {
            continue;
        }
        let mut filled = 0;
        for record in &mut dataset.records {
            if cell(record, column).is_null() {
                record.insert(column.clone(), Value::String(config.fill_value.clone()));
                filled += 1;
            }
        }
        if filled > 0 {
            log_info_indent(format!("{}: {} nulls set to '{}'", column, filled, config.fill_value), 1);
        }
    }

    for column in &config.median_fill {
        if !dataset.has_column(column) {
            continue;
        }
        let values: Vec<f64> = dataset.column(column).filter_map(as_f64).collect();
        let Some(median) = quantile(&values, 0.5) else {
            continue;
        };
        let fill = number_value(median);
        let mut filled = 0;
        for record in &mut dataset.records {
            if as_f64(cell(record, column)).is_none() {
                record.insert(column.clone(), fill.clone());
                filled += 1;
            }
        }
        if filled > 0 {
            log_info_indent(format!("{}: {} nulls set to median {}", column, filled, fill), 1);
        }
    }

    log_success("Missing values handled");
}

// =============================================================================
// Outliers
// =============================================================================

/// Quantile with linear interpolation between closest ranks.
///
/// `None` for an empty slice. Non-finite values must be filtered out first.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// `[Q1 - k*IQR, Q3 + k*IQR]`, or `None` when there is nothing to fence.
pub fn tukey_fence(values: &[f64], k: f64) -> Option<(f64, f64)> {
    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - k * iqr, q3 + k * iqr))
}

/// Drop rows outside the Tukey fence of each configured column in turn.
///
/// Each fence is computed over the rows that survived the previous column.
/// A null cell fails the fence. Returns the total number of rows removed.
pub fn remove_outliers(dataset: &mut Dataset, columns: &[String], k: f64) -> usize {
    let before = dataset.len();
    for column in columns {
        if !dataset.has_column(column) {
            log_warning(format!("{} column not found; no outlier fence applied", column));
            continue;
        }
        let values: Vec<f64> = dataset.column(column).filter_map(as_f64).collect();
        let Some((lower, upper)) = tukey_fence(&values, k) else {
            continue;
        };

        let count = dataset.len();
        dataset.retain(|record| {
            as_f64(cell(record, column))
                .map(|v| lower <= v && v <= upper)
                .unwrap_or(false)
        });
        log_info_indent(
            format!(
                "{}: fence [{:.2}, {:.2}] removed {} rows",
                column,
                lower,
                upper,
                count - dataset.len()
            ),
            1,
        );
    }
    let removed = before - dataset.len();
    log_success(format!("Removed {} outliers", removed));
    removed
}

// =============================================================================
// Quality summary
// =============================================================================

/// Counts describing the cleaned table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub total_records: usize,
    pub missing_town: usize,
    pub missing_datetime: usize,
    pub missing_substance: usize,
    pub missing_cause: usize,
    /// Rows identical in every column to an earlier row
    pub duplicate_records: usize,
    /// Non-null years outside the plausible window
    pub invalid_years: usize,
}

fn count_null(dataset: &Dataset, column: &str) -> usize {
    if !dataset.has_column(column) {
        return 0;
    }
    dataset.column(column).filter(|v| v.is_null()).count()
}

/// Summarize missing values, duplicates and implausible years.
pub fn validate_data_quality(dataset: &Dataset, plausible_years: (i32, i32)) -> QualitySummary {
    let mut seen = HashSet::new();
    let mut duplicate_records = 0;
    for record in &dataset.records {
        let key = serde_json::to_string(record).unwrap_or_default();
        if !seen.insert(key) {
            duplicate_records += 1;
        }
    }

    let (min_year, max_year) = (plausible_years.0 as i64, plausible_years.1 as i64);
    let invalid_years = dataset
        .column(columns::RELEASE_YEAR)
        .filter_map(as_i64)
        .filter(|year| *year < min_year || *year > max_year)
        .count();

    QualitySummary {
        total_records: dataset.len(),
        missing_town: count_null(dataset, columns::TOWN),
        missing_datetime: count_null(dataset, columns::RELEASE_DATETIME),
        missing_substance: count_null(dataset, columns::SUBSTANCE),
        missing_cause: count_null(dataset, columns::CAUSE),
        duplicate_records,
        invalid_years,
    }
}

impl QualitySummary {
    pub fn log(&self) {
        log_success("Data quality check complete");
        log_info_indent(format!("total records: {}", self.total_records), 1);
        log_info_indent(format!("missing town: {}", self.missing_town), 1);
        log_info_indent(format!("missing release datetime: {}", self.missing_datetime), 1);
        log_info_indent(format!("missing substance: {}", self.missing_substance), 1);
        log_info_indent(format!("missing cause: {}", self.missing_cause), 1);
        log_info_indent(format!("duplicate records: {}", self.duplicate_records), 1);
        log_info_indent(format!("invalid years: {}", self.invalid_years), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_years(years: &[Value]) -> Dataset {
        let mut ds = Dataset::new(vec![columns::RELEASE_YEAR.into()]);
        for y in years {
            ds.push_row(vec![y.clone()]);
        }
        ds
    }

    fn quantities(values: &[f64]) -> Dataset {
        let mut ds = Dataset::new(vec![columns::TOTAL_QUANTITY_EQUIVALENT.into()]);
        for v in values {
            ds.push_row(vec![number_value(*v)]);
        }
        ds
    }

    #[test]
    fn test_filter_timeframe_inclusive() {
        let mut ds = with_years(&[json!(2018), json!(2019), json!(2022), json!(2023), Value::Null, json!("2020")]);
        let removed = filter_timeframe(&mut ds, 2019, 2022);
        assert_eq!(removed, 3);
        let years: Vec<i64> = ds.column(columns::RELEASE_YEAR).filter_map(as_i64).collect();
        assert_eq!(years, vec![2019, 2022, 2020]);
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 100.0];
        assert_eq!(quantile(&v, 0.25), Some(2.0));
        assert_eq!(quantile(&v, 0.5), Some(3.0));
        assert_eq!(quantile(&v, 0.75), Some(4.0));
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), Some(2.5));
        assert_eq!(quantile(&[7.0], 0.25), Some(7.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_tukey_fence() {
        assert_eq!(tukey_fence(&[1.0, 2.0, 3.0, 4.0, 100.0], 1.5), Some((-1.0, 7.0)));
        assert_eq!(tukey_fence(&[], 1.5), None);
    }

    #[test]
    fn test_remove_outliers_drops_extreme() {
        let mut ds = quantities(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        let removed = remove_outliers(&mut ds, &[columns::TOTAL_QUANTITY_EQUIVALENT.to_string()], 1.5);
        assert_eq!(removed, 1);
        assert_eq!(ds.len(), 4);
        assert!(ds
            .column(columns::TOTAL_QUANTITY_EQUIVALENT)
            .all(|v| as_f64(v).unwrap() <= 7.0));
    }

    #[test]
    fn test_remove_outliers_null_fails_fence() {
        let mut ds = quantities(&[1.0, 2.0, 3.0]);
        ds.push_row(vec![Value::Null]);
        remove_outliers(&mut ds, &[columns::TOTAL_QUANTITY_EQUIVALENT.to_string()], 1.5);
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_remove_outliers_empty_and_missing_column() {
        let mut empty = quantities(&[]);
        assert_eq!(remove_outliers(&mut empty, &[columns::TOTAL_QUANTITY_EQUIVALENT.to_string()], 1.5), 0);

        let mut ds = with_years(&[json!(2020)]);
        assert_eq!(remove_outliers(&mut ds, &["nope".to_string()], 1.5), 0);
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_remove_outliers_sequential_columns() {
        let mut ds = Dataset::new(vec!["a".into(), "b".into()]);
        for (a, b) in [(1, 10), (2, 10), (3, 10), (4, 10), (100, 10), (3, 1000)] {
            ds.push_row(vec![json!(a), json!(b)]);
        }
        // Fencing "a" keeps the b=1000 row; fencing "b" over the survivors then drops it
        let removed = remove_outliers(&mut ds, &["a".to_string(), "b".to_string()], 1.5);
        assert_eq!(removed, 2);
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn test_handle_missing_values() {
        let mut ds = Dataset::new(vec![columns::TOWN.into(), columns::RELEASE_HOUR.into()]);
        ds.push_row(vec![json!("GROTON"), json!(10)]);
        ds.push_row(vec![Value::Null, json!(14)]);
        ds.push_row(vec![json!("ENFIELD"), Value::Null]);
        ds.push_row(vec![json!("HARTFORD"), json!(20)]);

        handle_missing_values(&mut ds, &QualityConfig::default());

        assert_eq!(ds.records[1][columns::TOWN], "Unknown");
        assert_eq!(ds.records[2][columns::RELEASE_HOUR], 14);
    }

    #[test]
    fn test_median_fill_fractional() {
        let mut ds = Dataset::new(vec![columns::RELEASE_HOUR.into()]);
        ds.push_row(vec![json!(10)]);
        ds.push_row(vec![json!(13)]);
        ds.push_row(vec![Value::Null]);
        handle_missing_values(&mut ds, &QualityConfig::default());
        assert_eq!(ds.records[2][columns::RELEASE_HOUR], json!(11.5));
    }

    #[test]
    fn test_validate_data_quality() {
        let mut ds = Dataset::new(vec![
            columns::TOWN.into(),
            columns::RELEASE_DATETIME.into(),
            columns::RELEASE_YEAR.into(),
        ]);
        ds.push_row(vec![json!("GROTON"), json!("2020-01-01 00:00:00"), json!(2020)]);
        ds.push_row(vec![json!("GROTON"), json!("2020-01-01 00:00:00"), json!(2020)]);
        ds.push_row(vec![Value::Null, Value::Null, json!(1899)]);

        let summary = validate_data_quality(&ds, (1990, 2024));
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.missing_town, 1);
        assert_eq!(summary.missing_datetime, 1);
        assert_eq!(summary.missing_substance, 0);
        assert_eq!(summary.duplicate_records, 1);
        assert_eq!(summary.invalid_years, 1);
    }
}
