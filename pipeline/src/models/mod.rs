//! Domain models for the spill cleaning pipeline.
//!
//! - [`Dataset`] - ordered columns plus one JSON object per incident
//! - [`columns`] - canonical column names shared by every stage
//! - [`TimePeriod`] - four-bucket day segment
//! - [`Severity`] - quantity-based severity bucket
//!
//! Cells are [`serde_json::Value`]s: `Null` is a missing value, strings hold
//! free text, numbers hold anything already coerced.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// One incident row, keyed by column name.
pub type Record = Map<String, Value>;

// =============================================================================
// Canonical column names
// =============================================================================

pub mod columns {
    pub const CASE_NUMBER: &str = "case_number";
    pub const DATE_REPORTED: &str = "date_reported";
    pub const RELEASE_DATETIME: &str = "release_datetime";
    pub const TOWN: &str = "town";
    pub const STATE: &str = "state";
    pub const RESPONSIBLE_PARTY: &str = "responsible_party";
    pub const SUBSTANCE: &str = "substance";
    pub const CAUSE: &str = "cause";

    pub const QUANTITY_GALLONS: &str = "quantity_gallons";
    pub const QUANTITY_YARDS: &str = "quantity_yards";
    pub const QUANTITY_FEET: &str = "quantity_feet";
    pub const QUANTITY_DRUMS: &str = "quantity_drums";
    pub const QUANTITY_POUNDS: &str = "quantity_pounds";

    pub const RELEASE_YEAR: &str = "release_year";
    pub const RELEASE_MONTH: &str = "release_month";
    pub const RELEASE_DAY: &str = "release_day";
    pub const RELEASE_HOUR: &str = "release_hour";
    pub const RELEASE_DAYOFWEEK: &str = "release_dayofweek";
    pub const RELEASE_QUARTER: &str = "release_quarter";
    pub const TIME_PERIOD: &str = "time_period";

    pub const TOTAL_QUANTITY_EQUIVALENT: &str = "total_quantity_equivalent";
    pub const SUBSTANCE_CATEGORY: &str = "substance_category";
    pub const CAUSE_CATEGORY: &str = "cause_category";
    pub const REGION: &str = "region";
    pub const INCIDENT_SEVERITY: &str = "incident_severity";
    pub const RESPONSE_TIME_HOURS: &str = "response_time_hours";

    /// Calendar fields derived from the release timestamp, in output order.
    pub const CALENDAR: [&str; 6] = [
        RELEASE_YEAR,
        RELEASE_MONTH,
        RELEASE_DAY,
        RELEASE_HOUR,
        RELEASE_DAYOFWEEK,
        RELEASE_QUARTER,
    ];
}

// =============================================================================
// Dataset
// =============================================================================

/// An in-memory table: ordered column names plus one record per row.
///
/// Every record carries every column; a cell that was never set is `Null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, records: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Append a row built from values in column order. Missing trailing
    /// values become `Null`, surplus values are dropped.
    pub fn push_row(&mut self, values: impl IntoIterator<Item = Value>) {
        let mut values = values.into_iter();
        let record: Record = self
            .columns
            .iter()
            .map(|col| (col.clone(), values.next().unwrap_or(Value::Null)))
            .collect();
        self.records.push(record);
    }

    /// Register a column, filling it with `Null` if it is new.
    pub fn ensure_column(&mut self, name: &str) {
        if self.has_column(name) {
            return;
        }
        self.columns.push(name.to_string());
        for record in &mut self.records {
            record.entry(name.to_string()).or_insert(Value::Null);
        }
    }

    /// Rename every column with `rename`. Records are re-keyed in place.
    /// When two columns collapse onto one name, the later one wins.
    pub fn rename_columns(&mut self, mut rename: impl FnMut(&str) -> String) {
        let renamed: Vec<(String, String)> = self
            .columns
            .iter()
            .map(|old| (old.clone(), rename(old)))
            .collect();

        for record in &mut self.records {
            let mut fresh = Record::new();
            for (old, new) in &renamed {
                let value = record.remove(old).unwrap_or(Value::Null);
                fresh.insert(new.clone(), value);
            }
            *record = fresh;
        }

        let mut columns: Vec<String> = Vec::with_capacity(renamed.len());
        for (_, new) in renamed {
            if !columns.contains(&new) {
                columns.push(new);
            }
        }
        self.columns = columns;
    }

    /// Cells of one column, `Null` where absent.
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.records
            .iter()
            .map(move |r| r.get(name).unwrap_or(&Value::Null))
    }

    /// Derive a column from each record.
    pub fn derive(&mut self, column: &str, mut f: impl FnMut(&Record) -> Value) {
        self.ensure_column(column);
        for record in &mut self.records {
            let value = f(record);
            record.insert(column.to_string(), value);
        }
    }

    /// Keep only the rows matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&Record) -> bool) {
        self.records.retain(keep);
    }
}

// =============================================================================
// Cell helpers
// =============================================================================

/// Read a cell, treating an absent column as `Null`.
pub fn cell<'a>(record: &'a Record, column: &str) -> &'a Value {
    record.get(column).unwrap_or(&Value::Null)
}

/// Text content of a non-null cell.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Numeric content of a cell. Numeric strings are accepted so that a
/// reloaded CSV reads the same as the in-memory table.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Integral content of a cell (`2020`, `2020.0` and `"2020"` all qualify).
pub fn as_i64(value: &Value) -> Option<i64> {
    as_f64(value)
        .filter(|f| f.fract() == 0.0)
        .map(|f| f as i64)
}

/// Store a float as a cell: integral values become integers, non-finite
/// values become `Null`.
pub fn number_value(f: f64) -> Value {
    if !f.is_finite() {
        return Value::Null;
    }
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        return Value::Number(Number::from(f as i64));
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Text written to a CSV cell. `Null` becomes the empty string.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// Time Period
// =============================================================================

/// Segment of the day an incident was released in.
///
/// Buckets are half-open: hour 18 is `Evening`, hour 6 is `Morning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePeriod {
    Night,
    Morning,
    Afternoon,
    Evening,
    Unknown,
}

impl TimePeriod {
    pub fn from_hour(hour: Option<i64>) -> Self {
        match hour {
            None => TimePeriod::Unknown,
            Some(h) if (6..12).contains(&h) => TimePeriod::Morning,
            Some(h) if (12..18).contains(&h) => TimePeriod::Afternoon,
            Some(h) if (18..24).contains(&h) => TimePeriod::Evening,
            Some(_) => TimePeriod::Night,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimePeriod::Night => "Night (00:00-06:00)",
            TimePeriod::Morning => "Morning (06:00-12:00)",
            TimePeriod::Afternoon => "Afternoon (12:00-18:00)",
            TimePeriod::Evening => "Evening (18:00-24:00)",
            TimePeriod::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Incident severity bucket derived from `total_quantity_equivalent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    UnknownOrMinimal,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Severity {
    /// Every bucket, smallest first.
    pub const ALL: [Severity; 5] = [
        Severity::UnknownOrMinimal,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::VeryHigh,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Severity::UnknownOrMinimal => "Unknown/Minimal",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Dataset {
        let mut ds = Dataset::new(vec!["Town of Release".into(), "Status".into()]);
        ds.push_row(vec![json!("Groton"), json!("Closed")]);
        ds.push_row(vec![json!("Hartford")]);
        ds
    }

    #[test]
    fn test_push_row_pads_with_null() {
        let ds = sample();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[1]["Status"], Value::Null);
    }

    #[test]
    fn test_rename_columns_keeps_values_and_order() {
        let mut ds = sample();
        ds.rename_columns(|c| c.to_lowercase().replace(' ', "_"));
        assert_eq!(ds.columns, vec!["town_of_release", "status"]);
        assert_eq!(ds.records[0]["town_of_release"], "Groton");
        assert_eq!(ds.records[0]["status"], "Closed");
    }

    #[test]
    fn test_derive_registers_column() {
        let mut ds = sample();
        ds.derive("flag", |r| json!(cell(r, "Status").is_null()));
        assert!(ds.has_column("flag"));
        assert_eq!(ds.records[0]["flag"], false);
        assert_eq!(ds.records[1]["flag"], true);
    }

    #[test]
    fn test_numeric_helpers() {
        assert_eq!(as_f64(&json!("12.5")), Some(12.5));
        assert_eq!(as_f64(&json!("abc")), None);
        assert_eq!(as_i64(&json!(2020.0)), Some(2020));
        assert_eq!(as_i64(&json!("2020")), Some(2020));
        assert_eq!(as_i64(&json!(13.5)), None);
        assert_eq!(number_value(1250.0), json!(1250));
        assert_eq!(number_value(7.48), json!(7.48));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Value::Null), "");
        assert_eq!(cell_to_string(&json!(55)), "55");
        assert_eq!(cell_to_string(&json!("GROTON")), "GROTON");
    }

    #[test]
    fn test_time_period_boundaries() {
        assert_eq!(TimePeriod::from_hour(Some(0)), TimePeriod::Night);
        assert_eq!(TimePeriod::from_hour(Some(5)), TimePeriod::Night);
        assert_eq!(TimePeriod::from_hour(Some(6)), TimePeriod::Morning);
        assert_eq!(TimePeriod::from_hour(Some(12)), TimePeriod::Afternoon);
        assert_eq!(TimePeriod::from_hour(Some(17)), TimePeriod::Afternoon);
        assert_eq!(TimePeriod::from_hour(Some(18)), TimePeriod::Evening);
        assert_eq!(TimePeriod::from_hour(Some(23)), TimePeriod::Evening);
        assert_eq!(TimePeriod::from_hour(None).label(), "Unknown");
        assert_eq!(TimePeriod::Evening.to_string(), "Evening (18:00-24:00)");
    }
}
