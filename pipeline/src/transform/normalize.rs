//! Type/Unit Normalizer.
//!
//! Turns free-text timestamps into calendar fields and free-text quantities
//! into numbers. A cell that cannot be coerced gets a default (null for a
//! timestamp, zero for a quantity); nothing here fails.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::config::{DatetimeConfig, UnitConversion};
use crate::logs::{log_success, log_warning};
use crate::models::{as_text, cell, columns, number_value, Dataset, TimePeriod};

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.]").expect("static regex"));

/// Parse a timestamp with the configured formats, first match wins.
pub fn parse_timestamp(text: &str, config: &DatetimeConfig) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    config
        .formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            config
                .date_formats
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_cell(value: &Value, config: &DatetimeConfig) -> Option<NaiveDateTime> {
    as_text(value).and_then(|text| parse_timestamp(&text, config))
}

/// Calendar fields of a timestamp, in [`columns::CALENDAR`] order.
/// Day of week counts from Monday = 0.
pub fn calendar_fields(ts: &NaiveDateTime) -> [i64; 6] {
    [
        ts.year() as i64,
        ts.month() as i64,
        ts.day() as i64,
        ts.hour() as i64,
        ts.weekday().num_days_from_monday() as i64,
        ((ts.month() - 1) / 3 + 1) as i64,
    ]
}

/// Parse `release_datetime` and `date_reported`, derive the calendar fields,
/// `time_period` and `response_time_hours`.
///
/// Timestamps are rewritten in `output_format`; unparseable ones become null.
/// Returns the number of release timestamps that could not be parsed.
pub fn parse_datetime_columns(dataset: &mut Dataset, config: &DatetimeConfig) -> usize {
    for column in columns::CALENDAR {
        dataset.ensure_column(column);
    }
    dataset.ensure_column(columns::TIME_PERIOD);
    dataset.ensure_column(columns::RESPONSE_TIME_HOURS);

    let has_release = dataset.has_column(columns::RELEASE_DATETIME);
    let has_reported = dataset.has_column(columns::DATE_REPORTED);
    if !has_release {
        log_warning("release_datetime column not found; calendar fields left empty");
    }

    let mut unparsed = 0;
    for record in &mut dataset.records {
        let release = parse_cell(cell(record, columns::RELEASE_DATETIME), config);
        let reported = parse_cell(cell(record, columns::DATE_REPORTED), config);

        if has_release {
            if release.is_none() {
                unparsed += 1;
            }
            record.insert(columns::RELEASE_DATETIME.to_string(), format_timestamp(release, config));
        }
        if has_reported {
            record.insert(columns::DATE_REPORTED.to_string(), format_timestamp(reported, config));
        }

        let fields = release.as_ref().map(calendar_fields);
        for (i, column) in columns::CALENDAR.iter().enumerate() {
            let value = fields.map(|f| json!(f[i])).unwrap_or(Value::Null);
            record.insert(column.to_string(), value);
        }

        let hour = fields.map(|f| f[3]);
        record.insert(
            columns::TIME_PERIOD.to_string(),
            json!(TimePeriod::from_hour(hour).label()),
        );

        let response = match (release, reported) {
            (Some(rel), Some(rep)) => number_value((rep - rel).num_seconds() as f64 / 3600.0),
            _ => Value::Null,
        };
        record.insert(columns::RESPONSE_TIME_HOURS.to_string(), response);
    }

    log_success(format!(
        "Parsed release timestamps ({} of {} unparseable)",
        unparsed,
        dataset.len()
    ));
    unparsed
}

fn format_timestamp(ts: Option<NaiveDateTime>, config: &DatetimeConfig) -> Value {
    ts.map(|t| Value::String(t.format(&config.output_format).to_string()))
        .unwrap_or(Value::Null)
}

/// Coerce a quantity cell: keep digits and dots, parse, default to zero.
///
/// `"1,250 gal"` is `1250.0`; `""`, `"N/A"` and `"1.2.3"` are `0.0`.
/// Numbers, and text that already reads as a plain float (`"1e-6"`, as
/// written by a previous run), keep their magnitude.
pub fn clean_quantity(value: &Value) -> f64 {
    let direct = match value {
        Value::Null => return 0.0,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    if let Some(f) = direct.filter(|f| f.is_finite()) {
        return f.abs();
    }
    let Some(text) = as_text(value) else {
        return 0.0;
    };
    let digits = NON_NUMERIC.replace_all(&text, "");
    digits
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

/// Coerce the five quantity columns and compute `total_quantity_equivalent`.
///
/// A quantity column absent from the table contributes zero to the total.
pub fn clean_numeric_columns(dataset: &mut Dataset, units: &UnitConversion) {
    let present: Vec<(&str, f64)> = units
        .factors()
        .into_iter()
        .filter(|(column, _)| {
            let found = dataset.has_column(column);
            if !found {
                log_warning(format!("{} column not found; counted as zero", column));
            }
            found
        })
        .collect();

    dataset.ensure_column(columns::TOTAL_QUANTITY_EQUIVALENT);
    for record in &mut dataset.records {
        let mut total = 0.0;
        for (column, factor) in &present {
            let qty = clean_quantity(cell(record, column));
            record.insert(column.to_string(), number_value(qty));
            total += qty * factor;
        }
        record.insert(columns::TOTAL_QUANTITY_EQUIVALENT.to_string(), number_value(total));
    }

    log_success("Quantity columns normalized to gallon equivalents");
}

/// Uppercase and trim `town` and `state`. Nulls stay null.
pub fn clean_text_columns(dataset: &mut Dataset) {
    for column in [columns::TOWN, columns::STATE] {
        if !dataset.has_column(column) {
            continue;
        }
        for record in &mut dataset.records {
            if let Some(text) = as_text(cell(record, column)) {
                record.insert(column.to_string(), Value::String(text.trim().to_uppercase()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::as_f64;

    fn dataset(columns: &[&str], rows: Vec<Vec<Value>>) -> Dataset {
        let mut ds = Dataset::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            ds.push_row(row);
        }
        ds
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let cfg = DatetimeConfig::default();
        let expected = NaiveDate::from_ymd_opt(2020, 3, 15).unwrap().and_hms_opt(16, 30, 0).unwrap();

        assert_eq!(parse_timestamp("03/15/2020 04:30:00 PM", &cfg), Some(expected));
        assert_eq!(parse_timestamp("03/15/2020 16:30", &cfg), Some(expected));
        assert_eq!(parse_timestamp("2020-03-15 16:30:00", &cfg), Some(expected));
        assert_eq!(parse_timestamp(" 2020-03-15T16:30:00 ", &cfg), Some(expected));
        assert_eq!(
            parse_timestamp("03/15/2020", &cfg),
            NaiveDate::from_ymd_opt(2020, 3, 15).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("last tuesday", &cfg), None);
        assert_eq!(parse_timestamp("", &cfg), None);
    }

    #[test]
    fn test_calendar_fields() {
        // 2021-12-31 was a Friday
        let ts = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap().and_hms_opt(18, 5, 0).unwrap();
        assert_eq!(calendar_fields(&ts), [2021, 12, 31, 18, 4, 4]);
    }

    #[test]
    fn test_parse_datetime_columns_derives_fields() {
        let mut ds = dataset(
            &[columns::RELEASE_DATETIME, columns::DATE_REPORTED],
            vec![
                vec![json!("01/02/2020 06:00:00 AM"), json!("01/02/2020 09:30:00 AM")],
                vec![json!("not a date"), json!("01/02/2020 09:30:00 AM")],
                vec![Value::Null, Value::Null],
            ],
        );

        let unparsed = parse_datetime_columns(&mut ds, &DatetimeConfig::default());
        assert_eq!(unparsed, 2);

        let first = &ds.records[0];
        assert_eq!(first[columns::RELEASE_DATETIME], "2020-01-02 06:00:00");
        assert_eq!(first[columns::RELEASE_YEAR], 2020);
        assert_eq!(first[columns::RELEASE_HOUR], 6);
        assert_eq!(first[columns::RELEASE_DAYOFWEEK], 3);
        assert_eq!(first[columns::RELEASE_QUARTER], 1);
        assert_eq!(first[columns::TIME_PERIOD], "Morning (06:00-12:00)");
        assert_eq!(as_f64(&first[columns::RESPONSE_TIME_HOURS]), Some(3.5));

        let second = &ds.records[1];
        assert_eq!(second[columns::RELEASE_DATETIME], Value::Null);
        for column in columns::CALENDAR {
            assert_eq!(second[column], Value::Null);
        }
        assert_eq!(second[columns::TIME_PERIOD], "Unknown");
        assert_eq!(second[columns::RESPONSE_TIME_HOURS], Value::Null);
        assert_eq!(second[columns::DATE_REPORTED], "2020-01-02 09:30:00");
    }

    #[test]
    fn test_normalized_timestamps_reparse() {
        let cfg = DatetimeConfig::default();
        let mut ds = dataset(&[columns::RELEASE_DATETIME], vec![vec![json!("07/04/2021 11:59:00 PM")]]);
        parse_datetime_columns(&mut ds, &cfg);
        let once = ds.clone();
        parse_datetime_columns(&mut ds, &cfg);
        assert_eq!(once, ds);
        assert_eq!(ds.records[0][columns::TIME_PERIOD], "Evening (18:00-24:00)");
    }

    #[test]
    fn test_clean_quantity() {
        assert_eq!(clean_quantity(&json!("1,250 gal")), 1250.0);
        assert_eq!(clean_quantity(&json!("12.5")), 12.5);
        assert_eq!(clean_quantity(&json!("-5")), 5.0);
        assert_eq!(clean_quantity(&json!("N/A")), 0.0);
        assert_eq!(clean_quantity(&json!("1.2.3")), 0.0);
        assert_eq!(clean_quantity(&json!(".")), 0.0);
        assert_eq!(clean_quantity(&Value::Null), 0.0);
        assert_eq!(clean_quantity(&json!(55)), 55.0);
        assert_eq!(clean_quantity(&json!("9".repeat(400))), 0.0);
        assert_eq!(clean_quantity(&json!("1e-6")), 1e-6);
        assert_eq!(clean_quantity(&json!(1e16)), 1e16);
    }

    #[test]
    fn test_tiny_and_huge_quantities_keep_their_value() {
        let mut ds = dataset(
            &[columns::QUANTITY_GALLONS],
            vec![vec![json!("0.000001 gal")], vec![json!("10000000000000000")]],
        );
        clean_numeric_columns(&mut ds, &UnitConversion::default());

        let totals: Vec<f64> = ds
            .column(columns::TOTAL_QUANTITY_EQUIVALENT)
            .map(|v| as_f64(v).unwrap())
            .collect();
        assert_eq!(totals, vec![1e-6, 1e16]);
        assert_eq!(as_f64(&ds.records[0][columns::QUANTITY_GALLONS]), Some(1e-6));

        // A second pass over written-out cells gives the same totals
        for record in &mut ds.records {
            let text = crate::models::cell_to_string(&record[columns::QUANTITY_GALLONS]);
            record.insert(columns::QUANTITY_GALLONS.to_string(), Value::String(text));
        }
        clean_numeric_columns(&mut ds, &UnitConversion::default());
        let again: Vec<f64> = ds
            .column(columns::TOTAL_QUANTITY_EQUIVALENT)
            .map(|v| as_f64(v).unwrap())
            .collect();
        assert_eq!(again, totals);
    }

    #[test]
    fn test_total_quantity_equivalent() {
        let mut ds = dataset(
            &[
                columns::QUANTITY_GALLONS,
                columns::QUANTITY_YARDS,
                columns::QUANTITY_FEET,
                columns::QUANTITY_DRUMS,
                columns::QUANTITY_POUNDS,
            ],
            vec![
                vec![json!("10"), json!("1"), json!("2"), json!("1"), json!("100")],
                vec![json!("abc"), Value::Null, json!(""), json!("?"), json!("none")],
            ],
        );
        clean_numeric_columns(&mut ds, &UnitConversion::default());

        let total = as_f64(&ds.records[0][columns::TOTAL_QUANTITY_EQUIVALENT]).unwrap();
        assert!((total - (10.0 + 202.0 + 14.96 + 55.0 + 12.0)).abs() < 1e-9);
        assert_eq!(ds.records[0][columns::QUANTITY_DRUMS], 1);

        assert_eq!(ds.records[1][columns::QUANTITY_GALLONS], 0);
        assert_eq!(ds.records[1][columns::TOTAL_QUANTITY_EQUIVALENT], 0);
    }

    #[test]
    fn test_missing_quantity_columns_count_as_zero() {
        let mut ds = dataset(&[columns::QUANTITY_DRUMS], vec![vec![json!("2 drums")]]);
        clean_numeric_columns(&mut ds, &UnitConversion::default());
        assert_eq!(ds.records[0][columns::TOTAL_QUANTITY_EQUIVALENT], 110);
        assert!(!ds.has_column(columns::QUANTITY_GALLONS));
    }

    #[test]
    fn test_clean_text_columns() {
        let mut ds = dataset(
            &[columns::TOWN, columns::STATE],
            vec![vec![json!("  new london "), json!("ct")], vec![Value::Null, json!(" Ct")]],
        );
        clean_text_columns(&mut ds);
        assert_eq!(ds.records[0][columns::TOWN], "NEW LONDON");
        assert_eq!(ds.records[0][columns::STATE], "CT");
        assert_eq!(ds.records[1][columns::TOWN], Value::Null);
    }
}
