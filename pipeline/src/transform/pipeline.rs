//! High-level cleaning API.
//!
//! Runs every stage in order over one table:
//!
//! 1. Schema Normalizer ([`normalize_columns`])
//! 2. Type/Unit Normalizer ([`parse_datetime_columns`], [`clean_numeric_columns`], [`clean_text_columns`])
//! 3. Categorizer ([`categorize`])
//! 4. Quality Filter ([`filter_timeframe`], [`handle_missing_values`], [`remove_outliers`])
//!
//! followed by a read-only [`validate_data_quality`] pass.
//!
//! # Example
//!
//! ```rust,ignore
//! use ctspill::{process_file, PipelineConfig, ProcessOptions};
//!
//! let config = PipelineConfig::default();
//! let result = process_file("data/raw/spill_incidents_raw.csv", &config, &ProcessOptions::default())?;
//! println!("{} of {} rows kept", result.dataset.len(), result.csv_info.row_count);
//! ```

use serde::Serialize;
use std::path::Path;

use super::categorize::categorize;
use super::normalize::{clean_numeric_columns, clean_text_columns, parse_datetime_columns};
use super::quality::{
    filter_timeframe, handle_missing_values, remove_outliers, validate_data_quality, QualitySummary,
};
use super::schema::normalize_columns;
use crate::config::{PipelineConfig, QualityConfig};
use crate::error::{ConfigError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::Dataset;
use crate::parser::{parse_bytes_auto, parse_csv_file_auto, ParseResult};

/// Per-run overrides on top of [`PipelineConfig::quality`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessOptions {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    /// Keep every year
    pub skip_timeframe: bool,
    /// Keep every quantity
    pub skip_outliers: bool,
}

impl ProcessOptions {
    /// Quality settings with the overrides applied.
    pub fn resolve(&self, base: &QualityConfig) -> PipelineResult<QualityConfig> {
        let mut quality = base.clone();
        if let Some(start) = self.start_year {
            quality.start_year = start;
        }
        if let Some(end) = self.end_year {
            quality.end_year = end;
        }
        if self.skip_timeframe {
            quality.filter_timeframe = false;
        }
        if self.skip_outliers {
            quality.remove_outliers = false;
        }
        if quality.filter_timeframe && quality.start_year > quality.end_year {
            return Err(ConfigError::Invalid(format!(
                "start_year {} > end_year {}",
                quality.start_year, quality.end_year
            ))
            .into());
        }
        Ok(quality)
    }
}

/// Input file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Row counts at each point where rows can disappear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub loaded: usize,
    pub unparsed_datetimes: usize,
    pub removed_by_timeframe: usize,
    pub removed_outliers: usize,
    pub kept: usize,
}

/// Result of a complete cleaning run
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub dataset: Dataset,
    pub quality: QualitySummary,
    pub counts: StageCounts,
    pub csv_info: CsvInfo,
}

/// Clean a CSV file.
pub fn process_file<P: AsRef<Path>>(
    path: P,
    config: &PipelineConfig,
    options: &ProcessOptions,
) -> PipelineResult<ProcessResult> {
    log_info(format!("📖 Reading {}", path.as_ref().display()));
    let parsed = parse_csv_file_auto(path)?;
    process_parsed(parsed, config, options)
}

/// Clean CSV bytes.
///
/// Same as [`process_file`] but accepts raw bytes instead of a file path.
pub fn process_bytes(
    bytes: &[u8],
    config: &PipelineConfig,
    options: &ProcessOptions,
) -> PipelineResult<ProcessResult> {
    let parsed = parse_bytes_auto(bytes)?;
    process_parsed(parsed, config, options)
}

fn process_parsed(
    parsed: ParseResult,
    config: &PipelineConfig,
    options: &ProcessOptions,
) -> PipelineResult<ProcessResult> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", parsed.dataset.len()));

    let csv_info = CsvInfo {
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        headers: parsed.dataset.columns.clone(),
        row_count: parsed.dataset.len(),
    };

    let (dataset, counts) = process_dataset(parsed.dataset, config, options)?;
    let quality = validate_data_quality(&dataset, config.quality.plausible_years);
    quality.log();

    Ok(ProcessResult { dataset, quality, counts, csv_info })
}

/// Run the four stages over an in-memory table.
pub fn process_dataset(
    mut dataset: Dataset,
    config: &PipelineConfig,
    options: &ProcessOptions,
) -> PipelineResult<(Dataset, StageCounts)> {
    let quality = options.resolve(&config.quality)?;
    let mut counts = StageCounts { loaded: dataset.len(), ..StageCounts::default() };

    log_info("🔄 Standardizing column names...");
    normalize_columns(&mut dataset, &config.schema);
    log_info(format!("📋 {} columns:", dataset.columns.len()));
    for (i, col) in dataset.columns.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }

    log_info("🕒 Parsing timestamps...");
    counts.unparsed_datetimes = parse_datetime_columns(&mut dataset, &config.datetime);

    log_info("⚖️  Normalizing quantities...");
    clean_numeric_columns(&mut dataset, &config.units);
    clean_text_columns(&mut dataset);

    log_info("🏷️  Categorizing incidents...");
    categorize(&mut dataset, config);

    if quality.filter_timeframe {
        counts.removed_by_timeframe = filter_timeframe(&mut dataset, quality.start_year, quality.end_year);
    } else {
        log_info("(timeframe filter skipped)");
    }

    handle_missing_values(&mut dataset, &quality);

    if quality.remove_outliers {
        counts.removed_outliers = remove_outliers(&mut dataset, &quality.outlier_columns, quality.iqr_multiplier);
    } else {
        log_info("(outlier removal skipped)");
    }

    counts.kept = dataset.len();
    if dataset.is_empty() {
        log_warning("No rows left after cleaning");
    } else {
        log_success(format!("{} of {} rows kept", counts.kept, counts.loaded));
    }
    Ok((dataset, counts))
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}
