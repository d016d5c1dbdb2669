//! Categorizer: free text to fixed labels.
//!
//! Substance, cause and region each run one [`RuleSet`] over a single column.
//! Region rules are town allowlists matched as substrings in priority order
//! (Eastern, Western, Central, Northern, Southern). The lists are disjoint
//! for real town names; when a value happens to hit two lists the earlier
//! region wins.

use serde_json::Value;

use crate::config::{PipelineConfig, SeverityThresholds};
use crate::logs::{log_success, log_warning};
use crate::models::{as_f64, as_text, cell, columns, Dataset, Severity};
use crate::transform::rules::RuleSet;

/// Write `rules.classify(source)` into `target` for every row.
///
/// When `source` is absent every row is treated as missing.
pub fn categorize_column(dataset: &mut Dataset, source: &str, target: &str, rules: &RuleSet) {
    if !dataset.has_column(source) {
        log_warning(format!("{} column not found; {} set to '{}'", source, target, rules.missing));
    }
    dataset.derive(target, |record| {
        let text = as_text(cell(record, source));
        Value::String(rules.classify(text.as_deref()).to_string())
    });
}

/// Severity bucket for a standardized quantity.
pub fn categorize_severity(quantity: Option<f64>, thresholds: &SeverityThresholds) -> Severity {
    match quantity {
        None => Severity::UnknownOrMinimal,
        Some(q) if q == 0.0 => Severity::UnknownOrMinimal,
        Some(q) if q < thresholds.low => Severity::Low,
        Some(q) if q < thresholds.medium => Severity::Medium,
        Some(q) if q < thresholds.high => Severity::High,
        Some(_) => Severity::VeryHigh,
    }
}

/// Add `substance_category`, `cause_category`, `region` and `incident_severity`.
pub fn categorize(dataset: &mut Dataset, config: &PipelineConfig) {
    categorize_column(dataset, columns::SUBSTANCE, columns::SUBSTANCE_CATEGORY, &config.substance);
    categorize_column(dataset, columns::CAUSE, columns::CAUSE_CATEGORY, &config.cause);
    categorize_column(dataset, columns::TOWN, columns::REGION, &config.regions);

    let thresholds = config.severity;
    dataset.derive(columns::INCIDENT_SEVERITY, |record| {
        let qty = as_f64(cell(record, columns::TOTAL_QUANTITY_EQUIVALENT));
        Value::String(categorize_severity(qty, &thresholds).label().to_string())
    });

    log_success("Substance, cause, region and severity categories assigned");
}
