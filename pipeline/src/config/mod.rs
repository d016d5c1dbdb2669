//! Pipeline configuration.
//!
//! Every lookup table the stages use (column renames, datetime formats, unit
//! coefficients, keyword rules, town lists, thresholds) lives in a
//! [`PipelineConfig`] passed into the stage functions. The built-in
//! [`Default`] reproduces the published study; a JSON file can override any
//! section and omitted fields keep their defaults.
//!
//! ```rust,ignore
//! let config = PipelineConfig::load("ct-2019.json")?;
//! println!("{}", config.to_json()?);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::models::columns;
use crate::transform::rules::{KeywordRule, RuleSet, RuleSetPatch};

/// Complete configuration for cleaning and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Version of the config format
    pub version: String,
    pub description: String,
    pub schema: SchemaConfig,
    pub datetime: DatetimeConfig,
    pub units: UnitConversion,
    #[serde(deserialize_with = "substance_over_defaults")]
    pub substance: RuleSet,
    #[serde(deserialize_with = "cause_over_defaults")]
    pub cause: RuleSet,
    /// Town lists per region, in priority order
    #[serde(deserialize_with = "regions_over_defaults")]
    pub regions: RuleSet,
    pub severity: SeverityThresholds,
    pub quality: QualityConfig,
    pub report: ReportConfig,
}

/// Known raw headers and their canonical names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub renames: BTreeMap<String, String>,
}

/// How timestamps are read and written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatetimeConfig {
    /// chrono formats with a time component, tried in order
    pub formats: Vec<String>,
    /// chrono formats without a time component (midnight is assumed)
    pub date_formats: Vec<String>,
    /// Format used when writing timestamps back out
    pub output_format: String,
}

/// Coefficients converting each quantity unit to gallons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConversion {
    pub gallons: f64,
    /// Cubic yards
    pub yards: f64,
    /// Cubic feet
    pub feet: f64,
    /// Standard 55-gallon drum
    pub drums: f64,
    /// Approximate, petroleum density
    pub pounds: f64,
}

impl UnitConversion {
    /// `(column, coefficient)` pairs in a fixed order.
    pub fn factors(&self) -> [(&'static str, f64); 5] {
        [
            (columns::QUANTITY_GALLONS, self.gallons),
            (columns::QUANTITY_YARDS, self.yards),
            (columns::QUANTITY_FEET, self.feet),
            (columns::QUANTITY_DRUMS, self.drums),
            (columns::QUANTITY_POUNDS, self.pounds),
        ]
    }
}

/// Upper bounds (exclusive) of the Low, Medium and High severity buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

/// Settings for the Quality Filter stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub filter_timeframe: bool,
    pub start_year: i32,
    pub end_year: i32,
    pub remove_outliers: bool,
    /// Columns fenced one after another
    pub outlier_columns: Vec<String>,
    pub iqr_multiplier: f64,
    /// Columns whose nulls become `fill_value`
    pub categorical_fill: Vec<String>,
    pub fill_value: String,
    /// Columns whose nulls become the live median
    pub median_fill: Vec<String>,
    /// Years outside this window are counted as invalid in the quality summary
    pub plausible_years: (i32, i32),
}

/// Settings for the research report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub top_towns: usize,
    /// Towns the prior study named as hotspots
    pub expected_towns: Vec<String>,
    pub afternoon_hours: Vec<u32>,
    pub top_hours: usize,
    pub highlight_substance: String,
    pub highlight_cause: String,
    /// Share (percent) above which a cause is HIGH impact
    pub high_impact_pct: f64,
    /// Share (percent) above which a cause is MEDIUM impact
    pub medium_impact_pct: f64,
}

// =============================================================================
// Defaults
// =============================================================================

const RAW_HEADERS: [(&str, &str); 29] = [
    ("Case No.", columns::CASE_NUMBER),
    ("Date Reported Time Reported", columns::DATE_REPORTED),
    ("Release date and time", columns::RELEASE_DATETIME),
    ("Town of Release", columns::TOWN),
    ("State of Release", columns::STATE),
    ("Responsibile Party/Discharger", columns::RESPONSIBLE_PARTY),
    ("Responsible Party Address", "responsible_party_address"),
    ("Responsible Party Town", "responsible_party_town"),
    ("Responsible Party State", "responsible_party_state"),
    ("Responsible Party Zip", "responsible_party_zip"),
    ("Responsible Party Accepts Responsibility (Y/N)", "accepts_responsibility"),
    ("Release Type", "release_type"),
    ("Location Of Reported Release", "release_location"),
    ("Release Substance", columns::SUBSTANCE),
    ("Total Quantity Gallons", columns::QUANTITY_GALLONS),
    ("Total Quantity Yards", columns::QUANTITY_YARDS),
    ("Total Quantity Feet", columns::QUANTITY_FEET),
    ("Total Quantity Drums", columns::QUANTITY_DRUMS),
    ("Total Quantity Pounds", columns::QUANTITY_POUNDS),
    ("Emergency Measures", "emergency_measures"),
    ("Type of Waterbody Affected", "waterbody_type"),
    ("Waterbodies Affected", "waterbodies_affected"),
    ("Corrective Actions Taken", "corrective_actions"),
    ("Cause Info", columns::CAUSE),
    ("Media Info", "media"),
    ("Assigned to", "assigned_to"),
    ("Reported By", "reported_by"),
    ("Representing", "representing"),
    ("Status", "status"),
];

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            renames: RAW_HEADERS
                .iter()
                .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
                .collect(),
        }
    }
}

impl Default for DatetimeConfig {
    fn default() -> Self {
        let formats = [
            "%m/%d/%Y %I:%M:%S %p",
            "%m/%d/%Y %I:%M %p",
            "%m/%d/%Y %H:%M:%S",
            "%m/%d/%Y %H:%M",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M",
        ];
        let date_formats = ["%m/%d/%Y", "%Y-%m-%d"];
        Self {
            formats: formats.iter().map(|f| f.to_string()).collect(),
            date_formats: date_formats.iter().map(|f| f.to_string()).collect(),
            output_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl Default for UnitConversion {
    fn default() -> Self {
        Self {
            gallons: 1.0,
            yards: 202.0,
            feet: 7.48,
            drums: 55.0,
            pounds: 0.12,
        }
    }
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self { low: 10.0, medium: 100.0, high: 1000.0 }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            filter_timeframe: true,
            start_year: 2019,
            end_year: 2022,
            remove_outliers: true,
            outlier_columns: vec![columns::TOTAL_QUANTITY_EQUIVALENT.to_string()],
            iqr_multiplier: 1.5,
            categorical_fill: [columns::TOWN, columns::SUBSTANCE, columns::CAUSE, columns::RESPONSIBLE_PARTY]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            fill_value: "Unknown".to_string(),
            median_fill: vec![columns::RELEASE_HOUR.to_string(), columns::RELEASE_YEAR.to_string()],
            plausible_years: (1990, 2024),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_towns: 10,
            expected_towns: ["GROTON", "SOUTHINGTON", "HARTFORD", "NEW BRITAIN", "ENFIELD"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            afternoon_hours: vec![15, 16, 17, 18],
            top_hours: 5,
            highlight_substance: "Petroleum Products".to_string(),
            highlight_cause: "Motor Vehicle Accident".to_string(),
            high_impact_pct: 25.0,
            medium_impact_pct: 10.0,
        }
    }
}

/// Substance rules of the published study.
pub fn default_substance_rules() -> RuleSet {
    RuleSet::new(
        vec![
            KeywordRule::new(
                "Petroleum Products",
                &["GASOLINE", "DIESEL", "FUEL", "OIL", "PETROLEUM", "HYDRAULIC"],
            ),
            KeywordRule::new("Chemicals", &["CHEMICAL", "ACID", "SOLVENT", "PAINT"]),
            KeywordRule::new("Waste Products", &["WASTE", "SEWAGE"]),
        ],
        "Other",
        "Unknown",
    )
}

/// Cause rules of the published study.
pub fn default_cause_rules() -> RuleSet {
    RuleSet::new(
        vec![
            KeywordRule::new("Motor Vehicle Accident", &["MV", "MOTOR VEHICLE", "ACCIDENT"]),
            KeywordRule::new("Equipment Failure", &["EQUIPMENT", "FAILURE", "MECHANICAL"]),
            KeywordRule::new("Human Error", &["HUMAN", "OPERATOR", "ERROR"]),
            KeywordRule::new("Natural Causes", &["WEATHER", "NATURAL"]),
        ],
        "Other",
        "Unknown",
    )
}

/// Simplified Connecticut regions. Order is priority: a town is tested
/// against Eastern first and Southern last.
pub fn default_region_rules() -> RuleSet {
    RuleSet::new(
        vec![
            KeywordRule::new(
                "Eastern Connecticut",
                &["GROTON", "NEW LONDON", "WATERFORD", "MONTVILLE", "LEBANON"],
            ),
            KeywordRule::new(
                "Western Connecticut",
                &["STAMFORD", "NORWALK", "DANBURY", "BRIDGEPORT", "WESTPORT"],
            ),
            KeywordRule::new(
                "Central Connecticut",
                &["HARTFORD", "NEW BRITAIN", "MIDDLETOWN", "MERIDEN"],
            ),
            KeywordRule::new("Northern Connecticut", &["ENFIELD", "WINDSOR", "MANCHESTER", "VERNON"]),
            KeywordRule::new("Southern Connecticut", &["NEW HAVEN", "MILFORD", "WEST HAVEN", "GUILFORD"]),
        ],
        "Other Connecticut",
        "Unknown",
    )
}

// A rule-set section in a config file patches the built-in set, so a file
// that only lists new rules keeps the default fallback and missing labels.
fn substance_over_defaults<'de, D: Deserializer<'de>>(d: D) -> Result<RuleSet, D::Error> {
    RuleSetPatch::deserialize(d).map(|p| p.apply(default_substance_rules()))
}

fn cause_over_defaults<'de, D: Deserializer<'de>>(d: D) -> Result<RuleSet, D::Error> {
    RuleSetPatch::deserialize(d).map(|p| p.apply(default_cause_rules()))
}

fn regions_over_defaults<'de, D: Deserializer<'de>>(d: D) -> Result<RuleSet, D::Error> {
    RuleSetPatch::deserialize(d).map(|p| p.apply(default_region_rules()))
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            description: "Connecticut spill incidents, 2019-2022 research timeframe".to_string(),
            schema: SchemaConfig::default(),
            datetime: DatetimeConfig::default(),
            units: UnitConversion::default(),
            substance: default_substance_rules(),
            cause: default_cause_rules(),
            regions: default_region_rules(),
            severity: SeverityThresholds::default(),
            quality: QualityConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl PipelineConfig {
    /// Parse a config from a JSON string and check it.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Load `path` if given, otherwise use the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Reject configurations the stages cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut problems = Vec::new();

        let q = &self.quality;
        if q.start_year > q.end_year {
            problems.push(format!("start_year {} > end_year {}", q.start_year, q.end_year));
        }
        if !(q.iqr_multiplier.is_finite() && q.iqr_multiplier >= 0.0) {
            problems.push(format!("iqr_multiplier must be >= 0, got {}", q.iqr_multiplier));
        }
        let s = &self.severity;
        if !(s.low <= s.medium && s.medium <= s.high) {
            problems.push(format!(
                "severity thresholds must ascend, got {} / {} / {}",
                s.low, s.medium, s.high
            ));
        }
        if self.datetime.formats.is_empty() && self.datetime.date_formats.is_empty() {
            problems.push("no datetime formats configured".to_string());
        }
        for (name, rules) in [("substance", &self.substance), ("cause", &self.cause), ("regions", &self.regions)] {
            problems.extend(rules.problems().into_iter().map(|p| format!("{}: {}", name, p)));
        }
        for (name, (_, factor)) in ["gallons", "yards", "feet", "drums", "pounds"]
            .iter()
            .zip(self.units.factors())
        {
            if !(factor.is_finite() && factor >= 0.0) {
                problems.push(format!("unit factor '{}' must be >= 0, got {}", name, factor));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems.join("; ")))
        }
    }
}
