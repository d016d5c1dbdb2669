//! # ctspill - Connecticut spill incident cleaning and research report
//!
//! Cleans the state's hazardous-material spill export into an analysis-ready
//! table, then recomputes the aggregates behind a published study and checks
//! its claims.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│        Transform         │────▶│ Cleaned CSV │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ schema → normalize →     │     └──────┬──────┘
//! └─────────────┘     └─────────────┘     │ categorize → quality     │            │
//!                                         └──────────────────────────┘            ▼
//!                                                                  ┌─────────────────────────┐
//!                                                                  │ Analysis (report, SVG)  │
//!                                                                  └─────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ctspill::{process_file, PipelineConfig, ProcessOptions, ResearchReport};
//!
//! let config = PipelineConfig::default();
//! let cleaned = process_file("spills.csv", &config, &ProcessOptions::default())?;
//! let report = ResearchReport::from_dataset(&cleaned.dataset, &config.report)?;
//! println!("{}", report.render());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Progress logging helpers
//! - [`models`] - Dataset, canonical columns, day periods, severity
//! - [`config`] - Lookup tables and thresholds
//! - [`parser`] - CSV loading with auto-detection, CSV writing
//! - [`transform`] - The four cleaning stages and the pipeline
//! - [`analysis`] - Frequency tables, research report, column summary
//! - [`charts`] - SVG figures

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Configuration
pub mod config;

// Parsing
pub mod parser;

// Cleaning
pub mod transform;

// Reporting
pub mod analysis;
pub mod charts;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ChartError, ChartResult, ConfigError, ConfigResult, CsvError, CsvResult, PipelineError,
    PipelineResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{columns, Dataset, Record, Severity, TimePeriod};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    DatetimeConfig, PipelineConfig, QualityConfig, ReportConfig, SchemaConfig, SeverityThresholds,
    UnitConversion,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv_file_auto,
    parse_str, write_csv, write_csv_file, ParseResult,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    process_bytes, process_dataset, process_file, CsvInfo, ProcessOptions, ProcessResult,
    StageCounts,
};
pub use transform::{KeywordRule, QualitySummary, RuleSet};

// =============================================================================
// Re-exports - Analysis
// =============================================================================

pub use analysis::{
    render_summary, summarize_columns, value_counts, ColumnSummary, Count, ResearchReport, Share,
};
pub use charts::{render_dataset_figures, render_research_figures};
