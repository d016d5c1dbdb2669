//! Cleaning stages.
//!
//! - Schema: raw headers to canonical names
//! - Normalize: timestamps, quantities, text casing
//! - Rules: ordered keyword rules
//! - Categorize: substance, cause, region, severity
//! - Quality: year window, imputation, outlier fence
//! - Pipeline: all of the above in order

pub mod categorize;
pub mod normalize;
pub mod pipeline;
pub mod quality;
pub mod rules;
pub mod schema;

pub use categorize::{categorize, categorize_severity};
pub use pipeline::*;
pub use quality::{tukey_fence, QualitySummary};
pub use rules::{Classification, KeywordRule, RuleSet, RuleSetPatch};
pub use schema::normalize_columns;
