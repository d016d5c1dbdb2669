//! Schema Normalizer: raw export headers to canonical snake-case names.

use crate::config::SchemaConfig;
use crate::models::Dataset;

/// Canonical name for one header.
///
/// Known raw headers use the configured mapping; anything else is lowercased
/// with spaces and slashes turned into underscores. Canonical names map to
/// themselves, so applying this twice changes nothing.
pub fn canonical_name(header: &str, schema: &SchemaConfig) -> String {
    let mapped = schema
        .renames
        .get(header)
        .map(String::as_str)
        .unwrap_or(header);
    mapped.to_lowercase().replace([' ', '/'], "_")
}

/// Rename every column of `dataset` to its canonical name.
pub fn normalize_columns(dataset: &mut Dataset, schema: &SchemaConfig) {
    dataset.rename_columns(|header| canonical_name(header, schema));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw() -> Dataset {
        let mut ds = Dataset::new(vec![
            "Case No.".into(),
            "Town of Release".into(),
            "Responsibile Party/Discharger".into(),
            "Extra Notes/Comments".into(),
        ]);
        ds.push_row(vec![json!("2020-001"), json!("Groton"), json!("ACME"), json!("n/a")]);
        ds
    }

    #[test]
    fn test_mapped_headers() {
        let schema = SchemaConfig::default();
        assert_eq!(canonical_name("Case No.", &schema), "case_number");
        assert_eq!(canonical_name("Release date and time", &schema), "release_datetime");
        assert_eq!(
            canonical_name("Responsible Party Accepts Responsibility (Y/N)", &schema),
            "accepts_responsibility"
        );
    }

    #[test]
    fn test_unmapped_headers_pass_through_normalized() {
        let schema = SchemaConfig::default();
        assert_eq!(canonical_name("Extra Notes/Comments", &schema), "extra_notes_comments");
        assert_eq!(canonical_name("Lat", &schema), "lat");
    }

    #[test]
    fn test_values_and_row_count_unchanged() {
        let mut ds = raw();
        normalize_columns(&mut ds, &SchemaConfig::default());

        assert_eq!(
            ds.columns,
            vec!["case_number", "town", "responsible_party", "extra_notes_comments"]
        );
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0]["town"], "Groton");
        assert_eq!(ds.records[0]["extra_notes_comments"], "n/a");
    }

    #[test]
    fn test_idempotent() {
        let schema = SchemaConfig::default();
        let mut once = raw();
        normalize_columns(&mut once, &schema);
        let mut twice = once.clone();
        normalize_columns(&mut twice, &schema);
        assert_eq!(once, twice);
    }
}
