//! Per-column summary of a table.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::models::{as_f64, as_i64, cell_to_string, Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    /// Every cell is null
    Empty,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
            ColumnKind::Empty => "empty",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null: usize,
    pub null: usize,
    pub distinct: usize,
}

/// Summarize every column, in column order.
pub fn summarize_columns(dataset: &Dataset) -> Vec<ColumnSummary> {
    dataset
        .columns
        .iter()
        .map(|name| {
            let values: Vec<_> = dataset.column(name).filter(|v| !v.is_null()).collect();
            let kind = if values.is_empty() {
                ColumnKind::Empty
            } else if values.iter().all(|v| as_i64(v).is_some()) {
                ColumnKind::Integer
            } else if values.iter().all(|v| as_f64(v).is_some()) {
                ColumnKind::Float
            } else {
                ColumnKind::Text
            };
            let distinct = values
                .iter()
                .map(|v| cell_to_string(v))
                .collect::<BTreeSet<_>>()
                .len();
            ColumnSummary {
                name: name.clone(),
                kind,
                non_null: values.len(),
                null: dataset.len() - values.len(),
                distinct,
            }
        })
        .collect()
}

/// Fixed-width table of [`summarize_columns`] output.
pub fn render_summary(summaries: &[ColumnSummary]) -> String {
    let width = summaries
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(6)
        .max(6);
    let mut out = format!(
        "{:<width$}  {:<8} {:>9} {:>9} {:>9}\n",
        "column",
        "type",
        "non-null",
        "null",
        "distinct",
        width = width
    );
    for s in summaries {
        out.push_str(&format!(
            "{:<width$}  {:<8} {:>9} {:>9} {:>9}\n",
            s.name,
            s.kind.to_string(),
            s.non_null,
            s.null,
            s.distinct,
            width = width
        ));
    }
    out
}
