//! Exploratory figures drawn straight from a cleaned table.
//!
//! | File | Content |
//! |------|---------|
//! | `year_wise_incidents_by_cities.svg` | incidents per year, stacked by the 10 busiest towns |
//! | `cities_highest_spills.svg` | 25 busiest towns, horizontal bars |
//! | `time_of_day_incidents.svg` | incidents per hour |
//! | `main_causes_analysis.svg` | cause categories |
//! | `spill_amount_per_incident.svg` | histogram of non-zero quantities, box plot per severity |
//! | `common_substances_analysis.svg` | 15 most common substance categories |
//!
//! Absent columns give empty charts rather than errors.

use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{render_bar_chart, render_error, render_hourly_chart, Bar, DrawResult, PRIMARY, SIZE};
use crate::analysis::{value_counts, Count, HourlyDistribution};
use crate::config::ReportConfig;
use crate::error::ChartResult;
use crate::logs::{log_info_indent, log_success};
use crate::models::{as_f64, as_i64, as_text, cell, columns, Dataset, Severity};

pub const YEAR_WISE_FILE: &str = "year_wise_incidents_by_cities.svg";
pub const CITIES_FILE: &str = "cities_highest_spills.svg";
pub const HOURLY_FILE: &str = "time_of_day_incidents.svg";
pub const MAIN_CAUSES_FILE: &str = "main_causes_analysis.svg";
pub const SPILL_AMOUNT_FILE: &str = "spill_amount_per_incident.svg";
pub const COMMON_SUBSTANCES_FILE: &str = "common_substances_analysis.svg";

const STACKED_TOWNS: usize = 10;
const RANKED_TOWNS: usize = 25;
const TOP_SUBSTANCES: usize = 15;
const HISTOGRAM_BINS: usize = 50;

// =============================================================================
// Data
// =============================================================================

/// Incidents per release year for the busiest towns.
#[derive(Debug, Clone, PartialEq)]
pub struct YearTownCounts {
    /// Ascending
    pub years: Vec<i64>,
    /// Busiest first
    pub towns: Vec<String>,
    /// `counts[t][y]` is the count of `towns[t]` in `years[y]`
    pub counts: Vec<Vec<usize>>,
}

impl YearTownCounts {
    /// Rows with a null town or a non-integral year are skipped.
    pub fn from_dataset(dataset: &Dataset, top_n: usize) -> Self {
        let towns: Vec<String> = value_counts(dataset, columns::TOWN)
            .into_iter()
            .take(top_n)
            .map(|c| c.label)
            .collect();

        let mut per_year: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for record in &dataset.records {
            let Some(year) = as_i64(cell(record, columns::RELEASE_YEAR)) else {
                continue;
            };
            let Some(town) = as_text(cell(record, columns::TOWN)) else {
                continue;
            };
            if let Some(t) = towns.iter().position(|known| *known == town) {
                per_year.entry(year).or_insert_with(|| vec![0; towns.len()])[t] += 1;
            }
        }

        let counts = (0..towns.len())
            .map(|t| per_year.values().map(|row| row[t]).collect())
            .collect();
        Self {
            years: per_year.into_keys().collect(),
            towns,
            counts,
        }
    }

    /// Height of each year's stack.
    pub fn year_totals(&self) -> Vec<usize> {
        (0..self.years.len())
            .map(|y| self.counts.iter().map(|row| row[y]).sum())
            .collect()
    }
}

/// Equal-width bins over a set of quantities.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountBins {
    pub lower: f64,
    /// Zero when every value is the same
    pub width: f64,
    pub counts: Vec<u32>,
}

impl AmountBins {
    /// Split `[min, max]` into `bins` bins; the maximum lands in the last one.
    pub fn from_values(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let mut counts = vec![0u32; bins];
        let (lower, upper) = values
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((*v, *v)),
                Some((lo, hi)) => Some((lo.min(*v), hi.max(*v))),
            })
            .unwrap_or((0.0, 0.0));
        let width = (upper - lower) / bins as f64;

        for v in values {
            let index = if width > 0.0 {
                (((v - lower) / width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[index] += 1;
        }
        Self { lower, width, counts }
    }

    pub fn bin_start(&self, index: u32) -> f64 {
        self.lower + self.width * index as f64
    }
}

/// Non-zero `total_quantity_equivalent` values.
pub fn nonzero_amounts(dataset: &Dataset) -> Vec<f64> {
    dataset
        .column(columns::TOTAL_QUANTITY_EQUIVALENT)
        .filter_map(as_f64)
        .filter(|v| *v > 0.0)
        .collect()
}

/// Non-zero quantities grouped by `incident_severity`, in bucket order.
/// Buckets without a value are left out.
pub fn amounts_by_severity(dataset: &Dataset) -> Vec<(&'static str, Vec<f64>)> {
    Severity::ALL
        .iter()
        .filter_map(|severity| {
            let label = severity.label();
            let values: Vec<f64> = dataset
                .records
                .iter()
                .filter(|r| as_text(cell(r, columns::INCIDENT_SEVERITY)).as_deref() == Some(label))
                .filter_map(|r| as_f64(cell(r, columns::TOTAL_QUANTITY_EQUIVALENT)))
                .filter(|v| *v > 0.0)
                .collect();
            (!values.is_empty()).then_some((label, values))
        })
        .collect()
}

fn bars(counts: Vec<Count>, highlight: &str) -> Vec<Bar> {
    counts
        .into_iter()
        .map(|c| Bar {
            highlighted: c.label == highlight,
            label: c.label,
            value: c.count,
        })
        .collect()
}

// =============================================================================
// Drawing
// =============================================================================

fn draw_year_stack(path: &Path, table: &YearTownCounts) -> DrawResult {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let segments = (table.years.len() as u32).max(1);
    let y_max = table.year_totals().into_iter().max().unwrap_or(0).max(1) as f64 * 1.1;
    let years = &table.years;
    let label_of = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => years.get(*i as usize).map(|y| y.to_string()).unwrap_or_default(),
        _ => String::new(),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption("Incidents per year in the busiest towns", ("sans-serif", 26))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..segments).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Year")
        .y_desc("Number of incidents")
        .x_labels(segments as usize)
        .x_label_formatter(&label_of)
        .draw()?;

    let mut base = vec![0usize; table.years.len()];
    for (t, town) in table.towns.iter().enumerate() {
        let color = Palette99::pick(t).to_rgba();
        let row = &table.counts[t];
        let blocks: Vec<_> = row
            .iter()
            .enumerate()
            .map(|(y, count)| {
                let bottom = base[y] as f64;
                let mut rect = Rectangle::new(
                    [
                        (SegmentValue::Exact(y as u32), bottom),
                        (SegmentValue::Exact(y as u32 + 1), bottom + *count as f64),
                    ],
                    color.filled(),
                );
                rect.set_margin(0, 0, 12, 12);
                rect
            })
            .collect();
        for (y, count) in row.iter().enumerate() {
            base[y] += count;
        }
        chart
            .draw_series(blocks)?
            .label(town.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    if !table.towns.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_ranked(path: &Path, title: &str, bars: &[Bar]) -> DrawResult {
    let root = SVGBackend::new(path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = bars.len() as u32;
    let segments = n.max(1);
    let x_max = bars.iter().map(|b| b.value).max().unwrap_or(0).max(1) as f64 * 1.1;
    // Busiest on top: rank i sits in segment n - 1 - i
    let label_of = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) if *i < n => bars[(n - 1 - *i) as usize].label.clone(),
        _ => String::new(),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(160)
        .build_cartesian_2d(0f64..x_max, (0u32..segments).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Number of spill incidents")
        .y_labels(segments as usize)
        .y_label_formatter(&label_of)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        let row = n - 1 - i as u32;
        let mut rect = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(row)),
                (bar.value as f64, SegmentValue::Exact(row + 1)),
            ],
            PRIMARY.filled(),
        );
        rect.set_margin(3, 3, 0, 0);
        rect
    }))?;

    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        Text::new(
            bar.value.to_string(),
            (bar.value as f64, SegmentValue::CenterOf(n - 1 - i as u32)),
            ("sans-serif", 14).into_font(),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_spill_amounts(path: &Path, bins: &AmountBins, by_severity: &[(&str, Vec<f64>)]) -> DrawResult {
    let root = SVGBackend::new(path, (1600, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Amount of spill per incident", ("sans-serif", 28))?;
    let (left, right) = root.split_horizontally(800);

    let bin_count = (bins.counts.len() as u32).max(1);
    let freq_max = bins.counts.iter().copied().max().unwrap_or(0).max(1) + 1;
    let bin_label = |v: &SegmentValue<u32>| match v {
        SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => format!("{:.0}", bins.bin_start(*i)),
        SegmentValue::Last => String::new(),
    };

    let mut histogram = ChartBuilder::on(&left)
        .caption("Distribution of quantities", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..bin_count).into_segmented(), 0u32..freq_max)?;

    histogram
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Spill quantity (gallons equivalent)")
        .y_desc("Frequency")
        .x_labels(10)
        .x_label_formatter(&bin_label)
        .draw()?;

    histogram.draw_series(
        Histogram::vertical(&histogram)
            .style(PRIMARY.filled())
            .margin(1)
            .data(bins.counts.iter().enumerate().map(|(i, c)| (i as u32, *c))),
    )?;

    let quartiles: Vec<Quartiles> = by_severity
        .iter()
        .map(|(_, values)| Quartiles::new(values.as_slice()))
        .collect();
    let (y_min, y_max) = quartiles.iter().fold((0f32, 1f32), |(lo, hi), q| {
        let v = q.values();
        (lo.min(v[0]), hi.max(v[4]))
    });
    let segments = (by_severity.len() as u32).max(1);
    let severity_label = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => by_severity
            .get(*i as usize)
            .map(|(label, _)| label.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };

    let mut boxes = ChartBuilder::on(&right)
        .caption("Quantities by severity", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d((0u32..segments).into_segmented(), y_min..y_max * 1.1)?;

    boxes
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Incident severity")
        .y_desc("Spill quantity (gallons equivalent)")
        .x_labels(segments as usize)
        .x_label_formatter(&severity_label)
        .draw()?;

    boxes.draw_series(quartiles.iter().enumerate().map(|(i, q)| {
        Boxplot::new_vertical(SegmentValue::CenterOf(i as u32), q)
            .width(40)
            .style(PRIMARY)
    }))?;

    root.present()?;
    Ok(())
}

/// Write the six exploratory figures into `dir`, creating it if needed.
pub fn render_dataset_figures(
    dataset: &Dataset,
    config: &ReportConfig,
    dir: &Path,
) -> ChartResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(6);

    let path = dir.join(YEAR_WISE_FILE);
    let table = YearTownCounts::from_dataset(dataset, STACKED_TOWNS);
    draw_year_stack(&path, &table).map_err(|e| render_error(&path, e))?;
    written.push(path);

    let path = dir.join(CITIES_FILE);
    let towns = bars(
        value_counts(dataset, columns::TOWN).into_iter().take(RANKED_TOWNS).collect(),
        "",
    );
    let title = format!("Top {} towns with the most spills", RANKED_TOWNS);
    draw_ranked(&path, &title, &towns).map_err(|e| render_error(&path, e))?;
    written.push(path);

    let path = dir.join(HOURLY_FILE);
    let hours = HourlyDistribution::from_dataset(dataset, config);
    render_hourly_chart(&path, &hours.counts, &hours.afternoon_hours)?;
    written.push(path);

    let path = dir.join(MAIN_CAUSES_FILE);
    let causes = bars(value_counts(dataset, columns::CAUSE_CATEGORY), &config.highlight_cause);
    render_bar_chart(&path, "Main causes of spill incidents", "Cause category", &causes)?;
    written.push(path);

    let path = dir.join(SPILL_AMOUNT_FILE);
    let bins = AmountBins::from_values(&nonzero_amounts(dataset), HISTOGRAM_BINS);
    draw_spill_amounts(&path, &bins, &amounts_by_severity(dataset)).map_err(|e| render_error(&path, e))?;
    written.push(path);

    let path = dir.join(COMMON_SUBSTANCES_FILE);
    let substances = bars(
        value_counts(dataset, columns::SUBSTANCE_CATEGORY)
            .into_iter()
            .take(TOP_SUBSTANCES)
            .collect(),
        &config.highlight_substance,
    );
    let title = format!("Top {} substances released", TOP_SUBSTANCES);
    render_bar_chart(&path, &title, "Substance category", &substances)?;
    written.push(path);

    log_success(format!("Figures saved to {}", dir.display()));
    for path in &written {
        log_info_indent(path.display().to_string(), 1);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn cleaned() -> Dataset {
        let mut ds = Dataset::new(vec![
            columns::TOWN.into(),
            columns::RELEASE_YEAR.into(),
            columns::RELEASE_HOUR.into(),
            columns::SUBSTANCE_CATEGORY.into(),
            columns::CAUSE_CATEGORY.into(),
            columns::TOTAL_QUANTITY_EQUIVALENT.into(),
            columns::INCIDENT_SEVERITY.into(),
        ]);
        let rows = [
            ("GROTON", 2019, 16, "Petroleum Products", "Motor Vehicle Accident", json!(5), "Low"),
            ("GROTON", 2020, 17, "Petroleum Products", "Motor Vehicle Accident", json!(50), "Medium"),
            ("GROTON", 2020, 9, "Chemicals", "Equipment Failure", json!(0), "Unknown/Minimal"),
            ("HARTFORD", 2019, 9, "Chemicals", "Human Error", json!(7.5), "Low"),
            ("HARTFORD", 2021, 23, "Other", "Other", json!(400), "High"),
            ("ENFIELD", 2021, 2, "Waste Products", "Other", json!(1500), "Very High"),
        ];
        for (town, year, hour, substance, cause, qty, severity) in rows {
            ds.push_row(vec![
                json!(town),
                json!(year),
                json!(hour),
                json!(substance),
                json!(cause),
                qty,
                json!(severity),
            ]);
        }
        ds
    }

    fn file<'a>(written: &'a [PathBuf], name: &str) -> &'a PathBuf {
        written.iter().find(|p| p.file_name().unwrap() == name).unwrap()
    }

    #[test]
    fn test_year_town_counts() {
        let table = YearTownCounts::from_dataset(&cleaned(), 2);
        assert_eq!(table.years, vec![2019, 2020, 2021]);
        assert_eq!(table.towns, vec!["GROTON", "HARTFORD"]);
        assert_eq!(table.counts, vec![vec![1, 2, 0], vec![1, 0, 1]]);
        assert_eq!(table.year_totals(), vec![2, 2, 1]);
    }

    #[test]
    fn test_year_town_counts_skip_fractional_years() {
        let mut ds = cleaned();
        ds.records[0].insert(columns::RELEASE_YEAR.into(), json!(2019.5));
        ds.records[1].insert(columns::TOWN.into(), Value::Null);
        let table = YearTownCounts::from_dataset(&ds, 10);
        assert_eq!(table.year_totals().iter().sum::<usize>(), 4);
    }

    #[test]
    fn test_amount_bins() {
        let bins = AmountBins::from_values(&[1.0, 2.0, 3.0, 11.0], 5);
        assert_eq!(bins.lower, 1.0);
        assert_eq!(bins.width, 2.0);
        assert_eq!(bins.counts, vec![2, 1, 0, 0, 1]);
        assert_eq!(bins.bin_start(2), 5.0);

        let flat = AmountBins::from_values(&[4.0, 4.0], 3);
        assert_eq!(flat.counts, vec![2, 0, 0]);
        assert_eq!(AmountBins::from_values(&[], 3).counts, vec![0, 0, 0]);
    }

    #[test]
    fn test_amounts_by_severity_skips_zero_and_empty_buckets() {
        let ds = cleaned();
        assert_eq!(nonzero_amounts(&ds), vec![5.0, 50.0, 7.5, 400.0, 1500.0]);
        let groups = amounts_by_severity(&ds);
        let labels: Vec<&str> = groups.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Low", "Medium", "High", "Very High"]);
        assert_eq!(groups[0].1, vec![5.0, 7.5]);
    }

    #[test]
    fn test_render_dataset_figures_writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let figures = dir.path().join("figures");
        let written = render_dataset_figures(&cleaned(), &ReportConfig::default(), &figures).unwrap();
        assert_eq!(written.len(), 6);

        let year_wise = std::fs::read_to_string(file(&written, YEAR_WISE_FILE)).unwrap();
        assert!(year_wise.contains("<svg"));
        assert!(year_wise.contains("GROTON"));

        let cities = std::fs::read_to_string(file(&written, CITIES_FILE)).unwrap();
        assert!(cities.contains("HARTFORD"));
        assert!(cities.contains("ENFIELD"));

        let hourly = std::fs::read_to_string(file(&written, HOURLY_FILE)).unwrap();
        assert!(hourly.contains("<svg"));

        let causes = std::fs::read_to_string(file(&written, MAIN_CAUSES_FILE)).unwrap();
        assert!(causes.contains("Motor Vehicle Accident"));

        let amounts = std::fs::read_to_string(file(&written, SPILL_AMOUNT_FILE)).unwrap();
        assert!(amounts.contains("Very High"));

        let substances = std::fs::read_to_string(file(&written, COMMON_SUBSTANCES_FILE)).unwrap();
        assert!(substances.contains("Petroleum Products"));
    }

    #[test]
    fn test_empty_table_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let ds = Dataset::new(vec![columns::TOWN.into()]);
        let written = render_dataset_figures(&ds, &ReportConfig::default(), dir.path()).unwrap();
        assert_eq!(written.len(), 6);
        assert!(written.iter().all(|p| p.exists()));
    }
}
