//! Static SVG figures for the research report.
//!
//! | File | Content |
//! |------|---------|
//! | `research_q1_top_towns.svg` | top towns, expected hotspots highlighted |
//! | `research_q2_time_of_day.svg` | incidents per hour |
//! | `research_q3_substances.svg` | substance categories |
//! | `research_q4_causes.svg` | cause categories |
//!
//! [`figures`] draws the exploratory set straight from a cleaned table.

pub mod figures;

pub use figures::{render_dataset_figures, AmountBins, YearTownCounts};

use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};

use crate::analysis::ResearchReport;
use crate::error::{ChartError, ChartResult};
use crate::logs::{log_error, log_info_indent, log_success};

const PRIMARY: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const HIGHLIGHT: RGBColor = RGBColor(0xd6, 0x27, 0x28);
const SIZE: (u32, u32) = (1200, 700);

pub const TOP_TOWNS_FILE: &str = "research_q1_top_towns.svg";
pub const TIME_OF_DAY_FILE: &str = "research_q2_time_of_day.svg";
pub const SUBSTANCES_FILE: &str = "research_q3_substances.svg";
pub const CAUSES_FILE: &str = "research_q4_causes.svg";

type DrawResult = Result<(), Box<dyn Error>>;

/// One bar of a category chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: usize,
    pub highlighted: bool,
}

fn render_error(path: &Path, err: Box<dyn Error>) -> ChartError {
    let chart = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    log_error(format!("Could not render {}: {}", chart, err));
    ChartError::Render { chart, message: err.to_string() }
}

fn draw_bars(path: &Path, title: &str, x_desc: &str, bars: &[Bar]) -> DrawResult {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let segments = (bars.len() as u32).max(1);
    let y_max = bars.iter().map(|b| b.value).max().unwrap_or(0).max(1) as f64 * 1.1;
    let labels: Vec<&str> = bars.iter().map(|b| b.label.as_str()).collect();
    let label_of = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).map(|l| l.to_string()).unwrap_or_default(),
        _ => String::new(),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26))
        .margin(20)
        .x_label_area_size(90)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..segments).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("Number of incidents")
        .x_labels(segments as usize)
        .x_label_formatter(&label_of)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        let color = if bar.highlighted { HIGHLIGHT } else { PRIMARY };
        let mut rect = Rectangle::new(
            [
                (SegmentValue::Exact(i as u32), 0.0),
                (SegmentValue::Exact(i as u32 + 1), bar.value as f64),
            ],
            color.filled(),
        );
        rect.set_margin(0, 0, 8, 8);
        rect
    }))?;

    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        Text::new(
            bar.value.to_string(),
            (SegmentValue::CenterOf(i as u32), bar.value as f64),
            ("sans-serif", 14).into_font(),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_hours(path: &Path, counts: &[usize; 24], highlighted: &[u32]) -> DrawResult {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .caption("Incidents by hour of release", ("sans-serif", 26))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0u32..23u32, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Hour of day")
        .y_desc("Number of incidents")
        .x_labels(24)
        .x_label_formatter(&|h| format!("{:02}", h))
        .draw()?;

    let points: Vec<(u32, f64)> = (0u32..24).map(|h| (h, counts[h as usize] as f64)).collect();
    chart.draw_series(LineSeries::new(points.clone(), &PRIMARY))?;
    chart.draw_series(points.into_iter().map(|(h, c)| {
        let color = if highlighted.contains(&h) { HIGHLIGHT } else { PRIMARY };
        Circle::new((h, c), 4, color.filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Bar chart of labelled counts.
pub fn render_bar_chart(path: &Path, title: &str, x_desc: &str, bars: &[Bar]) -> ChartResult<()> {
    draw_bars(path, title, x_desc, bars).map_err(|e| render_error(path, e))
}

/// Line chart of the 24 hourly counts, `highlighted` hours marked.
pub fn render_hourly_chart(path: &Path, counts: &[usize; 24], highlighted: &[u32]) -> ChartResult<()> {
    draw_hours(path, counts, highlighted).map_err(|e| render_error(path, e))
}

/// Write the four research figures into `dir`, creating it if needed.
pub fn render_research_figures(report: &ResearchReport, dir: &Path) -> ChartResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(4);

    let towns: Vec<Bar> = report
        .towns
        .top
        .iter()
        .map(|t| Bar { label: t.town.clone(), value: t.count, highlighted: t.expected })
        .collect();
    let path = dir.join(TOP_TOWNS_FILE);
    render_bar_chart(&path, "Top municipalities by incident count", "Municipality", &towns)?;
    written.push(path);

    let path = dir.join(TIME_OF_DAY_FILE);
    render_hourly_chart(&path, &report.hours.counts, &report.hours.afternoon_hours)?;
    written.push(path);

    let substances: Vec<Bar> = report
        .substances
        .iter()
        .map(|s| Bar {
            label: s.label.clone(),
            value: s.count,
            highlighted: s.label == report.highlight_substance,
        })
        .collect();
    let path = dir.join(SUBSTANCES_FILE);
    render_bar_chart(&path, "Substance category distribution", "Substance category", &substances)?;
    written.push(path);

    let causes: Vec<Bar> = report
        .causes
        .iter()
        .map(|c| Bar {
            label: c.share.label.clone(),
            value: c.share.count,
            highlighted: c.share.label == report.highlight_cause,
        })
        .collect();
    let path = dir.join(CAUSES_FILE);
    render_bar_chart(&path, "Primary causation factors", "Cause category", &causes)?;
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
    use crate::config::ReportConfig;
    use crate::models::{columns, Dataset};
    use serde_json::json;

    fn report(rows: usize) -> ResearchReport {
        let mut ds = Dataset::new(vec![
            columns::TOWN.into(),
            columns::RELEASE_HOUR.into(),
            columns::RELEASE_YEAR.into(),
            columns::SUBSTANCE_CATEGORY.into(),
            columns::CAUSE_CATEGORY.into(),
        ]);
        let towns = ["GROTON", "HARTFORD", "BETHEL"];
        for i in 0..rows {
            ds.push_row(vec![
                json!(towns[i % 3]),
                json!((i * 5) % 24),
                json!(2020),
                json!(if i % 2 == 0 { "Petroleum Products" } else { "Chemicals" }),
                json!("Motor Vehicle Accident"),
            ]);
        }
        ResearchReport::from_dataset(&ds, &ReportConfig::default()).unwrap()
    }

    #[test]
    fn test_render_research_figures() {
        let dir = tempfile::tempdir().unwrap();
        let figures = dir.path().join("reports").join("figures");
        let written = render_research_figures(&report(12), &figures).unwrap();

        assert_eq!(written.len(), 4);
        for (path, name) in written.iter().zip([TOP_TOWNS_FILE, TIME_OF_DAY_FILE, SUBSTANCES_FILE, CAUSES_FILE]) {
            assert_eq!(path.file_name().unwrap(), name);
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"));
        }
        let towns = std::fs::read_to_string(&written[0]).unwrap();
        assert!(towns.contains("GROTON"));
    }

    #[test]
    fn test_empty_report_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let written = render_research_figures(&report(0), dir.path()).unwrap();
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_render_into_missing_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();
        let err = render_research_figures(&report(3), &file).unwrap_err();
        assert!(matches!(err, ChartError::IoError(_)));
    }
}
