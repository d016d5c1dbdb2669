//! Research report over a cleaned table.
//!
//! Answers four questions (where, when, what, why) and checks each answer
//! against the claims of the prior study held in [`ReportConfig`].

use serde::Serialize;
use std::fmt;

use super::{distinct_count, percent, shares, value_counts, Share};
use crate::config::ReportConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{as_f64, columns, Dataset};

const REQUIRED: [&str; 5] = [
    columns::TOWN,
    columns::RELEASE_HOUR,
    columns::RELEASE_YEAR,
    columns::SUBSTANCE_CATEGORY,
    columns::CAUSE_CATEGORY,
];

// =============================================================================
// Findings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownRank {
    pub rank: usize,
    pub town: String,
    pub count: usize,
    /// Named as a hotspot by the prior study
    pub expected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownFindings {
    pub top: Vec<TownRank>,
    /// Expected towns present in `top`, in configured order
    pub expected_found: Vec<String>,
    pub expected_total: usize,
}

/// Incidents per hour of day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyDistribution {
    /// Rows per integral hour
    pub counts: [usize; 24],
    /// Rows with an hour in 0..=23, fractional medians from imputation included
    pub valid: usize,
    /// `(hour, count)` with the highest count, earliest hour on ties
    pub peak: Option<(u32, usize)>,
    pub afternoon_hours: Vec<u32>,
    pub afternoon_total: usize,
    pub afternoon_percent: f64,
    /// Busiest hours, most incidents first
    pub top_hours: Vec<(u32, usize)>,
}

impl HourlyDistribution {
    pub fn from_dataset(dataset: &Dataset, config: &ReportConfig) -> Self {
        let mut counts = [0usize; 24];
        let mut valid = 0;
        for hour in dataset.column(columns::RELEASE_HOUR).filter_map(as_f64) {
            if !(0.0..=23.0).contains(&hour) {
                continue;
            }
            valid += 1;
            if hour.fract() == 0.0 {
                counts[hour as usize] += 1;
            }
        }

        let mut ranked: Vec<(u32, usize)> = (0u32..24)
            .map(|h| (h, counts[h as usize]))
            .filter(|(_, c)| *c > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let afternoon_total = config
            .afternoon_hours
            .iter()
            .filter(|h| **h < 24)
            .map(|h| counts[*h as usize])
            .sum();

        Self {
            counts,
            valid,
            peak: ranked.first().copied(),
            afternoon_hours: config.afternoon_hours.clone(),
            afternoon_total,
            afternoon_percent: percent(afternoon_total, valid),
            top_hours: ranked.into_iter().take(config.top_hours).collect(),
        }
    }
}

/// Impact level of a cause by its share of incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    pub fn from_percent(pct: f64, config: &ReportConfig) -> Self {
        if pct > config.high_impact_pct {
            Impact::High
        } else if pct > config.medium_impact_pct {
            Impact::Medium
        } else {
            Impact::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Impact::High => "HIGH",
            Impact::Medium => "MEDIUM",
            Impact::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseShare {
    #[serde(flatten)]
    pub share: Share,
    pub impact: Impact,
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchReport {
    pub total_records: usize,
    pub towns: TownFindings,
    pub hours: HourlyDistribution,
    pub substances: Vec<Share>,
    pub highlight_substance: String,
    pub highlight_substance_percent: f64,
    pub causes: Vec<CauseShare>,
    pub highlight_cause: String,
    pub highlight_cause_percent: f64,
    pub distinct_towns: usize,
    pub distinct_years: usize,
}

impl ResearchReport {
    /// Build the report. Fails only when a column it reads is absent;
    /// an empty table gives an empty report.
    pub fn from_dataset(dataset: &Dataset, config: &ReportConfig) -> PipelineResult<Self> {
        if let Some(missing) = REQUIRED.iter().find(|c| !dataset.has_column(c)) {
            return Err(PipelineError::MissingColumn(missing.to_string()));
        }
        let total = dataset.len();

        let top: Vec<TownRank> = value_counts(dataset, columns::TOWN)
            .into_iter()
            .take(config.top_towns)
            .enumerate()
            .map(|(i, c)| TownRank {
                rank: i + 1,
                expected: config.expected_towns.contains(&c.label),
                town: c.label,
                count: c.count,
            })
            .collect();
        let expected_found = config
            .expected_towns
            .iter()
            .filter(|t| top.iter().any(|r| &r.town == *t))
            .cloned()
            .collect();
        let towns = TownFindings {
            top,
            expected_found,
            expected_total: config.expected_towns.len(),
        };

        let substances = shares(&value_counts(dataset, columns::SUBSTANCE_CATEGORY), total);
        let causes: Vec<CauseShare> = shares(&value_counts(dataset, columns::CAUSE_CATEGORY), total)
            .into_iter()
            .map(|share| CauseShare {
                impact: Impact::from_percent(share.percent, config),
                share,
            })
            .collect();

        let share_of = |list: &[Share], label: &str| {
            list.iter()
                .find(|s| s.label == label)
                .map(|s| s.percent)
                .unwrap_or(0.0)
        };
        let highlight_substance_percent = share_of(&substances, &config.highlight_substance);
        let cause_shares: Vec<Share> = causes.iter().map(|c| c.share.clone()).collect();
        let highlight_cause_percent = share_of(&cause_shares, &config.highlight_cause);

        Ok(Self {
            total_records: total,
            towns,
            hours: HourlyDistribution::from_dataset(dataset, config),
            substances,
            highlight_substance: config.highlight_substance.clone(),
            highlight_substance_percent,
            causes,
            highlight_cause: config.highlight_cause.clone(),
            highlight_cause_percent,
            distinct_towns: distinct_count(dataset, columns::TOWN),
            distinct_years: distinct_count(dataset, columns::RELEASE_YEAR),
        })
    }

    /// Plain-text narrative, see the [`fmt::Display`] impl.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

/// Towns, time of day, substances, causes, then the summary.
impl fmt::Display for ResearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(60);

        writeln!(f, "SPILL INCIDENTS: CONNECTICUT STATE")?;
        writeln!(f, "Dataset: {} records\n", self.total_records)?;

        writeln!(f, "RESEARCH QUESTION 1: Which towns have the most spills?")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "TOP {} TOWNS:", self.towns.top.len())?;
        for t in &self.towns.top {
            let mark = if t.expected { "*" } else { " " };
            writeln!(f, "{} {:2}. {:<20} {} incidents", mark, t.rank, t.town, t.count)?;
        }
        writeln!(
            f,
            "\nValidation: found {}/{} expected top towns",
            self.towns.expected_found.len(),
            self.towns.expected_total
        )?;
        writeln!(f, "Expected towns confirmed: [{}]", self.towns.expected_found.join(", "))?;

        writeln!(f, "\nRESEARCH QUESTION 2: Which time of day is most dangerous?")?;
        writeln!(f, "{}", rule)?;
        match self.hours.peak {
            None => writeln!(f, "No valid hour data found")?,
            Some((hour, count)) => {
                writeln!(f, "Peak hour: {:02}:00 ({} incidents)", hour, count)?;
                writeln!(
                    f,
                    "Afternoon window ({}): {} incidents ({:.1}%)",
                    hour_list(&self.hours.afternoon_hours),
                    self.hours.afternoon_total,
                    self.hours.afternoon_percent
                )?;
                writeln!(f, "\nTOP {} HIGH-RISK HOURS:", self.hours.top_hours.len())?;
                for (i, (hour, count)) in self.hours.top_hours.iter().enumerate() {
                    writeln!(f, "   {}. {:02}:00 - {} incidents", i + 1, hour, count)?;
                }
            }
        }

        writeln!(f, "\nRESEARCH QUESTION 3: Which substances are most common?")?;
        writeln!(f, "{}", rule)?;
        for (i, s) in self.substances.iter().enumerate() {
            let mark = if s.label == self.highlight_substance { "*" } else { " " };
            writeln!(f, "{} {}. {:<20} {} incidents ({:.1}%)", mark, i + 1, s.label, s.count, s.percent)?;
        }
        writeln!(
            f,
            "\nValidation: {} at {:.1}%",
            self.highlight_substance, self.highlight_substance_percent
        )?;

        writeln!(f, "\nRESEARCH QUESTION 4: What are the main causes?")?;
        writeln!(f, "{}", rule)?;
        for (i, c) in self.causes.iter().enumerate() {
            let mark = if c.share.label == self.highlight_cause { "*" } else { " " };
            writeln!(
                f,
                "{} {}. {:<25} {} ({:.1}%) [{} IMPACT]",
                mark,
                i + 1,
                c.share.label,
                c.share.count,
                c.share.percent,
                c.impact.label()
            )?;
        }
        writeln!(
            f,
            "\nValidation: {} at {:.1}% of causes",
            self.highlight_cause, self.highlight_cause_percent
        )?;

        writeln!(f, "\nSUMMARY")?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "Incidents analyzed: {}", self.total_records)?;
        writeln!(f, "Municipalities: {}", self.distinct_towns)?;
        writeln!(f, "Years of data: {}", self.distinct_years)
    }
}

fn hour_list(hours: &[u32]) -> String {
    hours
        .iter()
        .map(|h| format!("{:02}:00", h))
        .collect::<Vec<_>>()
        .join(", ")
}
