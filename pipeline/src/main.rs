//! ctspill CLI - clean Connecticut spill incident exports and report on them
//!
//! # Main Commands
//!
//! ```bash
//! ctspill clean data/raw/spill_incidents_raw.csv          # Raw export -> cleaned CSV
//! ctspill report data/processed/spill_incidents_clean.csv # Research report + SVG figures
//! ctspill figures data/processed/spill_incidents_clean.csv # Exploratory SVG figures
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! ctspill summary cleaned.csv                # Column types and null counts
//! ctspill categorize --substance "diesel"    # Show how a value is categorized
//! ctspill default-config > config.json       # Built-in lookup tables as JSON
//! ```

use clap::{Parser, Subcommand};
use ctspill::logs::{log_info, log_success};
use ctspill::{
    parse_csv_file_auto, process_file, render_dataset_figures, render_research_figures, render_summary,
    summarize_columns,
    write_csv_file, PipelineConfig, ProcessOptions, ResearchReport, RuleSet,
};
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "ctspill")]
#[command(about = "Clean and analyse Connecticut spill incident reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full cleaning pipeline: raw CSV -> cleaned CSV
    Clean {
        /// Raw CSV export
        input: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "data/processed/spill_incidents_clean.csv")]
        output: PathBuf,

        /// JSON config overriding the built-in tables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// First year kept (inclusive)
        #[arg(long)]
        start_year: Option<i32>,

        /// Last year kept (inclusive)
        #[arg(long)]
        end_year: Option<i32>,

        /// Keep every year
        #[arg(long)]
        no_filter: bool,

        /// Keep quantity outliers
        #[arg(long)]
        no_outliers: bool,
    },

    /// Research report over a cleaned CSV
    Report {
        /// Cleaned CSV
        input: PathBuf,

        /// JSON config overriding the built-in tables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for SVG figures
        #[arg(long, default_value = "reports/figures")]
        figures: PathBuf,

        /// Skip figure rendering
        #[arg(long)]
        no_charts: bool,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Exploratory figures over a cleaned CSV
    Figures {
        /// Cleaned CSV
        input: PathBuf,

        /// JSON config overriding the built-in tables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "reports/figures")]
        dir: PathBuf,
    },

    /// Column types, null counts and distinct counts of a CSV
    Summary {
        /// CSV file
        input: PathBuf,
    },

    /// Show which category a value falls into
    Categorize {
        #[arg(long)]
        substance: Option<String>,

        #[arg(long)]
        cause: Option<String>,

        /// Town name, categorized into a region
        #[arg(long)]
        town: Option<String>,

        /// JSON config overriding the built-in tables
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the built-in configuration
    DefaultConfig,
}

fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(log::LevelFilter::Info),
    };
    builder.try_init().ok();
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    init_logger();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Clean {
            input,
            output,
            config,
            start_year,
            end_year,
            no_filter,
            no_outliers,
        } => {
            let options = ProcessOptions {
                start_year,
                end_year,
                skip_timeframe: no_filter,
                skip_outliers: no_outliers,
            };
            cmd_clean(&input, &output, config.as_deref(), &options)
        }

        Commands::Report {
            input,
            config,
            figures,
            no_charts,
            json,
        } => cmd_report(&input, config.as_deref(), (!no_charts).then_some(figures.as_path()), json),

        Commands::Figures { input, config, dir } => cmd_figures(&input, config.as_deref(), &dir),

        Commands::Summary { input } => cmd_summary(&input),

        Commands::Categorize {
            substance,
            cause,
            town,
            config,
        } => cmd_categorize(substance, cause, town, config.as_deref()),

        Commands::DefaultConfig => cmd_default_config(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_clean(input: &Path, output: &Path, config: Option<&Path>, options: &ProcessOptions) -> CliResult {
    let config = PipelineConfig::load_or_default(config)?;
    let result = process_file(input, &config, options)?;

    write_csv_file(&result.dataset, output)?;
    log_success(format!(
        "Cleaned data saved to {} ({} records, {} columns)",
        output.display(),
        result.dataset.len(),
        result.dataset.columns.len()
    ));
    Ok(())
}

fn cmd_report(input: &Path, config: Option<&Path>, figures: Option<&Path>, json: bool) -> CliResult {
    let config = PipelineConfig::load_or_default(config)?;
    log_info(format!("📖 Loading {}", input.display()));
    let dataset = parse_csv_file_auto(input)?.dataset;
    log_success(format!("Dataset loaded: {} records", dataset.len()));

    let report = ResearchReport::from_dataset(&dataset, &config.report)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }

    if let Some(dir) = figures {
        render_research_figures(&report, dir)?;
    }
    Ok(())
}

fn cmd_figures(input: &Path, config: Option<&Path>, dir: &Path) -> CliResult {
    let config = PipelineConfig::load_or_default(config)?;
    log_info(format!("📖 Loading {}", input.display()));
    let dataset = parse_csv_file_auto(input)?.dataset;
    log_success(format!("Dataset loaded: {} records", dataset.len()));

    render_dataset_figures(&dataset, &config.report, dir)?;
    Ok(())
}

fn cmd_summary(input: &Path) -> CliResult {
    let dataset = parse_csv_file_auto(input)?.dataset;
    println!("{} rows, {} columns\n", dataset.len(), dataset.columns.len());
    print!("{}", render_summary(&summarize_columns(&dataset)));
    Ok(())
}

fn explain(kind: &str, rules: &RuleSet, text: &str) {
    let c = rules.explain(Some(text));
    match (c.rule, c.keyword) {
        (Some(i), Some(keyword)) => {
            println!("{} \"{}\" → {} (rule {}, keyword \"{}\")", kind, text, c.label, i + 1, keyword)
        }
        _ => println!("{} \"{}\" → {} (no keyword matched)", kind, text, c.label),
    }
}

fn cmd_categorize(
    substance: Option<String>,
    cause: Option<String>,
    town: Option<String>,
    config: Option<&Path>,
) -> CliResult {
    let config = PipelineConfig::load_or_default(config)?;

    if substance.is_none() && cause.is_none() && town.is_none() {
        print!("{}", config.substance.describe("Substance categories"));
        print!("{}", config.cause.describe("Cause categories"));
        print!("{}", config.regions.describe("Regions"));
        return Ok(());
    }
    if let Some(text) = substance {
        explain("substance", &config.substance, &text);
    }
    if let Some(text) = cause {
        explain("cause", &config.cause, &text);
    }
    if let Some(text) = town {
        explain("town", &config.regions, &text.trim().to_uppercase());
    }
    Ok(())
}

fn cmd_default_config() -> CliResult {
    println!("{}", PipelineConfig::default().to_json()?);
    Ok(())
}
