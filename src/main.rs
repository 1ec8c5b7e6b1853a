//! Fighter career CLI
//!
//! Builds per-fighter career timelines, rolling form, style-weighted
//! performance scores and peak windows from a CSV of fight records.

use clap::{Parser, Subcommand};
use fightcareer::{Config, Result};

#[derive(Parser)]
#[command(name = "fightcareer")]
#[command(about = "Fighter career timelines and performance scoring", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the output tables
    Run {
        /// Input fight CSV (defaults to data.input_path)
        #[arg(long)]
        input: Option<String>,
        /// Fighter-level event table
        #[arg(long)]
        output: Option<String>,
        /// Peak window table
        #[arg(long)]
        peaks: Option<String>,
        /// Career stage table
        #[arg(long)]
        stages: Option<String>,
    },
    /// Show one fighter's career timeline
    Career {
        /// Fighter id or name
        fighter: String,
        /// Input fight CSV (defaults to data.input_path)
        #[arg(long)]
        input: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show cohort, style, band and career stage summaries
    Summary {
        /// Input fight CSV (defaults to data.input_path)
        #[arg(long)]
        input: Option<String>,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Run {
            input,
            output,
            peaks,
            stages,
        } => commands::run(&config, input, output, peaks, stages),
        Commands::Career {
            fighter,
            input,
            format,
        } => commands::career(&config, &fighter, input, format),
        Commands::Summary { input } => commands::summary(&config, input),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use fightcareer::data::{load_matches, write_outputs, OutputPaths};
    use fightcareer::features::{CareerStage, PerformanceBand, RollingMetric, Style};
    use fightcareer::pipeline::{EventRow, Pipeline, PipelineOutput};
    use std::collections::BTreeMap;

    fn fmt_opt(value: Option<f64>, precision: usize) -> String {
        value
            .map(|v| format!("{:.*}", precision, v))
            .unwrap_or_else(|| "-".to_string())
    }

    fn run_pipeline(config: &Config, input: Option<String>) -> Result<PipelineOutput> {
        let input = input.unwrap_or_else(|| config.data.input_path.clone());
        let matches = load_matches(&input, &config.data)?;
        Pipeline::new(config.clone()).run(&matches)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("csv")?;
        println!("Created csv/ directory");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Put the cleaned fight data at {}", config.data.input_path);
        println!("  3. Run 'fightcareer run' to build the career tables");
        println!("  4. Run 'fightcareer career \"Fighter Name\"' to inspect a career");

        Ok(())
    }

    pub fn run(
        config: &Config,
        input: Option<String>,
        output: Option<String>,
        peaks: Option<String>,
        stages: Option<String>,
    ) -> Result<()> {
        let result = run_pipeline(config, input)?;

        let mut paths = OutputPaths::from_config(&config.data);
        if let Some(p) = output {
            paths.events = p.into();
        }
        if let Some(p) = peaks {
            paths.peaks = p.into();
        }
        if let Some(p) = stages {
            paths.stages = p.into();
        }

        write_outputs(&result, &paths)?;

        println!("Pipeline complete");
        println!("───────────────────────────────");
        println!("  Fights:       {}", result.summary.total_fights);
        println!("  Fighter rows: {}", result.rows.len());
        println!("  Fighters:     {}", result.summary.unique_fighters);
        println!("  Peaks found:  {}", result.peaks.len());
        println!("  Events:       {}", paths.events.display());
        println!("  Peaks:        {}", paths.peaks.display());
        println!("  Stages:       {}", paths.stages.display());

        Ok(())
    }

    pub fn career(
        config: &Config,
        fighter: &str,
        input: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let result = run_pipeline(config, input)?;
        let rows = result.career(fighter)?;

        match format {
            OutputFormat::Table => {
                let win_column = RollingMetric::WinFlag.column_name(config.peak.window);
                let win_index = result.rolling_columns.iter().position(|c| *c == win_column);
                print_career_table(&rows, win_index, config.peak.window);
            }
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = rows
                    .iter()
                    .map(|r| {
                        let rolling: serde_json::Map<String, serde_json::Value> = result
                            .rolling_columns
                            .iter()
                            .zip(&r.rolling)
                            .map(|(name, value)| (name.clone(), serde_json::json!(value)))
                            .collect();
                        let record = &r.entry.record;
                        serde_json::json!({
                            "fight_number": r.entry.fight_number,
                            "date": record.date,
                            "event_name": record.event_name,
                            "opponent": record.opponent_name,
                            "outcome": record.outcome.to_string(),
                            "win_flag": r.win_flag(),
                            "days_since_last_fight": r.entry.days_since_last_fight,
                            "age_at_fight": r.entry.age_at_fight,
                            "rolling": rolling,
                            "style": r.style.to_string(),
                            "performance_0_100": r.score.scaled,
                            "performance_category": r.score.band.map(|b| b.to_string()),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(std::io::stdout());
                writer.write_record(fightcareer::data::writer::event_header(
                    &result.rolling_columns,
                ))?;
                for row in &rows {
                    writer.write_record(fightcareer::data::writer::event_record(row))?;
                }
                writer.flush()?;
            }
        }

        Ok(())
    }

    fn print_career_table(rows: &[&EventRow], win_index: Option<usize>, window: usize) {
        let Some(first) = rows.first() else {
            return;
        };
        println!("Career: {} ({})", first.entry.record.name, first.fighter());
        println!("{}", "─".repeat(96));
        println!(
            "{:>3}  {:<10}  {:<24}  {:<12}  {:>5}  {:>6}  {:<9}  {:>5}  {}",
            "#",
            "Date",
            "Opponent",
            "Outcome",
            "Age",
            format!("Win%{}", window),
            "Style",
            "Perf",
            "Band"
        );
        for row in rows {
            let record = &row.entry.record;
            let win_rate = win_index.and_then(|i| row.rolling.get(i).copied().flatten());
            println!(
                "{:>3}  {:<10}  {:<24}  {:<12}  {:>5}  {:>6}  {:<9}  {:>5}  {}",
                row.entry.fight_number,
                record.date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                record.opponent_name,
                record.outcome.to_string(),
                fmt_opt(row.entry.age_at_fight, 1),
                fmt_opt(win_rate.map(|w| w * 100.0), 0),
                row.style.to_string(),
                fmt_opt(row.score.scaled, 1),
                row.score.band.map(|b| b.to_string()).unwrap_or_default(),
            );
        }
    }

    pub fn summary(config: &Config, input: Option<String>) -> Result<()> {
        let result = run_pipeline(config, input)?;
        let summary = &result.summary;

        println!("Cohort Summary");
        println!("───────────────────────────────");
        println!("  Fights:       {}", summary.total_fights);
        println!("  Fighter rows: {}", summary.total_rows);
        println!("  Fighters:     {}", summary.unique_fighters);
        if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
            println!("  Range:        {} to {}", first, last);
        }

        let mut styles: BTreeMap<Style, usize> = BTreeMap::new();
        let mut bands: BTreeMap<PerformanceBand, usize> = BTreeMap::new();
        for row in &result.rows {
            *styles.entry(row.style).or_default() += 1;
            if let Some(band) = row.score.band {
                *bands.entry(band).or_default() += 1;
            }
        }
        let total = result.rows.len().max(1) as f64;

        println!("\nStyle Mix");
        println!("───────────────────────────────");
        for style in Style::ALL {
            let count = styles.get(&style).copied().unwrap_or(0);
            println!(
                "  {:<10} {:>7}  ({:.1}%)",
                style.to_string(),
                count,
                100.0 * count as f64 / total
            );
        }

        println!("\nPerformance Bands");
        println!("───────────────────────────────");
        for band in PerformanceBand::ALL {
            let count = bands.get(&band).copied().unwrap_or(0);
            println!("  {:<24} {:>7}", band.to_string(), count);
        }

        println!(
            "\nCareer Stages (fighters with {}+ fights)",
            config.peak.min_fights
        );
        println!("───────────────────────────────");
        println!("  {:<14} {:>7} {:>8} {:>8}", "Stage", "Fights", "Win%", "Age");
        for stage in CareerStage::ALL {
            let found = result.stages.iter().find(|s| s.stage == stage);
            println!(
                "  {:<14} {:>7} {:>8} {:>8}",
                stage.to_string(),
                found.map(|s| s.fights).unwrap_or(0),
                fmt_opt(found.and_then(|s| s.win_rate).map(|w| w * 100.0), 1),
                fmt_opt(found.and_then(|s| s.mean_age), 1),
            );
        }

        Ok(())
    }
}
