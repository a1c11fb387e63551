//! Ceteris CLI Module
//!
//! Command-line interface for computing what-if profiles from tabular data and
//! a JSON model description.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::aggregate::{aggregate, AggregateOptions, GroupBy, Reduction};
use crate::data::{Dataset, Value};
use crate::explainer::{Explainer, LinearModel};
use crate::export::{plot_rows, write_csv, write_json, ExportOptions};
use crate::grid::GridStrategy;
use crate::profile::{Observation, ProfileGenerator, WhatIfConfig};
use crate::sampling::select_sample;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString { s.truecolor(230, 190, 90) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ceteris")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ceteris-paribus (what-if) profiles for predictive models")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute what-if profiles for observations of a dataset
    Profile {
        /// Reference data file (CSV, JSON, or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Linear model description (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Response column, excluded from the profiled variables
        #[arg(short, long)]
        target: Option<String>,

        /// Explainer label
        #[arg(short, long, default_value = "model")]
        label: String,

        /// Row indices to profile
        #[arg(long = "obs", value_delimiter = ',')]
        observations: Vec<usize>,

        /// Profile a random sample of this many rows instead
        #[arg(long)]
        sample: Option<usize>,

        /// Seed for --sample
        #[arg(long)]
        seed: Option<u64>,

        /// Variables to profile (default: all)
        #[arg(long, value_delimiter = ',')]
        variables: Vec<String>,

        /// Grid points per continuous variable
        #[arg(long)]
        grid_points: Option<usize>,

        /// Grid strategy (quantile, uniform)
        #[arg(long)]
        strategy: Option<String>,

        /// Worker threads
        #[arg(long)]
        threads: Option<usize>,

        /// Aggregate profiles with this reduction (mean, median, min, max, sum)
        #[arg(long)]
        aggregate: Option<String>,

        /// Group key for aggregation (label, observation, const:<key>, or a column name)
        #[arg(long, default_value = "label")]
        group_by: String,

        /// Only export aggregated curves
        #[arg(long)]
        hide_profiles: bool,

        /// Output file for exported rows (.json or .csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// What-if configuration file (JSON); flags override it
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show information about a dataset and the inferred variable kinds
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Data loading ──────────────────────────────────────────────────────────────

pub fn load_data(path: &Path) -> anyhow::Result<DataFrame> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let df = match ext {
        "csv" => CsvReadOptions::default()
            .with_infer_schema_length(Some(1000))
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        "json" => JsonReader::new(std::fs::File::open(path)?)
            .finish()?,
        "parquet" => ParquetReader::new(std::fs::File::open(path)?)
            .finish()?,
        _ => anyhow::bail!("Unsupported file format: {}", ext),
    };

    Ok(df)
}

fn response_vector(values: Vec<Value>, target: &str) -> anyhow::Result<Vec<f64>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_number()
                .ok_or_else(|| anyhow::anyhow!("Response '{}' is not numeric at row {}", target, i))
        })
        .collect()
}

fn parse_strategy(s: &str) -> anyhow::Result<GridStrategy> {
    match s {
        "quantile" => Ok(GridStrategy::Quantile),
        "uniform" => Ok(GridStrategy::Uniform),
        _ => anyhow::bail!("Invalid grid strategy: {}", s),
    }
}

/// Listed rows first, then a seeded sample; the first row otherwise
fn choose_observations(
    explainer: &Explainer,
    rows: &[usize],
    sample: Option<usize>,
    seed: Option<u64>,
) -> crate::Result<Vec<Observation>> {
    if !rows.is_empty() {
        return rows.iter().map(|&i| explainer.observation(i)).collect();
    }
    match sample {
        Some(n) => select_sample(explainer, n, seed),
        None => Ok(vec![explainer.observation(0)?]),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub struct ProfileArgs {
    pub data: PathBuf,
    pub model: PathBuf,
    pub target: Option<String>,
    pub label: String,
    pub observations: Vec<usize>,
    pub sample: Option<usize>,
    pub seed: Option<u64>,
    pub variables: Vec<String>,
    pub grid_points: Option<usize>,
    pub strategy: Option<String>,
    pub threads: Option<usize>,
    pub aggregate: Option<String>,
    pub group_by: String,
    pub hide_profiles: bool,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub fn cmd_profile(args: ProfileArgs) -> anyhow::Result<()> {
    section("What-if profiles");

    let mut config = match &args.config {
        Some(path) => WhatIfConfig::load(path)?,
        None => WhatIfConfig::default(),
    };
    if let Some(points) = args.grid_points {
        config.grid = config.grid.with_resolution(points);
    }
    if let Some(strategy) = &args.strategy {
        config.grid = config.grid.with_strategy(parse_strategy(strategy)?);
    }
    if !args.variables.is_empty() {
        config = config.with_variables(args.variables.iter().cloned());
    }
    if let Some(n) = args.threads {
        config.parallel = config.parallel.with_threads(n);
    }

    step_run("Loading data");
    let start = Instant::now();
    let df = load_data(&args.data)?;
    let mut dataset = Dataset::from_dataframe(&df)?;
    let response = match &args.target {
        Some(target) => Some(response_vector(dataset.take_column(target)?, target)?),
        None => None,
    };
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run("Loading model");
    let model = LinearModel::load(&args.model)?;
    step_done(&args.model.display().to_string());

    let mut builder = Explainer::builder(&args.label)
        .with_model(model)
        .with_data(dataset);
    if let Some(response) = response {
        builder = builder.with_response(response);
    }
    let explainer = builder.build()?;

    let observations = choose_observations(&explainer, &args.observations, args.sample, args.seed)?;

    step_run(&format!("Profiling {} observation(s)", observations.len()));
    let start = Instant::now();
    let run = ProfileGenerator::new(config).what_if(&explainer, &observations)?;
    step_done(&format!("{} profiles in {:?}", run.profiles.len(), start.elapsed()));

    for diagnostic in &run.diagnostics {
        println!("  {} {}", warn("!"), muted(&diagnostic.to_string()));
    }

    let group_by: GroupBy = args.group_by.parse()?;
    let aggregation = match &args.aggregate {
        Some(reduction) => {
            let options = AggregateOptions::new()
                .with_reduction(reduction.parse::<Reduction>()?)
                .with_group_by(group_by.clone());
            Some(aggregate(&run.profiles, &options)?)
        }
        None => None,
    };

    println!();
    println!(
        "  {:<20} {:<12} {:>8} {:>10}",
        muted("Variable"),
        muted("Kind"),
        muted("Profiles"),
        muted("Range")
    );
    println!("  {}", dim(&"─".repeat(54)));
    let mut variables: Vec<&str> = Vec::new();
    for profile in &run.profiles {
        if !variables.contains(&profile.variable.as_str()) {
            variables.push(&profile.variable);
        }
    }
    for variable in variables {
        let profiles: Vec<_> = run.profiles.for_variable(variable).collect();
        let range = profiles
            .iter()
            .filter_map(|p| p.amplitude())
            .fold(0.0_f64, f64::max);
        println!(
            "  {:<20} {:<12} {:>8} {:>10.4}",
            variable,
            format!("{:?}", profiles[0].kind).to_lowercase(),
            profiles.len(),
            range
        );
    }

    if let Some(aggregation) = &aggregation {
        println!();
        println!("  {:<20} {:<16} {:>8}", muted("Variable"), muted("Group"), muted("Points"));
        println!("  {}", dim(&"─".repeat(46)));
        for curve in &aggregation.profiles {
            println!("  {:<20} {:<16} {:>8}", curve.variable, curve.group, curve.points.len());
        }
        for diagnostic in &aggregation.diagnostics {
            println!("  {} {}", warn("!"), muted(&diagnostic.to_string()));
        }
    }

    if let Some(output) = &args.output {
        let options = ExportOptions::new()
            .with_show_profiles(!args.hide_profiles)
            .with_group_by(group_by);
        let rows = plot_rows(&run.profiles, aggregation.as_ref(), &options);

        step_run(&format!("Saving → {}", output.display()));
        match output.extension().and_then(|e| e.to_str()) {
            Some("csv") => write_csv(&rows, output)?,
            _ => write_json(&rows, output)?,
        }
        step_done(&format!("{} rows", rows.len()));
    }

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let df = load_data(data_path)?;
    let dataset = Dataset::from_dataframe(&df)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    println!(
        "  {:<20} {:<12} {:<12} {:>6}",
        muted("Column"),
        muted("Type"),
        muted("Kind"),
        muted("Nulls")
    );
    println!("  {}", dim(&"─".repeat(54)));

    for col in df.get_columns() {
        let kind = match dataset.schema().kind(col.name()) {
            Ok(kind) => format!("{:?}", kind).to_lowercase().normal(),
            Err(_) => "unsupported".yellow(),
        };
        println!(
            "  {:<20} {:<12} {:<12} {:>6}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            kind,
            col.null_count(),
        );
    }

    println!();
    Ok(())
}
