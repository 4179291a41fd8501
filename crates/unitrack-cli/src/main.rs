//! unitrack CLI: flatten run configs and feed metric streams to tracking backends.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use unitrack::storage;
use unitrack::{
    normalize_with, BackendKind, ConfigValue, Metrics, NormalizeOptions, Tracking,
    TrackingSettings,
};

#[derive(Parser)]
#[command(
    name = "unitrack",
    about = "Unified experiment tracking across console, hosted and local backends",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the flattened parameters of a YAML or JSON config
    Params {
        /// Config file (.json is read as JSON, anything else as YAML)
        file: PathBuf,
        /// Keep sequences as arrays instead of indexed keys
        #[arg(long)]
        preserve_lists: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Start a run and forward JSON-lines metrics to the chosen backends
    Log {
        /// Project name
        #[arg(long, short)]
        project: String,
        /// Experiment name
        #[arg(long, short)]
        experiment: String,
        /// Backend to log to; repeat for several (console, wandb, mlflow)
        #[arg(long = "backend", short, default_value = "console")]
        backends: Vec<String>,
        /// Run configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// Metrics file with one {"step": n, "data": {..}} object per line (default: stdin)
        #[arg(long, short)]
        metrics: Option<PathBuf>,
        /// Only deliver metrics to these backends
        #[arg(long)]
        only: Vec<String>,
    },
    /// Show a local server run: metadata, params and last metrics
    Inspect {
        /// Run directory, or an experiment directory to show its newest run
        /// (e.g. mlruns/my_project/my_experiment)
        run_dir: PathBuf,
    },
}

#[derive(Deserialize)]
struct MetricLine {
    step: u64,
    data: Metrics,
}

fn main() -> Result<()> {
    // Keep stdout for console backend output and command results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Params { file, preserve_lists, json } => {
            cmd_params(&file, preserve_lists, json)?;
        }
        Commands::Log {
            project,
            experiment,
            backends,
            config,
            metrics,
            only,
        } => {
            cmd_log(project, experiment, backends, config, metrics, only)?;
        }
        Commands::Inspect { run_dir } => {
            cmd_inspect(&run_dir)?;
        }
    }

    Ok(())
}

// ─── Command implementations ──────────────────────────────────────────────────

fn cmd_params(file: &Path, preserve_lists: bool, json: bool) -> Result<()> {
    let config = load_config(file)?;
    let mut options = NormalizeOptions::default();
    if preserve_lists {
        options = options.preserve_lists();
    }
    let params = normalize_with(Some(&config), &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Parameter", "Value"]);
    for (key, value) in &params {
        table.add_row([key.as_str(), &value.to_string()]);
    }
    println!("{}", table);
    Ok(())
}

fn cmd_log(
    project: String,
    experiment: String,
    backends: Vec<String>,
    config: Option<PathBuf>,
    metrics: Option<PathBuf>,
    only: Vec<String>,
) -> Result<()> {
    let config = config.as_deref().map(load_config).transpose()?;
    let only = only
        .iter()
        .map(|name| name.parse::<BackendKind>())
        .collect::<Result<Vec<_>, _>>()?;

    let settings = TrackingSettings::from_env();
    let mut tracking = Tracking::new(project, experiment, backends, config.as_ref(), &settings)?;

    let reader: Box<dyn BufRead> = match &metrics {
        Some(path) => Box::new(BufReader::new(
            fs::File::open(path).with_context(|| format!("Cannot open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let filter = (!only.is_empty()).then_some(only.as_slice());
    let mut logged = 0usize;
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: MetricLine = serde_json::from_str(&line)
            .with_context(|| format!("Invalid metrics record on line {}", n + 1))?;
        tracking.log(&record.data, record.step, filter)?;
        logged += 1;
    }

    info!(records = logged, "Metrics forwarded");
    Ok(())
}

fn cmd_inspect(run_dir: &Path) -> Result<()> {
    if !run_dir.exists() {
        anyhow::bail!("Run directory not found: {}", run_dir.display());
    }
    let run_dir = if run_dir.join(storage::RUN_FILE).exists() {
        run_dir.to_path_buf()
    } else {
        storage::latest_run(run_dir)?
            .with_context(|| format!("No runs found in {}", run_dir.display()))?
    };
    let run_dir = run_dir.as_path();

    let meta = storage::load_run_metadata(run_dir)?;
    println!("Project: {}", meta.project);
    println!("Experiment: {}", meta.experiment);
    println!("Run: {}", meta.run_name);
    println!("Status: {}", meta.status);
    println!("Started: {}", meta.started_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(d) = meta.duration_secs {
        println!("Duration: {:.1}s", d);
    }
    println!("Logged steps: {}", meta.steps_logged);
    println!();

    let params = storage::load_params(run_dir)?;
    if !params.is_empty() {
        println!("── Params ({}) ─────────────────────────", params.len());
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(["Parameter", "Value"]);
        for (key, value) in &params {
            table.add_row([key.as_str(), &value.to_string()]);
        }
        println!("{}", table);
    }

    let rows = storage::read_metrics(&run_dir.join(storage::METRICS_FILE))?;
    if let Some(last) = rows.last() {
        println!("── Last Metrics ({} total rows) ─────────", rows.len());
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(["Metric", "Value"]);
        let mut entries: Vec<_> = last.iter().collect();
        entries.sort_by_key(|(k, _)| k.as_str());
        for (k, v) in entries {
            table.add_row([k.as_str(), &v.to_string()]);
        }
        println!("{}", table);
    }

    Ok(())
}

// ─── Utilities ────────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<ConfigValue> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let config = if is_json {
        serde_json::from_str::<serde_json::Value>(&content)?.into()
    } else {
        serde_yaml::from_str::<serde_yaml::Value>(&content)?.into()
    };
    Ok(config)
}
