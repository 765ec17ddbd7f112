#![warn(missing_docs)]
//! BenchSweep CLI
//!
//! Drives the three collection strategies (latency, perf, summary) over a
//! set of microbenchmarks. Pairs run strictly sequentially; a failing pair
//! is recorded and the run continues. The accumulated report document is
//! flushed exactly once on every exit path.
//!
//! # Example
//!
//! ```text
//! benchsweep -c latency summary -b bm_closure --report-dir reports
//! ```

mod collector;
mod config;
mod scheduler;

pub use collector::{CollectContext, Collector};
pub use config::*;
pub use scheduler::{run_batches, StagePolicy, StageSet};

use anyhow::Context as _;
use benchsweep_core::{list_cases, BuildTag, Builder, ProcessEngine};
use benchsweep_report::Report;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// BenchSweep CLI arguments
#[derive(Parser, Debug)]
#[command(name = "benchsweep")]
#[command(
    author,
    version,
    about = "Collect latency traces, CPU flamegraphs, and statistical summaries from microbenchmarks"
)]
pub struct Cli {
    /// Optional subcommand (List, Run); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Which collectors to run against each benchmark (defaults to all)
    #[arg(short = 'c', long = "collect", value_enum, value_delimiter = ',', num_args = 1..)]
    pub collect: Vec<Collector>,

    /// Which benchmarks to process (defaults to the configured suite)
    #[arg(short = 'b', long = "benchmarks", value_delimiter = ',', num_args = 1..)]
    pub benchmarks: Vec<String>,

    /// Upload summary results to this table
    #[arg(long)]
    pub upload_table: Option<String>,

    /// Minimum run time in seconds for the summary collector's aggregate runs
    #[arg(long)]
    pub summary_min_time: Option<f64>,

    /// Report output directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List each selected benchmark's cases without collecting
    List,
    /// Run the selected collectors (default)
    Run,
}

/// Run the BenchSweep CLI with arguments from the environment.
///
/// # Returns
/// Returns `Ok(())` when every requested pair succeeded, or an error if
/// any pair failed. The report is written either way.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the BenchSweep CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("benchsweep_cli=debug,benchsweep_core=debug,benchsweep_report=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("benchsweep_cli=info,benchsweep_core=info,benchsweep_report=info")
            .init();
    }

    // Discover benchsweep.toml configuration (CLI flags override)
    let config = SweepConfig::discover().unwrap_or_default();

    match cli.command {
        Some(Commands::List) => list_benchmarks(&cli, &config),
        Some(Commands::Run) | None => collect_all(&cli, &config),
    }
}

/// Collectors selected on the command line, defaulting to all three.
fn selected_collectors(cli: &Cli) -> Vec<Collector> {
    if cli.collect.is_empty() {
        Collector::ALL.to_vec()
    } else {
        cli.collect.clone()
    }
}

/// Benchmarks selected on the command line, falling back to the suite.
fn selected_benchmarks(cli: &Cli, config: &SweepConfig) -> anyhow::Result<Vec<String>> {
    let benchmarks = if cli.benchmarks.is_empty() {
        config.suite.benchmarks.clone()
    } else {
        cli.benchmarks.clone()
    };
    if benchmarks.is_empty() {
        anyhow::bail!(
            "no benchmarks selected; pass --benchmarks or configure [suite] benchmarks in benchsweep.toml"
        );
    }
    Ok(benchmarks)
}

fn make_builder(config: &SweepConfig) -> Builder {
    Builder::new(
        &config.build.program,
        &config.build.target_prefix,
        &config.build.bin_root,
    )
}

/// Drive every (collector, benchmark) pair sequentially, then flush the
/// report.
fn collect_all(cli: &Cli, config: &SweepConfig) -> anyhow::Result<()> {
    let collectors = selected_collectors(cli);
    let benchmarks = selected_benchmarks(cli, config)?;

    let report_dir = cli
        .report_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.report.directory));
    let report = Report::new(&report_dir)
        .with_context(|| format!("failed to create report directory {}", report_dir.display()))?;

    let analyze_timeout = SweepConfig::parse_duration(&config.latency.analyze_timeout)
        .context("invalid latency.analyze_timeout")?;

    let ctx = CollectContext {
        config,
        builder: make_builder(config),
        engine: ProcessEngine,
        report: &report,
        report_dir: report_dir.clone(),
        analyze_timeout,
        summary_min_time: cli.summary_min_time,
        upload_table: cli
            .upload_table
            .clone()
            .or_else(|| config.upload.table.clone()),
    };

    let mut failed_pairs = 0usize;
    for collector in &collectors {
        for bench in &benchmarks {
            tracing::info!("{} collection: {}", collector.name(), bench);
            if let Err(e) = collector.collect(&ctx, bench) {
                // A pair's failure is recorded and the run continues.
                tracing::error!("{} collection failed for {}: {}", collector.name(), bench, e);
                ctx.report.text(format!(
                    "FAILED: {} collection for {}: {}",
                    collector.name(),
                    bench,
                    e
                ));
                failed_pairs += 1;
            }
        }
    }

    let path = report.finalize().context("failed to write report")?;
    println!("Report written to: {}", path.display());

    if failed_pairs > 0 {
        anyhow::bail!("{} (collector, benchmark) pair(s) failed", failed_pairs);
    }
    Ok(())
}

/// Build each selected benchmark and print its case list.
fn list_benchmarks(cli: &Cli, config: &SweepConfig) -> anyhow::Result<()> {
    let benchmarks = selected_benchmarks(cli, config)?;
    let builder = make_builder(config);

    let mut total = 0;
    for bench in &benchmarks {
        let artifact = builder.build(bench, BuildTag::Opt)?;
        let cases = list_cases(&artifact)?;
        println!("├── {}", bench);
        for case in &cases {
            println!("│   ├── {}", case);
            total += 1;
        }
    }
    println!("{} cases found.", total);

    Ok(())
}
