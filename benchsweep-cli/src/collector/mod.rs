//! Collection strategies.
//!
//! A closed set of three collectors. Each builds the artifact variant it
//! needs, derives the case list, and either feeds per-case work through
//! the batch scheduler (latency, perf) or runs one aggregate invocation
//! per configuration (summary).

mod latency;
mod perf;
mod summary;

use crate::config::SweepConfig;
use benchsweep_core::{Builder, CollectError, ProcessEngine};
use benchsweep_report::Report;
use std::path::PathBuf;
use std::time::Duration;

/// The three collection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Collector {
    /// Latency traces, analyzed into per-case text reports.
    Latency,
    /// CPU sampling profiles, rendered into per-case flamegraphs.
    Perf,
    /// Whole-suite statistical summaries, optionally uploaded.
    Summary,
}

impl Collector {
    /// All collectors, in the order they run by default.
    pub const ALL: [Collector; 3] = [Collector::Latency, Collector::Perf, Collector::Summary];

    /// Collector name as used in logs and CLI values.
    pub fn name(self) -> &'static str {
        match self {
            Collector::Latency => "latency",
            Collector::Perf => "perf",
            Collector::Summary => "summary",
        }
    }

    /// Run this strategy for one benchmark.
    ///
    /// An error aborts only this (collector, benchmark) pair; the driver
    /// records it and moves on.
    pub fn collect(self, ctx: &CollectContext<'_>, bench: &str) -> Result<(), CollectError> {
        match self {
            Collector::Latency => latency::collect(ctx, bench),
            Collector::Perf => perf::collect(ctx, bench),
            Collector::Summary => summary::collect(ctx, bench),
        }
    }
}

/// Everything a collector needs for one run, resolved once by the driver.
#[derive(Debug)]
pub struct CollectContext<'a> {
    /// Loaded configuration.
    pub config: &'a SweepConfig,
    /// Build system wrapper.
    pub builder: Builder,
    /// The process execution engine.
    pub engine: ProcessEngine,
    /// The shared report accumulator.
    pub report: &'a Report,
    /// Directory per-case outputs and the report document land in.
    pub report_dir: PathBuf,
    /// Resolved deadline for one analyze-stage item.
    pub analyze_timeout: Duration,
    /// Minimum-run-time override for the summary collector's aggregate
    /// runs. Deliberately independent of the latency/perf per-case
    /// minimum times.
    pub summary_min_time: Option<f64>,
    /// Upload destination; summaries are uploaded only when set.
    pub upload_table: Option<String>,
}

/// Available CPU cores, used to size ceilings and the latency batch bound.
pub(crate) fn ncpu() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
