//! Statistical summary collection.
//!
//! No per-case fan-out: the artifact is built in two configurations
//! (plain and counter-instrumented) and each runs once over its whole
//! case set. The textual output goes to both the report and the console.
//! When an upload table is configured, the two structured outputs are
//! joined into a CSV table and handed to the upload sink; a requested
//! upload is never silently dropped.

use super::CollectContext;
use benchsweep_core::{BuildTag, CollectError};
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Command;

pub(super) fn collect(ctx: &CollectContext<'_>, bench: &str) -> Result<(), CollectError> {
    let plain = run_summary(ctx, bench, BuildTag::Opt)?;
    let heading = format!("Summary: {} [no counters]", bench);
    ctx.report.heading(heading.as_str());
    ctx.report.text(plain.as_str());
    println!("{}", heading);
    println!("{}", plain);

    let counters = run_summary(ctx, bench, BuildTag::Counters)?;
    let heading = format!("Summary: {} [with counters]", bench);
    ctx.report.heading(heading.as_str());
    ctx.report.text(counters.as_str());
    println!("{}", heading);
    println!("{}", counters);

    if let Some(table) = &ctx.upload_table {
        upload(ctx, bench, table)?;
    }

    Ok(())
}

/// Build one configuration and run it over the entire case set.
///
/// Unlike the batched collectors, a failure here is fatal for the pair.
fn run_summary(ctx: &CollectContext<'_>, bench: &str, tag: BuildTag) -> Result<String, CollectError> {
    let artifact = ctx.builder.build(bench, tag)?;
    let label = format!("summary-{}-{}", bench, tag);

    let mut command = Command::new(&artifact);
    command
        .arg(format!("--benchmark_out={}", output_json(bench, tag)))
        .arg("--benchmark_out_format=json");
    if let Some(min_time) = ctx.summary_min_time {
        command.arg(format!("--benchmark_min_time={}", min_time));
    }

    let output = command.output().map_err(|e| CollectError::ItemExecution {
        label: label.clone(),
        reason: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(CollectError::ItemExecution {
            label,
            reason: format!("exited with {}", output.status),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Structured output file written by one summary run.
fn output_json(bench: &str, tag: BuildTag) -> String {
    format!("{}.{}.json", bench, tag)
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    #[serde(default)]
    benchmarks: Vec<SummaryEntry>,
}

/// One case's row in the structured benchmark output.
#[derive(Debug, Deserialize)]
struct SummaryEntry {
    name: String,
    #[serde(default)]
    iterations: u64,
    #[serde(default)]
    real_time: f64,
    #[serde(default)]
    cpu_time: f64,
    #[serde(default)]
    time_unit: Option<String>,
}

/// Join both runs' structured outputs into a CSV table and hand it to the
/// upload sink.
fn upload(ctx: &CollectContext<'_>, bench: &str, table: &str) -> Result<(), CollectError> {
    let plain = load_output(&output_json(bench, BuildTag::Opt), table)?;
    let counters = load_output(&output_json(bench, BuildTag::Counters), table)?;

    let csv_path = format!("{}.csv", bench);
    std::fs::write(&csv_path, tabulate(&plain, &counters)).map_err(|e| CollectError::Upload {
        destination: table.to_string(),
        reason: format!("failed to write {}: {}", csv_path, e),
    })?;

    let status = Command::new(&ctx.config.upload.program)
        .arg("load")
        .arg(table)
        .arg(&csv_path)
        .status()
        .map_err(|e| CollectError::Upload {
            destination: table.to_string(),
            reason: format!(
                "failed to invoke {}: {}",
                ctx.config.upload.program, e
            ),
        })?;

    if !status.success() {
        return Err(CollectError::Upload {
            destination: table.to_string(),
            reason: format!("upload exited with {}", status),
        });
    }

    Ok(())
}

fn load_output(path: &str, table: &str) -> Result<SummaryOutput, CollectError> {
    let content = std::fs::read_to_string(path).map_err(|e| CollectError::Upload {
        destination: table.to_string(),
        reason: format!("failed to read {}: {}", path, e),
    })?;
    serde_json::from_str(&content).map_err(|e| CollectError::Upload {
        destination: table.to_string(),
        reason: format!("failed to parse {}: {}", path, e),
    })
}

/// One row per case, joining the plain and counter runs by case name.
/// Cases present in only one run still get a row.
fn tabulate(plain: &SummaryOutput, counters: &SummaryOutput) -> String {
    let counter_rows: HashMap<&str, &SummaryEntry> = counters
        .benchmarks
        .iter()
        .map(|e| (e.name.as_str(), e))
        .collect();

    let mut out = String::from(
        "name,iterations,real_time,cpu_time,time_unit,counters_real_time,counters_cpu_time\n",
    );
    for entry in &plain.benchmarks {
        let (counters_real, counters_cpu) = counter_rows
            .get(entry.name.as_str())
            .map(|c| (c.real_time, c.cpu_time))
            .unwrap_or((0.0, 0.0));
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            csv_field(&entry.name),
            entry.iterations,
            entry.real_time,
            entry.cpu_time,
            csv_field(entry.time_unit.as_deref().unwrap_or("ns")),
            counters_real,
            counters_cpu,
        ));
    }
    for entry in &counters.benchmarks {
        if !plain.benchmarks.iter().any(|p| p.name == entry.name) {
            out.push_str(&format!(
                "{},{},0,0,{},{},{}\n",
                csv_field(&entry.name),
                entry.iterations,
                csv_field(entry.time_unit.as_deref().unwrap_or("ns")),
                entry.real_time,
                entry.cpu_time,
            ));
        }
    }
    out
}

/// Case names can contain commas and angle brackets; quote when needed.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
