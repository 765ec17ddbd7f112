//! CPU flamegraph collection.
//!
//! Per case: attach the sampling profiler to the artifact filtered to
//! that case, render the captured profile into a flamegraph image, then
//! delete both the raw profile and the intermediate textual profile.
//! Raw profiles are large, so batches are smaller than the latency
//! collector's and captures never overlap.

use super::{ncpu, CollectContext};
use crate::scheduler::{run_batches, StagePolicy, StageSet};
use benchsweep_core::{artifact_name, list_cases, BuildTag, CollectError, JobSpec};
use std::process::{Command, Stdio};

/// Environment handed to the flamegraph-rendering script.
const PERF_BASE_ENV: &str = "PERF_BASE_NAME";
const OUTPUT_DIR_ENV: &str = "OUTPUT_DIR";
const OUTPUT_FILENAME_ENV: &str = "OUTPUT_FILENAME";

pub(super) fn collect(ctx: &CollectContext<'_>, bench: &str) -> Result<(), CollectError> {
    ensure_tool(&ctx.config.perf.profiler)?;

    ctx.report.heading(format!("Flamegraphs: {}", bench));

    let artifact = ctx.builder.build(bench, BuildTag::Mutrace)?;
    let cases = list_cases(&artifact)?;

    for case in &cases {
        ctx.report.link(case, format!("{}.svg", artifact_name(case)));
    }

    let cores = ncpu();
    let policy = StagePolicy {
        capture_jobs: 1,
        analyze_jobs: cores,
        cleanup_jobs: cores,
    };

    let exe = artifact.display().to_string();
    run_batches(
        &cases,
        ctx.config.perf.batch_bound,
        |case| {
            let name = artifact_name(case);
            let raw_profile = format!("{}-perf.data", name);

            let capture = JobSpec::new(
                vec![
                    ctx.config.perf.profiler.clone(),
                    "record".to_string(),
                    "-o".to_string(),
                    raw_profile.clone(),
                    "-g".to_string(),
                    "-F".to_string(),
                    ctx.config.perf.frequency.to_string(),
                    exe.clone(),
                    format!("--benchmark_filter=^{}$", regex::escape(case)),
                    format!("--benchmark_min_time={}", ctx.config.perf.min_time_secs),
                ],
                format!("perf-{}", name),
            );

            let analyze = JobSpec::new(
                vec![ctx.config.perf.flamegraph_script.clone()],
                format!("flame-{}", name),
            )
            .with_env(PERF_BASE_ENV, name.clone())
            .with_env(OUTPUT_DIR_ENV, ctx.report_dir.display().to_string())
            .with_env(OUTPUT_FILENAME_ENV, name.clone());

            let cleanup = vec![
                JobSpec::new(
                    vec!["rm".to_string(), raw_profile],
                    format!("cleanup-{}-raw", name),
                ),
                JobSpec::new(
                    vec!["rm".to_string(), format!("{}-out.perf", name)],
                    format!("cleanup-{}-text", name),
                ),
            ];

            StageSet {
                capture,
                analyze,
                cleanup,
            }
        },
        policy,
        &ctx.engine,
        ctx.report,
    )
}

/// A host without the profiler gets a distinct error for this pair
/// instead of a silent skip.
fn ensure_tool(profiler: &str) -> Result<(), CollectError> {
    // Any exit status proves the binary exists; only a spawn failure
    // counts as missing.
    match Command::new(profiler)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => Ok(()),
        Err(_) => Err(CollectError::ToolUnavailable {
            tool: profiler.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_tool_passes_the_check() {
        assert!(ensure_tool("true").is_ok());
    }

    #[test]
    fn missing_tool_is_tool_unavailable() {
        let err = ensure_tool("/nonexistent/not-a-profiler").unwrap_err();
        assert!(matches!(err, CollectError::ToolUnavailable { tool } if tool.contains("not-a-profiler")));
    }
}
