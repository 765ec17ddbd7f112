//! Latency trace collection.
//!
//! Per case: run the trace-instrumented artifact filtered to that case,
//! analyze the trace into a text report under the report directory,
//! delete the trace. Analysis is the memory hog here, so the work is
//! batched rather than enumerated all at once.

use super::{ncpu, CollectContext};
use crate::scheduler::{run_batches, StagePolicy, StageSet};
use benchsweep_core::{artifact_name, list_cases, BuildTag, CollectError, JobSpec};

/// Environment variable the trace-instrumented binary writes its trace to.
const TRACE_ENV: &str = "LATENCY_TRACE";

pub(super) fn collect(ctx: &CollectContext<'_>, bench: &str) -> Result<(), CollectError> {
    ctx.report.heading(format!("Latency Profiles: {}", bench));

    let artifact = ctx.builder.build(bench, BuildTag::Trace)?;
    let cases = list_cases(&artifact)?;

    // Every case is linked before batching begins, so the report lists
    // all of them even if a later capture or analysis fails.
    for case in &cases {
        ctx.report.link(case, format!("{}.txt", artifact_name(case)));
    }

    let cores = ncpu();
    let policy = StagePolicy {
        // Each capture can use two cores: one for the case itself, one
        // for the trace flush.
        capture_jobs: (cores / 2).max(1),
        analyze_jobs: cores,
        cleanup_jobs: cores,
    };
    let bound = cores.min(16);

    let exe = artifact.display().to_string();
    run_batches(
        &cases,
        bound,
        |case| {
            let name = artifact_name(case);
            let trace_file = format!("{}.trace", name);

            let capture = JobSpec::new(
                vec![
                    exe.clone(),
                    format!("--benchmark_filter=^{}$", regex::escape(case)),
                    format!("--benchmark_min_time={}", ctx.config.latency.min_time_secs),
                ],
                format!("profile-{}", name),
            )
            .with_env(TRACE_ENV, trace_file.clone());

            let out_file = ctx.report_dir.join(format!("{}.txt", name));
            let analyze = JobSpec::new(
                vec![
                    ctx.config.latency.analyzer.clone(),
                    "--source".to_string(),
                    trace_file.clone(),
                    "--fmt".to_string(),
                    "simple".to_string(),
                    "--out".to_string(),
                    out_file.display().to_string(),
                ],
                format!("analyze-{}", name),
            )
            .with_timeout(ctx.analyze_timeout);

            let cleanup = vec![JobSpec::new(
                vec!["rm".to_string(), trace_file],
                format!("cleanup-{}", name),
            )];

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
