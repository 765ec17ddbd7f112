//! Bounded-batch scheduling.
//!
//! The scheduler consumes a case sequence lazily, building three per-stage
//! batches as it goes. Once a batch holds `bound` cases (or the input is
//! exhausted), all three batches are flushed together: the capture batch
//! runs to completion, then analyze, then cleanup - never interleaved,
//! since analysis reads capture's output files and cleanup removes them.
//!
//! The bound caps how many per-case intermediate artifacts (traces,
//! profiles) exist at once; each stage's concurrency ceiling independently
//! caps how many of its items run in parallel within a flush.

use benchsweep_core::{CollectError, JobEngine, JobSpec};
use benchsweep_report::Report;

/// The three work items a collector derives from one case.
#[derive(Debug)]
pub struct StageSet {
    /// Runs the case and produces its raw capture artifact.
    pub capture: JobSpec,
    /// Post-processes the capture artifact into report output.
    pub analyze: JobSpec,
    /// Removes the intermediate files. The perf collector deletes two
    /// files per case, hence a list.
    pub cleanup: Vec<JobSpec>,
}

/// Per-stage concurrency ceilings applied to each flushed batch.
#[derive(Debug, Clone, Copy)]
pub struct StagePolicy {
    /// Ceiling for the capture stage. Deliberately the lowest: one capture
    /// may occupy multiple cores or substantial memory.
    pub capture_jobs: usize,
    /// Ceiling for the analyze stage.
    pub analyze_jobs: usize,
    /// Ceiling for the cleanup stage.
    pub cleanup_jobs: usize,
}

/// Run every case through capture/analyze/cleanup in size-bounded batches.
///
/// Failed items are marked in the report and logged; they never abort
/// batch siblings or later stages. Only an engine-level failure is fatal.
pub fn run_batches<I, F, E>(
    cases: I,
    bound: usize,
    mut stage_builder: F,
    policy: StagePolicy,
    engine: &E,
    report: &Report,
) -> Result<(), CollectError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    F: FnMut(&str) -> StageSet,
    E: JobEngine + ?Sized,
{
    let bound = bound.max(1);
    let mut capture = Vec::new();
    let mut analyze = Vec::new();
    let mut cleanup = Vec::new();
    let mut pending_cases = 0usize;

    for case in cases {
        let stages = stage_builder(case.as_ref());
        capture.push(stages.capture);
        analyze.push(stages.analyze);
        cleanup.extend(stages.cleanup);
        pending_cases += 1;

        if pending_cases >= bound {
            flush(
                &mut capture,
                &mut analyze,
                &mut cleanup,
                policy,
                engine,
                report,
            )?;
            pending_cases = 0;
        }
    }

    // Trailing partial batch.
    if pending_cases > 0 {
        flush(
            &mut capture,
            &mut analyze,
            &mut cleanup,
            policy,
            engine,
            report,
        )?;
    }

    Ok(())
}

/// Run the three per-stage batches in order, clearing them.
fn flush<E>(
    capture: &mut Vec<JobSpec>,
    analyze: &mut Vec<JobSpec>,
    cleanup: &mut Vec<JobSpec>,
    policy: StagePolicy,
    engine: &E,
    report: &Report,
) -> Result<(), CollectError>
where
    E: JobEngine + ?Sized,
{
    let stages = [
        (capture, policy.capture_jobs),
        (analyze, policy.analyze_jobs),
        (cleanup, policy.cleanup_jobs),
    ];

    for (batch, ceiling) in stages {
        let outcomes = engine.run(std::mem::take(batch), ceiling)?;
        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            report.text(format!(
                "FAILED: {} ({})",
                outcome.label,
                outcome.failure_reason().unwrap_or("unknown")
            ));
        }
    }

    Ok(())
}
