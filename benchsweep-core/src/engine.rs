//! Bounded-parallel job execution.
//!
//! The engine accepts one batch of [`JobSpec`]s plus a concurrency ceiling,
//! attempts each spec at most once, runs up to `ceiling` of them at a time,
//! and returns per-item outcomes without aborting sibling items. Failures
//! are logged as they happen so the operator sees them before the final
//! report is written.

use crate::error::CollectError;
use crate::job::{JobOutcome, JobSpec, JobStatus};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// How often a running child is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Grace period between SIGTERM and SIGKILL on timeout.
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Executes batches of jobs under a concurrency ceiling.
///
/// The scheduler is generic over this seam so tests can substitute a
/// recording engine.
pub trait JobEngine {
    /// Run every spec in `batch`, at most `ceiling` concurrently.
    ///
    /// Per-item failures are reported in the returned outcomes; the only
    /// error is the engine itself failing to come up.
    fn run(&self, batch: Vec<JobSpec>, ceiling: usize) -> Result<Vec<JobOutcome>, CollectError>;
}

/// Engine that spawns each job as an OS process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEngine;

impl JobEngine for ProcessEngine {
    fn run(&self, batch: Vec<JobSpec>, ceiling: usize) -> Result<Vec<JobOutcome>, CollectError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let ceiling = ceiling.max(1).min(batch.len());
        let pb = ProgressBar::new(batch.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let outcomes = if ceiling == 1 {
            batch
                .into_iter()
                .map(|spec| {
                    pb.set_message(spec.label.clone());
                    let outcome = run_one(&spec);
                    pb.inc(1);
                    outcome
                })
                .collect()
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(ceiling)
                .build()
                .map_err(|e| CollectError::Engine(format!("failed to build job pool: {}", e)))?;

            pool.install(|| {
                batch
                    .par_iter()
                    .map(|spec| {
                        pb.set_message(spec.label.clone());
                        let outcome = run_one(spec);
                        pb.inc(1);
                        outcome
                    })
                    .collect()
            })
        };

        pb.finish_and_clear();
        Ok(outcomes)
    }
}

/// Spawn one job and wait for it, enforcing the spec's timeout.
fn run_one(spec: &JobSpec) -> JobOutcome {
    let Some((program, args)) = spec.command.split_first() else {
        return failed(spec, "empty command".to_string());
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit());
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => return failed(spec, format!("failed to spawn {}: {}", program, e)),
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    return JobOutcome {
                        label: spec.label.clone(),
                        status: JobStatus::Succeeded,
                    };
                }
                return failed(spec, format!("exited with {}", status));
            }
            Ok(None) => {
                if let Some(timeout) = spec.timeout {
                    if start.elapsed() >= timeout {
                        terminate(&mut child);
                        tracing::warn!(label = %spec.label, "job timed out after {:?}", timeout);
                        return JobOutcome {
                            label: spec.label.clone(),
                            status: JobStatus::TimedOut,
                        };
                    }
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return failed(spec, format!("wait failed: {}", e));
            }
        }
    }
}

fn failed(spec: &JobSpec, reason: String) -> JobOutcome {
    tracing::warn!(label = %spec.label, "job failed: {}", reason);
    JobOutcome {
        label: spec.label.clone(),
        status: JobStatus::Failed(reason),
    }
}

/// Graceful shutdown: SIGTERM, short grace period, then SIGKILL.
fn terminate(child: &mut Child) {
    let _ = send_sigterm(child.id());

    let deadline = Instant::now() + TERM_GRACE;
    while Instant::now() < deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let _ = child.kill();
    let _ = child.wait();
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be delivered.
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}
