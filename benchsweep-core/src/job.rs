//! Job specifications and per-job outcomes.

use std::time::Duration;

/// One external invocation: an argv, extra environment variables, an
/// optional timeout, and a short label used in logs and the report.
///
/// Specs are immutable once built; ownership passes to the engine and the
/// spec is discarded after the run.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Program and arguments, in order. Never empty.
    pub command: Vec<String>,
    /// Extra environment entries layered on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Per-item deadline. Expiry fails this item only, not its batch.
    pub timeout: Option<Duration>,
    /// Short name for logs and failure records.
    pub label: String,
}

impl JobSpec {
    /// Create a spec from a command line and a label.
    pub fn new<S: Into<String>>(command: Vec<String>, label: S) -> Self {
        Self {
            command,
            env: Vec::new(),
            timeout: None,
            label: label.into(),
        }
    }

    /// Add an environment variable for the invocation.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Bound the invocation's wall-clock runtime.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of attempting one [`JobSpec`].
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Label copied from the spec.
    pub label: String,
    /// How the invocation ended.
    pub status: JobStatus,
}

impl JobOutcome {
    /// Whether the job exited successfully.
    pub fn is_success(&self) -> bool {
        matches!(self.status, JobStatus::Succeeded)
    }

    /// Human-readable description of a non-success status.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            JobStatus::Succeeded => None,
            JobStatus::Failed(reason) => Some(reason),
            JobStatus::TimedOut => Some("timed out"),
        }
    }
}

/// Terminal status of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Exit code zero.
    Succeeded,
    /// Nonzero exit, spawn failure, or wait failure.
    Failed(String),
    /// The spec's timeout expired before the process exited.
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_accumulate() {
        let spec = JobSpec::new(vec!["prog".into(), "arg".into()], "example")
            .with_env("KEY", "value")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(spec.command, vec!["prog", "arg"]);
        assert_eq!(spec.env, vec![("KEY".to_string(), "value".to_string())]);
        assert_eq!(spec.timeout, Some(Duration::from_secs(5)));
        assert_eq!(spec.label, "example");
    }

    #[test]
    fn outcome_failure_reason() {
        let ok = JobOutcome {
            label: "a".into(),
            status: JobStatus::Succeeded,
        };
        let failed = JobOutcome {
            label: "b".into(),
            status: JobStatus::Failed("exit code 1".into()),
        };
        let timed_out = JobOutcome {
            label: "c".into(),
            status: JobStatus::TimedOut,
        };

        assert!(ok.is_success());
        assert_eq!(ok.failure_reason(), None);
        assert_eq!(failed.failure_reason(), Some("exit code 1"));
        assert_eq!(timed_out.failure_reason(), Some("timed out"));
    }
}
