//! Error taxonomy for the collection pipeline.
//!
//! None of these abort the whole multi-pair run; the driver catches them per
//! (collector, benchmark) pair and moves on. The report document is flushed
//! regardless.

use thiserror::Error;

/// Errors surfaced while collecting data for one (collector, benchmark) pair.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The build system could not produce the benchmark artifact.
    #[error("failed to build {target} [{config}]: {reason}")]
    Build {
        /// Build target that failed.
        target: String,
        /// Build configuration tag.
        config: String,
        /// What the build system reported.
        reason: String,
    },

    /// The built artifact could not report its case list.
    #[error("failed to enumerate cases from {artifact}: {reason}")]
    Enumeration {
        /// Path of the artifact that was invoked.
        artifact: String,
        /// Why enumeration failed.
        reason: String,
    },

    /// A single work item failed where failure is fatal for the pair
    /// (the Summary collector's aggregate runs).
    #[error("{label}: {reason}")]
    ItemExecution {
        /// Label of the failed invocation.
        label: String,
        /// Exit status or spawn error.
        reason: String,
    },

    /// The result upload sink rejected or could not receive the results.
    #[error("failed to upload results to {destination}: {reason}")]
    Upload {
        /// Configured upload destination.
        destination: String,
        /// Why the upload failed.
        reason: String,
    },

    /// A required external tool is not present on the host.
    #[error("required tool not available: {tool}")]
    ToolUnavailable {
        /// Name of the missing tool.
        tool: String,
    },

    /// The execution engine itself could not be brought up. This is the only
    /// error the batch scheduler propagates.
    #[error("execution engine error: {0}")]
    Engine(String),
}
