#![warn(missing_docs)]
//! BenchSweep Core - Process-Level Primitives
//!
//! Everything the collectors need to talk to the outside world:
//! - [`JobSpec`] / [`JobOutcome`] - one external invocation and its result
//! - [`ProcessEngine`] - bounded-parallel execution of a batch of jobs
//! - [`Builder`] - invoking the external build system for one benchmark target
//! - [`list_cases`] - asking a built benchmark binary for its case list
//! - [`artifact_name`] - mapping case identifiers to filesystem-safe names
//!
//! The orchestration itself (batching, collectors, the report) lives in
//! `benchsweep-cli` and `benchsweep-report`.

mod builder;
mod engine;
mod enumerate;
mod error;
mod job;
mod sanitize;

pub use builder::{BuildTag, Builder};
pub use engine::{JobEngine, ProcessEngine};
pub use enumerate::list_cases;
pub use error::CollectError;
pub use job::{JobOutcome, JobSpec, JobStatus};
pub use sanitize::artifact_name;
