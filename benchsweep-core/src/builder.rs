//! Benchmark artifact building.
//!
//! Thin wrapper around the external build system: one invocation per
//! (benchmark, configuration) pair, surfacing nonzero exit as
//! [`CollectError::Build`]. The collectors decide which configuration each
//! strategy needs.

use crate::error::CollectError;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

/// Build configuration variants the collectors request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTag {
    /// Plain optimized build.
    Opt,
    /// Latency-trace instrumented build.
    Trace,
    /// Mutex-tracking instrumented build, used for profiling.
    Mutrace,
    /// Counter-instrumented build.
    Counters,
}

impl BuildTag {
    /// Tag string passed to the build system as `--config=<tag>`.
    pub fn as_str(self) -> &'static str {
        match self {
            BuildTag::Opt => "opt",
            BuildTag::Trace => "trace",
            BuildTag::Mutrace => "mutrace",
            BuildTag::Counters => "counters",
        }
    }
}

impl fmt::Display for BuildTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invokes the external build system and resolves artifact paths.
#[derive(Debug, Clone)]
pub struct Builder {
    program: String,
    target_prefix: String,
    bin_root: PathBuf,
}

impl Builder {
    /// Create a builder.
    ///
    /// `program` is the build tool to invoke, `target_prefix` is prepended
    /// to the benchmark name to form the build target, and `bin_root` is
    /// where built binaries land.
    pub fn new(
        program: impl Into<String>,
        target_prefix: impl Into<String>,
        bin_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            target_prefix: target_prefix.into(),
            bin_root: bin_root.into(),
        }
    }

    /// Build one benchmark in the given configuration and return the
    /// artifact path.
    pub fn build(&self, bench: &str, tag: BuildTag) -> Result<PathBuf, CollectError> {
        let target = format!("{}{}", self.target_prefix, bench);
        tracing::info!("building {} [{}]", target, tag);

        let status = Command::new(&self.program)
            .arg("build")
            .arg(format!("--config={}", tag))
            .arg(&target)
            .status()
            .map_err(|e| CollectError::Build {
                target: target.clone(),
                config: tag.as_str().to_string(),
                reason: format!("failed to invoke {}: {}", self.program, e),
            })?;

        if !status.success() {
            return Err(CollectError::Build {
                target,
                config: tag.as_str().to_string(),
                reason: format!("build exited with {}", status),
            });
        }

        Ok(self.bin_root.join(bench))
    }

    /// Where the artifact for `bench` lands once built.
    pub fn artifact_path(&self, bench: &str) -> PathBuf {
        self.bin_root.join(bench)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_strings() {
        assert_eq!(BuildTag::Opt.as_str(), "opt");
        assert_eq!(BuildTag::Trace.as_str(), "trace");
        assert_eq!(BuildTag::Mutrace.as_str(), "mutrace");
        assert_eq!(BuildTag::Counters.as_str(), "counters");
    }

    #[test]
    fn successful_build_returns_artifact_path() {
        // `true` ignores its arguments and exits zero.
        let builder = Builder::new("true", "//benchmarks:", "/tmp/bin");
        let path = builder.build("bm_example", BuildTag::Opt).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/bin/bm_example"));
    }

    #[test]
    fn failing_build_is_a_build_error() {
        let builder = Builder::new("false", "//benchmarks:", "/tmp/bin");
        let err = builder.build("bm_example", BuildTag::Trace).unwrap_err();
        match err {
            CollectError::Build { target, config, .. } => {
                assert_eq!(target, "//benchmarks:bm_example");
                assert_eq!(config, "trace");
            }
            other => panic!("expected Build error, got {:?}", other),
        }
    }

    #[test]
    fn missing_build_tool_is_a_build_error() {
        let builder = Builder::new("/nonexistent/build-tool", "//b:", "/tmp/bin");
        assert!(matches!(
            builder.build("bm", BuildTag::Opt),
            Err(CollectError::Build { .. })
        ));
    }
}
