//! Configuration loading from benchsweep.toml
//!
//! The configuration file is discovered by walking up from the current
//! directory. Every field has a default, so a missing file means a fully
//! usable default configuration; CLI flags override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// BenchSweep configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SweepConfig {
    /// Build system invocation
    #[serde(default)]
    pub build: BuildConfig,
    /// Benchmark suite selection
    #[serde(default)]
    pub suite: SuiteConfig,
    /// Report output
    #[serde(default)]
    pub report: ReportConfig,
    /// Latency collector tuning
    #[serde(default)]
    pub latency: LatencyConfig,
    /// Perf collector tuning
    #[serde(default)]
    pub perf: PerfConfig,
    /// Result upload sink
    #[serde(default)]
    pub upload: UploadConfig,
}

/// How benchmark artifacts are built and where they land
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Build tool to invoke
    #[serde(default = "default_build_program")]
    pub program: String,
    /// Prefix prepended to a benchmark name to form the build target
    #[serde(default = "default_target_prefix")]
    pub target_prefix: String,
    /// Directory built benchmark binaries land in
    #[serde(default = "default_bin_root")]
    pub bin_root: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: default_build_program(),
            target_prefix: default_target_prefix(),
            bin_root: default_bin_root(),
        }
    }
}

fn default_build_program() -> String {
    "bazel".to_string()
}
fn default_target_prefix() -> String {
    "//benchmarks:".to_string()
}
fn default_bin_root() -> String {
    "bazel-bin/benchmarks".to_string()
}

/// The benchmark suite processed when `-b` is not given
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SuiteConfig {
    /// Benchmark target names
    #[serde(default)]
    pub benchmarks: Vec<String>,
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory the report document and per-case outputs are written to
    #[serde(default = "default_report_dir")]
    pub directory: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: default_report_dir(),
        }
    }
}

fn default_report_dir() -> String {
    "reports".to_string()
}

/// Latency collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Minimum per-case run time in seconds during trace capture
    #[serde(default = "default_latency_min_time")]
    pub min_time_secs: f64,
    /// Trace analyzer command
    #[serde(default = "default_analyzer")]
    pub analyzer: String,
    /// Deadline for one analysis invocation (e.g. "20m")
    #[serde(default = "default_analyze_timeout")]
    pub analyze_timeout: String,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            min_time_secs: default_latency_min_time(),
            analyzer: default_analyzer(),
            analyze_timeout: default_analyze_timeout(),
        }
    }
}

fn default_latency_min_time() -> f64 {
    0.05
}
fn default_analyzer() -> String {
    "trace-analyzer".to_string()
}
fn default_analyze_timeout() -> String {
    "20m".to_string()
}

/// Perf collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfConfig {
    /// Minimum per-case run time in seconds while sampling.
    /// Longer than the latency capture time: profiling needs samples.
    #[serde(default = "default_perf_min_time")]
    pub min_time_secs: f64,
    /// Sampling frequency in Hz
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    /// Sampling profiler binary
    #[serde(default = "default_profiler")]
    pub profiler: String,
    /// Flamegraph rendering script
    #[serde(default = "default_flamegraph_script")]
    pub flamegraph_script: String,
    /// Cases per batch. Smaller than the latency bound: raw profiles are
    /// large on disk.
    #[serde(default = "default_perf_batch_bound")]
    pub batch_bound: usize,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            min_time_secs: default_perf_min_time(),
            frequency: default_frequency(),
            profiler: default_profiler(),
            flamegraph_script: default_flamegraph_script(),
            batch_bound: default_perf_batch_bound(),
        }
    }
}

fn default_perf_min_time() -> f64 {
    10.0
}
fn default_frequency() -> u32 {
    997
}
fn default_profiler() -> String {
    "perf".to_string()
}
fn default_flamegraph_script() -> String {
    "tools/render_flamegraph.sh".to_string()
}
fn default_perf_batch_bound() -> usize {
    20
}

/// Result upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload tool to invoke as `<program> load <table> <csv>`
    #[serde(default = "default_upload_program")]
    pub program: String,
    /// Destination table; uploads only happen when set here or via the CLI
    #[serde(default)]
    pub table: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            program: default_upload_program(),
            table: None,
        }
    }
}

fn default_upload_program() -> String {
    "bq".to_string()
}

impl SweepConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join("benchsweep.toml");
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Parse duration string (e.g. "20m", "90s", "500ms") to a Duration
    pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;

        let nanos: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok(Duration::from_nanos((value * nanos as f64) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SweepConfig::default();
        assert_eq!(config.build.program, "bazel");
        assert_eq!(config.report.directory, "reports");
        assert_eq!(config.latency.min_time_secs, 0.05);
        assert_eq!(config.perf.min_time_secs, 10.0);
        assert_eq!(config.perf.batch_bound, 20);
        assert!(config.upload.table.is_none());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(
            SweepConfig::parse_duration("20m").unwrap(),
            Duration::from_secs(20 * 60)
        );
        assert_eq!(
            SweepConfig::parse_duration("90s").unwrap(),
            Duration::from_secs(90)
        );
        assert_eq!(
            SweepConfig::parse_duration("500ms").unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(
            SweepConfig::parse_duration("1.5s").unwrap(),
            Duration::from_millis(1500)
        );
        assert!(SweepConfig::parse_duration("").is_err());
        assert!(SweepConfig::parse_duration("5parsecs").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [build]
            program = "buck2"
            target_prefix = "//bench:"

            [suite]
            benchmarks = ["bm_chttp2", "bm_closure"]

            [perf]
            batch_bound = 8

            [upload]
            table = "perf.results"
        "#;

        let config: SweepConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.build.program, "buck2");
        assert_eq!(config.build.target_prefix, "//bench:");
        assert_eq!(config.suite.benchmarks, vec!["bm_chttp2", "bm_closure"]);
        assert_eq!(config.perf.batch_bound, 8);
        assert_eq!(config.upload.table.as_deref(), Some("perf.results"));
        // Defaults should still apply
        assert_eq!(config.build.bin_root, "bazel-bin/benchmarks");
        assert_eq!(config.latency.analyze_timeout, "20m");
    }
}
