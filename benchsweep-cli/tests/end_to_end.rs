//! End-to-end collection tests against fake external tools.
//!
//! The build system, benchmark binaries, profiler, trace analyzer, and
//! flamegraph renderer are all stand-in shell scripts, so these tests
//! exercise the real capture/analyze/cleanup flow without any of the
//! heavyweight tooling installed.

use benchsweep_cli::{CollectContext, Collector, SweepConfig};
use benchsweep_core::{Builder, CollectError, ProcessEngine};
use benchsweep_report::{Fragment, Report};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

// Collection jobs write intermediate files relative to the working
// directory, so each test pins the process CWD to its own tempdir.
static CWD_LOCK: Mutex<()> = Mutex::new(());

fn write_script(path: &Path, body: &str) -> PathBuf {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    write!(file, "{}", body).unwrap();
    drop(file);
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

/// A benchmark binary that lists two cases, honors the trace env var,
/// and writes structured output when asked for it.
fn fake_benchmark(bin_dir: &Path) -> PathBuf {
    write_script(
        &bin_dir.join("bm_fake"),
        r#"if [ "$1" = "--benchmark_list_tests" ]; then
  printf 'CaseA\nCase B\n'
  exit 0
fi
if [ -n "$LATENCY_TRACE" ]; then
  echo trace-data > "$LATENCY_TRACE"
fi
out=""
for arg in "$@"; do
  case "$arg" in
    --benchmark_out=*) out="${arg#--benchmark_out=}";;
  esac
done
if [ -n "$out" ]; then
  printf '{"benchmarks":[{"name":"CaseA","iterations":10,"real_time":1.5,"cpu_time":1.4,"time_unit":"ns"}]}' > "$out"
  echo "2 cases ran"
fi
exit 0
"#,
    )
}

struct Fixture {
    config: SweepConfig,
    report_dir: PathBuf,
    report: Report,
    // Declared last so the report's drop backstop can still reach the
    // directory.
    _dir: tempfile::TempDir,
}

impl Fixture {
    /// Tempdir with a bin/ directory holding the fake benchmark, the
    /// process CWD pointed inside, and a config wired to the fakes.
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("bin");
        std::fs::create_dir(&bin_dir).unwrap();
        fake_benchmark(&bin_dir);

        std::env::set_current_dir(dir.path()).unwrap();

        let report_dir = dir.path().join("reports");
        let report = Report::new(&report_dir).unwrap();

        let mut config = SweepConfig::default();
        config.build.program = "true".to_string();
        config.build.bin_root = bin_dir.display().to_string();

        Self {
            config,
            report_dir,
            report,
            _dir: dir,
        }
    }

    fn ctx(&self) -> CollectContext<'_> {
        CollectContext {
            config: &self.config,
            builder: Builder::new(
                &self.config.build.program,
                &self.config.build.target_prefix,
                &self.config.build.bin_root,
            ),
            engine: ProcessEngine,
            report: &self.report,
            report_dir: self.report_dir.clone(),
            analyze_timeout: Duration::from_secs(60),
            summary_min_time: None,
            upload_table: None,
        }
    }

    fn links(&self) -> Vec<(String, String)> {
        self.report
            .fragments()
            .into_iter()
            .filter_map(|f| match f {
                Fragment::Link { text, target } => Some((text, target)),
                _ => None,
            })
            .collect()
    }

    fn failure_marks(&self) -> Vec<String> {
        self.report
            .fragments()
            .into_iter()
            .filter_map(|f| match f {
                Fragment::Text(t) if t.starts_with("FAILED") => Some(t),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn latency_collection_produces_reports_and_cleans_up() {
    let _guard = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let mut fixture = Fixture::new();

    // Analyzer copies the trace into the report file, which also proves
    // the capture stage completed before analysis started.
    let analyzer = write_script(
        &fixture._dir.path().join("analyzer.sh"),
        "cp \"$2\" \"$6\"\n",
    );
    fixture.config.latency.analyzer = analyzer.display().to_string();

    Collector::Latency.collect(&fixture.ctx(), "bm_fake").unwrap();

    assert_eq!(
        fixture.links(),
        vec![
            ("CaseA".to_string(), "CaseA.txt".to_string()),
            ("Case B".to_string(), "Case_B.txt".to_string()),
        ]
    );
    assert!(fixture.failure_marks().is_empty());

    // Analysis output landed in the report directory.
    assert!(fixture.report_dir.join("CaseA.txt").exists());
    assert!(fixture.report_dir.join("Case_B.txt").exists());

    // Cleanup removed the traces.
    assert!(!Path::new("CaseA.trace").exists());
    assert!(!Path::new("Case_B.trace").exists());
}

#[test]
fn latency_failures_are_marked_but_do_not_stop_the_pair() {
    let _guard = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let mut fixture = Fixture::new();

    // Analyzer that always fails: both analyze items should be marked,
    // the collection itself still succeeds.
    fixture.config.latency.analyzer = "false".to_string();

    Collector::Latency.collect(&fixture.ctx(), "bm_fake").unwrap();

    let marks = fixture.failure_marks();
    assert_eq!(marks.len(), 2);
    assert!(marks.iter().any(|m| m.contains("analyze-CaseA")));
    assert!(marks.iter().any(|m| m.contains("analyze-Case_B")));

    // Cleanup still ran after the failed analysis stage.
    assert!(!Path::new("CaseA.trace").exists());
}

#[test]
fn perf_collection_renders_flamegraphs() {
    let _guard = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let mut fixture = Fixture::new();

    let profiler = write_script(
        &fixture._dir.path().join("fake-perf.sh"),
        r#"if [ "$1" = "--version" ]; then exit 0; fi
# record -o <file> -g -F <freq> <artifact> <filter> <min_time>
echo profile-data > "$3"
"#,
    );
    let renderer = write_script(
        &fixture._dir.path().join("fake-flamegraph.sh"),
        r#"echo folded > "${PERF_BASE_NAME}-out.perf"
echo '<svg/>' > "${OUTPUT_DIR}/${OUTPUT_FILENAME}.svg"
"#,
    );
    fixture.config.perf.profiler = profiler.display().to_string();
    fixture.config.perf.flamegraph_script = renderer.display().to_string();

    Collector::Perf.collect(&fixture.ctx(), "bm_fake").unwrap();

    assert_eq!(
        fixture.links(),
        vec![
            ("CaseA".to_string(), "CaseA.svg".to_string()),
            ("Case B".to_string(), "Case_B.svg".to_string()),
        ]
    );
    assert!(fixture.failure_marks().is_empty());
    assert!(fixture.report_dir.join("CaseA.svg").exists());
    assert!(fixture.report_dir.join("Case_B.svg").exists());

    // Both intermediate profiles were cleaned up.
    assert!(!Path::new("CaseA-perf.data").exists());
    assert!(!Path::new("CaseA-out.perf").exists());
}

#[test]
fn missing_profiler_surfaces_tool_unavailable() {
    let _guard = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let mut fixture = Fixture::new();
    fixture.config.perf.profiler = "/nonexistent/fake-perf".to_string();

    let err = Collector::Perf
        .collect(&fixture.ctx(), "bm_fake")
        .unwrap_err();

    assert!(matches!(err, CollectError::ToolUnavailable { .. }));
}

#[test]
fn summary_reports_both_configurations() {
    let _guard = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let fixture = Fixture::new();

    Collector::Summary.collect(&fixture.ctx(), "bm_fake").unwrap();

    let headings: Vec<String> = fixture
        .report
        .fragments()
        .into_iter()
        .filter_map(|f| match f {
            Fragment::Heading(h) => Some(h),
            _ => None,
        })
        .collect();

    assert_eq!(
        headings,
        vec![
            "Summary: bm_fake [no counters]".to_string(),
            "Summary: bm_fake [with counters]".to_string(),
        ]
    );

    // Each run's console output was captured as a text fragment.
    let texts: Vec<String> = fixture
        .report
        .fragments()
        .into_iter()
        .filter_map(|f| match f {
            Fragment::Text(t) => Some(t),
            _ => None,
        })
        .collect();
    assert_eq!(texts.len(), 2);
    assert!(texts.iter().all(|t| t.contains("2 cases ran")));
}

#[test]
fn summary_counter_build_failure_keeps_plain_results() {
    let _guard = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let mut fixture = Fixture::new();

    // Build tool that rejects only the counter-instrumented configuration.
    let build_tool = write_script(
        &fixture._dir.path().join("fake-build.sh"),
        r#"for arg in "$@"; do
  case "$arg" in
    --config=counters) exit 1;;
  esac
done
exit 0
"#,
    );
    fixture.config.build.program = build_tool.display().to_string();

    let err = Collector::Summary
        .collect(&fixture.ctx(), "bm_fake")
        .unwrap_err();

    assert!(matches!(err, CollectError::Build { .. }));

    // The plain-configuration results were appended before the failure.
    let fragments = fixture.report.fragments();
    assert!(fragments
        .iter()
        .any(|f| matches!(f, Fragment::Heading(h) if h == "Summary: bm_fake [no counters]")));
    assert!(!fragments
        .iter()
        .any(|f| matches!(f, Fragment::Heading(h) if h.contains("with counters"))));
}
