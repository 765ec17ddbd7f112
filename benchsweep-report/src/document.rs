//! The accumulator document.

use crate::fragment::Fragment;
use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Name of the rendered document inside the report directory.
const INDEX_FILE: &str = "index.html";

/// Process-lifetime, append-only report document.
///
/// Appends are serialized behind a mutex: workers in a stage's concurrency
/// pool may complete and report at the same time. The document is written
/// to disk exactly once - explicitly via [`Report::finalize`], or by the
/// `Drop` backstop if an error path returns before finalization.
#[derive(Debug)]
pub struct Report {
    fragments: Mutex<Vec<Fragment>>,
    path: PathBuf,
    flushed: AtomicBool,
}

impl Report {
    /// Create the report, creating `report_dir` if absent.
    ///
    /// Acquiring the output directory up front means the end-of-run flush
    /// cannot fail on a missing destination.
    pub fn new(report_dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(report_dir)?;
        Ok(Self {
            fragments: Mutex::new(Vec::new()),
            path: report_dir.join(INDEX_FILE),
            flushed: AtomicBool::new(false),
        })
    }

    /// Append a section heading.
    pub fn heading(&self, text: impl Into<String>) {
        self.push(Fragment::Heading(text.into()));
    }

    /// Append a link to a per-case artifact.
    pub fn link(&self, text: impl Into<String>, target: impl Into<String>) {
        self.push(Fragment::Link {
            text: text.into(),
            target: target.into(),
        });
    }

    /// Append a preformatted text block.
    pub fn text(&self, body: impl Into<String>) {
        self.push(Fragment::Text(body.into()));
    }

    fn push(&self, fragment: Fragment) {
        self.fragments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fragment);
    }

    /// Snapshot of the fragments appended so far, in insertion order.
    pub fn fragments(&self) -> Vec<Fragment> {
        self.fragments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Where the document will be written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the current fragment sequence as a complete HTML document.
    pub fn render(&self) -> String {
        let fragments = self.fragments();
        let mut html = String::from(
            "<html>\n<head>\n<title>Microbenchmark Results</title>\n</head>\n<body>\n",
        );
        for fragment in &fragments {
            match fragment {
                Fragment::Heading(text) => {
                    html.push_str(&format!("<h1>{}</h1>\n", escape(text)));
                }
                Fragment::Link { text, target } => {
                    html.push_str(&format!(
                        "<p><a href=\"{}\">{}</a></p>\n",
                        escape(target),
                        escape(text)
                    ));
                }
                Fragment::Text(body) => {
                    html.push_str(&format!("<p><pre>{}</pre></p>\n", escape(body)));
                }
            }
        }
        html.push_str(&format!(
            "<p><small>generated {}</small></p>\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ));
        html.push_str("</body>\n</html>\n");
        html
    }

    /// Serialize the document to its report location.
    ///
    /// Idempotent: the first call writes, later calls (and the `Drop`
    /// backstop) are no-ops.
    pub fn finalize(&self) -> io::Result<&Path> {
        if self.flushed.swap(true, Ordering::SeqCst) {
            return Ok(&self.path);
        }
        std::fs::write(&self.path, self.render())?;
        Ok(&self.path)
    }
}

impl Drop for Report {
    fn drop(&mut self) {
        // Backstop for early-return error paths: the accumulated fragments
        // still reach storage.
        if !self.flushed.load(Ordering::SeqCst) {
            if let Err(e) = self.finalize() {
                tracing::error!("failed to flush report to {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Minimal HTML escaping for text content and quoted attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::new(dir.path()).unwrap();

        report.heading("Latency Profiles: bm_example");
        report.link("BM_Case/1", "BM_Case_1.txt");
        report.text("raw output");

        assert_eq!(
            report.fragments(),
            vec![
                Fragment::Heading("Latency Profiles: bm_example".into()),
                Fragment::Link {
                    text: "BM_Case/1".into(),
                    target: "BM_Case_1.txt".into()
                },
                Fragment::Text("raw output".into()),
            ]
        );
    }

    #[test]
    fn render_escapes_markup() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::new(dir.path()).unwrap();

        report.heading("Summary: bm<fast> & friends");
        report.link("BM_Foo<int>", "BM_Foo_int.txt");
        report.text("a < b && c > \"d\"");

        let html = report.render();
        assert!(html.contains("<h1>Summary: bm&lt;fast&gt; &amp; friends</h1>"));
        assert!(html.contains("<a href=\"BM_Foo_int.txt\">BM_Foo&lt;int&gt;</a>"));
        assert!(html.contains("<pre>a &lt; b &amp;&amp; c &gt; &quot;d&quot;</pre>"));
        assert!(!html.contains("bm<fast>"));
    }

    #[test]
    fn empty_report_is_still_well_formed() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::new(dir.path()).unwrap();

        let path = report.finalize().unwrap().to_path_buf();
        let html = std::fs::read_to_string(path).unwrap();

        assert!(html.starts_with("<html>"));
        assert!(html.ends_with("</html>\n"));
        assert!(!html.contains("<a href"));
    }

    #[test]
    fn finalize_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::new(dir.path()).unwrap();
        report.heading("first");

        report.finalize().unwrap();
        let first = std::fs::read_to_string(report.path()).unwrap();

        // Appends after the flush must not change the persisted document.
        report.heading("second");
        report.finalize().unwrap();
        let second = std::fs::read_to_string(report.path()).unwrap();

        assert_eq!(first, second);
        assert!(first.contains("first"));
        assert!(!first.contains("second"));
    }

    #[test]
    fn drop_backstop_flushes_unfinalized_report() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join(INDEX_FILE);
        {
            let report = Report::new(dir.path()).unwrap();
            report.heading("abandoned run");
            // No finalize: simulate an early-return error path.
        }
        let html = std::fs::read_to_string(index).unwrap();
        assert!(html.contains("abandoned run"));
    }

    #[test]
    fn creates_missing_report_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports/nested");
        let report = Report::new(&nested).unwrap();
        report.finalize().unwrap();
        assert!(nested.join(INDEX_FILE).exists());
    }
}
