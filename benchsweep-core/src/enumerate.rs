//! Case enumeration.
//!
//! A built benchmark binary reports its runnable cases, one per stdout
//! line, when invoked with the list flag. Nothing else is permitted on
//! that stream.

use crate::error::CollectError;
use std::path::Path;
use std::process::Command;

/// Flag a benchmark binary answers with its case list.
pub(crate) const LIST_FLAG: &str = "--benchmark_list_tests";

/// Ask a built artifact for its case identifiers, in its own order.
///
/// Fails with [`CollectError::Enumeration`] if the artifact cannot be
/// invoked, exits nonzero, or reports no cases. Enumeration failure aborts
/// only the current (collector, benchmark) pair.
pub fn list_cases(artifact: &Path) -> Result<Vec<String>, CollectError> {
    let output = Command::new(artifact)
        .arg(LIST_FLAG)
        .output()
        .map_err(|e| CollectError::Enumeration {
            artifact: artifact.display().to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(CollectError::Enumeration {
            artifact: artifact.display().to_string(),
            reason: format!("exited with {}", output.status),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let cases: Vec<String> = stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if cases.is_empty() {
        return Err(CollectError::Enumeration {
            artifact: artifact.display().to_string(),
            reason: "no cases reported".to_string(),
        });
    }

    Ok(cases)
}
