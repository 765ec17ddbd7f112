//! Case-identifier sanitization.
//!
//! Benchmark case identifiers routinely contain template arguments and
//! parameter suffixes (`BM_Foo<Bar, Baz>/16`), which are not usable as file
//! names. Every per-case artifact (trace, profile, rendered output) is named
//! from the sanitized form so a case maps to the same file across all three
//! stages and across re-runs.

/// Characters replaced by the separator.
const UNSAFE: &[char] = &['<', '>', ',', ' ', '/'];

/// Map a case identifier to a filesystem-safe artifact name.
///
/// Any run of unsafe characters collapses to a single `_`; everything else
/// is preserved verbatim, in order. Idempotent.
pub fn artifact_name(case: &str) -> String {
    let mut out = String::with_capacity(case.len());
    for c in case.chars() {
        if UNSAFE.contains(&c) {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }
    out
}
