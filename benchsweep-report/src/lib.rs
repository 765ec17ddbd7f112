#![warn(missing_docs)]
//! BenchSweep Report - The Accumulated Result Document
//!
//! One [`Report`] exists for the lifetime of a collection run. Collectors
//! append [`Fragment`]s as they go - headings, per-case links, preformatted
//! output - and the document is serialized to `index.html` in the report
//! directory exactly once, at the end of the run, whether or not every
//! requested pair completed.

mod document;
mod fragment;

pub use document::Report;
pub use fragment::Fragment;
