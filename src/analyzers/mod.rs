//! Analysis modules.
//!
//! Each analyzer consumes the populated [`crate::index::Index`] through
//! an [`crate::core::AnalysisContext`] and produces a serializable
//! report. Analyzers never re-parse source.

pub mod cycles;
pub mod deadcode;
pub mod fingerprint;
pub mod redundancy;
