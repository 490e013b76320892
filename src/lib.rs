//! Argus - Cross-file structural analysis library.
//!
//! Argus parses multi-language source trees into a uniform structural
//! representation, indexes every definition in a global symbol table,
//! builds function-call and file-dependency graphs, detects cycles
//! (recursion, circular imports), finds dead code and unused variables,
//! and finds near-duplicate functions across files via structural
//! fingerprinting.
//!
//! # Supported Languages
//!
//! Python (native grammar walker), C, C++, Java (query-based walker).
//!
//! # Example
//!
//! ```no_run
//! use argus::analyzers::cycles::Analyzer as CycleAnalyzer;
//! use argus::config::Config;
//! use argus::core::{AnalysisContext, Analyzer, SourceSet};
//! use argus::index::Index;
//!
//! let config = Config::default();
//! let files = SourceSet::from_path(".").unwrap();
//! let index = Index::build(&files);
//! let ctx = AnalysisContext::new(&index, &config);
//! let analysis = CycleAnalyzer::new().analyze(&ctx).unwrap();
//! println!("{} call cycles", analysis.function_cycles.len());
//! ```

pub mod analyzers;
pub mod config;
pub mod core;
pub mod index;
pub mod oracle;
pub mod parser;

pub use core::{AnalysisContext, Analyzer};
pub use index::Index;
