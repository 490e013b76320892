//! Cycle analyzer.
//!
//! Runs Tarjan's SCC over the function-call graph (recursion cycles)
//! and the file graph (circular imports). Because call resolution
//! collapses member calls to bare names, one call-graph node can alias
//! several real definitions; the report carries a definition-site table
//! so consumers can disambiguate.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result};
use crate::index::{tarjan, SymbolKind};

/// Cycle analyzer.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }
}

/// Cycle analysis results.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Mutual/self recursion cycles over qualified function names.
    pub function_cycles: Vec<Vec<String>>,
    /// Circular file dependencies.
    pub file_cycles: Vec<Vec<String>>,
    /// Bare function name to every `file:line` defining it, covering
    /// every indexed function so aliased cycle nodes can be
    /// disambiguated.
    pub definition_sites: BTreeMap<String, Vec<String>>,
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "cycles"
    }

    fn description(&self) -> &'static str {
        "Detect recursion cycles and circular file dependencies"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let function_cycles = tarjan::cycles(ctx.index.call_graph());
        let file_cycles = tarjan::cycles(ctx.index.file_graph());

        let mut definition_sites: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for symbol in ctx.index.symbols().iter() {
            if symbol.kind == SymbolKind::Function {
                definition_sites
                    .entry(symbol.name.clone())
                    .or_default()
                    .push(format!("{}:{}", symbol.file.display(), symbol.line));
            }
        }

        tracing::info!(
            "cycle analysis: {} function cycles, {} file cycles",
            function_cycles.len(),
            file_cycles.len()
        );
        Ok(Analysis {
            function_cycles,
            file_cycles,
            definition_sites,
        })
    }
}
