//! Analyzer trait and analysis context.

use serde::Serialize;

use super::Result;
use crate::config::Config;
use crate::index::Index;

/// Trait implemented by all analyzers.
pub trait Analyzer: Send + Sync {
    /// The result type produced by this analyzer.
    type Output: Serialize + Send;

    /// Unique identifier for this analyzer.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Run analysis and return results.
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output>;
}

/// Context shared by all analyzers during one analysis run.
pub struct AnalysisContext<'a> {
    /// The populated cross-file index (symbol table, records, graphs).
    pub index: &'a Index,
    /// Configuration.
    pub config: &'a Config,
}

impl<'a> AnalysisContext<'a> {
    /// Create a new analysis context.
    pub fn new(index: &'a Index, config: &'a Config) -> Self {
        Self { index, config }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Language, SourceFile, SourceSet};

    #[test]
    fn test_analysis_context_new() {
        let files = SourceSet::new(vec![SourceFile::from_content(
            "m.py",
            Language::Python,
            "def f():\n    pass\n".to_string(),
        )]);
        let index = Index::build(&files);
        let config = Config::default();
        let ctx = AnalysisContext::new(&index, &config);
        assert_eq!(ctx.index.symbols().len(), 1);
    }
}
