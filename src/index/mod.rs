//! The cross-file index: symbol table, per-file records, and graphs.
//!
//! `Index::build` is the engine's merge point. Per-file parsing runs in
//! parallel; the fold into the symbol table and graphs is owned by one
//! thread so the last-write-wins collision rule stays deterministic.

pub mod graphs;
pub mod symbols;
pub mod tarjan;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::core::{SourceSet, StructuralRecord};
use crate::parser::Parser;

pub use graphs::NamedGraph;
pub use symbols::{Symbol, SymbolKind, SymbolTable};

pub(crate) use graphs::{module_stem, qualified_name};

/// The populated index for one analysis run.
pub struct Index {
    symbols: SymbolTable,
    records: BTreeMap<PathBuf, StructuralRecord>,
    call_graph: NamedGraph,
    file_graph: NamedGraph,
    parse_failures: usize,
}

impl Index {
    /// Parse every file and fold the records into the symbol table and
    /// both graphs.
    pub fn build(files: &SourceSet) -> Self {
        let started = Instant::now();
        let parser = Parser::new();

        let parsed: Vec<(PathBuf, StructuralRecord, bool)> = files
            .files()
            .par_iter()
            .map(|file| match parser.try_parse_record(file) {
                Ok(record) => (file.path.clone(), record, false),
                Err(e) => {
                    tracing::debug!("parse failed for {}: {e}", file.path.display());
                    (file.path.clone(), StructuralRecord::empty(), true)
                }
            })
            .collect();

        let mut symbols = SymbolTable::new();
        let mut records = BTreeMap::new();
        let mut parse_failures = 0;
        for (path, record, failed) in parsed {
            if failed {
                parse_failures += 1;
            }
            records.insert(path, record);
        }
        for (path, record) in &records {
            index_record(&mut symbols, path, record);
        }

        let builder = graphs::GraphBuilder::new(&symbols);
        let call_graph = builder.call_graph(&records);
        let file_graph = builder.file_graph(&records, &call_graph);

        tracing::info!(
            "indexed {} files, {} symbols in {:?}",
            records.len(),
            symbols.len(),
            started.elapsed()
        );
        Self {
            symbols,
            records,
            call_graph,
            file_graph,
            parse_failures,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Per-file structural records, keyed by path in sorted order.
    pub fn records(&self) -> &BTreeMap<PathBuf, StructuralRecord> {
        &self.records
    }

    pub fn record(&self, path: &Path) -> Option<&StructuralRecord> {
        self.records.get(path)
    }

    /// Function-call graph over qualified names.
    pub fn call_graph(&self) -> &NamedGraph {
        &self.call_graph
    }

    /// File-dependency graph over file paths.
    pub fn file_graph(&self) -> &NamedGraph {
        &self.file_graph
    }

    /// Files whose parse failed outright and contributed empty records.
    pub fn parse_failures(&self) -> usize {
        self.parse_failures
    }

    /// Every callee name observed anywhere in the corpus, with counts.
    pub fn corpus_call_names(&self) -> BTreeMap<&str, usize> {
        let mut names = BTreeMap::new();
        for record in self.records.values() {
            for call in &record.calls {
                *names.entry(call.as_str()).or_insert(0) += 1;
            }
        }
        names
    }
}

/// Fold one record into the symbol table in source order.
fn index_record(symbols: &mut SymbolTable, path: &PathBuf, record: &StructuralRecord) {
    let module = module_stem(path);
    for class in &record.classes {
        symbols.add_symbol(Symbol {
            name: class.name.clone(),
            kind: SymbolKind::Class,
            file: path.clone(),
            line: class.line,
            signature: String::new(),
            body: String::new(),
            parent_class: None,
            qualified_name: qualified_name(&module, None, &class.name),
        });
    }
    for func in &record.functions {
        symbols.add_symbol(Symbol {
            name: func.name.clone(),
            kind: SymbolKind::Function,
            file: path.clone(),
            line: func.start_line,
            signature: func.signature.clone(),
            body: func.body.clone(),
            parent_class: func.parent_class.clone(),
            qualified_name: qualified_name(&module, func.parent_class.as_deref(), &func.name),
        });
    }
    for binding in &record.module_bindings {
        symbols.add_symbol(Symbol {
            name: binding.name.clone(),
            kind: SymbolKind::Variable,
            file: path.clone(),
            line: binding.line,
            signature: String::new(),
            body: String::new(),
            parent_class: None,
            qualified_name: qualified_name(&module, None, &binding.name),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Language, SourceFile};

    fn py(path: &str, code: &str) -> SourceFile {
        SourceFile::from_content(path, Language::Python, code.to_string())
    }

    #[test]
    fn test_build_indexes_functions_and_classes() {
        let files = SourceSet::new(vec![py(
            "shapes.py",
            "class Rect:\n    def area(self):\n        return self.w * self.h\n\ndef make():\n    return Rect()\n",
        )]);
        let index = Index::build(&files);
        assert!(index.symbols().get_symbol("shapes.Rect").is_some());
        assert!(index.symbols().get_symbol("shapes.Rect.area").is_some());
        assert!(index.symbols().get_symbol("shapes.make").is_some());
        assert_eq!(index.parse_failures(), 0);
    }

    #[test]
    fn test_qualified_collision_last_write_wins() {
        let files = SourceSet::new(vec![py(
            "m.py",
            "def calc():\n    return 1\n\ndef calc():\n    return 2\n",
        )]);
        let index = Index::build(&files);
        let symbol = index.symbols().get_symbol("m.calc").unwrap();
        assert_eq!(symbol.line, 4);
        assert_eq!(index.symbols().find_by_name("calc").len(), 1);
    }

    #[test]
    fn test_cross_file_call_edge() {
        let files = SourceSet::new(vec![
            py("app.py", "from util import helper\n\ndef main():\n    helper()\n"),
            py("util.py", "def helper():\n    return 1\n"),
        ]);
        let index = Index::build(&files);
        assert!(index.call_graph().has_edge("app.main", "util.helper"));
        assert!(index.file_graph().has_edge("app.py", "util.py"));
    }

    #[test]
    fn test_same_file_resolution_beats_other_file() {
        let files = SourceSet::new(vec![
            py("a.py", "def helper():\n    return 1\n\ndef go():\n    helper()\n"),
            py("b.py", "def helper():\n    return 2\n"),
        ]);
        let index = Index::build(&files);
        assert!(index.call_graph().has_edge("a.go", "a.helper"));
        assert!(!index.call_graph().has_edge("a.go", "b.helper"));
    }

    #[test]
    fn test_imported_module_beats_first_bare_match() {
        // aaa.py sorts first, so without the import step its helper
        // would win the bare-name fallback.
        let files = SourceSet::new(vec![
            py("aaa.py", "def helper():\n    return 1\n"),
            py(
                "app.py",
                "from util import helper\n\ndef main():\n    helper()\n",
            ),
            py("util.py", "def helper():\n    return 2\n"),
        ]);
        let index = Index::build(&files);
        assert!(index.call_graph().has_edge("app.main", "util.helper"));
        assert!(!index.call_graph().has_edge("app.main", "aaa.helper"));
    }

    #[test]
    fn test_module_binding_indexed_as_variable() {
        let files = SourceSet::new(vec![py("cfg.py", "LIMIT = 10\n")]);
        let index = Index::build(&files);
        let symbol = index.symbols().get_symbol("cfg.LIMIT").unwrap();
        assert_eq!(symbol.kind, SymbolKind::Variable);
    }

    #[test]
    fn test_corpus_call_names() {
        let files = SourceSet::new(vec![py(
            "m.py",
            "def f():\n    g()\n    g()\n\ndef g():\n    pass\n",
        )]);
        let index = Index::build(&files);
        assert_eq!(index.corpus_call_names().get("g"), Some(&2));
    }
}
