//! Dead code and unused-symbol analyzer.
//!
//! Works entirely from the per-file structural records and the symbol
//! table: a function is dead when its bare name never appears in the
//! corpus-wide call list; a variable is unused when its scope never
//! reads it. Reflection and dynamic dispatch are invisible to a
//! syntax-only engine, so both lists are heuristics, not proofs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, FunctionDef, Result, StructuralRecord};
use crate::index::module_stem;

/// Decorator / annotation fragments implying framework-driven invocation.
const FRAMEWORK_MARKERS: [&str; 12] = [
    "route", "task", "fixture", "command", "handler", "listener", "override", "test", "event",
    "job", "scheduled", "app.",
];

/// Dead-code analyzer.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }
}

/// What scope a reported symbol belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadKind {
    Function,
    Method,
    LocalVariable,
    ModuleVariable,
}

/// One unreferenced definition.
#[derive(Debug, Clone, Serialize)]
pub struct DeadSymbol {
    pub name: String,
    pub file: PathBuf,
    pub line: u32,
    pub kind: DeadKind,
}

/// Two same-named definitions in one lexical scope. The symbol table
/// silently keeps only the later one; this scan makes the shadowing
/// visible.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateDefinition {
    pub name: String,
    pub file: PathBuf,
    pub first_line: u32,
    pub second_line: u32,
    pub similarity: f64,
    pub suggestion: String,
}

/// Dead-code analysis results.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub dead_functions: Vec<DeadSymbol>,
    pub unused_variables: Vec<DeadSymbol>,
    pub duplicate_definitions: Vec<DuplicateDefinition>,
    /// Qualified names unreached in the call graph: forward
    /// reachability when entry points are configured, in-degree zero
    /// otherwise.
    pub unreachable: Vec<String>,
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "deadcode"
    }

    fn description(&self) -> &'static str {
        "Find uncalled functions, unused variables, and shadowed definitions"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let called: HashSet<&str> = ctx.index.corpus_call_names().into_keys().collect();

        let mut dead_functions = Vec::new();
        let mut unused_variables = Vec::new();
        let mut duplicate_definitions = Vec::new();
        for (path, record) in ctx.index.records() {
            scan_dead_functions(path, record, &called, &mut dead_functions);
            scan_unused_variables(ctx, path, record, &mut unused_variables);
            scan_duplicate_definitions(path, record, &mut duplicate_definitions);
        }

        let unreachable = ctx
            .index
            .call_graph()
            .find_dead_code(&ctx.config.deadcode.entry_points);

        tracing::info!(
            "dead-code analysis: {} dead functions, {} unused variables",
            dead_functions.len(),
            unused_variables.len()
        );
        Ok(Analysis {
            dead_functions,
            unused_variables,
            duplicate_definitions,
            unreachable,
        })
    }
}

fn scan_dead_functions(
    path: &Path,
    record: &StructuralRecord,
    called: &HashSet<&str>,
    out: &mut Vec<DeadSymbol>,
) {
    for func in &record.functions {
        if called.contains(func.name.as_str()) || is_exempt(func) {
            continue;
        }
        out.push(DeadSymbol {
            name: func.name.clone(),
            file: path.to_path_buf(),
            line: func.start_line,
            kind: if func.parent_class.is_some() {
                DeadKind::Method
            } else {
                DeadKind::Function
            },
        });
    }
}

/// Functions that look uncalled but must never be reported.
fn is_exempt(func: &FunctionDef) -> bool {
    let name = func.name.as_str();
    if name.starts_with("__") && name.ends_with("__") {
        return true;
    }
    let lower = name.to_lowercase();
    if lower.contains("main") || lower.contains("test") {
        return true;
    }
    // constructors are invoked through the class name
    if func.parent_class.as_deref() == Some(name) {
        return true;
    }
    func.decorators.iter().any(|d| {
        let d = d.to_lowercase();
        FRAMEWORK_MARKERS.iter().any(|m| d.contains(m))
    })
}

fn scan_unused_variables(
    ctx: &AnalysisContext<'_>,
    path: &Path,
    record: &StructuralRecord,
    out: &mut Vec<DeadSymbol>,
) {
    // function scopes: reads already include nested scopes
    for func in &record.functions {
        let reads: HashSet<&str> = func.reads.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        for binding in &func.bindings {
            if binding.name.starts_with('_') || !seen.insert(binding.name.as_str()) {
                continue;
            }
            if !reads.contains(binding.name.as_str()) {
                out.push(DeadSymbol {
                    name: binding.name.clone(),
                    file: path.to_path_buf(),
                    line: binding.line,
                    kind: DeadKind::LocalVariable,
                });
            }
        }
    }

    // module scope: used when read anywhere in this file or imported by
    // name from another scanned file
    let mut reads: HashSet<&str> = record.module_reads.iter().map(String::as_str).collect();
    for func in &record.functions {
        reads.extend(func.reads.iter().map(String::as_str));
    }
    let stem = module_stem(&path.to_path_buf());
    let imported: HashSet<&str> = ctx
        .index
        .records()
        .iter()
        .filter(|(other, _)| other.as_path() != path)
        .flat_map(|(_, r)| &r.imports)
        .filter(|imp| match &imp.module {
            Some(module) => module.rsplit('.').next() == Some(stem.as_str()),
            None => false,
        })
        .flat_map(|imp| imp.names.iter().map(String::as_str))
        .collect();

    let mut seen = HashSet::new();
    for binding in &record.module_bindings {
        if binding.name.starts_with('_') || !seen.insert(binding.name.as_str()) {
            continue;
        }
        if !reads.contains(binding.name.as_str()) && !imported.contains(binding.name.as_str()) {
            out.push(DeadSymbol {
                name: binding.name.clone(),
                file: path.to_path_buf(),
                line: binding.line,
                kind: DeadKind::ModuleVariable,
            });
        }
    }
}

fn scan_duplicate_definitions(
    path: &Path,
    record: &StructuralRecord,
    out: &mut Vec<DuplicateDefinition>,
) {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<(Option<&str>, &str), Vec<&FunctionDef>> = BTreeMap::new();
    for func in &record.functions {
        groups
            .entry((func.parent_class.as_deref(), func.name.as_str()))
            .or_default()
            .push(func);
    }
    for ((_, name), defs) in groups {
        if defs.len() < 2 {
            continue;
        }
        for i in 0..defs.len() {
            for j in (i + 1)..defs.len() {
                out.push(DuplicateDefinition {
                    name: name.to_string(),
                    file: path.to_path_buf(),
                    first_line: defs[i].start_line,
                    second_line: defs[j].start_line,
                    similarity: 1.0,
                    suggestion: format!(
                        "delete the later definition of `{name}` at line {}",
                        defs[j].start_line
                    ),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::{Language, SourceFile, SourceSet};
    use crate::index::Index;

    fn analyze(files: Vec<SourceFile>) -> Analysis {
        let files = SourceSet::new(files);
        let index = Index::build(&files);
        let config = Config::default();
        let ctx = AnalysisContext::new(&index, &config);
        Analyzer::new().analyze(&ctx).unwrap()
    }

    fn py(path: &str, code: &str) -> SourceFile {
        SourceFile::from_content(path, Language::Python, code.to_string())
    }

    #[test]
    fn test_uncalled_function_reported_called_one_not() {
        let analysis = analyze(vec![py(
            "m.py",
            "def foo():\n    bar()\n\ndef bar():\n    pass\n",
        )]);
        let dead: Vec<&str> = analysis.dead_functions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(dead, vec!["foo"]);
    }

    #[test]
    fn test_main_test_and_dunder_exempt() {
        let analysis = analyze(vec![py(
            "m.py",
            "def main():\n    pass\n\ndef test_thing():\n    pass\n\nclass A:\n    def __repr__(self):\n        return 'a'\n",
        )]);
        assert!(analysis.dead_functions.is_empty());
    }

    #[test]
    fn test_decorated_function_exempt() {
        let analysis = analyze(vec![py(
            "m.py",
            "@app.route('/x')\ndef serve():\n    pass\n\ndef plain():\n    pass\n",
        )]);
        let dead: Vec<&str> = analysis.dead_functions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(dead, vec!["plain"]);
    }

    #[test]
    fn test_unused_local_variable() {
        let analysis = analyze(vec![py(
            "m.py",
            "def f():\n    total = 1\n    used = 2\n    _ignored = 3\n    return used\n",
        )]);
        let unused: Vec<&str> = analysis
            .unused_variables
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(unused, vec!["total"]);
        assert_eq!(analysis.unused_variables[0].kind, DeadKind::LocalVariable);
    }

    #[test]
    fn test_module_variable_used_via_import() {
        let analysis = analyze(vec![
            py("cfg.py", "LIMIT = 10\nSTALE = 20\n"),
            py("app.py", "from cfg import LIMIT\n\ndef main():\n    return LIMIT\n"),
        ]);
        let unused: Vec<&str> = analysis
            .unused_variables
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(unused, vec!["STALE"]);
    }

    #[test]
    fn test_module_variable_read_inside_function() {
        let analysis = analyze(vec![py(
            "m.py",
            "LIMIT = 10\n\ndef main():\n    return LIMIT\n",
        )]);
        assert!(analysis.unused_variables.is_empty());
    }

    #[test]
    fn test_duplicate_definitions_in_one_scope() {
        let analysis = analyze(vec![py(
            "m.py",
            "def calc():\n    return 1\n\ndef calc():\n    return 2\n",
        )]);
        assert_eq!(analysis.duplicate_definitions.len(), 1);
        let dup = &analysis.duplicate_definitions[0];
        assert_eq!(dup.name, "calc");
        assert_eq!((dup.first_line, dup.second_line), (1, 4));
        assert_eq!(dup.similarity, 1.0);
    }

    #[test]
    fn test_unreachable_from_entry_points() {
        let files = SourceSet::new(vec![py(
            "m.py",
            "def main():\n    helper()\n\ndef helper():\n    pass\n\ndef orphan():\n    misc()\n\ndef misc():\n    pass\n",
        )]);
        let index = Index::build(&files);
        let mut config = Config::default();
        config.deadcode.entry_points = vec!["main".to_string()];
        let ctx = AnalysisContext::new(&index, &config);
        let analysis = Analyzer::new().analyze(&ctx).unwrap();
        assert_eq!(
            analysis.unreachable,
            vec!["m.misc".to_string(), "m.orphan".to_string()]
        );
    }

    #[test]
    fn test_same_name_different_classes_not_duplicates() {
        let analysis = analyze(vec![py(
            "m.py",
            "class A:\n    def go(self):\n        pass\n\nclass B:\n    def go(self):\n        pass\n",
        )]);
        assert!(analysis.duplicate_definitions.is_empty());
    }
}
