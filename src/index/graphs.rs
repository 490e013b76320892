//! Named directed graphs: the function-call graph and the file graph.
//!
//! Both are a [`NamedGraph`], a thin wrapper over `petgraph::DiGraph`
//! with a name-to-node map. Call-graph nodes are qualified names; file
//! graph nodes are file paths.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;

use crate::core::{ImportDecl, StructuralRecord};

use super::symbols::{Symbol, SymbolKind, SymbolTable};

/// Entry-point names never reported dead in in-degree mode.
const DEAD_CODE_ALLOW_LIST: [&str; 4] = ["main", "__main__", "run", "start"];

/// A directed graph whose nodes are identified by string names.
#[derive(Debug, Default)]
pub struct NamedGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl NamedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node for `name`.
    pub fn ensure_node(&mut self, name: &str) -> NodeIndex {
        match self.nodes.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.graph.add_node(name.to_string());
                self.nodes.insert(name.to_string(), idx);
                idx
            }
        }
    }

    /// Add an edge, deduplicating repeats.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let a = self.ensure_node(from);
        let b = self.ensure_node(to);
        self.graph.update_edge(a, b, ());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing neighbor names of `name`, sorted.
    pub fn successors(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].as_str())
            .collect();
        out.sort_unstable();
        out
    }

    /// All node names, sorted.
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.nodes.get(from), self.nodes.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    pub(super) fn graph(&self) -> &DiGraph<String, ()> {
        &self.graph
    }

    pub(super) fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.get(name).copied()
    }

    /// Nodes not exercised by any caller.
    ///
    /// With entry points: forward reachability from every node whose bare
    /// name matches an entry point; everything unreached is reported.
    /// Without: nodes with in-degree zero, minus a fixed allow-list.
    /// Both modes are blind to reflection and callbacks by design of a
    /// syntax-only engine.
    pub fn find_dead_code(&self, entry_points: &[String]) -> Vec<String> {
        let mut dead: Vec<String> = if entry_points.is_empty() {
            self.graph
                .node_indices()
                .filter(|&idx| {
                    self.graph
                        .neighbors_directed(idx, Direction::Incoming)
                        .next()
                        .is_none()
                })
                .map(|idx| self.graph[idx].clone())
                .filter(|name| !DEAD_CODE_ALLOW_LIST.contains(&bare_name(name)))
                .collect()
        } else {
            let mut reached: HashSet<NodeIndex> = HashSet::new();
            for idx in self.graph.node_indices() {
                let bare = bare_name(&self.graph[idx]);
                if entry_points.iter().any(|e| e == bare || e == &self.graph[idx]) {
                    let mut dfs = Dfs::new(&self.graph, idx);
                    while let Some(n) = dfs.next(&self.graph) {
                        reached.insert(n);
                    }
                }
            }
            self.graph
                .node_indices()
                .filter(|idx| !reached.contains(idx))
                .map(|idx| self.graph[idx].clone())
                .collect()
        };
        dead.sort_unstable();
        dead
    }

    /// Shortest call path between two nodes (BFS), inclusive of both
    /// endpoints. Empty when either node is missing or unreachable.
    pub fn call_chain(&self, from: &str, to: &str) -> Vec<String> {
        let (Some(start), Some(goal)) = (self.node_index(from), self.node_index(to)) else {
            return Vec::new();
        };
        if start == goal {
            return vec![self.graph[start].clone()];
        }
        let mut prev: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if next != start && !prev.contains_key(&next) {
                    prev.insert(next, node);
                    if next == goal {
                        let mut chain = vec![self.graph[goal].clone()];
                        let mut cursor = goal;
                        while let Some(&p) = prev.get(&cursor) {
                            chain.push(self.graph[p].clone());
                            cursor = p;
                        }
                        chain.reverse();
                        return chain;
                    }
                    queue.push_back(next);
                }
            }
        }
        Vec::new()
    }
}

/// Last dotted segment of a qualified name.
fn bare_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Builds the call graph and the file graph from symbols and records.
pub struct GraphBuilder<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self { symbols }
    }

    /// Function-call graph over qualified names.
    ///
    /// Every function symbol gets a node even when uncalled, so the
    /// in-degree dead-code mode sees isolated definitions.
    pub fn call_graph(
        &self,
        records: &std::collections::BTreeMap<PathBuf, StructuralRecord>,
    ) -> NamedGraph {
        let mut graph = NamedGraph::new();
        for symbol in self.symbols.iter() {
            if symbol.kind == SymbolKind::Function {
                graph.ensure_node(&symbol.qualified_name);
            }
        }
        for (path, record) in records {
            let module = module_stem(path);
            for func in &record.functions {
                let caller = qualified_name(&module, func.parent_class.as_deref(), &func.name);
                // Caller may have been overwritten by a collision; skip
                // edges from definitions the table no longer holds at
                // this location.
                let Some(owner) = self.symbols.get_symbol(&caller) else {
                    continue;
                };
                if owner.file != *path {
                    continue;
                }
                for call in &func.calls {
                    if let Some(callee) = self.resolve(call, path, &record.imports) {
                        graph.add_edge(&caller, &callee.qualified_name);
                    }
                }
            }
        }
        graph
    }

    /// Resolve a call-site name to a function symbol.
    ///
    /// Priority: exact qualified name, then bare name in the caller's
    /// file, then a bare name from a module the caller imports, then
    /// first bare-name match anywhere. Unresolved calls are dropped,
    /// not modeled.
    fn resolve(
        &self,
        call: &str,
        caller_file: &PathBuf,
        imports: &[ImportDecl],
    ) -> Option<&Symbol> {
        if let Some(symbol) = self.symbols.get_symbol(call) {
            if symbol.kind == SymbolKind::Function {
                return Some(symbol);
            }
        }
        let candidates: Vec<&Symbol> = self
            .symbols
            .find_by_name(call)
            .into_iter()
            .filter(|s| s.kind == SymbolKind::Function)
            .collect();
        candidates
            .iter()
            .find(|s| s.file == *caller_file)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|s| imports_module(imports, &module_stem(&s.file)))
            })
            .or_else(|| candidates.first())
            .copied()
    }

    /// File-dependency graph: union of projected cross-file call edges
    /// and import-to-file-stem matches.
    pub fn file_graph(
        &self,
        records: &std::collections::BTreeMap<PathBuf, StructuralRecord>,
        call_graph: &NamedGraph,
    ) -> NamedGraph {
        let mut graph = NamedGraph::new();
        let mut by_stem: HashMap<String, Vec<String>> = HashMap::new();
        for path in records.keys() {
            let name = path.display().to_string();
            graph.ensure_node(&name);
            by_stem.entry(module_stem(path)).or_default().push(name);
        }

        // (a) every cross-file call edge becomes a file edge.
        for caller in call_graph.node_names() {
            let Some(caller_sym) = self.symbols.get_symbol(caller) else {
                continue;
            };
            for callee in call_graph.successors(caller) {
                let Some(callee_sym) = self.symbols.get_symbol(callee) else {
                    continue;
                };
                if caller_sym.file != callee_sym.file {
                    graph.add_edge(
                        &caller_sym.file.display().to_string(),
                        &callee_sym.file.display().to_string(),
                    );
                }
            }
        }

        // (b) imports resolved against scanned file stems.
        for (path, record) in records {
            let from = path.display().to_string();
            for import in &record.imports {
                // `import a, b` carries no module, only names.
                let stems: Vec<&str> = match &import.module {
                    Some(module) => vec![import_stem(module)],
                    None => import.names.iter().map(|n| import_stem(n)).collect(),
                };
                for stem in stems {
                    if let Some(targets) = by_stem.get(stem) {
                        for target in targets {
                            if target != &from {
                                graph.add_edge(&from, target);
                            }
                        }
                    }
                }
            }
        }
        graph
    }
}

/// File stem used as the module part of qualified names.
pub(crate) fn module_stem(path: &PathBuf) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Does any of the caller's imports name the given module stem?
fn imports_module(imports: &[ImportDecl], stem: &str) -> bool {
    imports.iter().any(|imp| match &imp.module {
        Some(module) => import_stem(module) == stem,
        None => imp.names.iter().any(|name| import_stem(name) == stem),
    })
}

/// `pkg.mod` or `dir/util.h` reduced to the bare module stem.
fn import_stem(module: &str) -> &str {
    let file = module.rsplit('/').next().unwrap_or(module);
    for ext in [".h", ".hpp", ".hh", ".hxx"] {
        if let Some(stem) = file.strip_suffix(ext) {
            return stem;
        }
    }
    // dotted module paths resolve to their last segment.
    file.rsplit('.').next().unwrap_or(file)
}

/// `module.class.member` or `module.function`.
pub(crate) fn qualified_name(module: &str, class: Option<&str>, name: &str) -> String {
    match class {
        Some(class) => format!("{module}.{class}.{name}"),
        None => format!("{module}.{name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_graph_dedupes_edges() {
        let mut g = NamedGraph::new();
        g.add_edge("a", "b");
        g.add_edge("a", "b");
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge("a", "b"));
        assert!(!g.has_edge("b", "a"));
    }

    #[test]
    fn test_dead_code_in_degree_mode() {
        let mut g = NamedGraph::new();
        g.add_edge("m.foo", "m.bar");
        g.ensure_node("m.main");
        let dead = g.find_dead_code(&[]);
        // foo has no callers; bar is called; main is allow-listed.
        assert_eq!(dead, vec!["m.foo".to_string()]);
    }

    #[test]
    fn test_dead_code_reachability_mode() {
        let mut g = NamedGraph::new();
        g.add_edge("m.main", "m.a");
        g.add_edge("m.a", "m.b");
        g.ensure_node("m.orphan");
        let dead = g.find_dead_code(&["main".to_string()]);
        assert_eq!(dead, vec!["m.orphan".to_string()]);
    }

    #[test]
    fn test_call_chain_shortest_path() {
        let mut g = NamedGraph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        g.add_edge("a", "c");
        assert_eq!(g.call_chain("a", "c"), vec!["a".to_string(), "c".to_string()]);
        assert!(g.call_chain("c", "a").is_empty());
        assert!(g.call_chain("a", "missing").is_empty());
        assert_eq!(g.call_chain("b", "b"), vec!["b".to_string()]);
    }

    #[test]
    fn test_import_stem() {
        assert_eq!(import_stem("pkg.mod"), "mod");
        assert_eq!(import_stem("util"), "util");
        assert_eq!(import_stem("dir/util.h"), "util");
        assert_eq!(import_stem("stdio.h"), "stdio");
    }
}
