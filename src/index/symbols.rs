//! Cross-file symbol table.
//!
//! Symbols are immutable once inserted. Qualified-name collisions are
//! resolved last-write-wins: the colliding definition replaces the
//! earlier one in place, so bare-name lookups keep insertion order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// What kind of definition a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Variable,
}

/// One definition in the analyzed corpus.
#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    /// Bare name.
    pub name: String,
    pub kind: SymbolKind,
    /// File the definition lives in.
    pub file: PathBuf,
    /// Definition line (1-indexed).
    pub line: u32,
    /// Signature text, empty for classes and variables.
    pub signature: String,
    /// Full definition body text.
    pub body: String,
    /// Enclosing class, for methods.
    pub parent_class: Option<String>,
    /// `module.class.member` path, unique per table.
    pub qualified_name: String,
}

/// Insertion-ordered symbol table keyed by qualified name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_qname: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
    by_file: HashMap<PathBuf, Vec<usize>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a symbol. A qualified-name collision replaces the earlier
    /// definition and is logged, never an error.
    pub fn add_symbol(&mut self, symbol: Symbol) {
        if let Some(&slot) = self.by_qname.get(&symbol.qualified_name) {
            tracing::debug!(
                "symbol collision on {}: {} replaces {}",
                symbol.qualified_name,
                symbol.file.display(),
                self.symbols[slot].file.display()
            );
            let old = std::mem::replace(&mut self.symbols[slot], symbol);
            if old.file != self.symbols[slot].file {
                // The replaced slot keeps its position in every index,
                // including the old file's list. Rebuild that one entry.
                if let Some(list) = self.by_file.get_mut(&old.file) {
                    list.retain(|&i| i != slot);
                }
                self.by_file
                    .entry(self.symbols[slot].file.clone())
                    .or_default()
                    .push(slot);
            }
            return;
        }
        let slot = self.symbols.len();
        self.by_qname.insert(symbol.qualified_name.clone(), slot);
        self.by_name
            .entry(symbol.name.clone())
            .or_default()
            .push(slot);
        self.by_file.entry(symbol.file.clone()).or_default().push(slot);
        self.symbols.push(symbol);
    }

    /// Exact qualified-name lookup.
    pub fn get_symbol(&self, qualified_name: &str) -> Option<&Symbol> {
        self.by_qname.get(qualified_name).map(|&i| &self.symbols[i])
    }

    /// All symbols with the given bare name, in insertion order.
    pub fn find_by_name(&self, name: &str) -> Vec<&Symbol> {
        self.by_name
            .get(name)
            .map(|slots| slots.iter().map(|&i| &self.symbols[i]).collect())
            .unwrap_or_default()
    }

    /// All symbols defined in one file, in insertion order.
    pub fn symbols_in_file(&self, file: &Path) -> Vec<&Symbol> {
        self.by_file
            .get(file)
            .map(|slots| slots.iter().map(|&i| &self.symbols[i]).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(qname: &str, name: &str, file: &str, line: u32) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            file: PathBuf::from(file),
            line,
            signature: format!("{name}()"),
            body: String::new(),
            parent_class: None,
            qualified_name: qname.to_string(),
        }
    }

    #[test]
    fn test_add_and_get() {
        let mut table = SymbolTable::new();
        table.add_symbol(symbol("m.f", "f", "m.py", 1));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_symbol("m.f").unwrap().line, 1);
        assert!(table.get_symbol("m.g").is_none());
    }

    #[test]
    fn test_collision_last_write_wins() {
        let mut table = SymbolTable::new();
        table.add_symbol(symbol("m.f", "f", "m.py", 1));
        table.add_symbol(symbol("m.f", "f", "m.py", 9));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_symbol("m.f").unwrap().line, 9);
        // The survivor is still reachable by bare name and by file.
        assert_eq!(table.find_by_name("f").len(), 1);
        assert_eq!(table.symbols_in_file(Path::new("m.py")).len(), 1);
    }

    #[test]
    fn test_find_by_name_insertion_order() {
        let mut table = SymbolTable::new();
        table.add_symbol(symbol("a.calc", "calc", "a.py", 3));
        table.add_symbol(symbol("b.calc", "calc", "b.py", 7));
        let found = table.find_by_name("calc");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].qualified_name, "a.calc");
        assert_eq!(found[1].qualified_name, "b.calc");
    }

    #[test]
    fn test_symbols_in_file() {
        let mut table = SymbolTable::new();
        table.add_symbol(symbol("a.f", "f", "a.py", 1));
        table.add_symbol(symbol("b.g", "g", "b.py", 1));
        table.add_symbol(symbol("a.h", "h", "a.py", 5));
        let in_a = table.symbols_in_file(Path::new("a.py"));
        assert_eq!(in_a.len(), 2);
        assert_eq!(in_a[1].name, "h");
    }
}
