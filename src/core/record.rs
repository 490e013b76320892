//! The language-neutral structural record.
//!
//! One record per file, produced by either parser backend with an
//! identical schema so every downstream component is backend-agnostic.
//! Records live for one analysis run; the index retains them for the
//! analyzers and drops them with the run.

use serde::{Deserialize, Serialize};

/// Structural contents of one source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuralRecord {
    /// Functions and methods, in source order.
    pub functions: Vec<FunctionDef>,
    /// Classes/structs, in source order.
    pub classes: Vec<ClassDef>,
    /// Import declarations, in source order.
    pub imports: Vec<ImportDecl>,
    /// Every call's callee name, corpus-usage order (flat, file-wide).
    pub calls: Vec<String>,
    /// Every referenced identifier, file-wide.
    pub identifiers: Vec<String>,
    /// Names bound by assignment at module scope.
    pub module_bindings: Vec<Binding>,
    /// Names read at module scope.
    pub module_reads: Vec<String>,
}

impl StructuralRecord {
    /// The record a failed parse yields: structurally empty, never an error.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.classes.is_empty()
            && self.imports.is_empty()
            && self.calls.is_empty()
            && self.identifiers.is_empty()
            && self.module_bindings.is_empty()
            && self.module_reads.is_empty()
    }
}

/// A function or method definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Bare name.
    pub name: String,
    /// Start line (1-indexed).
    pub start_line: u32,
    /// End line (1-indexed).
    pub end_line: u32,
    /// Parameter-and-return signature text.
    pub signature: String,
    /// Full body source text (includes the definition header).
    pub body: String,
    /// Enclosing class, if this is a method. Nested functions are
    /// flattened to the nearest enclosing class, not their lexical
    /// parent function.
    pub parent_class: Option<String>,
    /// Parameter names.
    pub params: Vec<String>,
    /// Decorator / annotation text attached to the definition.
    pub decorators: Vec<String>,
    /// Callee names of calls made inside the body (member calls reduced
    /// to the rightmost identifier).
    pub calls: Vec<String>,
    /// Names bound by assignment in this function's scope.
    pub bindings: Vec<Binding>,
    /// Names read in this function's scope (including nested scopes).
    pub reads: Vec<String>,
}

/// A class or struct definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    /// Class name.
    pub name: String,
    /// Start line (1-indexed).
    pub line: u32,
    /// Method names.
    pub methods: Vec<String>,
    /// Field / attribute names.
    pub fields: Vec<String>,
}

/// An import declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Module path (`from m import a` → `m`; C/C++ include path; Java
    /// package path). `import a, b` has no module, only names.
    pub module: Option<String>,
    /// Imported names, if any.
    pub names: Vec<String>,
    /// Start line.
    pub line: u32,
}

/// A name bound by assignment, with the line it was bound on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub line: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record() {
        let record = StructuralRecord::empty();
        assert!(record.is_empty());
    }

    #[test]
    fn test_non_empty_record() {
        let record = StructuralRecord {
            calls: vec!["helper".to_string()],
            ..Default::default()
        };
        assert!(!record.is_empty());
    }
}
