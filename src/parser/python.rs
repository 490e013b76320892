//! Native grammar walker for Python.
//!
//! Single recursive pass over the tree-sitter-python AST tracking the
//! enclosing class and a stack of function scopes. Nested functions are
//! flattened to the nearest enclosing class; lambdas contribute calls
//! and reads to the scope they appear in but are never indexed.

use tree_sitter::{Node, Tree};

use super::{node_text, RecordBackend};
use crate::core::{Binding, ClassDef, FunctionDef, ImportDecl, Language, StructuralRecord};

pub(super) struct PythonWalker;

impl RecordBackend for PythonWalker {
    fn extract(&self, tree: &Tree, source: &str, _lang: Language) -> StructuralRecord {
        let mut walk = Walk {
            source,
            record: StructuralRecord::default(),
            class_stack: Vec::new(),
            scopes: Vec::new(),
        };
        walk.visit(tree.root_node());
        walk.record
    }
}

/// Per-function accumulation while the walker is inside its body.
#[derive(Default)]
struct Scope {
    calls: Vec<String>,
    bindings: Vec<Binding>,
    reads: Vec<String>,
}

struct Walk<'a> {
    source: &'a str,
    record: StructuralRecord,
    class_stack: Vec<String>,
    scopes: Vec<Scope>,
}

impl Walk<'_> {
    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "function_definition" => self.handle_function(node, Vec::new()),
            "decorated_definition" => self.handle_decorated(node),
            "class_definition" => self.handle_class(node),
            "import_statement" => self.handle_import(node),
            "import_from_statement" => self.handle_import_from(node),
            "call" => self.handle_call(node),
            "assignment" => self.handle_assignment(node),
            "attribute" => {
                // Only the object side is a name reference; the member
                // identifier is not a standalone read.
                if let Some(object) = node.child_by_field_name("object") {
                    self.visit(object);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            "lambda" => {
                // Body only: lambda parameters are neither reads nor
                // indexed bindings.
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body);
                }
            }
            "identifier" => self.read(node_text(&node, self.source)),
            "comment" => {}
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child);
        }
    }

    fn read(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.record.identifiers.push(name.to_string());
        match self.scopes.last_mut() {
            Some(scope) => scope.reads.push(name.to_string()),
            None => self.record.module_reads.push(name.to_string()),
        }
    }

    fn handle_decorated(&mut self, node: Node<'_>) {
        let mut decorators = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "decorator" {
                decorators.push(node_text(&child, self.source).trim_start_matches('@').to_string());
            }
        }
        if let Some(def) = node.child_by_field_name("definition") {
            match def.kind() {
                "function_definition" => self.handle_function(def, decorators),
                "class_definition" => self.handle_class(def),
                _ => self.visit(def),
            }
        }
    }

    fn handle_function(&mut self, node: Node<'_>, decorators: Vec<String>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(&name_node, self.source).to_string();
        let params = self.collect_params(node);

        let signature = match node.child_by_field_name("return_type") {
            Some(ret) => format!(
                "{}({}) -> {}",
                name,
                params.join(", "),
                node_text(&ret, self.source)
            ),
            None => format!("{}({})", name, params.join(", ")),
        };

        self.scopes.push(Scope::default());
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_children(body);
        }
        let scope = self.scopes.pop().unwrap_or_default();

        // Reads inside a nested scope count as reads in the enclosing one.
        if let Some(parent) = self.scopes.last_mut() {
            parent.reads.extend(scope.reads.iter().cloned());
        }

        let parent_class = self.class_stack.last().cloned();
        if let Some(class_name) = &parent_class {
            if let Some(class) = self
                .record
                .classes
                .iter_mut()
                .rev()
                .find(|c| &c.name == class_name)
            {
                class.methods.push(name.clone());
            }
        }

        self.record.functions.push(FunctionDef {
            name,
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            signature,
            body: node_text(&node, self.source).to_string(),
            parent_class,
            params,
            decorators,
            calls: scope.calls,
            bindings: scope.bindings,
            reads: scope.reads,
        });
    }

    fn collect_params(&mut self, node: Node<'_>) -> Vec<String> {
        let mut params = Vec::new();
        let Some(param_list) = node.child_by_field_name("parameters") else {
            return params;
        };
        let mut cursor = param_list.walk();
        for child in param_list.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => params.push(node_text(&child, self.source).to_string()),
                "typed_parameter" => {
                    if let Some(inner) = first_identifier(child) {
                        params.push(node_text(&inner, self.source).to_string());
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        params.push(node_text(&name, self.source).to_string());
                    }
                    // Default values evaluate in the enclosing scope.
                    if let Some(value) = child.child_by_field_name("value") {
                        self.visit(value);
                    }
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    if let Some(inner) = first_identifier(child) {
                        params.push(node_text(&inner, self.source).to_string());
                    }
                }
                _ => {}
            }
        }
        params
    }

    fn handle_class(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(&name_node, self.source).to_string();
        self.record.classes.push(ClassDef {
            name: name.clone(),
            line: node.start_position().row as u32 + 1,
            methods: Vec::new(),
            fields: Vec::new(),
        });

        self.class_stack.push(name);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_children(body);
        }
        self.class_stack.pop();
    }

    fn handle_import(&mut self, node: Node<'_>) {
        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => names.push(node_text(&child, self.source).to_string()),
                "aliased_import" => {
                    if let Some(inner) = child.child_by_field_name("name") {
                        names.push(node_text(&inner, self.source).to_string());
                    }
                }
                _ => {}
            }
        }
        self.record.imports.push(ImportDecl {
            module: None,
            names,
            line: node.start_position().row as u32 + 1,
        });
    }

    fn handle_import_from(&mut self, node: Node<'_>) {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| node_text(&m, self.source).to_string());

        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            // The module_name field also matches dotted_name; skip it.
            if Some(child) == node.child_by_field_name("module_name") {
                continue;
            }
            match child.kind() {
                "dotted_name" => names.push(node_text(&child, self.source).to_string()),
                "aliased_import" => {
                    if let Some(inner) = child.child_by_field_name("name") {
                        names.push(node_text(&inner, self.source).to_string());
                    }
                }
                _ => {}
            }
        }
        self.record.imports.push(ImportDecl {
            module,
            names,
            line: node.start_position().row as u32 + 1,
        });
    }

    fn handle_call(&mut self, node: Node<'_>) {
        if let Some(function) = node.child_by_field_name("function") {
            let callee = match function.kind() {
                "identifier" => Some(node_text(&function, self.source).to_string()),
                // obj.method() reduces to the rightmost identifier.
                "attribute" => function
                    .child_by_field_name("attribute")
                    .map(|a| node_text(&a, self.source).to_string()),
                _ => None,
            };
            if let Some(callee) = callee {
                self.record.calls.push(callee.clone());
                if let Some(scope) = self.scopes.last_mut() {
                    scope.calls.push(callee);
                }
            }
        }
        self.visit_children(node);
    }

    fn handle_assignment(&mut self, node: Node<'_>) {
        if let Some(left) = node.child_by_field_name("left") {
            if left.kind() == "identifier" {
                let name = node_text(&left, self.source).to_string();
                let line = left.start_position().row as u32 + 1;
                if let Some(scope) = self.scopes.last_mut() {
                    scope.bindings.push(Binding { name, line });
                } else if let Some(class_name) = self.class_stack.last().cloned() {
                    // Class-body assignment: a field, not a module binding.
                    if let Some(class) = self
                        .record
                        .classes
                        .iter_mut()
                        .rev()
                        .find(|c| c.name == class_name)
                    {
                        class.fields.push(name);
                    }
                } else {
                    self.record.module_bindings.push(Binding { name, line });
                }
            } else {
                // Tuple/attribute/subscript targets read their parts.
                self.visit(left);
            }
        }
        if let Some(ty) = node.child_by_field_name("type") {
            self.visit(ty);
        }
        if let Some(right) = node.child_by_field_name("right") {
            self.visit(right);
        }
    }
}

fn first_identifier<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "identifier");
    found
}
