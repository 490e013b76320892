//! Query-based walker for the curly-brace family (C, C++, Java).
//!
//! Extraction runs a fixed set of tree-sitter queries per language and
//! assigns every capture to its enclosing function or class by byte
//! range. The emitted record schema is identical to the Python walker's.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor, Tree};

use super::{node_text, rightmost_identifier, tree_sitter_language, RecordBackend};
use crate::core::{Binding, ClassDef, FunctionDef, ImportDecl, Language, StructuralRecord};

pub(super) struct CurlyWalker;

/// Compiled query set for one language.
struct LangQueries {
    functions: Query,
    classes: Query,
    calls: Query,
    imports: Query,
    decls: Query,
    params: Query,
    fields: Query,
    idents: Query,
    annotations: Option<Query>,
}

fn compile(lang: Language, src: &str) -> Query {
    Query::new(&tree_sitter_language(lang), src).expect("query source should be valid")
}

static C_QUERIES: Lazy<LangQueries> = Lazy::new(|| LangQueries {
    functions: compile(Language::C, "(function_definition) @func"),
    classes: compile(
        Language::C,
        "(struct_specifier name: (type_identifier) @name) @class",
    ),
    calls: compile(Language::C, "(call_expression function: (_) @callee)"),
    imports: compile(Language::C, "(preproc_include path: (_) @path)"),
    decls: compile(
        Language::C,
        "(declaration declarator: (identifier) @decl) \
         (declaration declarator: (init_declarator declarator: (identifier) @decl))",
    ),
    params: compile(
        Language::C,
        "(parameter_declaration declarator: (identifier) @param) \
         (parameter_declaration declarator: (pointer_declarator declarator: (identifier) @param))",
    ),
    fields: compile(
        Language::C,
        "(field_declaration declarator: (field_identifier) @field)",
    ),
    idents: compile(Language::C, "(identifier) @id"),
    annotations: None,
});

static CPP_QUERIES: Lazy<LangQueries> = Lazy::new(|| LangQueries {
    functions: compile(Language::Cpp, "(function_definition) @func"),
    classes: compile(
        Language::Cpp,
        "(class_specifier name: (type_identifier) @name) @class \
         (struct_specifier name: (type_identifier) @name) @class",
    ),
    calls: compile(Language::Cpp, "(call_expression function: (_) @callee)"),
    imports: compile(Language::Cpp, "(preproc_include path: (_) @path)"),
    decls: compile(
        Language::Cpp,
        "(declaration declarator: (identifier) @decl) \
         (declaration declarator: (init_declarator declarator: (identifier) @decl))",
    ),
    params: compile(
        Language::Cpp,
        "(parameter_declaration declarator: (identifier) @param) \
         (parameter_declaration declarator: (pointer_declarator declarator: (identifier) @param)) \
         (parameter_declaration declarator: (reference_declarator (identifier) @param))",
    ),
    fields: compile(
        Language::Cpp,
        "(field_declaration declarator: (field_identifier) @field)",
    ),
    idents: compile(Language::Cpp, "(identifier) @id"),
    annotations: None,
});

static JAVA_QUERIES: Lazy<LangQueries> = Lazy::new(|| LangQueries {
    functions: compile(
        Language::Java,
        "(method_declaration name: (identifier) @name) @func \
         (constructor_declaration name: (identifier) @name) @func",
    ),
    classes: compile(
        Language::Java,
        "(class_declaration name: (identifier) @name) @class \
         (interface_declaration name: (identifier) @name) @class",
    ),
    calls: compile(
        Language::Java,
        "(method_invocation name: (identifier) @callee)",
    ),
    imports: compile(Language::Java, "(import_declaration) @import"),
    decls: compile(
        Language::Java,
        "(local_variable_declaration declarator: (variable_declarator name: (identifier) @decl))",
    ),
    params: compile(Language::Java, "(formal_parameter name: (identifier) @param)"),
    fields: compile(
        Language::Java,
        "(field_declaration declarator: (variable_declarator name: (identifier) @field))",
    ),
    idents: compile(Language::Java, "(identifier) @id"),
    annotations: Some(compile(
        Language::Java,
        "(marker_annotation) @ann (annotation) @ann",
    )),
});

fn queries(lang: Language) -> &'static LangQueries {
    match lang {
        Language::C => &C_QUERIES,
        Language::Cpp => &CPP_QUERIES,
        Language::Java => &JAVA_QUERIES,
        Language::Python => unreachable!("python uses the native walker"),
    }
}

/// A function under construction while captures are being assigned.
struct FuncAcc {
    name: String,
    start_byte: usize,
    end_byte: usize,
    start_line: u32,
    end_line: u32,
    signature: String,
    body: String,
    parent_class: Option<String>,
    params: Vec<String>,
    decorators: Vec<String>,
    calls: Vec<String>,
    bindings: Vec<Binding>,
    reads: Vec<String>,
}

struct ClassAcc {
    name: String,
    line: u32,
    start_byte: usize,
    end_byte: usize,
    methods: Vec<String>,
    fields: Vec<String>,
}

impl RecordBackend for CurlyWalker {
    fn extract(&self, tree: &Tree, source: &str, lang: Language) -> StructuralRecord {
        let q = queries(lang);
        let root = tree.root_node();
        let mut record = StructuralRecord::default();

        // Identifier occurrences that are definition sites, not reads.
        let mut excluded: HashSet<usize> = HashSet::new();
        let mut import_ranges: Vec<(usize, usize)> = Vec::new();

        let mut classes = collect_classes(q, root, source, &mut excluded);
        let mut funcs = collect_functions(q, root, source, lang, &mut excluded);

        // Attach methods to their innermost enclosing class. Out-of-class
        // C++ definitions (`Foo::bar`) already carry their class name.
        for func in &mut funcs {
            if func.parent_class.is_none() {
                func.parent_class =
                    enclosing_class(&classes, func.start_byte).map(|i| classes[i].name.clone());
            }
            if let Some(class_name) = &func.parent_class {
                if let Some(class) = classes.iter_mut().find(|c| &c.name == class_name) {
                    class.methods.push(func.name.clone());
                }
            }
        }

        collect_imports(q, root, source, lang, &mut record, &mut import_ranges);
        collect_params(q, root, source, &mut funcs, &mut excluded);
        collect_fields(q, root, source, &mut classes, &mut excluded);
        collect_decls(q, root, source, &mut funcs, &mut record, &mut excluded);
        collect_calls(q, root, source, &mut funcs, &mut record);
        collect_annotations(q, root, source, &mut funcs);
        collect_reads(q, root, source, &mut funcs, &mut record, &excluded, &import_ranges);

        record.classes = classes
            .into_iter()
            .map(|c| ClassDef {
                name: c.name,
                line: c.line,
                methods: c.methods,
                fields: c.fields,
            })
            .collect();
        record.functions = funcs
            .into_iter()
            .map(|f| FunctionDef {
                name: f.name,
                start_line: f.start_line,
                end_line: f.end_line,
                signature: f.signature,
                body: f.body,
                parent_class: f.parent_class,
                params: f.params,
                decorators: f.decorators,
                calls: f.calls,
                bindings: f.bindings,
                reads: f.reads,
            })
            .collect();
        record
    }
}

fn collect_classes(
    q: &LangQueries,
    root: Node<'_>,
    source: &str,
    excluded: &mut HashSet<usize>,
) -> Vec<ClassAcc> {
    let mut classes = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&q.classes, root, source.as_bytes());
    while let Some(m) = matches.next() {
        let mut class_node = None;
        let mut name_node = None;
        for cap in m.captures {
            match q.classes.capture_names()[cap.index as usize] {
                "class" => class_node = Some(cap.node),
                "name" => name_node = Some(cap.node),
                _ => {}
            }
        }
        if let (Some(class), Some(name)) = (class_node, name_node) {
            excluded.insert(name.start_byte());
            classes.push(ClassAcc {
                name: node_text(&name, source).to_string(),
                line: class.start_position().row as u32 + 1,
                start_byte: class.start_byte(),
                end_byte: class.end_byte(),
                methods: Vec::new(),
                fields: Vec::new(),
            });
        }
    }
    classes
}

fn collect_functions(
    q: &LangQueries,
    root: Node<'_>,
    source: &str,
    lang: Language,
    excluded: &mut HashSet<usize>,
) -> Vec<FuncAcc> {
    let mut funcs = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&q.functions, root, source.as_bytes());
    while let Some(m) = matches.next() {
        let mut func_node = None;
        let mut name_node = None;
        for cap in m.captures {
            match q.functions.capture_names()[cap.index as usize] {
                "func" => func_node = Some(cap.node),
                "name" => name_node = Some(cap.node),
                _ => {}
            }
        }
        let Some(func) = func_node else { continue };

        // Java captures the name; C/C++ drill down through declarators.
        let name_node = name_node.or_else(|| {
            if lang == Language::Java {
                None
            } else {
                drill_declarator(func)
            }
        });
        let Some(name_node) = name_node else { continue };
        excluded.insert(name_node.start_byte());

        let raw_name = node_text(&name_node, source);
        // `Foo::bar` out-of-class definitions carry the class qualifier.
        let (name, qualified_class) = match raw_name.rsplit_once("::") {
            Some((prefix, bare)) => (
                bare.to_string(),
                prefix.rsplit("::").next().map(|s| s.to_string()),
            ),
            None => (raw_name.to_string(), None),
        };

        let text = node_text(&func, source);
        let signature = text.lines().next().unwrap_or("").trim().to_string();

        funcs.push(FuncAcc {
            name,
            start_byte: func.start_byte(),
            end_byte: func.end_byte(),
            start_line: func.start_position().row as u32 + 1,
            end_line: func.end_position().row as u32 + 1,
            signature,
            body: text.to_string(),
            parent_class: qualified_class,
            params: Vec::new(),
            decorators: Vec::new(),
            calls: Vec::new(),
            bindings: Vec::new(),
            reads: Vec::new(),
        });
    }
    funcs.sort_by_key(|f| f.start_byte);
    funcs
}

/// Walk nested declarators down to the naming node (C/C++).
fn drill_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        match current.child_by_field_name("declarator") {
            Some(inner) => current = inner,
            None => break,
        }
    }
    matches!(
        current.kind(),
        "identifier" | "field_identifier" | "qualified_identifier" | "operator_name" | "destructor_name"
    )
    .then_some(current)
}

fn collect_imports(
    q: &LangQueries,
    root: Node<'_>,
    source: &str,
    lang: Language,
    record: &mut StructuralRecord,
    import_ranges: &mut Vec<(usize, usize)>,
) {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&q.imports, root, source.as_bytes());
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let node = cap.node;
            let line = node.start_position().row as u32 + 1;
            match lang {
                Language::Java => {
                    // `import java.util.List;` → module path + imported name.
                    let path = node_text(&node, source)
                        .trim_start_matches("import")
                        .trim_start_matches(" static")
                        .trim()
                        .trim_end_matches(';')
                        .trim()
                        .to_string();
                    let names = path
                        .rsplit('.')
                        .next()
                        .filter(|n| *n != "*")
                        .map(|n| vec![n.to_string()])
                        .unwrap_or_default();
                    import_ranges.push((node.start_byte(), node.end_byte()));
                    record.imports.push(ImportDecl {
                        module: Some(path),
                        names,
                        line,
                    });
                }
                _ => {
                    let path = node_text(&node, source)
                        .trim_matches(|c| c == '"' || c == '<' || c == '>')
                        .to_string();
                    import_ranges.push((node.start_byte(), node.end_byte()));
                    record.imports.push(ImportDecl {
                        module: Some(path),
                        names: Vec::new(),
                        line,
                    });
                }
            }
        }
    }
}

fn collect_params(
    q: &LangQueries,
    root: Node<'_>,
    source: &str,
    funcs: &mut [FuncAcc],
    excluded: &mut HashSet<usize>,
) {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&q.params, root, source.as_bytes());
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let node = cap.node;
            excluded.insert(node.start_byte());
            if let Some(i) = enclosing_func(funcs, node.start_byte()) {
                funcs[i].params.push(node_text(&node, source).to_string());
            }
        }
    }
}

fn collect_fields(
    q: &LangQueries,
    root: Node<'_>,
    source: &str,
    classes: &mut [ClassAcc],
    excluded: &mut HashSet<usize>,
) {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&q.fields, root, source.as_bytes());
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let node = cap.node;
            excluded.insert(node.start_byte());
            if let Some(i) = enclosing_class(classes, node.start_byte()) {
                classes[i].fields.push(node_text(&node, source).to_string());
            }
        }
    }
}

fn collect_decls(
    q: &LangQueries,
    root: Node<'_>,
    source: &str,
    funcs: &mut [FuncAcc],
    record: &mut StructuralRecord,
    excluded: &mut HashSet<usize>,
) {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&q.decls, root, source.as_bytes());
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let node = cap.node;
            excluded.insert(node.start_byte());
            let binding = Binding {
                name: node_text(&node, source).to_string(),
                line: node.start_position().row as u32 + 1,
            };
            match enclosing_func(funcs, node.start_byte()) {
                Some(i) => funcs[i].bindings.push(binding),
                None => record.module_bindings.push(binding),
            }
        }
    }
}

fn collect_calls(
    q: &LangQueries,
    root: Node<'_>,
    source: &str,
    funcs: &mut [FuncAcc],
    record: &mut StructuralRecord,
) {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&q.calls, root, source.as_bytes());
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let node = cap.node;
            let callee = match node.kind() {
                "identifier" => node_text(&node, source).to_string(),
                "field_expression" => node
                    .child_by_field_name("field")
                    .map(|f| node_text(&f, source).to_string())
                    .unwrap_or_else(|| {
                        rightmost_identifier(node_text(&node, source)).to_string()
                    }),
                _ => rightmost_identifier(node_text(&node, source)).to_string(),
            };
            if callee.is_empty() {
                continue;
            }
            record.calls.push(callee.clone());
            if let Some(i) = enclosing_func(funcs, node.start_byte()) {
                funcs[i].calls.push(callee);
            }
        }
    }
}

fn collect_annotations(q: &LangQueries, root: Node<'_>, source: &str, funcs: &mut [FuncAcc]) {
    let Some(ann_query) = &q.annotations else {
        return;
    };
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(ann_query, root, source.as_bytes());
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let node = cap.node;
            if let Some(i) = enclosing_func(funcs, node.start_byte()) {
                funcs[i]
                    .decorators
                    .push(node_text(&node, source).trim_start_matches('@').to_string());
            }
        }
    }
}

fn collect_reads(
    q: &LangQueries,
    root: Node<'_>,
    source: &str,
    funcs: &mut [FuncAcc],
    record: &mut StructuralRecord,
    excluded: &HashSet<usize>,
    import_ranges: &[(usize, usize)],
) {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&q.idents, root, source.as_bytes());
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let node = cap.node;
            let byte = node.start_byte();
            if excluded.contains(&byte) {
                continue;
            }
            if import_ranges.iter().any(|(s, e)| byte >= *s && byte < *e) {
                continue;
            }
            let name = node_text(&node, source).to_string();
            if name.is_empty() {
                continue;
            }
            record.identifiers.push(name.clone());
            match enclosing_func(funcs, byte) {
                Some(i) => funcs[i].reads.push(name),
                None => record.module_reads.push(name),
            }
        }
    }
}

/// Innermost function whose byte range contains `byte`.
fn enclosing_func(funcs: &[FuncAcc], byte: usize) -> Option<usize> {
    funcs
        .iter()
        .enumerate()
        .filter(|(_, f)| f.start_byte <= byte && byte < f.end_byte)
        .min_by_key(|(_, f)| f.end_byte - f.start_byte)
        .map(|(i, _)| i)
}

/// Innermost class whose byte range contains `byte`.
fn enclosing_class(classes: &[ClassAcc], byte: usize) -> Option<usize> {
    classes
        .iter()
        .enumerate()
        .filter(|(_, c)| c.start_byte <= byte && byte < c.end_byte)
        .min_by_key(|(_, c)| c.end_byte - c.start_byte)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use crate::core::{Language, SourceFile, StructuralRecord};
    use crate::parser::Parser;

    fn parse(name: &str, lang: Language, code: &str) -> StructuralRecord {
        let parser = Parser::new();
        parser.parse_record(&SourceFile::from_content(name, lang, code.to_string()))
    }

    #[test]
    fn test_c_function_and_call() {
        let code = "int add(int a, int b) { return a + b; }\nint twice(int x) { return add(x, x); }\n";
        let record = parse("math.c", Language::C, code);
        assert_eq!(record.functions.len(), 2);
        assert_eq!(record.functions[0].name, "add");
        assert_eq!(record.functions[0].params, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(record.functions[1].calls, vec!["add".to_string()]);
    }

    #[test]
    fn test_c_pointer_call_reduced() {
        let code = "void run(struct ops *o) { o->start(); }\n";
        let record = parse("run.c", Language::C, code);
        assert_eq!(record.functions[0].calls, vec!["start".to_string()]);
    }

    #[test]
    fn test_c_include_import() {
        let code = "#include <stdio.h>\n#include \"util.h\"\n";
        let record = parse("main.c", Language::C, code);
        assert_eq!(record.imports.len(), 2);
        assert_eq!(record.imports[0].module, Some("stdio.h".to_string()));
        assert_eq!(record.imports[1].module, Some("util.h".to_string()));
    }

    #[test]
    fn test_c_local_declaration_binding() {
        let code = "void f(void) { int unused_total = 3; int used = 1; printf(\"%d\", used); }\n";
        let record = parse("f.c", Language::C, code);
        let f = &record.functions[0];
        let bound: Vec<_> = f.bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(bound, vec!["unused_total", "used"]);
        assert!(f.reads.contains(&"used".to_string()));
        assert!(!f.reads.contains(&"unused_total".to_string()));
    }

    #[test]
    fn test_java_method_in_class() {
        let code = "class Calc { int total; int add(int a, int b) { return a + b; } }";
        let record = parse("Calc.java", Language::Java, code);
        assert_eq!(record.classes.len(), 1);
        assert_eq!(record.classes[0].name, "Calc");
        assert_eq!(record.classes[0].methods, vec!["add".to_string()]);
        assert_eq!(record.classes[0].fields, vec!["total".to_string()]);
        assert_eq!(record.functions[0].parent_class, Some("Calc".to_string()));
    }

    #[test]
    fn test_java_import_and_annotation() {
        let code = "import java.util.List;\nclass A { @Override public String toString() { return \"a\"; } }";
        let record = parse("A.java", Language::Java, code);
        assert_eq!(record.imports[0].module, Some("java.util.List".to_string()));
        assert_eq!(record.imports[0].names, vec!["List".to_string()]);
        assert_eq!(record.functions[0].decorators, vec!["Override".to_string()]);
    }

    #[test]
    fn test_java_member_call_uses_method_name() {
        let code = "class A { void f(A other) { other.g(); } void g() {} }";
        let record = parse("A.java", Language::Java, code);
        let f = record.functions.iter().find(|f| f.name == "f").unwrap();
        assert_eq!(f.calls, vec!["g".to_string()]);
    }

    #[test]
    fn test_cpp_out_of_class_method() {
        let code = "class Foo { public: void bar(); };\nvoid Foo::bar() { helper(); }\nvoid helper() {}\n";
        let record = parse("foo.cpp", Language::Cpp, code);
        let bar = record.functions.iter().find(|f| f.name == "bar").unwrap();
        assert_eq!(bar.parent_class, Some("Foo".to_string()));
    }
}
