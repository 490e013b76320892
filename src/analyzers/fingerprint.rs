//! Structural fingerprints for function bodies.
//!
//! A fingerprint is a normalized token sequence: identifier names and
//! literal values are discarded, while the syntax-node sequence, the
//! operator sub-kind (`+` and `*` fingerprint differently), the literal
//! category (string vs numeric vs other), and string-interpolation
//! markers survive. Python fingerprints come from a full grammar walk;
//! the curly-brace family uses an ordered regex scanner, no grammar
//! walk assumed.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

use crate::core::{Backend, Language};
use crate::parser::Parser;

/// Fingerprint generator. Owns a parser for the Python grammar walk.
pub struct Fingerprinter {
    parser: Parser,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Normalized token sequence for one function body. Unparseable
    /// input yields an empty sequence, never an error.
    pub fn tokens(&self, body: &str, lang: Language) -> Vec<String> {
        match lang.backend() {
            Backend::NativeWalk => self.python_tokens(body),
            Backend::CurlyQuery => curly_tokens(body),
        }
    }

    fn python_tokens(&self, body: &str) -> Vec<String> {
        let source = dedent(body);
        let Ok(tree) = self.parser.parse_tree(&source, Language::Python) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        walk_python(tree.root_node(), &mut out);
        out
    }
}

/// Strip the common leading indentation so method bodies reparse.
/// Counted in characters, not bytes; indentation is not always ASCII.
fn dedent(body: &str) -> String {
    let indent = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);
    if indent == 0 {
        return body.to_string();
    }
    body.lines()
        .map(|line| strip_leading_whitespace(line, indent))
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_leading_whitespace(line: &str, count: usize) -> &str {
    let mut rest = line;
    for _ in 0..count {
        let mut chars = rest.chars();
        match chars.next() {
            Some(c) if c.is_whitespace() => rest = chars.as_str(),
            _ => break,
        }
    }
    rest
}

fn walk_python(node: Node<'_>, out: &mut Vec<String>) {
    match node.kind() {
        "comment" => return,
        "identifier" => {
            out.push("id".to_string());
            return;
        }
        "integer" | "float" => {
            out.push("num".to_string());
            return;
        }
        "true" | "false" | "none" => {
            out.push("lit".to_string());
            return;
        }
        "string" => {
            out.push("str".to_string());
            // f-string interpolations fingerprint distinctly; the
            // interpolated expression still contributes its own tokens
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "interpolation" {
                    out.push("interp".to_string());
                    walk_python(child, out);
                }
            }
            return;
        }
        _ => {}
    }
    if node.child_count() == 0 {
        // leaf token: keeps operator/keyword text
        out.push(node.kind().to_string());
        return;
    }
    if node.is_named() {
        out.push(node.kind().to_string());
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_python(child, out);
    }
}

static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("comment pattern is valid"));

/// Ordered alternation: strings, char literals, numbers, words, then
/// multi-character operators before their single-character prefixes.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        "(?:\\.|[^"\\])*" |
        '(?:\\.|[^'\\])*' |
        \d[\w.]* |
        [A-Za-z_][A-Za-z0-9_]* |
        <<=|>>=|<=|>=|==|!=|&&|\|\||->|\+\+|--|\+=|-=|\*=|/=|%=|&=|\|=|\^=|<<|>> |
        [-+*/%<>=!&|^~?:;,.(){}\[\]]
    "#,
    )
    .expect("token pattern is valid")
});

const CURLY_KEYWORDS: [&str; 18] = [
    "if", "else", "for", "while", "do", "switch", "case", "default", "return", "break",
    "continue", "goto", "new", "delete", "try", "catch", "throw", "finally",
];

const CURLY_LITERAL_WORDS: [&str; 5] = ["true", "false", "null", "nullptr", "NULL"];

fn curly_tokens(body: &str) -> Vec<String> {
    let stripped = COMMENT_RE.replace_all(body, " ");
    TOKEN_RE
        .find_iter(&stripped)
        .map(|m| classify_curly(m.as_str()))
        .collect()
}

fn classify_curly(token: &str) -> String {
    let first = token.chars().next().unwrap_or(' ');
    if first == '"' {
        return "str".to_string();
    }
    if first == '\'' {
        return "lit".to_string();
    }
    if first.is_ascii_digit() {
        return "num".to_string();
    }
    if first.is_alphabetic() || first == '_' {
        if CURLY_KEYWORDS.contains(&token) {
            return token.to_string();
        }
        if CURLY_LITERAL_WORDS.contains(&token) {
            return "lit".to_string();
        }
        return "id".to_string();
    }
    token.to_string()
}

/// Matching-block ratio `2*M / (m+n)` over two token sequences.
pub fn similarity(a: &[String], b: &[String]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_total(a, b) as f64 / total as f64
}

fn matching_total(a: &[String], b: &[String]) -> usize {
    let mut b2j: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, token) in b.iter().enumerate() {
        b2j.entry(token.as_str()).or_default().push(j);
    }
    let mut total = 0;
    let mut regions = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = regions.pop() {
        let (i, j, size) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if size > 0 {
            total += size;
            regions.push((alo, i, blo, j));
            regions.push((i + size, ahi, j + size, bhi));
        }
    }
    total
}

/// Longest block of consecutive equal tokens within the given region.
fn longest_match(
    a: &[String],
    b2j: &HashMap<&str, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for i in alo..ahi {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(a[i].as_str()) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let run = match j.checked_sub(1).and_then(|p| j2len.get(&p)) {
                    Some(&len) => len + 1,
                    None => 1,
                };
                next.insert(j, run);
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            }
        }
        j2len = next;
    }
    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn py(body: &str) -> Vec<String> {
        Fingerprinter::new().tokens(body, Language::Python)
    }

    #[test]
    fn test_identical_modulo_renaming_scores_one() {
        let a = py("def calculate_area(width, height):\n    if width < 0:\n        return 0\n    return width * height\n");
        let b = py("def get_rect_size(w, h):\n    if w < 0:\n        return 0\n    return w * h\n");
        assert!(!a.is_empty());
        assert_eq!(similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_operator_sub_kind_differs() {
        let a = py("def f(x, y):\n    return x + y\n");
        let b = py("def f(x, y):\n    return x * y\n");
        assert_ne!(a, b);
        assert!(similarity(&a, &b) < 1.0);
    }

    #[test]
    fn test_literal_category_not_value() {
        let a = py("def f():\n    return 'alpha'\n");
        let b = py("def f():\n    return 'omega'\n");
        assert_eq!(a, b);
        let c = py("def f():\n    return 42\n");
        assert_ne!(a, c);
    }

    #[test]
    fn test_interpolation_marker() {
        let plain = py("def f(x):\n    return 'val'\n");
        let interp = py("def f(x):\n    return f'{x}'\n");
        assert!(interp.contains(&"interp".to_string()));
        assert!(!plain.contains(&"interp".to_string()));
    }

    #[test]
    fn test_dedented_method_body_parses() {
        let body = "def area(self):\n        if self.w < 0:\n            return 0\n        return self.w * self.h";
        let tokens = py(body);
        assert!(tokens.contains(&"*".to_string()));
    }

    #[test]
    fn test_non_ascii_indentation_dedents_without_panic() {
        // one line indented with a space, one with a no-break space
        let body = " x = 1\n\u{a0}y = 2\n";
        let tokens = py(body);
        assert!(tokens.iter().any(|t| t == "id"));

        let indented = "def f(self):\u{a0}\n\u{a0}\u{a0}return 1";
        let _ = py(indented);
    }

    #[test]
    fn test_curly_scanner_keywords_and_categories() {
        let tokens = curly_tokens("if (count >= 10) { return \"big\"; } // done");
        assert_eq!(
            tokens,
            vec!["if", "(", "id", ">=", "num", ")", "{", "return", "str", ";", "}"]
        );
    }

    #[test]
    fn test_curly_renaming_scores_one() {
        let a = curly_tokens("int area(int w, int h) { if (w < 0) return 0; return w * h; }");
        let b = curly_tokens("int size(int x, int y) { if (x < 0) return 0; return x * y; }");
        assert_eq!(similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_similarity_bounds() {
        let a = py("def f():\n    return 1\n");
        let b: Vec<String> = Vec::new();
        assert_eq!(similarity(&a, &a), 1.0);
        assert_eq!(similarity(&a, &b), 0.0);
        assert_eq!(similarity(&b, &b), 1.0);
    }
}
