//! Tree-sitter based multi-language structural parser.
//!
//! Two backends produce the identical [`StructuralRecord`] schema: a
//! native grammar walker for Python and a query-based walker for the
//! curly-brace family (C, C++, Java). The language dispatch happens
//! here and nowhere else.

mod curly;
mod python;

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use tree_sitter::{Language as TsLanguage, Parser as TsParser, Tree};

use crate::core::{Backend, Error, Language, Result, SourceFile, StructuralRecord};

/// Produces one structural record from a parsed syntax tree.
///
/// Both backends must emit the same schema; downstream components never
/// see which backend ran.
trait RecordBackend {
    fn extract(&self, tree: &Tree, source: &str, lang: Language) -> StructuralRecord;
}

/// Thread-safe parser pool for multi-language parsing.
pub struct Parser {
    /// Cached parsers per language.
    parsers: Mutex<HashMap<Language, TsParser>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self {
            parsers: Mutex::new(HashMap::new()),
        }
    }

    /// Parse a file into its structural record.
    ///
    /// A file that fails to parse yields an empty record; parsing never
    /// aborts the batch.
    pub fn parse_record(&self, file: &SourceFile) -> StructuralRecord {
        match self.try_parse_record(file) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("parse failed for {}: {e}", file.path.display());
                StructuralRecord::empty()
            }
        }
    }

    /// Like [`Parser::parse_record`] but surfaces the parse failure so
    /// callers can count it.
    pub fn try_parse_record(&self, file: &SourceFile) -> Result<StructuralRecord> {
        let tree = self.parse_tree(&file.content, file.language)?;
        Ok(match file.language.backend() {
            Backend::NativeWalk => {
                python::PythonWalker.extract(&tree, &file.content, file.language)
            }
            Backend::CurlyQuery => curly::CurlyWalker.extract(&tree, &file.content, file.language),
        })
    }

    /// Parse content into a raw syntax tree.
    pub fn parse_tree(&self, content: &str, lang: Language) -> Result<Tree> {
        let ts_lang = tree_sitter_language(lang);

        let mut parsers = self.parsers.lock();
        let parser = parsers.entry(lang).or_insert_with(|| {
            let mut p = TsParser::new();
            p.set_language(&ts_lang).expect("Language should be valid");
            p
        });

        parser
            .parse(content.as_bytes(), None)
            .ok_or_else(|| Error::Parse {
                path: Path::new("<memory>").to_path_buf(),
                message: "Failed to parse content".to_string(),
            })
    }
}

/// Get tree-sitter language for a Language enum value.
pub fn tree_sitter_language(lang: Language) -> TsLanguage {
    let ts_lang = match lang {
        Language::Python => tree_sitter_python::LANGUAGE,
        Language::C => tree_sitter_c::LANGUAGE,
        Language::Cpp => tree_sitter_cpp::LANGUAGE,
        Language::Java => tree_sitter_java::LANGUAGE,
    };
    ts_lang.into()
}

pub(crate) fn node_text<'a>(node: &tree_sitter::Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Reduce a member-access callee to its rightmost identifier.
///
/// A deliberate, lossy simplification: `obj.method()` and `other.method()`
/// alias to `method`.
pub(crate) fn rightmost_identifier(name: &str) -> &str {
    let name = name.rsplit("->").next().unwrap_or(name);
    name.rsplit('.').next().unwrap_or(name).trim()
}
