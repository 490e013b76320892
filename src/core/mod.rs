//! Core types shared across the library.

pub mod analyzer;
pub mod error;
pub mod language;
pub mod record;
pub mod source_file;

pub use analyzer::{AnalysisContext, Analyzer};
pub use error::{Error, Result};
pub use language::{Backend, Language};
pub use record::{Binding, ClassDef, FunctionDef, ImportDecl, StructuralRecord};
pub use source_file::{SourceFile, SourceSet};
