//! Source file and source set representations.
//!
//! File discovery and filtering belong to the caller; a [`SourceSet`] is
//! just the list of files handed to the engine, with their content already
//! loaded. `from_path` exists as a convenience for tests and simple runs.

use std::path::{Path, PathBuf};

use super::{Error, Language, Result};

/// A source file with its content loaded.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Detected language.
    pub language: Language,
    /// File content.
    pub content: String,
}

impl SourceFile {
    /// Load a source file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let language = Language::detect(path).ok_or_else(|| Error::UnsupportedLanguage {
            path: path.to_path_buf(),
        })?;
        let content = std::fs::read_to_string(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            language,
            content,
        })
    }

    /// Create from existing content.
    pub fn from_content(path: impl Into<PathBuf>, language: Language, content: String) -> Self {
        Self {
            path: path.into(),
            language,
            content,
        }
    }

    /// Module name for qualified names: the file stem.
    pub fn module_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Count total lines.
    pub fn total_lines(&self) -> usize {
        self.content.lines().count()
    }
}

/// The set of files to analyze, sorted by path for deterministic merging.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    files: Vec<SourceFile>,
}

impl SourceSet {
    /// Create a source set from files supplied by the discovery collaborator.
    pub fn new(mut files: Vec<SourceFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { files }
    }

    /// Recursively collect supported source files under a directory.
    pub fn from_path(root: impl AsRef<Path>) -> Result<Self> {
        let mut files = Vec::new();
        collect_files(root.as_ref(), &mut files)?;
        Ok(Self::new(files))
    }

    /// Get all files in the set.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Get the number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over files.
    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a SourceFile;
    type IntoIter = std::slice::Iter<'a, SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

fn collect_files(dir: &Path, files: &mut Vec<SourceFile>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            // Hidden directories are never source roots.
            let hidden = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(false);
            if !hidden {
                collect_files(&path, files)?;
            }
        } else if Language::detect(&path).is_some() {
            // Unreadable files are skipped, not fatal.
            if let Ok(file) = SourceFile::load(&path) {
                files.push(file);
            }
        }
    }
    Ok(())
}
