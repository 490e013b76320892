//! Language detection and enumeration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Supported programming languages.
///
/// This is a closed set: Python is handled by the native grammar walker,
/// the curly-brace family (C, C++, Java) by the query-based walker. The
/// parser is the single dispatch point between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    C,
    Cpp,
    Java,
}

/// Which extraction backend handles a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Full grammar walk (Python).
    NativeWalk,
    /// Query-based extraction (curly-brace family).
    CurlyQuery,
}

impl Language {
    /// Detect language from file path based on extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        Self::from_extension(extension)
    }

    /// Get language from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Some(Self::Python),
            "c" => Some(Self::C),
            // Headers go through the C++ grammar, which parses both.
            "cpp" | "cc" | "cxx" | "h" | "hpp" | "hxx" | "hh" => Some(Self::Cpp),
            "java" => Some(Self::Java),
            _ => None,
        }
    }

    /// Get the display name for the language.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::C => "C",
            Self::Cpp => "C++",
            Self::Java => "Java",
        }
    }

    /// Which backend extracts structural records for this language.
    pub fn backend(&self) -> Backend {
        match self {
            Self::Python => Backend::NativeWalk,
            Self::C | Self::Cpp | Self::Java => Backend::CurlyQuery,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
