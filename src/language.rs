//! Language identification for the indexing pipeline
//!
//! Each supported language maps to exactly one external SCIP indexer
//! toolchain. Adding a language means adding a variant here plus a
//! `ToolSpec` entry in `toolchain` -- everything else dispatches on the enum.

use std::fmt;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Languages with a supported SCIP indexer toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    CSharp,
    Cpp,
}

/// All supported languages in stable order.
pub const ALL_LANGUAGES: [Language; 7] = [
    Language::Python,
    Language::JavaScript,
    Language::TypeScript,
    Language::Go,
    Language::Rust,
    Language::CSharp,
    Language::Cpp,
];

impl Language {
    /// Canonical lowercase name used in records, CLI arguments and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::CSharp => "csharp",
            Language::Cpp => "cpp",
        }
    }

    /// Parse from a CLI/config string (case-insensitive, common aliases).
    ///
    /// # Returns
    /// Some(Language) if recognized, None otherwise
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "javascript" | "js" => Some(Language::JavaScript),
            "typescript" | "ts" => Some(Language::TypeScript),
            "go" | "golang" => Some(Language::Go),
            "rust" | "rs" => Some(Language::Rust),
            "csharp" | "c#" | "dotnet" => Some(Language::CSharp),
            "cpp" | "c++" | "cxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// Source file extensions attributed to this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            Language::Go => &["go"],
            Language::Rust => &["rs"],
            Language::CSharp => &["cs"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx", "c", "h"],
        }
    }

    /// Classify a file path by extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        let ext = ext.to_lowercase();
        ALL_LANGUAGES
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a comma-separated language list as given on the CLI.
///
/// # Returns
/// Languages in input order, deduplicated. Errors on any unknown name so a
/// typo does not silently shrink the indexing run.
pub fn parse_language_list(s: &str) -> Result<Vec<Language>> {
    let mut out = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let lang = Language::parse(part)
            .ok_or_else(|| anyhow::anyhow!("unknown language: {:?}", part))?;
        if !out.contains(&lang) {
            out.push(lang);
        }
    }
    Ok(out)
}

/// Detect languages present in a codebase.
///
/// Walks the tree honoring .gitignore and counts source files per language.
/// Languages are returned ordered by descending file count so callers can
/// prioritize the dominant toolchains.
///
/// # Arguments
/// * `root` - Codebase root directory
pub fn detect_languages(root: &Path) -> Vec<(Language, usize)> {
    let mut counts: std::collections::BTreeMap<Language, usize> = Default::default();

    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .build();

    for entry in walker.flatten() {
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            if let Some(lang) = Language::from_path(entry.path()) {
                *counts.entry(lang).or_insert(0) += 1;
            }
        }
    }

    let mut detected: Vec<(Language, usize)> = counts.into_iter().collect();
    detected.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    detected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Language::parse("PY"), Some(Language::Python));
        assert_eq!(Language::parse("c++"), Some(Language::Cpp));
        assert_eq!(Language::parse("dotnet"), Some(Language::CSharp));
        assert_eq!(Language::parse("cobol"), None);
    }

    #[test]
    fn test_from_path_extension_mapping() {
        assert_eq!(
            Language::from_path(Path::new("src/app.tsx")),
            Some(Language::TypeScript)
        );
        assert_eq!(
            Language::from_path(Path::new("lib/util.cc")),
            Some(Language::Cpp)
        );
        assert_eq!(Language::from_path(Path::new("README.md")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_parse_language_list_dedup_and_errors() {
        let langs = parse_language_list("python, ts,python").unwrap();
        assert_eq!(langs, vec![Language::Python, Language::TypeScript]);

        assert!(parse_language_list("python,klingon").is_err());
    }

    #[test]
    fn test_as_str_round_trip() {
        for lang in ALL_LANGUAGES {
            assert_eq!(Language::parse(lang.as_str()), Some(lang));
        }
    }
}
