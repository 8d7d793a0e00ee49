//! Indexing configuration
//!
//! All pipeline behavior is driven by an explicit `IndexingConfig` passed to
//! the orchestrator. Environment variables are read in exactly one place
//! (`IndexingConfig::from_env`), at the CLI boundary, so the pipeline itself
//! never consults ambient state.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Default overall indexing timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// How the `index` entry point executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingMode {
    /// Block the caller until the run completes.
    Sync,
    /// Hand the run to the background indexer and return a job handle.
    Background,
    /// Caller decides interactively; the pipeline treats this as sync.
    Prompt,
}

impl IndexingMode {
    /// Parse from a config/CLI string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sync" => Some(IndexingMode::Sync),
            "background" => Some(IndexingMode::Background),
            "prompt" => Some(IndexingMode::Prompt),
            _ => None,
        }
    }
}

/// Configuration for an indexing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Master enable switch.
    pub enable_indexing: bool,
    /// Explicit kill switch; wins over `enable_indexing`.
    pub disable_indexing: bool,
    /// Overall wall-clock timeout for one orchestration run.
    pub timeout: Duration,
    /// Execution mode for the `index` entry point.
    pub mode: IndexingMode,
    /// Languages to index when the caller does not pass an explicit list.
    pub languages: Vec<Language>,
    /// Re-index automatically when the staleness check reports a change.
    pub auto_reindex: bool,
    /// Install missing indexer tools before running them.
    pub auto_install: bool,
    /// Override for the graph database path (default: `<root>/.sextant/graph.db`).
    pub db_path: Option<PathBuf>,
    /// Override for the tool installation directory (default: `~/.sextant/bin`).
    pub bin_dir: Option<PathBuf>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            enable_indexing: true,
            disable_indexing: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            mode: IndexingMode::Sync,
            languages: vec![Language::Python, Language::TypeScript, Language::Rust],
            auto_reindex: false,
            auto_install: true,
            db_path: None,
            bin_dir: None,
        }
    }
}

impl IndexingConfig {
    /// Whether indexing should run at all.
    pub fn indexing_enabled(&self) -> bool {
        self.enable_indexing && !self.disable_indexing
    }

    /// Resolve the graph database path for a codebase root.
    pub fn resolve_db_path(&self, root: &std::path::Path) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| root.join(".sextant").join("graph.db"))
    }

    /// Build a config from `SEXTANT_*` environment variables.
    ///
    /// Recognized variables:
    /// - `SEXTANT_DISABLE_INDEXING=1`
    /// - `SEXTANT_TIMEOUT_SECS=<int>`
    /// - `SEXTANT_MODE=sync|background|prompt`
    /// - `SEXTANT_LANGUAGES=python,go,...`
    /// - `SEXTANT_AUTO_REINDEX=1`
    /// - `SEXTANT_AUTO_INSTALL=0`
    ///
    /// Unset or unparsable values fall back to defaults. This is the only
    /// environment lookup in the crate; everything downstream receives the
    /// struct.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if env_flag("SEXTANT_DISABLE_INDEXING") {
            config.disable_indexing = true;
        }
        if let Ok(v) = std::env::var("SEXTANT_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                config.timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("SEXTANT_MODE") {
            if let Some(mode) = IndexingMode::parse(&v) {
                config.mode = mode;
            }
        }
        if let Ok(v) = std::env::var("SEXTANT_LANGUAGES") {
            if let Ok(langs) = crate::language::parse_language_list(&v) {
                if !langs.is_empty() {
                    config.languages = langs;
                }
            }
        }
        if env_flag("SEXTANT_AUTO_REINDEX") {
            config.auto_reindex = true;
        }
        if let Ok(v) = std::env::var("SEXTANT_AUTO_INSTALL") {
            config.auto_install = v != "0" && v.to_lowercase() != "false";
        }

        config
    }
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IndexingConfig::default();
        assert!(config.indexing_enabled());
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.mode, IndexingMode::Sync);
        assert!(!config.auto_reindex);
        assert!(config.auto_install);
        assert_eq!(config.languages.len(), 3);
    }

    #[test]
    fn test_disable_wins_over_enable() {
        let config = IndexingConfig {
            enable_indexing: true,
            disable_indexing: true,
            ..Default::default()
        };
        assert!(!config.indexing_enabled());
    }

    #[test]
    fn test_resolve_db_path_default_location() {
        let config = IndexingConfig::default();
        let path = config.resolve_db_path(std::path::Path::new("/repo"));
        assert_eq!(path, PathBuf::from("/repo/.sextant/graph.db"));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(
            IndexingMode::parse("Background"),
            Some(IndexingMode::Background)
        );
        assert_eq!(IndexingMode::parse("later"), None);
    }
}
