//! Prerequisite checking for indexer toolchains
//!
//! Pure read-only lookups used to fail fast before invoking the installer or
//! the indexer itself. The shared bin dir is consulted before PATH so tools
//! installed by `Installer` are found without PATH mutation.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::language::Language;

/// Result of a prerequisite check for one language.
#[derive(Debug, Clone, Serialize)]
pub struct PrerequisiteStatus {
    /// True when the indexer binary and all runtime tools are present.
    pub available: bool,
    /// Names of the tools that could not be found.
    pub missing_tools: Vec<String>,
}

/// Locate a tool in the shared bin dir or on PATH.
///
/// # Returns
/// Absolute path to the executable, or None when not found.
pub fn find_tool(tool: &str, bin_dir: &Path) -> Option<PathBuf> {
    let local = bin_dir.join(tool);
    if is_executable(&local) {
        return Some(local);
    }
    which::which(tool).ok()
}

/// Check whether a language's indexer toolchain is runnable.
///
/// No side effects; safe to call repeatedly from interactive paths.
///
/// # Arguments
/// * `language` - Language whose toolchain to check
/// * `bin_dir` - Shared user-local bin directory the installer writes to
pub fn check(language: Language, bin_dir: &Path) -> PrerequisiteStatus {
    let spec = language.tool_spec();
    let mut missing = Vec::new();

    if find_tool(spec.tool, bin_dir).is_none() {
        missing.push(spec.tool.to_string());
    }
    for runtime_tool in spec.runtime {
        if find_tool(runtime_tool, bin_dir).is_none() {
            missing.push(runtime_tool.to_string());
        }
    }

    PrerequisiteStatus {
        available: missing.is_empty(),
        missing_tools: missing,
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && path
            .metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
