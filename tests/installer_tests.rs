//! Installer tests
//!
//! Exercise idempotency and structured failure without touching any real
//! package manager: success paths use fake executables in an injected bin
//! dir, failure paths rely on package managers that are absent from PATH
//! (and skip when the host genuinely has them).

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use sextant::installer::Installer;
use sextant::{prereq, Language};
use tempfile::TempDir;

fn install_fake_tool(bin_dir: &Path, name: &str, version_line: &str) {
    let path = bin_dir.join(name);
    std::fs::write(
        &path,
        format!("#!/bin/sh\necho '{}'\nexit 0\n", version_line),
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_install_is_idempotent_when_tool_present() {
    let bin = TempDir::new().unwrap();
    install_fake_tool(bin.path(), "scip-python", "scip-python 0.6.0");

    let installer = Installer::new(bin.path().to_path_buf());
    let first = installer.install(Language::Python);
    let second = installer.install(Language::Python);

    assert!(first.success, "present tool must short-circuit: {:?}", first.error_detail);
    assert!(second.success);
    assert_eq!(first.tool_name, "scip-python");
    assert_eq!(
        first.installed_version.as_deref(),
        Some("scip-python 0.6.0"),
        "version probe reads the tool's --version output"
    );
}

#[test]
fn test_missing_package_manager_is_structured_failure() {
    let bin = TempDir::new().unwrap();
    // Only meaningful when dotnet is genuinely absent; otherwise installing
    // would hit the real package manager, which tests must never do.
    if prereq::find_tool("dotnet", bin.path()).is_some() {
        return;
    }

    let installer = Installer::new(bin.path().to_path_buf());
    let result = installer.install(Language::CSharp);

    assert!(!result.success);
    assert_eq!(result.tool_name, "scip-dotnet");
    let detail = result.error_detail.as_deref().unwrap_or("");
    assert!(
        detail.contains("SXT-INST-001"),
        "missing package manager carries its error code: {}",
        detail
    );
    assert!(
        detail.contains("dotnet"),
        "failure names the absent host tool: {}",
        detail
    );
}

#[test]
fn test_install_all_dedups_shared_tools() {
    let bin = TempDir::new().unwrap();
    // scip-typescript serves both JavaScript and TypeScript; stub every tool
    // so install_all never reaches a package manager.
    for tool in [
        "scip-python",
        "scip-typescript",
        "scip-go",
        "rust-analyzer",
        "scip-dotnet",
        "scip-clang",
    ] {
        install_fake_tool(bin.path(), tool, &format!("{} 1.0", tool));
    }

    let installer = Installer::new(bin.path().to_path_buf());
    let results = installer.install_all_auto_installable();

    assert_eq!(
        results.len(),
        6,
        "seven languages share six tools: {:?}",
        results.keys().collect::<Vec<_>>()
    );
    assert!(results.values().all(|r| r.success));
    assert!(results.contains_key("scip-typescript"));
}
