//! Dependency installer for indexer toolchains
//!
//! Installs missing SCIP indexer binaries through each ecosystem's package
//! manager. Every failure is converted into a structured, non-fatal
//! `InstallResult` with an actionable message; the orchestrator proceeds with
//! whichever languages succeeded.
//!
//! Installed binaries land in a shared user-local bin directory
//! (`~/.sextant/bin` by default) which `prereq::find_tool` consults before
//! PATH, so the runner resolves them without any PATH mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::error_codes;
use crate::language::Language;
use crate::prereq;
use crate::toolchain::InstallMethod;

/// Outcome of one install attempt.
#[derive(Debug, Clone, Serialize)]
pub struct InstallResult {
    pub success: bool,
    pub tool_name: String,
    /// First line of `<tool> --version` when the tool is runnable.
    pub installed_version: Option<String>,
    /// Human-actionable failure detail; None on success.
    pub error_detail: Option<String>,
}

impl InstallResult {
    fn ok(tool: &str, version: Option<String>) -> Self {
        Self {
            success: true,
            tool_name: tool.to_string(),
            installed_version: version,
            error_detail: None,
        }
    }

    fn failed(tool: &str, detail: String) -> Self {
        Self {
            success: false,
            tool_name: tool.to_string(),
            installed_version: None,
            error_detail: Some(detail),
        }
    }
}

/// Installer for per-language indexer toolchains.
pub struct Installer {
    bin_dir: PathBuf,
}

impl Installer {
    /// Create an installer writing to the given bin directory.
    ///
    /// The directory is created lazily on first install.
    pub fn new(bin_dir: PathBuf) -> Self {
        Self { bin_dir }
    }

    /// Default shared bin directory: `~/.sextant/bin`.
    ///
    /// Falls back to `.sextant/bin` under the current directory when HOME is
    /// unset (CI containers).
    pub fn default_bin_dir() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sextant")
            .join("bin")
    }

    /// The bin directory this installer writes to.
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Ensure the indexer for `language` is installed.
    ///
    /// Idempotent: when a runnable tool is already present (bin dir or PATH)
    /// this probes its version and returns success without touching any
    /// package manager.
    ///
    /// Never returns Err; all failures are carried in the result so one
    /// broken ecosystem cannot abort the others.
    pub fn install(&self, language: Language) -> InstallResult {
        let spec = language.tool_spec();

        // Already installed and runnable: skip.
        if let Some(path) = prereq::find_tool(spec.tool, &self.bin_dir) {
            return InstallResult::ok(spec.tool, probe_version(&path));
        }

        if let Err(detail) = std::fs::create_dir_all(&self.bin_dir) {
            return InstallResult::failed(
                spec.tool,
                format!(
                    "[{}] cannot create bin dir {}: {}",
                    error_codes::SXT_INST_003_BIN_DIR,
                    self.bin_dir.display(),
                    detail
                ),
            );
        }

        let outcome = match &spec.install {
            InstallMethod::Npm { package } => self.install_npm(spec.tool, package),
            InstallMethod::GoInstall { module } => self.install_go(spec.tool, module),
            InstallMethod::RustupComponent { component } => {
                self.install_rustup(spec.tool, component)
            }
            InstallMethod::DotnetTool {
                package,
                source_repo,
            } => self.install_dotnet(spec.tool, package, source_repo),
            InstallMethod::BinaryRelease { url_template } => {
                self.install_binary_release(spec.tool, url_template)
            }
        };

        match outcome {
            Ok(()) => match prereq::find_tool(spec.tool, &self.bin_dir) {
                Some(path) => InstallResult::ok(spec.tool, probe_version(&path)),
                None => InstallResult::failed(
                    spec.tool,
                    format!(
                        "[{}] install reported success but {} was not found in {} or PATH",
                        error_codes::SXT_INST_004_NOT_FOUND_AFTER_INSTALL,
                        spec.tool,
                        self.bin_dir.display()
                    ),
                ),
            },
            Err(detail) => InstallResult::failed(spec.tool, detail),
        }
    }

    /// Install every language's indexer that can be installed without user
    /// interaction, keyed by tool name.
    ///
    /// Tools shared between languages (scip-typescript) are installed once.
    pub fn install_all_auto_installable(&self) -> BTreeMap<String, InstallResult> {
        let mut results = BTreeMap::new();
        for lang in crate::language::ALL_LANGUAGES {
            let tool = lang.tool_spec().tool.to_string();
            results.entry(tool).or_insert_with(|| self.install(lang));
        }
        results
    }

    fn install_npm(&self, tool: &str, package: &str) -> Result<(), String> {
        let npm = require_host_tool("npm", tool, "install Node.js (https://nodejs.org)")?;
        // npm --prefix <dir> places binaries in <dir>/bin; our prefix is the
        // bin dir's parent so the binary lands in bin_dir itself.
        let prefix = self.bin_dir.parent().unwrap_or(&self.bin_dir);
        run_package_manager(
            Command::new(npm)
                .args(["install", "--global", "--prefix"])
                .arg(prefix)
                .arg(package),
            tool,
        )
    }

    fn install_go(&self, tool: &str, module: &str) -> Result<(), String> {
        let go = require_host_tool("go", tool, "install the Go toolchain (https://go.dev/dl)")?;
        run_package_manager(
            Command::new(go)
                .args(["install", &format!("{}@latest", module)])
                .env("GOBIN", &self.bin_dir),
            tool,
        )
    }

    fn install_rustup(&self, tool: &str, component: &str) -> Result<(), String> {
        let rustup = require_host_tool("rustup", tool, "install rustup (https://rustup.rs)")?;
        run_package_manager(
            Command::new(rustup).args(["component", "add", component]),
            tool,
        )
    }

    fn install_dotnet(&self, tool: &str, package: &str, source_repo: &str) -> Result<(), String> {
        let dotnet = require_host_tool(
            "dotnet",
            tool,
            "install the .NET SDK (https://dotnet.microsoft.com)",
        )?;
        let prebuilt = run_package_manager(
            Command::new(&dotnet)
                .args(["tool", "install", package, "--tool-path"])
                .arg(&self.bin_dir),
            tool,
        );
        match prebuilt {
            Ok(()) => Ok(()),
            // No package compatible with the host runtime: build from source.
            Err(first_error) => self
                .build_dotnet_from_source(&dotnet, tool, source_repo)
                .map_err(|build_error| {
                    format!("{}; source build also failed: {}", first_error, build_error)
                }),
        }
    }

    fn build_dotnet_from_source(
        &self,
        dotnet: &Path,
        tool: &str,
        source_repo: &str,
    ) -> Result<(), String> {
        let git = require_host_tool("git", tool, "install git")?;
        let checkout = tempfile::tempdir()
            .map_err(|e| format!("cannot create temp dir for source build: {}", e))?;

        run_package_manager(
            Command::new(git)
                .args(["clone", "--depth", "1", source_repo])
                .arg(checkout.path()),
            tool,
        )?;
        run_package_manager(
            Command::new(dotnet)
                .args(["publish", "-c", "Release", "-o"])
                .arg(&self.bin_dir)
                .current_dir(checkout.path()),
            tool,
        )
    }

    fn install_binary_release(&self, tool: &str, url_template: &str) -> Result<(), String> {
        let curl = require_host_tool("curl", tool, "install curl")?;
        let url = url_template
            .replace("{os}", release_os())
            .replace("{arch}", release_arch());
        let dest = self.bin_dir.join(tool);
        let staging = self.bin_dir.join(format!(".{}.download", tool));

        run_package_manager(
            Command::new(curl)
                .args([
                    "--fail",
                    "--silent",
                    "--show-error",
                    "--location",
                    "--output",
                ])
                .arg(&staging)
                .arg(&url),
            tool,
        )?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o755))
                .map_err(|e| format!("cannot mark {} executable: {}", tool, e))?;
        }
        std::fs::rename(&staging, &dest).map_err(|e| {
            format!(
                "cannot move {} into {}: {}",
                tool,
                self.bin_dir.display(),
                e
            )
        })
    }
}

/// Find a host package manager / runtime, with an actionable hint when absent.
fn require_host_tool(name: &str, tool: &str, hint: &str) -> Result<PathBuf, String> {
    which::which(name).map_err(|_| {
        format!(
            "[{}] cannot install {}: {} not found on PATH -- {}",
            error_codes::SXT_INST_001_MISSING_PACKAGE_MANAGER,
            tool,
            name,
            hint
        )
    })
}

/// Run a package-manager command, mapping failure to an actionable message.
///
/// Network failures surface here as non-zero exits with stderr detail.
fn run_package_manager(cmd: &mut Command, tool: &str) -> Result<(), String> {
    let output = cmd
        .output()
        .map_err(|e| format!("failed to spawn installer for {}: {}", tool, e))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "[{}] installing {} failed ({}): {}",
            error_codes::SXT_INST_002_INSTALL_FAILED,
            tool,
            output.status,
            stderr.lines().take(4).collect::<Vec<_>>().join(" | ")
        ))
    }
}

/// Probe `<tool> --version`, returning the first output line.
fn probe_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines().next().map(|l| l.trim().to_string())
}

fn release_os() -> &'static str {
    if cfg!(target_os = "macos") {
        "darwin"
    } else {
        "linux"
    }
}

fn release_arch() -> &'static str {
    if cfg!(target_arch = "aarch64") {
        "arm64"
    } else {
        "x86_64"
    }
}
