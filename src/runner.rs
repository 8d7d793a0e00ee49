//! SCIP indexer runner
//!
//! Invokes the per-language indexer binary as a subprocess inside the
//! codebase, with a cooperative deadline (spawn, poll, terminate on expiry --
//! no alarm signals) and an atomically promoted artifact: the indexer writes
//! to a staging path that is renamed over `index.scip` only on success, so a
//! failed or killed re-run never clobbers a previously good index.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error_codes;
use crate::language::Language;
use crate::prereq;
use crate::toolchain::ManifestKind;

/// File name of the index artifact in the codebase root.
pub const ARTIFACT_FILE_NAME: &str = "index.scip";

/// Poll interval while waiting on the indexer subprocess.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Why an indexer invocation failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum RunFailure {
    #[error("indexer tool not found: {0}")]
    ToolNotFound(String),
    #[error("indexer could not be spawned: {0}")]
    Spawn(String),
    #[error("indexer exited with status {0:?}")]
    ExitFailure(Option<i32>),
    #[error("indexer exceeded its deadline and was terminated")]
    TimedOut,
    #[error("indexer exited successfully but produced no artifact")]
    MissingArtifact,
}

impl RunFailure {
    /// Stable error code for this failure.
    pub fn error_code(&self) -> &'static str {
        match self {
            RunFailure::ToolNotFound(_) => error_codes::SXT_PRE_001_TOOLCHAIN_MISSING,
            RunFailure::Spawn(_) => error_codes::SXT_RUN_003_SPAWN_FAILED,
            RunFailure::ExitFailure(_) => error_codes::SXT_RUN_001_EXIT_FAILURE,
            RunFailure::TimedOut => error_codes::SXT_RUN_002_TIMEOUT,
            RunFailure::MissingArtifact => error_codes::SXT_RUN_004_MISSING_ARTIFACT,
        }
    }
}

/// Outcome of one indexer invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ScipIndexResult {
    pub success: bool,
    /// Path of the promoted artifact; set only on success.
    pub index_artifact_path: Option<PathBuf>,
    /// Tail of the indexer's stderr for diagnostics.
    pub stderr_excerpt: String,
    pub duration: Duration,
    pub failure: Option<RunFailure>,
    /// Name of a build-configuration manifest synthesized before the run,
    /// so callers can warn that the project's real config was not used.
    pub synthesized_manifest: Option<String>,
}

/// Seam for the orchestrator: production code uses `ScipRunner`, tests
/// substitute slow or failing fakes.
pub trait IndexRunner: Send + Sync {
    /// Run the indexer for `language` against `codebase`, finishing (or
    /// being terminated) by `deadline`.
    fn run(&self, language: Language, codebase: &Path, deadline: Instant) -> ScipIndexResult;
}

/// Production runner invoking the real per-language SCIP indexer CLIs.
pub struct ScipRunner {
    bin_dir: PathBuf,
}

impl ScipRunner {
    pub fn new(bin_dir: PathBuf) -> Self {
        Self { bin_dir }
    }
}

impl IndexRunner for ScipRunner {
    fn run(&self, language: Language, codebase: &Path, deadline: Instant) -> ScipIndexResult {
        let started = Instant::now();
        let spec = language.tool_spec();

        let tool = match prereq::find_tool(spec.tool, &self.bin_dir) {
            Some(path) => path,
            None => {
                return failure_result(
                    RunFailure::ToolNotFound(spec.tool.to_string()),
                    String::new(),
                    started,
                    None,
                )
            }
        };

        // Language-specific pre-step: synthesize a minimal manifest when the
        // indexer requires one and the project has none.
        let synthesized_manifest = match spec.manifest {
            Some(kind) => match ensure_manifest(codebase, kind) {
                Ok(synthesized) => synthesized,
                Err(e) => {
                    return failure_result(
                        RunFailure::Spawn(format!("manifest synthesis failed: {}", e)),
                        String::new(),
                        started,
                        None,
                    )
                }
            },
            None => None,
        };

        let staging = staging_artifact_path(codebase);
        let mut cmd = indexer_command(language, &tool, codebase, &staging);

        let stderr_file = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => {
                return failure_result(
                    RunFailure::Spawn(format!("cannot create stderr capture file: {}", e)),
                    String::new(),
                    started,
                    synthesized_manifest,
                )
            }
        };
        match stderr_file.reopen() {
            Ok(handle) => {
                cmd.stdout(Stdio::null()).stderr(handle);
            }
            Err(e) => {
                return failure_result(
                    RunFailure::Spawn(format!("cannot redirect stderr: {}", e)),
                    String::new(),
                    started,
                    synthesized_manifest,
                )
            }
        }

        let wait_result = run_command_with_deadline(&mut cmd, deadline);
        let stderr_excerpt = read_stderr_excerpt(stderr_file.path());

        match wait_result {
            Ok(status) if status.success() => {
                if !staging.exists() {
                    return failure_result(
                        RunFailure::MissingArtifact,
                        stderr_excerpt,
                        started,
                        synthesized_manifest,
                    );
                }
                let artifact = codebase.join(ARTIFACT_FILE_NAME);
                match promote_artifact(&staging, &artifact) {
                    Ok(()) => ScipIndexResult {
                        success: true,
                        index_artifact_path: Some(artifact),
                        stderr_excerpt,
                        duration: started.elapsed(),
                        failure: None,
                        synthesized_manifest,
                    },
                    Err(e) => failure_result(
                        RunFailure::Spawn(format!("artifact promotion failed: {}", e)),
                        stderr_excerpt,
                        started,
                        synthesized_manifest,
                    ),
                }
            }
            Ok(status) => {
                let _ = std::fs::remove_file(&staging);
                failure_result(
                    RunFailure::ExitFailure(status.code()),
                    stderr_excerpt,
                    started,
                    synthesized_manifest,
                )
            }
            Err(failure) => {
                let _ = std::fs::remove_file(&staging);
                failure_result(failure, stderr_excerpt, started, synthesized_manifest)
            }
        }
    }
}

fn failure_result(
    failure: RunFailure,
    stderr_excerpt: String,
    started: Instant,
    synthesized_manifest: Option<String>,
) -> ScipIndexResult {
    ScipIndexResult {
        success: false,
        index_artifact_path: None,
        stderr_excerpt,
        duration: started.elapsed(),
        failure: Some(failure),
        synthesized_manifest,
    }
}

/// Staging path for the artifact, in the same directory as the final path so
/// the promoting rename is atomic.
fn staging_artifact_path(codebase: &Path) -> PathBuf {
    codebase.join(format!(".{}.tmp-{}", ARTIFACT_FILE_NAME, std::process::id()))
}

/// Build the indexer command line for one language.
///
/// The working directory is the codebase root; output is directed at the
/// staging path so a failed run cannot touch the promoted artifact.
fn indexer_command(language: Language, tool: &Path, codebase: &Path, staging: &Path) -> Command {
    let mut cmd = Command::new(tool);
    cmd.current_dir(codebase);
    match language {
        Language::Python => {
            cmd.arg("index").arg(".").arg("--output").arg(staging);
        }
        Language::JavaScript => {
            cmd.arg("index")
                .arg("--infer-tsconfig")
                .arg("--output")
                .arg(staging);
        }
        Language::TypeScript => {
            cmd.arg("index").arg("--output").arg(staging);
        }
        Language::Go => {
            cmd.arg("-o").arg(staging);
        }
        Language::Rust => {
            cmd.arg("scip").arg(".").arg("--output").arg(staging);
        }
        Language::CSharp => {
            cmd.arg("index").arg("--output").arg(staging);
        }
        Language::Cpp => {
            cmd.arg("--compdb-path")
                .arg("compile_commands.json")
                .arg("--index-output-path")
                .arg(staging);
        }
    }
    cmd
}

/// Spawn a command and wait for it with a cooperative deadline.
///
/// Polls `try_wait` until the child exits or the deadline passes; on expiry
/// the child is killed and reaped before returning `TimedOut`.
pub fn run_command_with_deadline(
    cmd: &mut Command,
    deadline: Instant,
) -> Result<ExitStatus, RunFailure> {
    let mut child = cmd.spawn().map_err(|e| RunFailure::Spawn(e.to_string()))?;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RunFailure::TimedOut);
                }
                std::thread::sleep(WAIT_POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RunFailure::Spawn(e.to_string()));
            }
        }
    }
}

/// Atomically promote a staged artifact over the final path.
///
/// Rename within one directory: readers see either the old artifact or the
/// new one, never a truncated file.
pub fn promote_artifact(staging: &Path, artifact: &Path) -> Result<()> {
    std::fs::rename(staging, artifact).with_context(|| {
        format!(
            "cannot promote artifact {} -> {}",
            staging.display(),
            artifact.display()
        )
    })
}

/// Synthesize a minimal build-configuration manifest when absent.
///
/// Non-destructive: an existing manifest is never touched. Returns the file
/// name when one was synthesized so the caller can surface a warning.
pub fn ensure_manifest(codebase: &Path, kind: ManifestKind) -> Result<Option<String>> {
    let path = codebase.join(kind.file_name());
    if path.exists() {
        return Ok(None);
    }

    let content = match kind {
        ManifestKind::TsConfig | ManifestKind::JsConfig => serde_json::to_string_pretty(
            &serde_json::json!({
                "compilerOptions": {
                    "allowJs": true,
                    "checkJs": false,
                },
                "include": ["**/*"],
            }),
        )?,
        ManifestKind::CompileCommands => {
            let entries = cpp_compile_entries(codebase);
            serde_json::to_string_pretty(&entries)?
        }
    };

    std::fs::write(&path, content)
        .with_context(|| format!("cannot write synthesized manifest {}", path.display()))?;
    Ok(Some(kind.file_name().to_string()))
}

/// Minimal compilation database: one default clang++ entry per C++ source.
fn cpp_compile_entries(codebase: &Path) -> Vec<serde_json::Value> {
    let mut entries = Vec::new();
    let walker = ignore::WalkBuilder::new(codebase)
        .hidden(true)
        .git_ignore(true)
        .build();
    for entry in walker.flatten() {
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if matches!(ext, "cpp" | "cc" | "cxx" | "c") {
            let file = entry
                .path()
                .strip_prefix(codebase)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();
            entries.push(serde_json::json!({
                "directory": codebase.to_string_lossy(),
                "command": format!("clang++ -c {}", file),
                "file": file,
            }));
        }
    }
    entries
}

fn read_stderr_excerpt(path: &Path) -> String {
    let text = std::fs::read_to_string(path).unwrap_or_default();
    let lines: Vec<&str> = text.lines().collect();
    let tail_start = lines.len().saturating_sub(10);
    lines[tail_start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deadline_expired_before_spawn_still_kills_promptly() {
        let deadline = Instant::now();
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let started = Instant::now();
        let result = run_command_with_deadline(&mut cmd, deadline);
        assert_eq!(result, Err(RunFailure::TimedOut));
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "expired deadline must terminate the child immediately"
        );
    }

    #[test]
    fn test_manifest_synthesis_is_non_destructive() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("tsconfig.json");
        std::fs::write(&existing, "{\"extends\": \"./base\"}").unwrap();

        let synthesized = ensure_manifest(dir.path(), ManifestKind::TsConfig).unwrap();
        assert!(synthesized.is_none(), "existing manifest must be kept");
        let content = std::fs::read_to_string(&existing).unwrap();
        assert!(content.contains("extends"), "existing manifest untouched");
    }
}
