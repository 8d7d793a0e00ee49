//! Indexing orchestration
//!
//! Drives the per-language pipeline (prerequisite check, optional install,
//! indexer run, artifact import) under one overall wall-clock deadline.
//! Languages are processed sequentially and independently: a failure in one
//! never aborts the others, and each gets its own report in the result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use crate::background::{BackgroundIndexer, JobHandle};
use crate::config::{IndexingConfig, IndexingMode};
use crate::error_codes;
use crate::graph::GraphStore;
use crate::installer::Installer;
use crate::language::Language;
use crate::prereq;
use crate::runner::{IndexRunner, ScipRunner};
use crate::scip_import::{import_index, ImportResult};
use crate::staleness;

/// Where one language's pipeline stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    NotStarted,
    Installing,
    Running,
    Importing,
    Done,
    Failed,
}

/// Per-language outcome of one orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageReport {
    pub language: Language,
    /// Final state, `Done` or `Failed`.
    pub state: PipelineState,
    /// Stage the pipeline was in when it failed; None on success.
    pub failed_stage: Option<PipelineState>,
    pub success: bool,
    pub error_code: Option<String>,
    pub detail: Option<String>,
    /// Import statistics, present when the import stage ran.
    pub import: Option<ImportResult>,
    /// Manifest file synthesized before the indexer ran, if any.
    pub synthesized_manifest: Option<String>,
    pub duration: Duration,
}

impl LanguageReport {
    fn failed(
        language: Language,
        stage: PipelineState,
        error_code: &str,
        detail: String,
        started: Instant,
    ) -> Self {
        Self {
            language,
            state: PipelineState::Failed,
            failed_stage: Some(stage),
            success: false,
            error_code: Some(error_code.to_string()),
            detail: Some(detail),
            import: None,
            synthesized_manifest: None,
            duration: started.elapsed(),
        }
    }
}

/// Aggregate outcome of one synchronous orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    pub repo_id: String,
    /// Keyed by language name for stable JSON output.
    pub per_language: BTreeMap<String, LanguageReport>,
    /// True only when every requested language succeeded.
    pub overall_success: bool,
    /// True when the overall deadline expired with languages still pending.
    pub timed_out: bool,
    pub duration: Duration,
}

impl OrchestrationResult {
    /// One-line human summary, also stored as the background job summary.
    pub fn summary_line(&self) -> String {
        let succeeded = self.per_language.values().filter(|r| r.success).count();
        let total = self.per_language.len();
        let nodes: usize = self
            .per_language
            .values()
            .filter_map(|r| r.import.as_ref())
            .map(|i| i.nodes_created)
            .sum();
        let edges: usize = self
            .per_language
            .values()
            .filter_map(|r| r.import.as_ref())
            .map(|i| i.edges_created)
            .sum();
        format!(
            "{}/{} languages indexed, {} nodes, {} edges in {:.1}s",
            succeeded,
            total,
            nodes,
            edges,
            self.duration.as_secs_f64()
        )
    }
}

/// How an `index` invocation ultimately executed.
pub enum RunOutcome {
    /// Ran synchronously to completion (possibly with per-language failures).
    Completed(OrchestrationResult),
    /// Handed to the background indexer; poll the handle's job id.
    Background(JobHandle),
}

/// Sequential per-language indexing pipeline.
pub struct Orchestrator {
    config: IndexingConfig,
    bin_dir: PathBuf,
    runner: Box<dyn IndexRunner>,
}

impl Orchestrator {
    pub fn new(config: IndexingConfig) -> Self {
        let bin_dir = config
            .bin_dir
            .clone()
            .unwrap_or_else(Installer::default_bin_dir);
        let runner = Box::new(ScipRunner::new(bin_dir.clone()));
        Self {
            config,
            bin_dir,
            runner,
        }
    }

    /// Construct with a substitute runner. Used by tests to inject slow or
    /// failing indexers without spawning real subprocesses.
    pub fn with_runner(config: IndexingConfig, runner: Box<dyn IndexRunner>) -> Self {
        let bin_dir = config
            .bin_dir
            .clone()
            .unwrap_or_else(Installer::default_bin_dir);
        Self {
            config,
            bin_dir,
            runner,
        }
    }

    /// Run the pipeline synchronously for the given languages.
    ///
    /// The overall timeout from the config bounds the whole run; each
    /// language's indexer inherits whatever time remains. Languages that
    /// never got to start when the deadline expired are reported as failed
    /// with the orchestration-timeout code.
    pub fn run(
        &self,
        store: &mut GraphStore,
        codebase: &Path,
        languages: &[Language],
    ) -> Result<OrchestrationResult> {
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let repo_id = staleness::repo_id_for(codebase);
        let fingerprint = staleness::compute_fingerprint(codebase)?;

        let mut per_language = BTreeMap::new();
        let mut timed_out = false;

        for &language in languages {
            if Instant::now() >= deadline {
                timed_out = true;
                per_language.insert(
                    language.as_str().to_string(),
                    LanguageReport::failed(
                        language,
                        PipelineState::NotStarted,
                        error_codes::SXT_RUN_005_ORCHESTRATION_TIMEOUT,
                        "overall indexing deadline expired before this language started"
                            .to_string(),
                        // This language did no work; its duration is its own,
                        // not the whole run's.
                        Instant::now(),
                    ),
                );
                continue;
            }
            let report = self.run_language(
                store,
                codebase,
                language,
                &repo_id,
                &fingerprint.digest,
                deadline,
            );
            if report.error_code.as_deref()
                == Some(error_codes::SXT_RUN_002_TIMEOUT)
            {
                timed_out = true;
            }
            per_language.insert(language.as_str().to_string(), report);
        }

        let overall_success = per_language.values().all(|r| r.success);
        Ok(OrchestrationResult {
            repo_id,
            per_language,
            overall_success,
            timed_out,
            duration: started.elapsed(),
        })
    }

    fn run_language(
        &self,
        store: &mut GraphStore,
        codebase: &Path,
        language: Language,
        repo_id: &str,
        fingerprint: &str,
        deadline: Instant,
    ) -> LanguageReport {
        let started = Instant::now();

        let mut status = prereq::check(language, &self.bin_dir);
        if !status.available && self.config.auto_install {
            let installer = Installer::new(self.bin_dir.clone());
            let install = installer.install(language);
            if !install.success {
                return LanguageReport::failed(
                    language,
                    PipelineState::Installing,
                    error_codes::SXT_INST_002_INSTALL_FAILED,
                    install
                        .error_detail
                        .unwrap_or_else(|| format!("installing {} failed", install.tool_name)),
                    started,
                );
            }
            status = prereq::check(language, &self.bin_dir);
        }
        if !status.available {
            return LanguageReport::failed(
                language,
                PipelineState::Installing,
                error_codes::SXT_PRE_001_TOOLCHAIN_MISSING,
                format!("missing tools: {}", status.missing_tools.join(", ")),
                started,
            );
        }

        let run = self.runner.run(language, codebase, deadline);
        if !run.success {
            let (code, detail) = match run.failure {
                Some(failure) => (
                    failure.error_code(),
                    format!("{} (stderr: {})", failure, run.stderr_excerpt),
                ),
                None => (
                    error_codes::SXT_RUN_001_EXIT_FAILURE,
                    "indexer failed without detail".to_string(),
                ),
            };
            return LanguageReport::failed(language, PipelineState::Running, code, detail, started);
        }
        let Some(artifact) = run.index_artifact_path else {
            return LanguageReport::failed(
                language,
                PipelineState::Running,
                error_codes::SXT_RUN_004_MISSING_ARTIFACT,
                "indexer reported success without an artifact path".to_string(),
                started,
            );
        };

        let import = import_index(store, &artifact, repo_id, language, fingerprint);
        if let Some(fatal) = &import.fatal_error {
            let code = if fatal.contains(error_codes::SXT_DB_001_WRITE_FAILED) {
                error_codes::SXT_DB_001_WRITE_FAILED
            } else {
                error_codes::SXT_IMP_001_ARTIFACT_UNREADABLE
            };
            return LanguageReport {
                language,
                state: PipelineState::Failed,
                failed_stage: Some(PipelineState::Importing),
                success: false,
                error_code: Some(code.to_string()),
                detail: Some(fatal.clone()),
                import: Some(import),
                synthesized_manifest: run.synthesized_manifest,
                duration: started.elapsed(),
            };
        }

        LanguageReport {
            language,
            state: PipelineState::Done,
            failed_stage: None,
            success: true,
            error_code: None,
            detail: None,
            import: Some(import),
            synthesized_manifest: run.synthesized_manifest,
            duration: started.elapsed(),
        }
    }
}

/// Entry point that honors the configured execution mode.
///
/// `Prompt` is treated as sync here; interactive confirmation happens at the
/// CLI boundary before this is called.
pub fn run_indexing(
    config: &IndexingConfig,
    codebase: &Path,
    languages: &[Language],
) -> Result<RunOutcome> {
    match config.mode {
        IndexingMode::Background => {
            let indexer = BackgroundIndexer::new(config.clone(), codebase);
            let handle = indexer.start_background_job(languages)?;
            Ok(RunOutcome::Background(handle))
        }
        IndexingMode::Sync | IndexingMode::Prompt => {
            let db_path = config.resolve_db_path(codebase);
            let mut store = GraphStore::open(&db_path)?;
            let orchestrator = Orchestrator::new(config.clone());
            let result = orchestrator.run(&mut store, codebase, languages)?;
            Ok(RunOutcome::Completed(result))
        }
    }
}
