//! Background indexing jobs
//!
//! Runs the orchestration pipeline on a worker thread so the caller can
//! return immediately with a job id. Job state lives in the graph store, not
//! in memory, so any later process opening the same database can query it.
//! A `running` row whose worker pid no longer exists is an interrupted job:
//! the host process died before the worker finished. Status reads detect
//! that case and fail the row rather than reporting it running forever.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use anyhow::{anyhow, Result};

use crate::config::IndexingConfig;
use crate::error_codes;
use crate::graph::{GraphStore, IndexingJob, JobStatus};
use crate::language::Language;
use crate::orchestrator::Orchestrator;

/// Handle to a spawned background job.
pub struct JobHandle {
    pub job_id: String,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    /// Block until the worker thread finishes. Tests use this; production
    /// callers poll `get_job_status` instead.
    pub fn wait(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawns and tracks indexing jobs for one codebase.
pub struct BackgroundIndexer {
    config: IndexingConfig,
    codebase: PathBuf,
    db_path: PathBuf,
}

impl BackgroundIndexer {
    pub fn new(config: IndexingConfig, codebase: &Path) -> Self {
        let db_path = config.resolve_db_path(codebase);
        Self {
            config,
            codebase: codebase.to_path_buf(),
            db_path,
        }
    }

    /// Insert a pending job row and spawn the worker thread.
    ///
    /// The row is committed before the thread starts, so a caller that
    /// immediately polls the returned job id always finds it.
    pub fn start_background_job(&self, languages: &[Language]) -> Result<JobHandle> {
        let job_id = uuid::Uuid::new_v4().to_string();
        let job = IndexingJob {
            job_id: job_id.clone(),
            status: JobStatus::Pending,
            languages: languages.iter().map(|l| l.as_str().to_string()).collect(),
            started_at: None,
            completed_at: None,
            result_summary: None,
            worker_pid: std::process::id(),
        };
        {
            let store = GraphStore::open(&self.db_path)?;
            store.insert_job(&job)?;
        }

        let config = self.config.clone();
        let codebase = self.codebase.clone();
        let db_path = self.db_path.clone();
        let languages = languages.to_vec();
        let thread_job_id = job_id.clone();
        let thread = std::thread::spawn(move || {
            run_job(&config, &codebase, &db_path, &thread_job_id, &languages);
        });

        Ok(JobHandle {
            job_id,
            thread: Some(thread),
        })
    }

    /// Fetch job state, detecting interrupted jobs.
    ///
    /// A `running` row owned by another, no-longer-alive process is
    /// transitioned to `failed` before being returned.
    pub fn get_job_status(&self, job_id: &str) -> Result<IndexingJob> {
        let store = GraphStore::open(&self.db_path)?;
        let job = store
            .get_job(job_id)?
            .ok_or_else(|| anyhow!("[{}] no such job: {}", error_codes::SXT_JOB_001_NOT_FOUND, job_id))?;

        if job.status == JobStatus::Running && !worker_alive(job.worker_pid) {
            let summary = format!(
                "[{}] worker process {} exited before the job finished",
                error_codes::SXT_JOB_002_INTERRUPTED,
                job.worker_pid
            );
            store.transition_job(
                job_id,
                JobStatus::Failed,
                None,
                Some(chrono::Utc::now().timestamp()),
                Some(&summary),
            )?;
            return Ok(store
                .get_job(job_id)?
                .ok_or_else(|| anyhow!("[{}] no such job: {}", error_codes::SXT_JOB_001_NOT_FOUND, job_id))?);
        }

        Ok(job)
    }
}

/// Worker body. Opens its own store connection; SQLite connections are not
/// shared across threads here.
fn run_job(
    config: &IndexingConfig,
    codebase: &Path,
    db_path: &Path,
    job_id: &str,
    languages: &[Language],
) {
    let mut store = match GraphStore::open(db_path) {
        Ok(store) => store,
        // Nothing to record the failure in; the row stays pending and a
        // status read after this process exits reports it interrupted.
        Err(_) => return,
    };

    let now = chrono::Utc::now().timestamp();
    match store.transition_job(job_id, JobStatus::Running, Some(now), None, None) {
        Ok(true) => {}
        // Not applied: the row is already terminal, e.g. a status read
        // marked it interrupted. The job is no longer ours to run.
        Ok(false) | Err(_) => return,
    }

    let orchestrator = Orchestrator::new(config.clone());
    let (status, summary) = match orchestrator.run(&mut store, codebase, languages) {
        Ok(result) => {
            let status = if result.timed_out {
                JobStatus::TimedOut
            } else if result.overall_success {
                JobStatus::Completed
            } else {
                JobStatus::Failed
            };
            let summary = serde_json::json!({
                "summary": result.summary_line(),
                "overall_success": result.overall_success,
                "timed_out": result.timed_out,
                "repo_id": result.repo_id,
            })
            .to_string();
            (status, summary)
        }
        Err(e) => (JobStatus::Failed, format!("orchestration error: {}", e)),
    };

    let completed = chrono::Utc::now().timestamp();
    let _ = store.transition_job(job_id, status, None, Some(completed), Some(&summary));
}

/// Whether the process that owns a job's worker thread is still alive.
#[cfg(target_os = "linux")]
fn worker_alive(pid: u32) -> bool {
    pid == std::process::id() || Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn worker_alive(pid: u32) -> bool {
    // Without a portable liveness probe, only the owning process may declare
    // its own job interrupted.
    pid == std::process::id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_current_process_is_alive() {
        assert!(worker_alive(std::process::id()));
    }

    #[cfg(unix)]
    #[test]
    fn test_worker_skips_job_already_terminal() {
        use std::os::unix::fs::PermissionsExt;

        let bin = TempDir::new().unwrap();
        let codebase = TempDir::new().unwrap();
        for (name, body) in [
            ("scip-python", "#!/bin/sh\n: > \"$4\"\nexit 0\n"),
            ("node", "#!/bin/sh\nexit 0\n"),
        ] {
            let path = bin.path().join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        std::fs::write(codebase.path().join("a.py"), "x = 1\n").unwrap();

        let config = IndexingConfig {
            auto_install: false,
            bin_dir: Some(bin.path().to_path_buf()),
            ..Default::default()
        };
        let db_path = config.resolve_db_path(codebase.path());
        {
            let store = GraphStore::open(&db_path).unwrap();
            store
                .insert_job(&IndexingJob {
                    job_id: "job-claimed".to_string(),
                    status: JobStatus::Pending,
                    languages: vec!["python".to_string()],
                    started_at: None,
                    completed_at: None,
                    result_summary: None,
                    worker_pid: std::process::id(),
                })
                .unwrap();
            // A status read flipped the row terminal before the worker got
            // scheduled.
            let applied = store
                .transition_job(
                    "job-claimed",
                    JobStatus::Failed,
                    None,
                    Some(1_700_000_000),
                    Some("interrupted"),
                )
                .unwrap();
            assert!(applied);
        }

        run_job(
            &config,
            codebase.path(),
            &db_path,
            "job-claimed",
            &[Language::Python],
        );

        let store = GraphStore::open(&db_path).unwrap();
        let job = store.get_job("job-claimed").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed, "terminal row must survive the worker");
        assert_eq!(job.result_summary.as_deref(), Some("interrupted"));
        let repo_id = crate::staleness::repo_id_for(codebase.path());
        assert!(
            store.index_records_for_repo(&repo_id).unwrap().is_empty(),
            "a worker whose row is terminal must not run the pipeline"
        );
    }
}
