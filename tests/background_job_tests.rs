//! Background job lifecycle tests
//!
//! Jobs live in the graph store, so every assertion here reads the same
//! rows a separate process would see.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use sextant::config::IndexingConfig;
use sextant::graph::{GraphStore, IndexingJob, JobStatus};
use sextant::{BackgroundIndexer, Language};
use tempfile::TempDir;

/// Fake toolchain whose indexer writes an empty (but valid) SCIP artifact.
/// An empty protobuf message parses as an index with zero documents, so the
/// import succeeds with zero nodes.
fn stub_python_toolchain(bin_dir: &Path) {
    let indexer = bin_dir.join("scip-python");
    std::fs::write(&indexer, "#!/bin/sh\n: > \"$4\"\nexit 0\n").unwrap();
    std::fs::set_permissions(&indexer, std::fs::Permissions::from_mode(0o755)).unwrap();

    let node = bin_dir.join("node");
    std::fs::write(&node, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&node, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn job_row(job_id: &str, status: JobStatus, worker_pid: u32) -> IndexingJob {
    IndexingJob {
        job_id: job_id.to_string(),
        status,
        languages: vec!["python".to_string()],
        started_at: Some(1_700_000_000),
        completed_at: None,
        result_summary: None,
        worker_pid,
    }
}

#[test]
fn test_job_runs_to_completion() {
    let bin = TempDir::new().unwrap();
    let codebase = TempDir::new().unwrap();
    stub_python_toolchain(bin.path());
    std::fs::write(codebase.path().join("a.py"), "x = 1\n").unwrap();

    let config = IndexingConfig {
        timeout: Duration::from_secs(30),
        auto_install: false,
        bin_dir: Some(bin.path().to_path_buf()),
        ..Default::default()
    };
    let indexer = BackgroundIndexer::new(config, codebase.path());

    let handle = indexer.start_background_job(&[Language::Python]).unwrap();
    let job_id = handle.job_id.clone();

    // The pending row is visible before the worker finishes.
    let early = indexer.get_job_status(&job_id).unwrap();
    assert!(
        matches!(early.status, JobStatus::Pending | JobStatus::Running | JobStatus::Completed),
        "job must be observable immediately: {:?}",
        early.status
    );

    handle.wait();

    let done = indexer.get_job_status(&job_id).unwrap();
    assert_eq!(done.status, JobStatus::Completed, "summary: {:?}", done.result_summary);
    assert!(done.started_at.is_some());
    assert!(done.completed_at.is_some());
    assert!(
        done.result_summary.as_deref().unwrap_or("").contains("overall_success"),
        "summary carries the run outcome: {:?}",
        done.result_summary
    );
}

#[test]
fn test_unknown_job_id_is_an_error() {
    let codebase = TempDir::new().unwrap();
    let indexer = BackgroundIndexer::new(IndexingConfig::default(), codebase.path());

    let err = indexer.get_job_status("no-such-job").unwrap_err();
    assert!(
        err.to_string().contains("SXT-JOB-001"),
        "unknown job carries its error code: {}",
        err
    );
}

#[test]
fn test_terminal_status_rejects_regression() {
    let dir = TempDir::new().unwrap();
    let store = GraphStore::open(&dir.path().join("graph.db")).unwrap();

    store
        .insert_job(&job_row("job-1", JobStatus::Running, std::process::id()))
        .unwrap();
    let applied = store
        .transition_job("job-1", JobStatus::Completed, None, Some(1_700_000_100), Some("done"))
        .unwrap();
    assert!(applied);

    let regressed = store
        .transition_job("job-1", JobStatus::Running, Some(1_700_000_200), None, None)
        .unwrap();
    assert!(!regressed, "terminal rows must reject further transitions");

    let job = store.get_job("job-1").unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result_summary.as_deref(), Some("done"));
}

#[test]
fn test_stale_running_row_with_dead_pid_reports_interrupted() {
    let codebase = TempDir::new().unwrap();
    let config = IndexingConfig::default();
    let db_path = config.resolve_db_path(codebase.path());
    {
        let store = GraphStore::open(&db_path).unwrap();
        // Pid near u32::MAX cannot belong to a live process.
        store
            .insert_job(&job_row("job-dead", JobStatus::Running, u32::MAX - 1))
            .unwrap();
    }

    let indexer = BackgroundIndexer::new(config, codebase.path());
    let job = indexer.get_job_status("job-dead").unwrap();

    assert_eq!(job.status, JobStatus::Failed, "orphaned running row must be failed");
    assert!(
        job.result_summary.as_deref().unwrap_or("").contains("SXT-JOB-002"),
        "interruption carries its error code: {:?}",
        job.result_summary
    );
}
