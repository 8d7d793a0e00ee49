//! Background job command implementations

use std::path::{Path, PathBuf};

use anyhow::Result;
use sextant::config::IndexingConfig;
use sextant::graph::IndexingJob;
use sextant::output::{generate_execution_id, output_json, JobResponse, JsonResponse};
use sextant::{BackgroundIndexer, GraphStore, JobStatus, OutputFormat};

fn job_response(job: &IndexingJob) -> JobResponse {
    JobResponse {
        job_id: job.job_id.clone(),
        status: job.status.as_str().to_string(),
        languages: job.languages.clone(),
        started_at: job.started_at,
        completed_at: job.completed_at,
        result_summary: job.result_summary.clone(),
    }
}

fn print_job(job: &IndexingJob) {
    println!("Job:       {}", job.job_id);
    println!("Status:    {}", job.status.as_str());
    println!("Languages: {}", job.languages.join(", "));
    if let Some(started) = job.started_at {
        println!("Started:   {}", started);
    }
    if let Some(completed) = job.completed_at {
        println!("Completed: {}", completed);
    }
    if let Some(summary) = &job.result_summary {
        println!("Summary:   {}", summary);
    }
}

pub fn run_jobs(root: &Path, db_path: Option<PathBuf>, format: OutputFormat) -> Result<bool> {
    let execution_id = generate_execution_id();
    let config = IndexingConfig {
        db_path,
        ..Default::default()
    };
    let store = GraphStore::open(&config.resolve_db_path(root))?;
    let jobs = store.list_jobs()?;

    match format {
        OutputFormat::Human => {
            if jobs.is_empty() {
                println!("No jobs.");
            } else {
                println!("{:<38} {:<10} {}", "job_id", "status", "languages");
                for job in &jobs {
                    println!(
                        "{:<38} {:<10} {}",
                        job.job_id,
                        job.status.as_str(),
                        job.languages.join(",")
                    );
                }
            }
        }
        OutputFormat::Json => {
            let data: Vec<JobResponse> = jobs.iter().map(job_response).collect();
            let response = JsonResponse::new(data, &execution_id);
            output_json(&response)?;
        }
    }
    Ok(true)
}

pub fn run_job_status(
    root: &Path,
    db_path: Option<PathBuf>,
    job_id: &str,
    format: OutputFormat,
) -> Result<bool> {
    let execution_id = generate_execution_id();
    let config = IndexingConfig {
        db_path,
        ..Default::default()
    };
    let indexer = BackgroundIndexer::new(config, root);
    let job = indexer.get_job_status(job_id)?;

    match format {
        OutputFormat::Human => print_job(&job),
        OutputFormat::Json => {
            let response = JsonResponse::new(job_response(&job), &execution_id);
            output_json(&response)?;
        }
    }
    Ok(job.status != JobStatus::Failed && job.status != JobStatus::TimedOut)
}
