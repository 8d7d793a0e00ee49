//! Index command implementation
//!
//! Runs the full pipeline for a codebase: staleness check, language
//! selection, then a sync or background orchestration run depending on the
//! configured mode.

use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use sextant::config::{IndexingConfig, IndexingMode};
use sextant::language::{detect_languages, Language};
use sextant::output::{
    generate_execution_id, output_json, IndexResponse, JobStartedResponse, JsonResponse,
};
use sextant::{check_index_status, run_indexing, GraphStore, OutputFormat, RunOutcome};

/// Interactive confirmation for prompt mode, when auto-reindex is off.
fn confirm_reindex(reason: &str, estimated_files: usize) -> Result<bool> {
    eprint!(
        "Index is stale ({}); ~{} file(s) to index. Re-index now? [y/N] ",
        reason, estimated_files
    );
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub fn run(
    root: &Path,
    config: IndexingConfig,
    languages: Option<Vec<Language>>,
    force: bool,
    format: OutputFormat,
) -> Result<bool> {
    let execution_id = generate_execution_id();

    if !config.indexing_enabled() {
        if format == OutputFormat::Human {
            eprintln!("Indexing is disabled by configuration; nothing to do.");
        }
        return Ok(true);
    }

    // Skip when fresh, unless forced. The check opens the store read-only
    // and is cheap relative to a full indexer run.
    if !force {
        let db_path = config.resolve_db_path(root);
        let store = GraphStore::open(&db_path)?;
        let staleness = check_index_status(&store, root)?;
        if staleness.needs_indexing
            && config.mode == IndexingMode::Prompt
            && !config.auto_reindex
            && format == OutputFormat::Human
            && !confirm_reindex(&staleness.reason, staleness.estimated_files)?
        {
            eprintln!("Skipping indexing.");
            return Ok(true);
        }
        if !staleness.needs_indexing {
            match format {
                OutputFormat::Human => {
                    eprintln!("Index is fresh; use --force to re-index.");
                }
                OutputFormat::Json => {
                    let response = JsonResponse::new(
                        serde_json::json!({"skipped": true, "reason": staleness.reason}),
                        &execution_id,
                    );
                    output_json(&response)?;
                }
            }
            return Ok(true);
        }
    }

    let languages = match languages {
        Some(languages) => languages,
        None => {
            let detected: Vec<Language> =
                detect_languages(root).into_iter().map(|(l, _)| l).collect();
            if detected.is_empty() {
                config.languages.clone()
            } else {
                detected
            }
        }
    };

    let progress = match format {
        OutputFormat::Human => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {msg} [{elapsed_precise}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(format!(
                "indexing {} language(s): {}",
                languages.len(),
                languages
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(pb)
        }
        OutputFormat::Json => None,
    };

    let outcome = run_indexing(&config, root, &languages)?;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    match outcome {
        RunOutcome::Completed(result) => {
            let success = result.overall_success;
            match format {
                OutputFormat::Human => {
                    println!("{}", result.summary_line());
                    for (name, report) in &result.per_language {
                        if report.success {
                            let import = report.import.as_ref();
                            println!(
                                "  {}: ok ({} files, {} functions, {} classes)",
                                name,
                                import.map(|i| i.file_count).unwrap_or(0),
                                import.map(|i| i.function_count).unwrap_or(0),
                                import.map(|i| i.class_count).unwrap_or(0),
                            );
                        } else {
                            println!(
                                "  {}: failed [{}] {}",
                                name,
                                report.error_code.as_deref().unwrap_or("?"),
                                report.detail.as_deref().unwrap_or(""),
                            );
                        }
                        if let Some(manifest) = &report.synthesized_manifest {
                            println!(
                                "  {}: note: synthesized {} (project had none)",
                                name, manifest
                            );
                        }
                    }
                }
                OutputFormat::Json => {
                    let response = JsonResponse::new(IndexResponse { result }, &execution_id);
                    output_json(&response)?;
                }
            }
            Ok(success)
        }
        RunOutcome::Background(handle) => {
            match format {
                OutputFormat::Human => {
                    println!("Background job started: {}", handle.job_id);
                    println!("Poll with: sextant job-status --job {}", handle.job_id);
                }
                OutputFormat::Json => {
                    let response = JsonResponse::new(
                        JobStartedResponse {
                            job_id: handle.job_id.clone(),
                            status: "pending".to_string(),
                        },
                        &execution_id,
                    );
                    output_json(&response)?;
                }
            }
            // The worker thread dies with this process; wait for it so a
            // plain CLI invocation still produces a finished job.
            handle.wait();
            Ok(true)
        }
    }
}
