//! Status and check command implementations
//!
//! Both are read-only: `status` reports per-language index records plus
//! freshness, `check` reports freshness alone (the scriptable fast path).

use std::path::{Path, PathBuf};

use anyhow::Result;
use sextant::config::IndexingConfig;
use sextant::output::{
    generate_execution_id, output_json, CheckResponse, JsonResponse, LanguageStatus,
    StatusResponse,
};
use sextant::{check_index_status, repo_id_for, GraphStore, OutputFormat};

fn open_store(root: &Path, db_path: Option<PathBuf>) -> Result<(GraphStore, PathBuf)> {
    let config = IndexingConfig {
        db_path,
        ..Default::default()
    };
    let path = config.resolve_db_path(root);
    let store = GraphStore::open(&path)?;
    Ok((store, path))
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| ts.to_string())
}

pub fn run_status(root: &Path, db_path: Option<PathBuf>, format: OutputFormat) -> Result<bool> {
    let execution_id = generate_execution_id();
    let (store, path) = open_store(root, db_path)?;

    let repo_id = repo_id_for(root);
    let staleness = check_index_status(&store, root)?;
    let records = store.index_records_for_repo(&repo_id)?;

    let languages: Vec<LanguageStatus> = records
        .iter()
        .map(|r| LanguageStatus {
            language: r.language.clone(),
            last_indexed_at: format_timestamp(r.last_indexed_at),
            file_count: r.file_count,
            function_count: r.function_count,
            class_count: r.class_count,
        })
        .collect();

    match format {
        OutputFormat::Human => {
            println!("Repository: {}", repo_id);
            println!("Database:   {}", path.display());
            println!("Freshness:  {}", staleness.reason);
            if languages.is_empty() {
                println!("No index records.");
            } else {
                println!();
                println!(
                    "{:<12} {:<22} {:>7} {:>10} {:>8}",
                    "language", "last indexed", "files", "functions", "classes"
                );
                for l in &languages {
                    println!(
                        "{:<12} {:<22} {:>7} {:>10} {:>8}",
                        l.language, l.last_indexed_at, l.file_count, l.function_count, l.class_count
                    );
                }
            }
        }
        OutputFormat::Json => {
            let response = JsonResponse::new(
                StatusResponse {
                    repo_id,
                    db_path: path.display().to_string(),
                    staleness,
                    languages,
                },
                &execution_id,
            );
            output_json(&response)?;
        }
    }
    Ok(true)
}

pub fn run_check(root: &Path, db_path: Option<PathBuf>, format: OutputFormat) -> Result<bool> {
    let execution_id = generate_execution_id();
    let (store, _) = open_store(root, db_path)?;
    let staleness = check_index_status(&store, root)?;

    match format {
        OutputFormat::Human => {
            println!("{}", staleness.reason);
            if staleness.needs_indexing {
                println!("{} source file(s) would be indexed.", staleness.estimated_files);
            }
        }
        OutputFormat::Json => {
            let response = JsonResponse::new(CheckResponse { staleness: staleness.clone() }, &execution_id);
            output_json(&response)?;
        }
    }
    // Exit status mirrors freshness so scripts can branch on it.
    Ok(!staleness.needs_indexing)
}
