//! Sextant CLI - SCIP-based code-graph indexing pipeline
//!
//! Usage: sextant <command> [arguments]

mod cli;
mod index_cmd;
mod job_cmd;
mod status_cmd;
mod tools_cmd;

use std::process::ExitCode;

use cli::{parse_args, print_usage, Command};

fn main() -> ExitCode {
    let command = match parse_args() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        Command::Index {
            root,
            config,
            languages,
            force,
            format,
        } => index_cmd::run(&root, config, languages, force, format),
        Command::Status {
            root,
            db_path,
            format,
        } => status_cmd::run_status(&root, db_path, format),
        Command::Check {
            root,
            db_path,
            format,
        } => status_cmd::run_check(&root, db_path, format),
        Command::Install {
            languages,
            bin_dir,
            format,
        } => tools_cmd::run_install(languages, bin_dir, format),
        Command::Jobs {
            root,
            db_path,
            format,
        } => job_cmd::run_jobs(&root, db_path, format),
        Command::JobStatus {
            root,
            db_path,
            job_id,
            format,
        } => job_cmd::run_job_status(&root, db_path, &job_id, format),
        Command::Languages { root, format } => tools_cmd::run_languages(&root, format),
    };

    match result {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
