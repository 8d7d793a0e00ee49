//! Command-line parsing for the sextant binary
//!
//! Hand-rolled argv parsing: one `Command` variant per subcommand, a
//! `while`-loop flag matcher per variant. Environment defaults come from
//! `IndexingConfig::from_env()`; explicit flags win over the environment.

use std::path::PathBuf;

use anyhow::Result;
use sextant::config::{IndexingConfig, IndexingMode};
use sextant::language::{parse_language_list, Language};
use sextant::OutputFormat;

pub fn print_usage() {
    eprintln!("Sextant - SCIP-based code-graph indexing pipeline");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  sextant <command> [arguments]");
    eprintln!("  sextant --help");
    eprintln!();
    eprintln!("  sextant index [--root <DIR>] [--db <FILE>] [--languages <L1,L2>] [--mode <sync|background>] [--timeout-secs <N>] [--force] [--no-install]");
    eprintln!("  sextant status [--root <DIR>] [--db <FILE>]");
    eprintln!("  sextant check [--root <DIR>] [--db <FILE>]");
    eprintln!("  sextant install [--languages <L1,L2>] [--bin-dir <DIR>]");
    eprintln!("  sextant jobs [--root <DIR>] [--db <FILE>]");
    eprintln!("  sextant job-status --job <ID> [--root <DIR>] [--db <FILE>]");
    eprintln!("  sextant languages [--root <DIR>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  index       Index a codebase into the graph database");
    eprintln!("  status      Show per-language index records and freshness");
    eprintln!("  check       Report whether the index is stale (read-only)");
    eprintln!("  install     Install missing indexer tools");
    eprintln!("  jobs        List background indexing jobs");
    eprintln!("  job-status  Show one background job");
    eprintln!("  languages   Detect languages and report toolchain readiness");
    eprintln!();
    eprintln!("Global arguments:");
    eprintln!("  --root <DIR>        Codebase root (default: current directory)");
    eprintln!("  --db <FILE>         Graph database path (default: <root>/.sextant/graph.db)");
    eprintln!("  --output <FORMAT>   Output format: human (default) or json");
    eprintln!();
    eprintln!("Index arguments:");
    eprintln!("  --languages <LIST>  Comma-separated languages (default: detected)");
    eprintln!("  --mode <MODE>       sync (default) or background");
    eprintln!("  --timeout-secs <N>  Overall wall-clock timeout (default: 300)");
    eprintln!("  --force             Index even when the graph is fresh");
    eprintln!("  --no-install        Fail on missing tools instead of installing");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SEXTANT_DISABLE_INDEXING, SEXTANT_TIMEOUT_SECS, SEXTANT_MODE,");
    eprintln!("  SEXTANT_LANGUAGES, SEXTANT_AUTO_REINDEX, SEXTANT_AUTO_INSTALL");
}

#[derive(Debug)]
pub enum Command {
    Index {
        root: PathBuf,
        config: IndexingConfig,
        /// None means detect from the codebase.
        languages: Option<Vec<Language>>,
        force: bool,
        format: OutputFormat,
    },
    Status {
        root: PathBuf,
        db_path: Option<PathBuf>,
        format: OutputFormat,
    },
    Check {
        root: PathBuf,
        db_path: Option<PathBuf>,
        format: OutputFormat,
    },
    Install {
        languages: Option<Vec<Language>>,
        bin_dir: Option<PathBuf>,
        format: OutputFormat,
    },
    Jobs {
        root: PathBuf,
        db_path: Option<PathBuf>,
        format: OutputFormat,
    },
    JobStatus {
        root: PathBuf,
        db_path: Option<PathBuf>,
        job_id: String,
        format: OutputFormat,
    },
    Languages {
        root: PathBuf,
        format: OutputFormat,
    },
}

fn parse_output_format(s: &str) -> Result<OutputFormat> {
    match s {
        "human" => Ok(OutputFormat::Human),
        "json" => Ok(OutputFormat::Json),
        other => Err(anyhow::anyhow!("Unknown output format: {}", other)),
    }
}

/// Fetch the value following a flag, advancing the cursor.
fn flag_value(args: &[String], i: &mut usize, flag: &str) -> Result<String> {
    if *i + 1 >= args.len() {
        return Err(anyhow::anyhow!("{} requires an argument", flag));
    }
    let value = args[*i + 1].clone();
    *i += 2;
    Ok(value)
}

pub fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        return Err(anyhow::anyhow!("Missing command"));
    }

    let command = &args[1];

    if command == "--help" || command == "-h" {
        print_usage();
        std::process::exit(0);
    }

    match command.as_str() {
        "index" => {
            let mut root = PathBuf::from(".");
            let mut config = IndexingConfig::from_env();
            let mut languages: Option<Vec<Language>> = None;
            let mut force = false;
            let mut format = OutputFormat::Human;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--root" => root = PathBuf::from(flag_value(&args, &mut i, "--root")?),
                    "--db" => config.db_path = Some(PathBuf::from(flag_value(&args, &mut i, "--db")?)),
                    "--languages" => {
                        languages = Some(parse_language_list(&flag_value(&args, &mut i, "--languages")?)?)
                    }
                    "--mode" => {
                        let value = flag_value(&args, &mut i, "--mode")?;
                        config.mode = IndexingMode::parse(&value)
                            .ok_or_else(|| anyhow::anyhow!("Unknown mode: {}", value))?;
                    }
                    "--timeout-secs" => {
                        let value = flag_value(&args, &mut i, "--timeout-secs")?;
                        config.timeout = std::time::Duration::from_secs(value.parse()?);
                    }
                    "--bin-dir" => {
                        config.bin_dir = Some(PathBuf::from(flag_value(&args, &mut i, "--bin-dir")?))
                    }
                    "--force" => {
                        force = true;
                        i += 1;
                    }
                    "--no-install" => {
                        config.auto_install = false;
                        i += 1;
                    }
                    "--output" => format = parse_output_format(&flag_value(&args, &mut i, "--output")?)?,
                    _ => return Err(anyhow::anyhow!("Unknown argument: {}", args[i])),
                }
            }

            Ok(Command::Index {
                root,
                config,
                languages,
                force,
                format,
            })
        }
        "status" | "check" | "jobs" => {
            let mut root = PathBuf::from(".");
            let mut db_path: Option<PathBuf> = None;
            let mut format = OutputFormat::Human;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--root" => root = PathBuf::from(flag_value(&args, &mut i, "--root")?),
                    "--db" => db_path = Some(PathBuf::from(flag_value(&args, &mut i, "--db")?)),
                    "--output" => format = parse_output_format(&flag_value(&args, &mut i, "--output")?)?,
                    _ => return Err(anyhow::anyhow!("Unknown argument: {}", args[i])),
                }
            }

            Ok(match command.as_str() {
                "status" => Command::Status { root, db_path, format },
                "check" => Command::Check { root, db_path, format },
                _ => Command::Jobs { root, db_path, format },
            })
        }
        "install" => {
            let mut languages: Option<Vec<Language>> = None;
            let mut bin_dir: Option<PathBuf> = None;
            let mut format = OutputFormat::Human;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--languages" => {
                        languages = Some(parse_language_list(&flag_value(&args, &mut i, "--languages")?)?)
                    }
                    "--bin-dir" => {
                        bin_dir = Some(PathBuf::from(flag_value(&args, &mut i, "--bin-dir")?))
                    }
                    "--output" => format = parse_output_format(&flag_value(&args, &mut i, "--output")?)?,
                    _ => return Err(anyhow::anyhow!("Unknown argument: {}", args[i])),
                }
            }

            Ok(Command::Install {
                languages,
                bin_dir,
                format,
            })
        }
        "job-status" => {
            let mut root = PathBuf::from(".");
            let mut db_path: Option<PathBuf> = None;
            let mut job_id: Option<String> = None;
            let mut format = OutputFormat::Human;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--root" => root = PathBuf::from(flag_value(&args, &mut i, "--root")?),
                    "--db" => db_path = Some(PathBuf::from(flag_value(&args, &mut i, "--db")?)),
                    "--job" => job_id = Some(flag_value(&args, &mut i, "--job")?),
                    "--output" => format = parse_output_format(&flag_value(&args, &mut i, "--output")?)?,
                    _ => return Err(anyhow::anyhow!("Unknown argument: {}", args[i])),
                }
            }

            let job_id = job_id.ok_or_else(|| anyhow::anyhow!("--job is required"))?;
            Ok(Command::JobStatus {
                root,
                db_path,
                job_id,
                format,
            })
        }
        "languages" => {
            let mut root = PathBuf::from(".");
            let mut format = OutputFormat::Human;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--root" => root = PathBuf::from(flag_value(&args, &mut i, "--root")?),
                    "--output" => format = parse_output_format(&flag_value(&args, &mut i, "--output")?)?,
                    _ => return Err(anyhow::anyhow!("Unknown argument: {}", args[i])),
                }
            }

            Ok(Command::Languages { root, format })
        }
        _ => Err(anyhow::anyhow!("Unknown command: {}", command)),
    }
}
