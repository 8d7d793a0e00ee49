//! Install and languages command implementations
//!
//! `install` drives the tool installer directly; `languages` is the
//! fast-fail readiness report (detected languages plus toolchain status).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use sextant::installer::Installer;
use sextant::language::{detect_languages, Language, ALL_LANGUAGES};
use sextant::output::{
    generate_execution_id, output_json, DetectedLanguage, InstallOutcome, InstallResponse,
    JsonResponse, LanguagesResponse,
};
use sextant::{prereq, OutputFormat};

pub fn run_install(
    languages: Option<Vec<Language>>,
    bin_dir: Option<PathBuf>,
    format: OutputFormat,
) -> Result<bool> {
    let execution_id = generate_execution_id();
    let installer = Installer::new(bin_dir.unwrap_or_else(Installer::default_bin_dir));

    let results = match languages {
        Some(languages) => {
            let mut results = BTreeMap::new();
            for language in languages {
                let result = installer.install(language);
                results.insert(result.tool_name.clone(), result);
            }
            results
        }
        None => installer.install_all_auto_installable(),
    };

    let all_ok = results.values().all(|r| r.success);

    match format {
        OutputFormat::Human => {
            for (tool, result) in &results {
                if result.success {
                    println!(
                        "{}: ok{}",
                        tool,
                        result
                            .installed_version
                            .as_deref()
                            .map(|v| format!(" ({})", v))
                            .unwrap_or_default()
                    );
                } else {
                    println!(
                        "{}: failed - {}",
                        tool,
                        result.error_detail.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }
        OutputFormat::Json => {
            let tools = results
                .into_iter()
                .map(|(tool, r)| {
                    (
                        tool,
                        InstallOutcome {
                            success: r.success,
                            installed_version: r.installed_version,
                            error_detail: r.error_detail,
                        },
                    )
                })
                .collect();
            let response = JsonResponse::new(InstallResponse { tools }, &execution_id);
            output_json(&response)?;
        }
    }
    Ok(all_ok)
}

pub fn run_languages(root: &Path, format: OutputFormat) -> Result<bool> {
    let execution_id = generate_execution_id();
    let bin_dir = Installer::default_bin_dir();
    let detected = detect_languages(root);

    match format {
        OutputFormat::Human => {
            if detected.is_empty() {
                println!("No supported source files detected.");
            } else {
                println!("Detected languages:");
                for (language, count) in &detected {
                    let status = prereq::check(*language, &bin_dir);
                    let readiness = if status.available {
                        "ready".to_string()
                    } else {
                        format!("missing: {}", status.missing_tools.join(", "))
                    };
                    println!("  {:<12} {:>6} file(s)  [{}]", language.as_str(), count, readiness);
                }
            }
            println!();
            println!(
                "Supported: {}",
                ALL_LANGUAGES
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        OutputFormat::Json => {
            let response = JsonResponse::new(
                LanguagesResponse {
                    detected: detected
                        .iter()
                        .map(|(language, count)| DetectedLanguage {
                            language: language.as_str().to_string(),
                            file_count: *count,
                        })
                        .collect(),
                    supported: ALL_LANGUAGES.iter().map(|l| l.as_str().to_string()).collect(),
                },
                &execution_id,
            );
            output_json(&response)?;
        }
    }
    Ok(true)
}
