//! JSON output types for CLI commands
//!
//! Every machine-readable response is wrapped in a schema-versioned envelope
//! with an execution id, so scripted consumers can pin a schema and correlate
//! output with logs.

use serde::{Deserialize, Serialize};

use crate::orchestrator::OrchestrationResult;
use crate::staleness::StalenessStatus;

/// Current JSON output schema version
pub const SEXTANT_JSON_SCHEMA_VERSION: &str = "1.0.0";

/// Output rendering selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Wrapper for all JSON responses
///
/// Every JSON response includes schema_version and execution_id for
/// parsing stability and traceability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    /// Schema version for parsing stability
    pub schema_version: String,
    /// Unique execution ID for this run
    pub execution_id: String,
    /// Emitting tool name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// RFC 3339 emission timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Response data
    pub data: T,
}

impl<T> JsonResponse<T> {
    /// Create a new JSON response
    pub fn new(data: T, execution_id: &str) -> Self {
        JsonResponse {
            schema_version: SEXTANT_JSON_SCHEMA_VERSION.to_string(),
            execution_id: execution_id.to_string(),
            tool: Some("sextant".to_string()),
            timestamp: Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            data,
        }
    }
}

/// Generate a unique execution ID for this run
///
/// Uses timestamp + process ID for uniqueness.
pub fn generate_execution_id() -> String {
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let pid = process::id();

    format!("{:x}-{:x}", timestamp, pid)
}

/// Output JSON to stdout
pub fn output_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{}", json);
    Ok(())
}

/// `sextant status` response data.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub repo_id: String,
    pub db_path: String,
    pub staleness: StalenessStatus,
    /// One entry per indexed language.
    pub languages: Vec<LanguageStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageStatus {
    pub language: String,
    pub last_indexed_at: String,
    pub file_count: usize,
    pub function_count: usize,
    pub class_count: usize,
}

/// `sextant index` response data for a synchronous run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub result: OrchestrationResult,
}

/// `sextant index` response data when the run went to the background.
#[derive(Debug, Clone, Serialize)]
pub struct JobStartedResponse {
    pub job_id: String,
    pub status: String,
}

/// `sextant job-status` response data.
#[derive(Debug, Clone, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub status: String,
    pub languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<String>,
}

/// `sextant check` response data.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub staleness: StalenessStatus,
}

/// `sextant install` response data.
#[derive(Debug, Clone, Serialize)]
pub struct InstallResponse {
    /// Keyed by tool name.
    pub tools: std::collections::BTreeMap<String, InstallOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// `sextant languages` response data.
#[derive(Debug, Clone, Serialize)]
pub struct LanguagesResponse {
    /// Detected in the codebase, most files first.
    pub detected: Vec<DetectedLanguage>,
    /// Everything the pipeline supports.
    pub supported: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectedLanguage {
    pub language: String,
    pub file_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_id_format() {
        let id = generate_execution_id();
        assert!(id.contains('-'), "execution id is timestamp-pid: {}", id);
    }

    #[test]
    fn test_envelope_fields() {
        let response = JsonResponse::new(serde_json::json!({"ok": true}), "exec-1");
        let text = serde_json::to_string(&response).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["schema_version"], SEXTANT_JSON_SCHEMA_VERSION);
        assert_eq!(parsed["execution_id"], "exec-1");
        assert_eq!(parsed["tool"], "sextant");
    }
}
