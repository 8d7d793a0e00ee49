//! Graph schema definitions for Sextant
//!
//! Node, edge and index-record rows persisted in the embedded store. Every
//! row carries its (repo_id, language) scope; all reads and writes filter on
//! that scope so separately indexed repositories never bleed into each other.

use serde::{Deserialize, Serialize};

/// Node classification in the code graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    File,
    Class,
    Function,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::File => "FILE",
            NodeType::Class => "CLASS",
            NodeType::Function => "FUNCTION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FILE" => Some(NodeType::File),
            "CLASS" => Some(NodeType::Class),
            "FUNCTION" => Some(NodeType::Function),
            _ => None,
        }
    }
}

/// Edge classification in the code graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Contains,
    Calls,
    References,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Contains => "CONTAINS",
            EdgeType::Calls => "CALLS",
            EdgeType::References => "REFERENCES",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONTAINS" => Some(EdgeType::Contains),
            "CALLS" => Some(EdgeType::Calls),
            "REFERENCES" => Some(EdgeType::References),
            _ => None,
        }
    }
}

/// A node in the code graph.
///
/// `node_id` is globally unique across repositories: it is derived from
/// `repo_id` and `entity_id` so two repositories indexed into the same store
/// cannot collide even when their indexers emit identical symbol strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub node_id: String,
    pub repo_id: String,
    pub language: String,
    /// Indexer-provided symbol or path identifier, unique within the scope.
    pub entity_id: String,
    pub node_type: NodeType,
    pub name: String,
    pub file_path: Option<String>,
    /// 1-indexed inclusive line range of the definition, when known.
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
}

/// Compose the globally unique node id for an entity within a repository.
pub fn node_id_for(repo_id: &str, entity_id: &str) -> String {
    format!("{}::{}", repo_id, entity_id)
}

impl GraphNode {
    /// Create a node, deriving `node_id` from the scope.
    pub fn new(
        repo_id: &str,
        language: &str,
        entity_id: &str,
        node_type: NodeType,
        name: &str,
    ) -> Self {
        Self {
            node_id: node_id_for(repo_id, entity_id),
            repo_id: repo_id.to_string(),
            language: language.to_string(),
            entity_id: entity_id.to_string(),
            node_type,
            name: name.to_string(),
            file_path: None,
            line_start: None,
            line_end: None,
        }
    }
}

/// A directed edge between two nodes in the same scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphEdge {
    pub repo_id: String,
    pub language: String,
    pub source_node_id: String,
    pub target_node_id: String,
    pub edge_type: EdgeType,
}

/// Bookkeeping row for one (repository, language) index.
///
/// Written only after a fully successful import; an in-progress or failed
/// import never touches the prior record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub repo_id: String,
    pub language: String,
    /// Unix timestamp (seconds) of the last successful import.
    pub last_indexed_at: i64,
    /// Opaque fingerprint of the source tree used for staleness comparison.
    pub fingerprint: String,
    pub file_count: usize,
    pub function_count: usize,
    pub class_count: usize,
}

/// Status of a background indexing job.
///
/// Transitions are monotonic: Pending -> Running -> terminal. Terminal states
/// (Completed, Failed, TimedOut) never regress; the store enforces this in
/// the update statement itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed_out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "timed_out" => Some(JobStatus::TimedOut),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::TimedOut
        )
    }
}

/// Persisted background indexing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingJob {
    pub job_id: String,
    pub status: JobStatus,
    /// Language names requested for the run.
    pub languages: Vec<String>,
    /// Unix timestamps (seconds); None until the transition happens.
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    /// Human/JSON summary of the outcome, set on terminal transitions.
    pub result_summary: Option<String>,
    /// Pid of the process that owns the worker thread. A `running` row whose
    /// pid is not the current process is an interrupted job.
    pub worker_pid: u32,
}
