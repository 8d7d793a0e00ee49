//! Sextant: SCIP-based code-graph indexing pipeline
//!
//! Sextant orchestrates external SCIP indexers per language, imports the
//! resulting artifacts into an embedded SQLite graph, and keeps track of
//! index freshness per repository.
//!
//! # Pipeline
//!
//! For each requested language: check prerequisites, install the indexer
//! when missing and allowed, run it with a deadline, import the artifact.
//! Languages fail independently; one broken toolchain never blocks the rest.
//!
//! # Scoping
//!
//! Every node and edge carries its (repo_id, language) scope, and node ids
//! are derived from repo_id + entity_id, so multiple repositories share one
//! database without collisions. Imports replace exactly their own scope.

pub mod background;
pub mod config;
pub mod error_codes;
pub mod graph;
pub mod installer;
pub mod language;
pub mod orchestrator;
pub mod output;
pub mod prereq;
pub mod runner;
pub mod scip_import;
pub mod staleness;
pub mod toolchain;

pub use background::{BackgroundIndexer, JobHandle};
pub use config::{IndexingConfig, IndexingMode, DEFAULT_TIMEOUT_SECS};
pub use graph::{
    EdgeType, GraphEdge, GraphNode, GraphStore, IndexRecord, IndexingJob, JobStatus, NodeType,
};
pub use installer::{InstallResult, Installer};
pub use language::Language;
pub use orchestrator::{
    run_indexing, LanguageReport, OrchestrationResult, Orchestrator, PipelineState, RunOutcome,
};
pub use output::OutputFormat;
pub use runner::{IndexRunner, RunFailure, ScipIndexResult, ScipRunner};
pub use scip_import::{import_index, ImportResult};
pub use staleness::{check_index_status, compute_fingerprint, repo_id_for, StalenessStatus};
