//! Embedded graph store
//!
//! Thin persistence layer over an embedded SQLite database. Owns the
//! connection lifecycle and creates the schema on first open. Every node and
//! edge row carries its (repo_id, language) scope and every query filters on
//! it; the store exposes no unscoped reads over graph data.
//!
//! Scope replacement is transactional: concurrent readers observe either the
//! prior scope or the fully imported new scope, never an intermediate mix.

mod schema;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

pub use schema::{
    node_id_for, EdgeType, GraphEdge, GraphNode, IndexRecord, IndexingJob, JobStatus, NodeType,
};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS graph_nodes (
    node_id    TEXT PRIMARY KEY,
    repo_id    TEXT NOT NULL,
    language   TEXT NOT NULL,
    entity_id  TEXT NOT NULL,
    node_type  TEXT NOT NULL,
    name       TEXT NOT NULL,
    file_path  TEXT,
    line_start INTEGER,
    line_end   INTEGER
);
CREATE INDEX IF NOT EXISTS idx_nodes_scope ON graph_nodes(repo_id, language);
CREATE INDEX IF NOT EXISTS idx_nodes_entity ON graph_nodes(repo_id, entity_id);

CREATE TABLE IF NOT EXISTS graph_edges (
    edge_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    repo_id        TEXT NOT NULL,
    language       TEXT NOT NULL,
    source_node_id TEXT NOT NULL,
    target_node_id TEXT NOT NULL,
    edge_type      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_edges_scope ON graph_edges(repo_id, language);
CREATE INDEX IF NOT EXISTS idx_edges_source ON graph_edges(repo_id, source_node_id);

CREATE TABLE IF NOT EXISTS index_records (
    repo_id        TEXT NOT NULL,
    language       TEXT NOT NULL,
    last_indexed_at INTEGER NOT NULL,
    fingerprint    TEXT NOT NULL,
    file_count     INTEGER NOT NULL,
    function_count INTEGER NOT NULL,
    class_count    INTEGER NOT NULL,
    PRIMARY KEY (repo_id, language)
);

CREATE TABLE IF NOT EXISTS indexing_jobs (
    job_id         TEXT PRIMARY KEY,
    status         TEXT NOT NULL,
    languages      TEXT NOT NULL,
    started_at     INTEGER,
    completed_at   INTEGER,
    result_summary TEXT,
    worker_pid     INTEGER NOT NULL
);
";

/// Connection wrapper for the embedded graph database.
///
/// The connection is owned exclusively; concurrent imports into different
/// scopes use separate `GraphStore` handles on the same file (SQLite
/// serializes the writes, and disjoint scopes touch disjoint rows).
pub struct GraphStore {
    conn: Connection,
}

impl GraphStore {
    /// Open (and if necessary create) the store at the given path.
    ///
    /// Parent directories are created; the schema is applied idempotently.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create db directory {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("cannot open graph database {}", db_path.display()))?;
        // journal_mode returns a result row, so it cannot go through execute
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA_SQL)
            .context("cannot initialize graph schema")?;
        Ok(Self { conn })
    }

    /// Replace the full node/edge set for one (repo_id, language) scope and
    /// update its IndexRecord, all in a single transaction.
    ///
    /// Either the complete new scope plus its record becomes visible, or the
    /// prior state remains untouched.
    pub fn replace_scope(
        &mut self,
        repo_id: &str,
        language: &str,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        record: &IndexRecord,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM graph_edges WHERE repo_id = ?1 AND language = ?2",
            params![repo_id, language],
        )?;
        tx.execute(
            "DELETE FROM graph_nodes WHERE repo_id = ?1 AND language = ?2",
            params![repo_id, language],
        )?;

        {
            let mut insert_node = tx.prepare(
                "INSERT INTO graph_nodes
                 (node_id, repo_id, language, entity_id, node_type, name, file_path, line_start, line_end)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for node in nodes {
                insert_node.execute(params![
                    node.node_id,
                    node.repo_id,
                    node.language,
                    node.entity_id,
                    node.node_type.as_str(),
                    node.name,
                    node.file_path,
                    node.line_start,
                    node.line_end,
                ])?;
            }

            let mut insert_edge = tx.prepare(
                "INSERT INTO graph_edges
                 (repo_id, language, source_node_id, target_node_id, edge_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for edge in edges {
                insert_edge.execute(params![
                    edge.repo_id,
                    edge.language,
                    edge.source_node_id,
                    edge.target_node_id,
                    edge.edge_type.as_str(),
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO index_records
             (repo_id, language, last_indexed_at, fingerprint, file_count, function_count, class_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(repo_id, language) DO UPDATE SET
                last_indexed_at = excluded.last_indexed_at,
                fingerprint = excluded.fingerprint,
                file_count = excluded.file_count,
                function_count = excluded.function_count,
                class_count = excluded.class_count",
            params![
                record.repo_id,
                record.language,
                record.last_indexed_at,
                record.fingerprint,
                record.file_count as i64,
                record.function_count as i64,
                record.class_count as i64,
            ],
        )?;

        tx.commit().context("scope replacement commit failed")?;
        Ok(())
    }

    /// All nodes within one scope.
    pub fn nodes_in_scope(&self, repo_id: &str, language: &str) -> Result<Vec<GraphNode>> {
        let mut stmt = self.conn.prepare(
            "SELECT node_id, repo_id, language, entity_id, node_type, name, file_path, line_start, line_end
             FROM graph_nodes WHERE repo_id = ?1 AND language = ?2 ORDER BY node_id",
        )?;
        let rows = stmt.query_map(params![repo_id, language], row_to_node)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("node scope query failed")
    }

    /// Look up one node by its scope and entity id.
    ///
    /// Both `repo_id` and `entity_id` are required; there is deliberately no
    /// entity-only lookup.
    pub fn find_node(&self, repo_id: &str, entity_id: &str) -> Result<Option<GraphNode>> {
        let mut stmt = self.conn.prepare(
            "SELECT node_id, repo_id, language, entity_id, node_type, name, file_path, line_start, line_end
             FROM graph_nodes WHERE repo_id = ?1 AND entity_id = ?2",
        )?;
        stmt.query_row(params![repo_id, entity_id], row_to_node)
            .optional()
            .context("node lookup failed")
    }

    /// All edges within one scope.
    pub fn edges_in_scope(&self, repo_id: &str, language: &str) -> Result<Vec<GraphEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT repo_id, language, source_node_id, target_node_id, edge_type
             FROM graph_edges WHERE repo_id = ?1 AND language = ?2 ORDER BY edge_id",
        )?;
        let rows = stmt.query_map(params![repo_id, language], |row| {
            let edge_type: String = row.get(4)?;
            Ok(GraphEdge {
                repo_id: row.get(0)?,
                language: row.get(1)?,
                source_node_id: row.get(2)?,
                target_node_id: row.get(3)?,
                edge_type: EdgeType::parse(&edge_type).unwrap_or(EdgeType::References),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("edge scope query failed")
    }

    /// Node counts per type for one scope, for status reporting.
    pub fn scope_counts(&self, repo_id: &str, language: &str) -> Result<HashMap<String, usize>> {
        let mut stmt = self.conn.prepare(
            "SELECT node_type, COUNT(*) FROM graph_nodes
             WHERE repo_id = ?1 AND language = ?2 GROUP BY node_type",
        )?;
        let rows = stmt.query_map(params![repo_id, language], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;
        let mut counts = HashMap::new();
        for row in rows {
            let (node_type, count) = row?;
            counts.insert(node_type, count);
        }
        Ok(counts)
    }

    /// IndexRecord for one (repo, language) pair.
    pub fn get_index_record(&self, repo_id: &str, language: &str) -> Result<Option<IndexRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT repo_id, language, last_indexed_at, fingerprint, file_count, function_count, class_count
             FROM index_records WHERE repo_id = ?1 AND language = ?2",
        )?;
        stmt.query_row(params![repo_id, language], row_to_record)
            .optional()
            .context("index record lookup failed")
    }

    /// All IndexRecords for a repository.
    pub fn index_records_for_repo(&self, repo_id: &str) -> Result<Vec<IndexRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT repo_id, language, last_indexed_at, fingerprint, file_count, function_count, class_count
             FROM index_records WHERE repo_id = ?1 ORDER BY language",
        )?;
        let rows = stmt.query_map(params![repo_id], row_to_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("index record listing failed")
    }

    /// Most recently written IndexRecord for a repository, if any.
    pub fn latest_index_record(&self, repo_id: &str) -> Result<Option<IndexRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT repo_id, language, last_indexed_at, fingerprint, file_count, function_count, class_count
             FROM index_records WHERE repo_id = ?1 ORDER BY last_indexed_at DESC LIMIT 1",
        )?;
        stmt.query_row(params![repo_id], row_to_record)
            .optional()
            .context("latest index record lookup failed")
    }

    // ===== Background job rows =====

    /// Insert a new pending job row.
    pub fn insert_job(&self, job: &IndexingJob) -> Result<()> {
        self.conn.execute(
            "INSERT INTO indexing_jobs
             (job_id, status, languages, started_at, completed_at, result_summary, worker_pid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.job_id,
                job.status.as_str(),
                job.languages.join(","),
                job.started_at,
                job.completed_at,
                job.result_summary,
                job.worker_pid,
            ],
        )?;
        Ok(())
    }

    /// Transition a job, enforcing monotonicity in the statement itself:
    /// terminal rows are never updated.
    ///
    /// # Returns
    /// true when the transition was applied, false when the row was already
    /// terminal (or absent).
    pub fn transition_job(
        &self,
        job_id: &str,
        status: JobStatus,
        started_at: Option<i64>,
        completed_at: Option<i64>,
        result_summary: Option<&str>,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE indexing_jobs SET
                status = ?2,
                started_at = COALESCE(?3, started_at),
                completed_at = COALESCE(?4, completed_at),
                result_summary = COALESCE(?5, result_summary)
             WHERE job_id = ?1 AND status IN ('pending', 'running')",
            params![job_id, status.as_str(), started_at, completed_at, result_summary],
        )?;
        Ok(changed > 0)
    }

    /// Fetch a job row by id.
    pub fn get_job(&self, job_id: &str) -> Result<Option<IndexingJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT job_id, status, languages, started_at, completed_at, result_summary, worker_pid
             FROM indexing_jobs WHERE job_id = ?1",
        )?;
        stmt.query_row(params![job_id], row_to_job)
            .optional()
            .context("job lookup failed")
    }

    /// List all jobs, most recently started first (pending rows last).
    pub fn list_jobs(&self) -> Result<Vec<IndexingJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT job_id, status, languages, started_at, completed_at, result_summary, worker_pid
             FROM indexing_jobs ORDER BY started_at IS NULL, started_at DESC",
        )?;
        let rows = stmt.query_map([], row_to_job)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("job listing failed")
    }

    /// Execute a parameterized read query, returning untyped rows.
    ///
    /// Escape hatch for external consumers (visualization, context
    /// retrieval). Callers remain responsible for scoping their queries by
    /// repo_id.
    pub fn query(
        &self,
        sql: &str,
        query_params: &[&dyn rusqlite::types::ToSql],
    ) -> Result<Vec<Vec<rusqlite::types::Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let rows = stmt.query_map(query_params, |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(row.get::<_, rusqlite::types::Value>(i)?);
            }
            Ok(values)
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("raw query failed")
    }
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexingJob> {
    let status: String = row.get(1)?;
    let languages: String = row.get(2)?;
    Ok(IndexingJob {
        job_id: row.get(0)?,
        status: JobStatus::parse(&status).unwrap_or(JobStatus::Failed),
        languages: languages
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        started_at: row.get(3)?,
        completed_at: row.get(4)?,
        result_summary: row.get(5)?,
        worker_pid: row.get::<_, i64>(6)? as u32,
    })
}

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<GraphNode> {
    let node_type: String = row.get(4)?;
    Ok(GraphNode {
        node_id: row.get(0)?,
        repo_id: row.get(1)?,
        language: row.get(2)?,
        entity_id: row.get(3)?,
        node_type: NodeType::parse(&node_type).unwrap_or(NodeType::File),
        name: row.get(5)?,
        file_path: row.get(6)?,
        line_start: row.get(7)?,
        line_end: row.get(8)?,
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexRecord> {
    Ok(IndexRecord {
        repo_id: row.get(0)?,
        language: row.get(1)?,
        last_indexed_at: row.get(2)?,
        fingerprint: row.get(3)?,
        file_count: row.get::<_, i64>(4)? as usize,
        function_count: row.get::<_, i64>(5)? as usize,
        class_count: row.get::<_, i64>(6)? as usize,
    })
}
