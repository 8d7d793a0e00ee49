//! Staleness detection
//!
//! Decides whether a codebase needs (re)indexing by comparing a fingerprint
//! of the current source tree against the stored IndexRecord. The fingerprint
//! covers the HEAD commit (when the tree is a git repository), the newest
//! source-file mtime, and the source file count, so both committed and
//! uncommitted edits flip staleness.

use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::graph::GraphStore;
use crate::language::Language;

/// Staleness verdict for a codebase.
#[derive(Debug, Clone, Serialize)]
pub struct StalenessStatus {
    pub needs_indexing: bool,
    /// "no prior index", "source changed since <timestamp>", or "fresh".
    pub reason: String,
    /// Approximate source file count, for UX time estimation only.
    pub estimated_files: usize,
}

/// Source-tree fingerprint inputs plus the resulting digest.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub digest: String,
    /// Newest source mtime, nanoseconds since the epoch. Sub-second
    /// precision so edits landing within the same second still differ.
    pub newest_mtime: u128,
    pub file_count: usize,
}

/// Stable repository identifier.
///
/// Derived from the origin remote URL plus current branch when the codebase
/// is a git repository (so clones of the same repo at the same branch share
/// an id), otherwise from the canonical path. First 16 hex chars of SHA-256.
pub fn repo_id_for(codebase: &Path) -> String {
    let identity = match git2::Repository::discover(codebase) {
        Ok(repo) => {
            let remote = repo
                .find_remote("origin")
                .ok()
                .and_then(|r| r.url().map(str::to_string));
            let branch = repo
                .head()
                .ok()
                .and_then(|h| h.shorthand().map(str::to_string));
            match (remote, branch) {
                (Some(url), Some(branch)) => format!("{}#{}", url, branch),
                (Some(url), None) => url,
                _ => canonical_path_string(codebase),
            }
        }
        Err(_) => canonical_path_string(codebase),
    };

    let digest = Sha256::digest(identity.as_bytes());
    hex::encode(&digest[..8])
}

fn canonical_path_string(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

/// Compute the staleness fingerprint for a codebase.
///
/// Walks source files (gitignore-aware, extension-filtered to supported
/// languages) collecting the newest mtime and file count, and mixes in the
/// HEAD commit id when available.
pub fn compute_fingerprint(codebase: &Path) -> Result<Fingerprint> {
    let head_commit = git2::Repository::discover(codebase)
        .ok()
        .and_then(|repo| {
            repo.head()
                .ok()
                .and_then(|h| h.target())
                .map(|oid| oid.to_string())
        })
        .unwrap_or_default();

    let mut newest_mtime: u128 = 0;
    let mut file_count: usize = 0;

    let walker = ignore::WalkBuilder::new(codebase)
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .build();

    for entry in walker.flatten() {
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if Language::from_path(entry.path()).is_none() {
            continue;
        }
        file_count += 1;
        if let Ok(meta) = entry.metadata() {
            if let Ok(modified) = meta.modified() {
                if let Ok(elapsed) = modified.duration_since(UNIX_EPOCH) {
                    newest_mtime = newest_mtime.max(elapsed.as_nanos());
                }
            }
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(head_commit.as_bytes());
    hasher.update(b":");
    hasher.update(newest_mtime.to_le_bytes());
    hasher.update(b":");
    hasher.update(file_count.to_le_bytes());
    let digest = hex::encode(&hasher.finalize()[..16]);

    Ok(Fingerprint {
        digest,
        newest_mtime,
        file_count,
    })
}

/// Check whether a codebase needs (re)indexing.
///
/// Safe to call repeatedly; read-only against both the filesystem and the
/// store.
///
/// # Returns
/// - needs_indexing=true, reason "no prior index" when no IndexRecord exists
///   for this repository
/// - needs_indexing=true, reason "source changed since <timestamp>" when the
///   fingerprint differs from the stored one
/// - needs_indexing=false, reason "fresh" otherwise
pub fn check_index_status(store: &GraphStore, codebase: &Path) -> Result<StalenessStatus> {
    let repo_id = repo_id_for(codebase);
    let fingerprint = compute_fingerprint(codebase)?;

    let record = store.latest_index_record(&repo_id)?;
    let status = match record {
        None => StalenessStatus {
            needs_indexing: true,
            reason: "no prior index".to_string(),
            estimated_files: fingerprint.file_count,
        },
        Some(record) if record.fingerprint != fingerprint.digest => {
            let indexed_at = chrono::DateTime::from_timestamp(record.last_indexed_at, 0)
                .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
                .unwrap_or_else(|| record.last_indexed_at.to_string());
            StalenessStatus {
                needs_indexing: true,
                reason: format!("source changed since {}", indexed_at),
                estimated_files: fingerprint.file_count,
            }
        }
        Some(_) => StalenessStatus {
            needs_indexing: false,
            reason: "fresh".to_string(),
            estimated_files: fingerprint.file_count,
        },
    };

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();

        let fp1 = compute_fingerprint(dir.path()).unwrap();
        let fp2 = compute_fingerprint(dir.path()).unwrap();
        assert_eq!(fp1.digest, fp2.digest);
        assert_eq!(fp1.file_count, 1);
    }

    #[test]
    fn test_fingerprint_ignores_non_source_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not source\n").unwrap();

        let fp = compute_fingerprint(dir.path()).unwrap();
        assert_eq!(fp.file_count, 1, "only source extensions are counted");
    }

    #[test]
    fn test_in_place_edit_changes_fingerprint() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.py");
        std::fs::write(&file, "x = 1\n").unwrap();
        let before = compute_fingerprint(dir.path()).unwrap();

        // Same file count, rewrite lands within the same wall-clock second.
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(&file, "x = 2\n").unwrap();
        let after = compute_fingerprint(dir.path()).unwrap();

        assert_ne!(
            before.digest, after.digest,
            "sub-second edits must flip the fingerprint"
        );
        assert!(after.newest_mtime > before.newest_mtime);
    }

    #[test]
    fn test_repo_id_stable_for_same_path() {
        let dir = TempDir::new().unwrap();
        assert_eq!(repo_id_for(dir.path()), repo_id_for(dir.path()));
    }
}
