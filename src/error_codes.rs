//! Sextant-specific error codes
//!
//! Error codes follow the pattern: SXT-{CATEGORY}-{3-digit number}
//!
//! Categories (1-4 uppercase letters):
//! - PRE: Prerequisite errors (missing host toolchains)
//! - INST: Installer errors (package manager, network, filesystem)
//! - RUN: Indexer runner errors (subprocess failure, timeout, manifests)
//! - IMP: Importer errors (artifact parsing, graph population)
//! - DB: Graph store errors
//! - JOB: Background job errors
//!
//! Each error code is stable and should not be reused.

/// Language toolchain missing (indexer binary or runtime not found)
pub const SXT_PRE_001_TOOLCHAIN_MISSING: &str = "SXT-PRE-001";

/// Package manager required for installation not found on PATH
pub const SXT_INST_001_MISSING_PACKAGE_MANAGER: &str = "SXT-INST-001";

/// Package manager invocation failed (network, registry, build)
pub const SXT_INST_002_INSTALL_FAILED: &str = "SXT-INST-002";

/// Shared bin directory cannot be created
pub const SXT_INST_003_BIN_DIR: &str = "SXT-INST-003";

/// Install succeeded but the tool is still unresolvable
pub const SXT_INST_004_NOT_FOUND_AFTER_INSTALL: &str = "SXT-INST-004";

/// Indexer subprocess exited non-zero
pub const SXT_RUN_001_EXIT_FAILURE: &str = "SXT-RUN-001";

/// Indexer subprocess exceeded its deadline and was terminated
pub const SXT_RUN_002_TIMEOUT: &str = "SXT-RUN-002";

/// Indexer subprocess could not be spawned
pub const SXT_RUN_003_SPAWN_FAILED: &str = "SXT-RUN-003";

/// Indexer exited successfully but produced no artifact
pub const SXT_RUN_004_MISSING_ARTIFACT: &str = "SXT-RUN-004";

/// Overall orchestration timeout expired
pub const SXT_RUN_005_ORCHESTRATION_TIMEOUT: &str = "SXT-RUN-005";

/// Index artifact unreadable or not valid SCIP protobuf
pub const SXT_IMP_001_ARTIFACT_UNREADABLE: &str = "SXT-IMP-001";

/// Duplicate entity id within one repo+language scope (first-seen kept)
pub const SXT_IMP_002_DUPLICATE_SYMBOL: &str = "SXT-IMP-002";

/// Edge dropped because an endpoint did not resolve in scope
pub const SXT_IMP_003_UNRESOLVED_EDGE: &str = "SXT-IMP-003";

/// Graph database write failed mid-import
pub const SXT_DB_001_WRITE_FAILED: &str = "SXT-DB-001";

/// Background job not found
pub const SXT_JOB_001_NOT_FOUND: &str = "SXT-JOB-001";

/// Background job interrupted by host process exit
pub const SXT_JOB_002_INTERRUPTED: &str = "SXT-JOB-002";

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify all error codes are unique
    #[test]
    fn test_error_codes_are_unique() {
        let codes = vec![
            SXT_PRE_001_TOOLCHAIN_MISSING,
            SXT_INST_001_MISSING_PACKAGE_MANAGER,
            SXT_INST_002_INSTALL_FAILED,
            SXT_INST_003_BIN_DIR,
            SXT_INST_004_NOT_FOUND_AFTER_INSTALL,
            SXT_RUN_001_EXIT_FAILURE,
            SXT_RUN_002_TIMEOUT,
            SXT_RUN_003_SPAWN_FAILED,
            SXT_RUN_004_MISSING_ARTIFACT,
            SXT_RUN_005_ORCHESTRATION_TIMEOUT,
            SXT_IMP_001_ARTIFACT_UNREADABLE,
            SXT_IMP_002_DUPLICATE_SYMBOL,
            SXT_IMP_003_UNRESOLVED_EDGE,
            SXT_DB_001_WRITE_FAILED,
            SXT_JOB_001_NOT_FOUND,
            SXT_JOB_002_INTERRUPTED,
        ];

        let mut seen = std::collections::HashSet::new();
        for code in codes {
            assert!(seen.insert(code), "duplicate error code: {}", code);
        }
    }
}
