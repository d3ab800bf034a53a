//! Core types for the migration engine: configuration, ledger records,
//! and run reports.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Table the ledger records applied versions in.
    pub ledger_table: String,
    /// Name of the store-level lock that serializes concurrent runs.
    pub lock_name: String,
    /// Bounded wait for the execution lock before giving up.
    pub lock_timeout: Duration,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            ledger_table: "tw_schema_migrations".to_string(),
            lock_name: "tideway:schema-migrations".to_string(),
            lock_timeout: Duration::from_secs(30),
        }
    }
}

/// One ledger row: a version that has been applied and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub version: String,
    pub applied_at: DateTime<Utc>,
}

/// The unit a run stopped at, with its error.
#[derive(Debug)]
pub struct FailedMigration {
    pub version: String,
    pub error: MigrateError,
}

impl FailedMigration {
    /// Fold the failure into a single error value, for callers that want
    /// `Result` semantics instead of inspecting the report.
    pub fn into_error(self) -> MigrateError {
        MigrateError::migration_failed(self.version, self.error)
    }
}

/// Result of an apply run.
///
/// A unit failure does not discard the report: `applied` still lists the
/// versions committed to the ledger before the run stopped.
#[derive(Debug)]
pub struct ApplyReport {
    /// Versions newly applied by this run, in execution order.
    pub applied: Vec<String>,
    /// Versions that were already in the ledger and were skipped.
    pub skipped: usize,
    /// The unit the run stopped at, if any.
    pub failed: Option<FailedMigration>,
    /// Total execution time in milliseconds.
    pub execution_time_ms: u128,
}

impl ApplyReport {
    /// Whether every pending unit was applied.
    pub fn succeeded(&self) -> bool {
        self.failed.is_none()
    }
}

/// Result of a rollback run.
#[derive(Debug)]
pub struct RollbackReport {
    /// Versions reverted by this run, newest first.
    pub reverted: Vec<String>,
    /// The unit the run stopped at, if any.
    pub failed: Option<FailedMigration>,
    /// Total execution time in milliseconds.
    pub execution_time_ms: u128,
}

impl RollbackReport {
    /// Whether every selected unit was reverted.
    pub fn succeeded(&self) -> bool {
        self.failed.is_none()
    }
}

/// Applied-versus-pending split reported by `status`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Ledger entries, ascending by version.
    pub applied: Vec<LedgerEntry>,
    /// Registry versions not yet in the ledger, ascending.
    pub pending: Vec<String>,
}
