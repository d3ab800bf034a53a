//! Migration runner: computes the pending set and applies it in order
//! under the execution lock.

use std::time::Instant;

use crate::definitions::{ApplyReport, FailedMigration, MigrateConfig, StatusReport};
use crate::error::MigrateResult;
use crate::ledger::Ledger;
use crate::registry::MigrationRegistry;
use crate::store::Store;

/// Orchestrates migration runs against a store.
///
/// One invocation uses one store session for everything it does: the
/// lock, the unit bodies, and the ledger writes.
pub struct MigrationRunner {
    config: MigrateConfig,
}

impl MigrationRunner {
    pub fn new() -> Self {
        Self::with_config(MigrateConfig::default())
    }

    pub fn with_config(config: MigrateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MigrateConfig {
        &self.config
    }

    /// Apply every pending migration, in registry order.
    ///
    /// Pending is the registry minus the ledger. Units run strictly
    /// sequentially; each success is recorded in the ledger before the
    /// next unit starts. The first unit failure stops the run, since later
    /// units may assume earlier schema states exist, and is returned as
    /// data in the report so the versions that did apply stay visible.
    /// Lock acquisition failure and ledger faults surface as `Err`.
    pub async fn apply(
        &self,
        registry: &MigrationRegistry,
        ledger: &dyn Ledger,
        store: &dyn Store,
    ) -> MigrateResult<ApplyReport> {
        let started = Instant::now();

        ledger.ensure_schema(store).await?;

        let lock = store
            .acquire_named_lock(&self.config.lock_name, self.config.lock_timeout)
            .await?;

        let outcome = self.apply_locked(registry, ledger, store, started).await;

        // Release on every exit path, the failure one included.
        let released = store.release_lock(lock).await;
        let report = outcome?;
        released?;

        Ok(report)
    }

    async fn apply_locked(
        &self,
        registry: &MigrationRegistry,
        ledger: &dyn Ledger,
        store: &dyn Store,
        started: Instant,
    ) -> MigrateResult<ApplyReport> {
        let applied_versions = ledger.applied_versions(store).await?;
        let pending: Vec<_> = registry
            .list()
            .into_iter()
            .filter(|unit| !applied_versions.contains(unit.version()))
            .collect();

        let mut report = ApplyReport {
            applied: Vec::new(),
            skipped: applied_versions.len(),
            failed: None,
            execution_time_ms: 0,
        };

        if pending.is_empty() {
            report.execution_time_ms = started.elapsed().as_millis();
            tracing::info!(skipped = report.skipped, "no pending migrations");
            return Ok(report);
        }

        for unit in pending {
            let version = unit.version().to_string();
            tracing::info!(
                version = %version,
                description = unit.description(),
                "applying migration"
            );

            match unit.up(store).await {
                Ok(()) => {
                    ledger.record_applied(store, &version).await?;
                    report.applied.push(version);
                }
                Err(error) => {
                    tracing::error!(version = %version, %error, "migration failed, stopping run");
                    report.failed = Some(FailedMigration { version, error });
                    break;
                }
            }
        }

        report.execution_time_ms = started.elapsed().as_millis();
        tracing::info!(
            applied = report.applied.len(),
            skipped = report.skipped,
            failed = report.failed.is_some(),
            elapsed_ms = report.execution_time_ms as u64,
            "migration run finished"
        );
        Ok(report)
    }

    /// Applied-versus-pending split. Read-only, takes no lock, and always
    /// reflects exactly what is in the ledger.
    pub async fn status(
        &self,
        registry: &MigrationRegistry,
        ledger: &dyn Ledger,
        store: &dyn Store,
    ) -> MigrateResult<StatusReport> {
        ledger.ensure_schema(store).await?;

        let applied = ledger.entries(store).await?;
        let recorded: std::collections::BTreeSet<&str> =
            applied.iter().map(|e| e.version.as_str()).collect();
        let pending = registry
            .list()
            .into_iter()
            .map(|unit| unit.version().to_string())
            .filter(|version| !recorded.contains(version.as_str()))
            .collect();

        Ok(StatusReport { applied, pending })
    }
}

impl Default for MigrationRunner {
    fn default() -> Self {
        Self::new()
    }
}
