//! Rollback controller: reverts applied migrations back to a target
//! version.

use std::time::Instant;

use async_trait::async_trait;

use crate::definitions::{FailedMigration, RollbackReport};
use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Ledger;
use crate::registry::MigrationRegistry;
use crate::runner::MigrationRunner;
use crate::store::Store;

/// Extension trait adding rollback to [`MigrationRunner`].
#[async_trait]
pub trait RollbackMigrations {
    /// Revert every applied version greater than `target_version`, newest
    /// first, down to and excluding the target.
    ///
    /// Fails with `UnknownVersion` before any mutation when the target,
    /// or any applied version selected for revert, is not in the
    /// registry. Runs under the same execution lock as apply, deletes the
    /// ledger row after each successful Down, and stops at the first
    /// failure leaving the ledger consistent with what actually reverted.
    /// A documented no-op Down counts as success.
    async fn rollback_to(
        &self,
        target_version: &str,
        registry: &MigrationRegistry,
        ledger: &dyn Ledger,
        store: &dyn Store,
    ) -> MigrateResult<RollbackReport>;
}

#[async_trait]
impl RollbackMigrations for MigrationRunner {
    async fn rollback_to(
        &self,
        target_version: &str,
        registry: &MigrationRegistry,
        ledger: &dyn Ledger,
        store: &dyn Store,
    ) -> MigrateResult<RollbackReport> {
        let started = Instant::now();

        if !registry.contains(target_version) {
            return Err(MigrateError::UnknownVersion {
                version: target_version.to_string(),
            });
        }

        ledger.ensure_schema(store).await?;

        let lock = store
            .acquire_named_lock(&self.config().lock_name, self.config().lock_timeout)
            .await?;

        let outcome = rollback_locked(target_version, registry, ledger, store, started).await;

        let released = store.release_lock(lock).await;
        let report = outcome?;
        released?;

        Ok(report)
    }
}

async fn rollback_locked(
    target_version: &str,
    registry: &MigrationRegistry,
    ledger: &dyn Ledger,
    store: &dyn Store,
    started: Instant,
) -> MigrateResult<RollbackReport> {
    let applied = ledger.applied_versions(store).await?;

    // Newest first. Every unit is resolved before the first Down runs so a
    // version with no catalog entry fails the run while the store is still
    // untouched.
    let mut to_revert = Vec::new();
    for version in applied.iter().rev() {
        if version.as_str() <= target_version {
            break;
        }
        let unit = registry
            .get(version)
            .ok_or_else(|| MigrateError::UnknownVersion {
                version: version.clone(),
            })?;
        to_revert.push(unit);
    }

    let mut report = RollbackReport {
        reverted: Vec::new(),
        failed: None,
        execution_time_ms: 0,
    };

    for unit in to_revert {
        let version = unit.version().to_string();
        tracing::info!(
            version = %version,
            description = unit.description(),
            "reverting migration"
        );

        match unit.down(store).await {
            Ok(()) => {
                ledger.record_reverted(store, &version).await?;
                report.reverted.push(version);
            }
            Err(error) => {
                tracing::error!(version = %version, %error, "rollback failed, stopping run");
                report.failed = Some(FailedMigration { version, error });
                break;
            }
        }
    }

    report.execution_time_ms = started.elapsed().as_millis();
    tracing::info!(
        reverted = report.reverted.len(),
        failed = report.failed.is_some(),
        elapsed_ms = report.execution_time_ms as u64,
        "rollback run finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::testing::{MemoryLedger, MemoryStore, RecordingUnit};

    fn shared_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn reverts_down_to_and_excluding_the_target() {
        let log = shared_log();
        let registry = MigrationRegistry::with_units([
            RecordingUnit::with_log("20250101000000", log.clone()).into_arc(),
            RecordingUnit::with_log("20250101000001", log.clone()).into_arc(),
        ])
        .unwrap();
        let ledger = MemoryLedger::new();
        let store = MemoryStore::new();
        let runner = MigrationRunner::new();

        runner.apply(&registry, &ledger, &store).await.unwrap();
        let report = runner
            .rollback_to("20250101000000", &registry, &ledger, &store)
            .await
            .unwrap();

        assert!(report.succeeded());
        assert_eq!(report.reverted, vec!["20250101000001"]);
        let applied = ledger.applied_versions(&store).await.unwrap();
        assert!(applied.contains("20250101000000"));
        assert!(!applied.contains("20250101000001"));
        assert!(log.lock().unwrap().contains(&"down 20250101000001".to_string()));
        assert!(!log.lock().unwrap().contains(&"down 20250101000000".to_string()));
    }

    #[tokio::test]
    async fn reverts_newest_first() {
        let log = shared_log();
        let registry = MigrationRegistry::with_units([
            RecordingUnit::with_log("20250101000000", log.clone()).into_arc(),
            RecordingUnit::with_log("20250101000001", log.clone()).into_arc(),
            RecordingUnit::with_log("20250101000002", log.clone()).into_arc(),
        ])
        .unwrap();
        let ledger = MemoryLedger::new();
        let store = MemoryStore::new();
        let runner = MigrationRunner::new();

        runner.apply(&registry, &ledger, &store).await.unwrap();
        let report = runner
            .rollback_to("20250101000000", &registry, &ledger, &store)
            .await
            .unwrap();

        assert_eq!(report.reverted, vec!["20250101000002", "20250101000001"]);
        let log = log.lock().unwrap();
        let downs: Vec<_> = log.iter().filter(|e| e.starts_with("down")).collect();
        assert_eq!(downs, vec!["down 20250101000002", "down 20250101000001"]);
    }

    #[tokio::test]
    async fn unknown_target_fails_before_any_mutation() {
        let log = shared_log();
        let registry = MigrationRegistry::with_units([
            RecordingUnit::with_log("20250101000000", log.clone()).into_arc(),
        ])
        .unwrap();
        let ledger = MemoryLedger::new();
        let store = MemoryStore::new();
        let runner = MigrationRunner::new();

        runner.apply(&registry, &ledger, &store).await.unwrap();
        let err = runner
            .rollback_to("20241231000000", &registry, &ledger, &store)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::UnknownVersion { .. }));
        assert!(!log.lock().unwrap().iter().any(|e| e.starts_with("down")));
        assert_eq!(ledger.applied_versions(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn applied_version_missing_from_registry_fails_up_front() {
        let log = shared_log();
        let registry = MigrationRegistry::with_units([
            RecordingUnit::with_log("20250101000000", log.clone()).into_arc(),
            RecordingUnit::with_log("20250101000002", log.clone()).into_arc(),
        ])
        .unwrap();
        let ledger = MemoryLedger::new();
        let store = MemoryStore::new();
        let runner = MigrationRunner::new();

        runner.apply(&registry, &ledger, &store).await.unwrap();
        // An entry recorded by a catalog this build no longer carries.
        ledger.seed("20250101000001");

        let err = runner
            .rollback_to("20250101000000", &registry, &ledger, &store)
            .await
            .unwrap_err();

        assert!(
            matches!(err, MigrateError::UnknownVersion { version } if version == "20250101000001")
        );
        // Nothing reverted, the newest unit included.
        assert!(!log.lock().unwrap().iter().any(|e| e.starts_with("down")));
        assert_eq!(ledger.applied_versions(&store).await.unwrap().len(), 3);
        assert!(!store.is_locked(&runner.config().lock_name));
    }

    #[tokio::test]
    async fn stops_at_first_down_failure() {
        let log = shared_log();
        let registry = MigrationRegistry::with_units([
            RecordingUnit::with_log("20250101000000", log.clone()).into_arc(),
            RecordingUnit::with_log("20250101000001", log.clone())
                .failing_down()
                .into_arc(),
            RecordingUnit::with_log("20250101000002", log.clone()).into_arc(),
        ])
        .unwrap();
        let ledger = MemoryLedger::new();
        let store = MemoryStore::new();
        let runner = MigrationRunner::new();

        runner.apply(&registry, &ledger, &store).await.unwrap();
        let report = runner
            .rollback_to("20250101000000", &registry, &ledger, &store)
            .await
            .unwrap();

        // The newest unit reverted; the failing one stopped the run and
        // stays recorded, as does everything below it.
        assert_eq!(report.reverted, vec!["20250101000002"]);
        let failed = report.failed.as_ref().expect("run stopped at a failure");
        assert_eq!(failed.version, "20250101000001");

        let applied = ledger.applied_versions(&store).await.unwrap();
        assert!(applied.contains("20250101000000"));
        assert!(applied.contains("20250101000001"));
        assert!(!applied.contains("20250101000002"));
        assert!(!store.is_locked(&runner.config().lock_name));
    }

    #[tokio::test]
    async fn rollback_then_apply_round_trips_the_ledger() {
        let registry = MigrationRegistry::with_units([
            RecordingUnit::arc("20250101000000"),
            RecordingUnit::arc("20250101000001"),
            RecordingUnit::arc("20250101000002"),
        ])
        .unwrap();
        let ledger = MemoryLedger::new();
        let store = MemoryStore::new();
        let runner = MigrationRunner::new();

        runner.apply(&registry, &ledger, &store).await.unwrap();
        runner
            .rollback_to("20250101000000", &registry, &ledger, &store)
            .await
            .unwrap();

        let applied = ledger.applied_versions(&store).await.unwrap();
        assert_eq!(
            applied.iter().cloned().collect::<Vec<_>>(),
            vec!["20250101000000"]
        );

        let report = runner.apply(&registry, &ledger, &store).await.unwrap();
        assert_eq!(report.applied, vec!["20250101000001", "20250101000002"]);
        assert_eq!(ledger.applied_versions(&store).await.unwrap().len(), 3);
    }
}
