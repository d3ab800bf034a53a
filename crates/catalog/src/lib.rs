//! Schema migrations for the Tideway onboarding platform.
//!
//! One module per versioned unit, append-only: published versions are
//! never edited or reordered, new work gets a new version. Every Up is
//! written to be safe under re-execution (`IF NOT EXISTS` forms for
//! whole objects, the guard helpers for columns and indexes) so a run
//! interrupted between a DDL commit and its ledger write recovers on the
//! next invocation.

use std::sync::Arc;

use tideway_migrate::{MigrateResult, MigrationRegistry, MigrationUnit};

mod m20250101000000_create_workflow_tables;
mod m20250101000001_create_onboarding_table;
mod m20250101000006_create_events_table;
mod m20250101000008_create_user_invitations;
mod m20250110000001_add_app_code_columns;
mod m20250115000001_add_portal_fields_to_stage;
mod m20250118000001_convert_stage_progress_to_jsonb;
mod m20250120000001_index_invitations_by_email;

pub use m20250101000000_create_workflow_tables::CreateWorkflowTables;
pub use m20250101000001_create_onboarding_table::CreateOnboardingTable;
pub use m20250101000008_create_user_invitations::CreateUserInvitations;
pub use m20250110000001_add_app_code_columns::AddAppCodeColumns;
pub use m20250115000001_add_portal_fields_to_stage::AddPortalFieldsToStage;
pub use m20250118000001_convert_stage_progress_to_jsonb::ConvertStageProgressToJsonb;
pub use m20250120000001_index_invitations_by_email::IndexInvitationsByEmail;

/// The full Tideway migration catalog, ordered by version.
pub fn registry() -> MigrateResult<MigrationRegistry> {
    MigrationRegistry::with_units([
        Arc::new(CreateWorkflowTables) as Arc<dyn MigrationUnit>,
        Arc::new(CreateOnboardingTable),
        Arc::new(m20250101000006_create_events_table::unit()),
        Arc::new(CreateUserInvitations),
        Arc::new(AddAppCodeColumns),
        Arc::new(AddPortalFieldsToStage),
        Arc::new(ConvertStageProgressToJsonb),
        Arc::new(IndexInvitationsByEmail),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideway_migrate::testing::{MemoryLedger, MemoryStore};
    use tideway_migrate::{MigrationRunner, RollbackMigrations};

    #[test]
    fn catalog_builds_with_unique_ascending_versions() {
        let registry = registry().unwrap();
        assert_eq!(registry.len(), 8);

        let versions: Vec<_> = registry
            .list()
            .iter()
            .map(|u| u.version().to_string())
            .collect();
        let mut sorted = versions.clone();
        sorted.sort();
        assert_eq!(versions, sorted);
        assert_eq!(versions[0], "20250101000000");
    }

    #[test]
    fn every_unit_carries_a_description() {
        for unit in registry().unwrap().list() {
            assert!(
                !unit.description().is_empty(),
                "unit {} has no description",
                unit.version()
            );
        }
    }

    #[tokio::test]
    async fn full_catalog_applies_cleanly() {
        let registry = registry().unwrap();
        let ledger = MemoryLedger::new();
        let store = MemoryStore::new();

        let report = MigrationRunner::new()
            .apply(&registry, &ledger, &store)
            .await
            .unwrap();

        assert!(report.succeeded());
        assert_eq!(report.applied.len(), 8);
        assert!(store
            .executed()
            .iter()
            .any(|sql| sql.contains("CREATE TABLE IF NOT EXISTS tw_workflow")));
    }

    #[tokio::test]
    async fn full_catalog_rolls_back_to_the_initial_version() {
        let registry = registry().unwrap();
        let ledger = MemoryLedger::new();
        let store = MemoryStore::new();
        let runner = MigrationRunner::new();

        runner.apply(&registry, &ledger, &store).await.unwrap();
        let report = runner
            .rollback_to("20250101000000", &registry, &ledger, &store)
            .await
            .unwrap();

        assert!(report.succeeded());
        assert_eq!(report.reverted.len(), 7);

        let status = runner.status(&registry, &ledger, &store).await.unwrap();
        assert_eq!(status.applied.len(), 1);
        assert_eq!(status.applied[0].version, "20250101000000");
    }
}
