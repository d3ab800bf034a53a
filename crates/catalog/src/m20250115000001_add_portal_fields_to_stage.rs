//! Customer-portal controls on stages: visibility, attachment handling,
//! and the portal permission level.

use async_trait::async_trait;
use tideway_migrate::{guard, MigrateResult, MigrationUnit, Store};

pub struct AddPortalFieldsToStage;

#[async_trait]
impl MigrationUnit for AddPortalFieldsToStage {
    fn version(&self) -> &str {
        "20250115000001"
    }

    fn description(&self) -> &str {
        "add portal visibility and permission fields to stage"
    }

    async fn up(&self, store: &dyn Store) -> MigrateResult<()> {
        guard::add_column_if_absent(store, "tw_stage", "visible_in_portal", "BOOLEAN DEFAULT TRUE")
            .await?;
        guard::add_column_if_absent(
            store,
            "tw_stage",
            "attachment_management_needed",
            "BOOLEAN DEFAULT FALSE",
        )
        .await?;
        guard::add_column_if_absent(
            store,
            "tw_stage",
            "portal_permission",
            "VARCHAR(20) DEFAULT 'viewable'",
        )
        .await?;
        Ok(())
    }

    async fn down(&self, store: &dyn Store) -> MigrateResult<()> {
        guard::drop_column_if_present(store, "tw_stage", "portal_permission").await?;
        guard::drop_column_if_present(store, "tw_stage", "attachment_management_needed").await?;
        guard::drop_column_if_present(store, "tw_stage", "visible_in_portal").await?;
        Ok(())
    }
}
