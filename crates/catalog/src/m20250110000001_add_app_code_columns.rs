//! Application isolation: an `app_code` discriminator on every tenant
//! table, plus the composite lookup index.

use async_trait::async_trait;
use tideway_migrate::{guard, MigrateResult, MigrationUnit, Store};

const TABLES: &[&str] = &[
    "tw_workflow",
    "tw_stage",
    "tw_onboarding",
    "tw_events",
    "tw_user_invitations",
];

pub struct AddAppCodeColumns;

#[async_trait]
impl MigrationUnit for AddAppCodeColumns {
    fn version(&self) -> &str {
        "20250110000001"
    }

    fn description(&self) -> &str {
        "add app_code column and index to all tenant tables"
    }

    async fn up(&self, store: &dyn Store) -> MigrateResult<()> {
        for table in TABLES {
            guard::add_column_if_absent(
                store,
                table,
                "app_code",
                "VARCHAR(32) NOT NULL DEFAULT 'DEFAULT'",
            )
            .await?;
            guard::create_index_if_absent(
                store,
                table,
                &format!("idx_{}_app_code_tenant_id", table),
                &["app_code", "tenant_id"],
            )
            .await?;
        }
        Ok(())
    }

    async fn down(&self, store: &dyn Store) -> MigrateResult<()> {
        for table in TABLES.iter().rev() {
            guard::drop_index_if_present(store, &format!("idx_{}_app_code_tenant_id", table))
                .await?;
            guard::drop_column_if_present(store, table, "app_code").await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideway_migrate::testing::MemoryStore;

    #[tokio::test]
    async fn up_touches_every_tenant_table() {
        let store = MemoryStore::new();
        AddAppCodeColumns.up(&store).await.unwrap();

        let executed = store.executed();
        for table in TABLES {
            assert!(executed
                .iter()
                .any(|sql| sql.contains(&format!("ALTER TABLE {} ADD COLUMN app_code", table))));
            assert!(executed
                .iter()
                .any(|sql| sql.contains(&format!("idx_{}_app_code_tenant_id", table))));
        }
    }
}
