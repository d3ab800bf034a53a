//! Workflow and stage tables: the onboarding pipeline definition.

use async_trait::async_trait;
use tideway_migrate::{MigrateResult, MigrationUnit, Store};

pub struct CreateWorkflowTables;

#[async_trait]
impl MigrationUnit for CreateWorkflowTables {
    fn version(&self) -> &str {
        "20250101000000"
    }

    fn description(&self) -> &str {
        "create workflow and stage tables"
    }

    async fn up(&self, store: &dyn Store) -> MigrateResult<()> {
        store
            .execute(
                "CREATE TABLE IF NOT EXISTS tw_workflow (
                    id BIGINT NOT NULL PRIMARY KEY,
                    tenant_id VARCHAR(32) NOT NULL DEFAULT 'default',
                    name VARCHAR(100) NOT NULL,
                    description VARCHAR(500),
                    is_default BOOLEAN DEFAULT FALSE,
                    status VARCHAR(20) DEFAULT 'active',
                    start_date TIMESTAMPTZ,
                    end_date TIMESTAMPTZ,
                    version INTEGER DEFAULT 1,
                    is_valid BOOLEAN DEFAULT TRUE,
                    create_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                    modify_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                    create_by VARCHAR(50) DEFAULT 'SYSTEM',
                    modify_by VARCHAR(50) DEFAULT 'SYSTEM'
                )",
                &[],
            )
            .await?;

        store
            .execute(
                "CREATE TABLE IF NOT EXISTS tw_stage (
                    id BIGINT NOT NULL PRIMARY KEY,
                    tenant_id VARCHAR(32) NOT NULL DEFAULT 'default',
                    workflow_id BIGINT NOT NULL,
                    name VARCHAR(100) NOT NULL,
                    description VARCHAR(500),
                    order_index INTEGER NOT NULL DEFAULT 0,
                    estimated_duration_days INTEGER,
                    is_valid BOOLEAN DEFAULT TRUE,
                    create_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                    modify_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                    create_by VARCHAR(50) DEFAULT 'SYSTEM',
                    modify_by VARCHAR(50) DEFAULT 'SYSTEM',
                    CONSTRAINT fk_tw_stage_workflow
                        FOREIGN KEY (workflow_id) REFERENCES tw_workflow(id) ON DELETE CASCADE
                )",
                &[],
            )
            .await?;

        store
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_tw_workflow_tenant_id ON tw_workflow(tenant_id)",
                &[],
            )
            .await?;
        store
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_tw_stage_workflow_id ON tw_stage(workflow_id)",
                &[],
            )
            .await?;
        store
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_tw_stage_order ON tw_stage(workflow_id, order_index)",
                &[],
            )
            .await?;
        Ok(())
    }

    async fn down(&self, store: &dyn Store) -> MigrateResult<()> {
        store.execute("DROP TABLE IF EXISTS tw_stage", &[]).await?;
        store.execute("DROP TABLE IF EXISTS tw_workflow", &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideway_migrate::testing::MemoryStore;

    #[tokio::test]
    async fn up_creates_both_tables_before_indexes() {
        let store = MemoryStore::new();
        CreateWorkflowTables.up(&store).await.unwrap();

        let executed = store.executed();
        assert!(executed[0].contains("CREATE TABLE IF NOT EXISTS tw_workflow"));
        assert!(executed[1].contains("CREATE TABLE IF NOT EXISTS tw_stage"));
        assert!(executed[1].contains("REFERENCES tw_workflow(id)"));
        assert!(executed.iter().skip(2).all(|sql| sql.contains("CREATE INDEX")));
    }

    #[tokio::test]
    async fn down_drops_the_dependent_table_first() {
        let store = MemoryStore::new();
        CreateWorkflowTables.down(&store).await.unwrap();

        let executed = store.executed();
        assert!(executed[0].contains("tw_stage"));
        assert!(executed[1].contains("tw_workflow"));
    }
}
