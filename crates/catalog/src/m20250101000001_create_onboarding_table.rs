//! Onboarding cases: one row per customer moving through a workflow.
//!
//! `stages_progress` starts life as TEXT holding serialized progress;
//! a later unit converts it to JSONB.

use async_trait::async_trait;
use tideway_migrate::{MigrateResult, MigrationUnit, Store};

pub struct CreateOnboardingTable;

#[async_trait]
impl MigrationUnit for CreateOnboardingTable {
    fn version(&self) -> &str {
        "20250101000001"
    }

    fn description(&self) -> &str {
        "create onboarding case table"
    }

    async fn up(&self, store: &dyn Store) -> MigrateResult<()> {
        store
            .execute(
                "CREATE TABLE IF NOT EXISTS tw_onboarding (
                    id BIGINT NOT NULL PRIMARY KEY,
                    tenant_id VARCHAR(32) NOT NULL DEFAULT 'default',
                    workflow_id BIGINT NOT NULL,
                    current_stage_id BIGINT,
                    lead_id VARCHAR(100),
                    lead_name VARCHAR(200),
                    contact_email VARCHAR(200),
                    life_cycle_stage VARCHAR(50),
                    status VARCHAR(20) DEFAULT 'Started',
                    completion_rate INTEGER DEFAULT 0,
                    start_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                    estimated_completion_date TIMESTAMPTZ,
                    actual_completion_date TIMESTAMPTZ,
                    stages_progress TEXT,
                    notes VARCHAR(1000),
                    is_valid BOOLEAN DEFAULT TRUE,
                    create_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                    modify_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                    create_by VARCHAR(50) DEFAULT 'SYSTEM',
                    modify_by VARCHAR(50) DEFAULT 'SYSTEM',
                    CONSTRAINT fk_tw_onboarding_workflow
                        FOREIGN KEY (workflow_id) REFERENCES tw_workflow(id)
                )",
                &[],
            )
            .await?;

        store
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_tw_onboarding_workflow_id ON tw_onboarding(workflow_id)",
                &[],
            )
            .await?;
        store
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_tw_onboarding_status ON tw_onboarding(status)",
                &[],
            )
            .await?;
        store
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_tw_onboarding_tenant_id ON tw_onboarding(tenant_id)",
                &[],
            )
            .await?;
        Ok(())
    }

    async fn down(&self, store: &dyn Store) -> MigrateResult<()> {
        store
            .execute("DROP TABLE IF EXISTS tw_onboarding", &[])
            .await?;
        Ok(())
    }
}
