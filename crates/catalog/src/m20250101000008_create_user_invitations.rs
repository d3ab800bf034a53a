//! Portal invitations: tokens mailed to customer contacts so they can
//! follow their own onboarding case.

use async_trait::async_trait;
use tideway_migrate::{guard, MigrateResult, MigrationUnit, Store};

pub struct CreateUserInvitations;

#[async_trait]
impl MigrationUnit for CreateUserInvitations {
    fn version(&self) -> &str {
        "20250101000008"
    }

    fn description(&self) -> &str {
        "create user invitations table"
    }

    async fn up(&self, store: &dyn Store) -> MigrateResult<()> {
        store
            .execute(
                "CREATE TABLE IF NOT EXISTS tw_user_invitations (
                    id BIGINT NOT NULL PRIMARY KEY,
                    tenant_id VARCHAR(32) NOT NULL DEFAULT 'default',
                    onboarding_id BIGINT NOT NULL,
                    email VARCHAR(200) NOT NULL,
                    invitation_token VARCHAR(100) NOT NULL,
                    status VARCHAR(20) DEFAULT 'Pending',
                    sent_date TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    token_expiry TIMESTAMPTZ NOT NULL,
                    last_access_date TIMESTAMPTZ,
                    user_id BIGINT,
                    send_count INTEGER DEFAULT 1,
                    invitation_url VARCHAR(500),
                    is_valid BOOLEAN DEFAULT TRUE,
                    create_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                    modify_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
                )",
                &[],
            )
            .await?;

        store
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_tw_user_invitations_onboarding_id \
                 ON tw_user_invitations(onboarding_id)",
                &[],
            )
            .await?;
        store
            .execute(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_tw_user_invitations_token \
                 ON tw_user_invitations(invitation_token) WHERE is_valid = TRUE",
                &[],
            )
            .await?;

        // The constraint has no IF NOT EXISTS form, so it gets the
        // check-before-mutate treatment.
        if !guard::constraint_exists(store, "tw_user_invitations", "fk_tw_user_invitations_onboarding")
            .await?
        {
            store
                .execute(
                    "ALTER TABLE tw_user_invitations \
                     ADD CONSTRAINT fk_tw_user_invitations_onboarding \
                     FOREIGN KEY (onboarding_id) REFERENCES tw_onboarding(id) ON DELETE CASCADE",
                    &[],
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, store: &dyn Store) -> MigrateResult<()> {
        store
            .execute("DROP TABLE IF EXISTS tw_user_invitations", &[])
            .await?;
        Ok(())
    }
}
