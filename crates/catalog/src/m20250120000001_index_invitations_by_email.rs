//! Lookup index for the portal login path: invitations are resolved by
//! contact email and status.

use async_trait::async_trait;
use tideway_migrate::{guard, MigrateResult, MigrationUnit, Store};

const INDEX: &str = "idx_tw_user_invitations_email_status";

pub struct IndexInvitationsByEmail;

#[async_trait]
impl MigrationUnit for IndexInvitationsByEmail {
    fn version(&self) -> &str {
        "20250120000001"
    }

    fn description(&self) -> &str {
        "index invitations by email and status"
    }

    async fn up(&self, store: &dyn Store) -> MigrateResult<()> {
        guard::create_index_if_absent(store, "tw_user_invitations", INDEX, &["email", "status"])
            .await?;
        Ok(())
    }

    async fn down(&self, store: &dyn Store) -> MigrateResult<()> {
        guard::drop_index_if_present(store, INDEX).await?;
        Ok(())
    }
}
