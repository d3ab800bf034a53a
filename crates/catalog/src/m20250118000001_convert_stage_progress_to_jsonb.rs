//! Convert `tw_onboarding.stages_progress` from TEXT to JSONB so progress
//! can be queried and indexed in place.

use async_trait::async_trait;
use tideway_migrate::{MigrateResult, MigrationUnit, Store};

pub struct ConvertStageProgressToJsonb;

#[async_trait]
impl MigrationUnit for ConvertStageProgressToJsonb {
    fn version(&self) -> &str {
        "20250118000001"
    }

    fn description(&self) -> &str {
        "convert onboarding stages_progress to jsonb"
    }

    async fn up(&self, store: &dyn Store) -> MigrateResult<()> {
        let columns = store.columns_of("tw_onboarding").await?;
        let progress = match columns.iter().find(|c| c.name == "stages_progress") {
            Some(column) => column,
            None => return Ok(()),
        };
        if progress.data_type.eq_ignore_ascii_case("jsonb") {
            return Ok(());
        }

        store
            .execute(
                "ALTER TABLE tw_onboarding \
                 ALTER COLUMN stages_progress TYPE JSONB \
                 USING CASE \
                     WHEN stages_progress IS NULL OR stages_progress = '' THEN '[]'::jsonb \
                     ELSE stages_progress::jsonb \
                 END",
                &[],
            )
            .await?;
        Ok(())
    }

    /// No-op: the original text rendering is not recoverable once the
    /// values have been normalized as JSONB.
    async fn down(&self, _store: &dyn Store) -> MigrateResult<()> {
        Ok(())
    }
}
