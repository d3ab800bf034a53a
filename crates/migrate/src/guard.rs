//! Idempotency guard: existence-check-then-mutate helpers for unit bodies.
//!
//! A unit's Up can succeed in the store while the ledger write behind it is
//! lost, so the next run re-selects the unit as pending and runs Up again.
//! Units that mutate through these helpers make that re-run a no-op. The
//! policy is check-before-mutate, never mutate-then-catch: some store
//! engines abort the enclosing transaction on a DDL error, poisoning every
//! statement after it.

use crate::error::MigrateResult;
use crate::store::Store;

/// Whether a table exists in the current schema.
pub async fn table_exists(store: &dyn Store, table: &str) -> MigrateResult<bool> {
    let rows = store
        .query_text(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1",
            &[table],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Whether a column exists on a table.
pub async fn column_exists(store: &dyn Store, table: &str, column: &str) -> MigrateResult<bool> {
    let columns = store.columns_of(table).await?;
    Ok(columns.iter().any(|c| c.name == column))
}

/// Whether an index exists in the current schema. Index names are
/// schema-unique, so no table qualifier is needed.
pub async fn index_exists(store: &dyn Store, index: &str) -> MigrateResult<bool> {
    let rows = store
        .query_text(
            "SELECT indexname FROM pg_indexes \
             WHERE schemaname = current_schema() AND indexname = $1",
            &[index],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Whether a named constraint exists on a table.
pub async fn constraint_exists(
    store: &dyn Store,
    table: &str,
    constraint: &str,
) -> MigrateResult<bool> {
    let rows = store
        .query_text(
            "SELECT constraint_name FROM information_schema.table_constraints \
             WHERE table_schema = current_schema() \
               AND table_name = $1 AND constraint_name = $2",
            &[table, constraint],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Add a column unless it is already there. Returns whether it mutated.
pub async fn add_column_if_absent(
    store: &dyn Store,
    table: &str,
    column: &str,
    definition: &str,
) -> MigrateResult<bool> {
    if column_exists(store, table, column).await? {
        tracing::debug!(table, column, "column already present, skipping");
        return Ok(false);
    }
    store
        .execute(
            &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition),
            &[],
        )
        .await?;
    Ok(true)
}

/// Drop a column if it is there. Returns whether it mutated.
pub async fn drop_column_if_present(
    store: &dyn Store,
    table: &str,
    column: &str,
) -> MigrateResult<bool> {
    if !column_exists(store, table, column).await? {
        tracing::debug!(table, column, "column already absent, skipping");
        return Ok(false);
    }
    store
        .execute(&format!("ALTER TABLE {} DROP COLUMN {}", table, column), &[])
        .await?;
    Ok(true)
}

/// Create an index unless one with that name exists. Returns whether it
/// mutated.
pub async fn create_index_if_absent(
    store: &dyn Store,
    table: &str,
    index: &str,
    columns: &[&str],
) -> MigrateResult<bool> {
    if index_exists(store, index).await? {
        tracing::debug!(table, index, "index already present, skipping");
        return Ok(false);
    }
    store
        .execute(
            &format!("CREATE INDEX {} ON {} ({})", index, table, columns.join(", ")),
            &[],
        )
        .await?;
    Ok(true)
}

/// Drop an index if one with that name exists. Returns whether it mutated.
pub async fn drop_index_if_present(store: &dyn Store, index: &str) -> MigrateResult<bool> {
    if !index_exists(store, index).await? {
        tracing::debug!(index, "index already absent, skipping");
        return Ok(false);
    }
    store.execute(&format!("DROP INDEX {}", index), &[]).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ColumnInfo;
    use crate::testing::MemoryStore;

    fn column(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: "character varying".to_string(),
            is_nullable: true,
        }
    }

    #[tokio::test]
    async fn add_column_mutates_only_when_absent() {
        let store = MemoryStore::new();

        let mutated = add_column_if_absent(&store, "tw_stage", "app_code", "VARCHAR(32)")
            .await
            .unwrap();
        assert!(mutated);
        assert_eq!(
            store.executed(),
            vec!["ALTER TABLE tw_stage ADD COLUMN app_code VARCHAR(32)"]
        );

        store.set_columns("tw_stage", vec![column("app_code")]);
        let mutated = add_column_if_absent(&store, "tw_stage", "app_code", "VARCHAR(32)")
            .await
            .unwrap();
        assert!(!mutated);
        assert_eq!(store.executed().len(), 1);
    }

    #[tokio::test]
    async fn double_up_produces_the_same_schema_state() {
        // Simulates the partial-failure window: the first Up added the
        // column but the ledger write was lost, and the unit runs again.
        let store = MemoryStore::new();

        assert!(add_column_if_absent(&store, "tw_onboarding", "owner_id", "BIGINT")
            .await
            .unwrap());
        store.set_columns("tw_onboarding", vec![column("owner_id")]);

        assert!(!add_column_if_absent(&store, "tw_onboarding", "owner_id", "BIGINT")
            .await
            .unwrap());
        assert_eq!(store.executed().len(), 1);
    }

    #[tokio::test]
    async fn drop_column_skips_when_absent() {
        let store = MemoryStore::new();
        let mutated = drop_column_if_present(&store, "tw_stage", "legacy_json")
            .await
            .unwrap();
        assert!(!mutated);
        assert!(store.executed().is_empty());

        store.set_columns("tw_stage", vec![column("legacy_json")]);
        let mutated = drop_column_if_present(&store, "tw_stage", "legacy_json")
            .await
            .unwrap();
        assert!(mutated);
        assert_eq!(
            store.executed(),
            vec!["ALTER TABLE tw_stage DROP COLUMN legacy_json"]
        );
    }

    #[tokio::test]
    async fn create_index_checks_by_name() {
        let store = MemoryStore::new();

        // No scripted rows: the index does not exist yet.
        let mutated = create_index_if_absent(
            &store,
            "tw_user_invitations",
            "idx_tw_user_invitations_email",
            &["email"],
        )
        .await
        .unwrap();
        assert!(mutated);

        store.push_query_rows(vec![vec!["idx_tw_user_invitations_email".to_string()]]);
        let mutated = create_index_if_absent(
            &store,
            "tw_user_invitations",
            "idx_tw_user_invitations_email",
            &["email"],
        )
        .await
        .unwrap();
        assert!(!mutated);
        assert_eq!(store.executed().len(), 1);
    }

    #[tokio::test]
    async fn table_and_constraint_probes_read_metadata() {
        let store = MemoryStore::new();

        store.push_query_rows(vec![vec!["tw_workflow".to_string()]]);
        assert!(table_exists(&store, "tw_workflow").await.unwrap());
        assert!(!table_exists(&store, "tw_missing").await.unwrap());

        store.push_query_rows(vec![vec!["fk_tw_stage_workflow".to_string()]]);
        assert!(constraint_exists(&store, "tw_stage", "fk_tw_stage_workflow")
            .await
            .unwrap());
    }
}
