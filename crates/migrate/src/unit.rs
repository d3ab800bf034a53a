//! Migration units: the authoring interface the engine orchestrates.

use async_trait::async_trait;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::MigrateResult;
use crate::store::Store;

/// One versioned, reversible schema-mutation step.
///
/// The engine treats `up` and `down` as opaque: it never parses or
/// validates their content. Units are responsible for their own
/// re-runnability: mutate through the [`crate::guard`] helpers (or
/// `IF NOT EXISTS` forms) so a second Up after a lost ledger write is a
/// no-op rather than an error. A `down` that cannot cleanly reverse its
/// `up` (an index drop after data loss, say) returns `Ok(())` and
/// documents itself as a no-op; the engine counts that as success.
#[async_trait]
pub trait MigrationUnit: Send + Sync {
    /// Lexically sortable identifier, unique within the registry and
    /// immutable once published.
    fn version(&self) -> &str;

    /// Human-readable label, informational only.
    fn description(&self) -> &str {
        ""
    }

    /// Apply the migration.
    async fn up(&self, store: &dyn Store) -> MigrateResult<()>;

    /// Reverse the migration.
    async fn down(&self, store: &dyn Store) -> MigrateResult<()>;
}

/// A migration unit authored as raw SQL scripts.
///
/// Each script may hold several statements; they are split and executed in
/// order. An empty down script is the documented-no-op rollback case.
#[derive(Debug, Clone)]
pub struct SqlUnit {
    version: String,
    description: String,
    up_sql: String,
    down_sql: String,
}

impl SqlUnit {
    pub fn new(
        version: impl Into<String>,
        description: impl Into<String>,
        up_sql: impl Into<String>,
        down_sql: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            description: description.into(),
            up_sql: up_sql.into(),
            down_sql: down_sql.into(),
        }
    }

    async fn run_script(&self, store: &dyn Store, sql: &str) -> MigrateResult<()> {
        for statement in split_sql_statements(sql) {
            store.execute(&statement, &[]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationUnit for SqlUnit {
    fn version(&self) -> &str {
        &self.version
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn up(&self, store: &dyn Store) -> MigrateResult<()> {
        self.run_script(store, &self.up_sql).await
    }

    async fn down(&self, store: &dyn Store) -> MigrateResult<()> {
        self.run_script(store, &self.down_sql).await
    }
}

/// Split a script into individual statements using proper SQL parsing.
///
/// Falls back to naive semicolon splitting when the script does not parse,
/// so dialect extensions still execute.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    if sql.trim().is_empty() {
        return Vec::new();
    }

    let dialect = GenericDialect {};
    match Parser::parse_sql(&dialect, sql) {
        Ok(parsed) => parsed.into_iter().map(|stmt| format!("{};", stmt)).collect(),
        Err(e) => {
            tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
            sql.split(';')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| format!("{};", s))
                .collect()
        }
    }
}
