//! Version ledger: the persisted record of applied migrations.
//!
//! The ledger lives inside the target database and is the single source of
//! truth for "already applied". Its own table is bootstrapped lazily, not
//! migrated like domain tables.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::definitions::{LedgerEntry, MigrateConfig};
use crate::error::{MigrateError, MigrateResult};
use crate::store::Store;

/// Persisted record of which versions have been applied.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Idempotently create the ledger's own storage if absent. Safe to
    /// call concurrently.
    async fn ensure_schema(&self, store: &dyn Store) -> MigrateResult<()>;

    /// All recorded versions. Pure read.
    async fn applied_versions(&self, store: &dyn Store) -> MigrateResult<BTreeSet<String>>;

    /// All recorded entries with their application timestamps, ascending
    /// by version.
    async fn entries(&self, store: &dyn Store) -> MigrateResult<Vec<LedgerEntry>>;

    /// Insert one entry. Fails with `DuplicateApplication` if the version
    /// is already recorded.
    async fn record_applied(&self, store: &dyn Store, version: &str) -> MigrateResult<()>;

    /// Delete one entry. Fails with `NotApplied` if the version was not
    /// recorded.
    async fn record_reverted(&self, store: &dyn Store, version: &str) -> MigrateResult<()>;
}

/// Store-backed ledger over one history table.
///
/// Layout: `(version VARCHAR(255) PRIMARY KEY, applied_at TIMESTAMPTZ NOT
/// NULL DEFAULT CURRENT_TIMESTAMP)`. The table name comes from
/// configuration; versions are always bound as parameters.
pub struct VersionLedger {
    table: String,
}

impl VersionLedger {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn from_config(config: &MigrateConfig) -> Self {
        Self::new(config.ledger_table.clone())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL to create the history table.
    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                version VARCHAR(255) PRIMARY KEY,\n    \
                applied_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP\n\
            )",
            self.table
        )
    }

    /// SQL to list recorded versions.
    fn select_versions_sql(&self) -> String {
        format!("SELECT version FROM {} ORDER BY version", self.table)
    }

    /// SQL to list recorded entries. `applied_at` is rendered as RFC 3339
    /// text so it travels through the text-typed store boundary.
    fn select_entries_sql(&self) -> String {
        format!(
            "SELECT version, \
             to_char(applied_at AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS.US\"Z\"') \
             FROM {} ORDER BY version",
            self.table
        )
    }

    /// SQL to record one applied version. The conditional form makes a
    /// duplicate visible as zero affected rows instead of a store error.
    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (version) VALUES ($1) ON CONFLICT (version) DO NOTHING",
            self.table
        )
    }

    /// SQL to delete one recorded version.
    fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE version = $1", self.table)
    }
}

#[async_trait]
impl Ledger for VersionLedger {
    async fn ensure_schema(&self, store: &dyn Store) -> MigrateResult<()> {
        store.execute(&self.create_table_sql(), &[]).await?;
        Ok(())
    }

    async fn applied_versions(&self, store: &dyn Store) -> MigrateResult<BTreeSet<String>> {
        let rows = store.query_text(&self.select_versions_sql(), &[]).await?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| (!row.is_empty()).then(|| row.remove(0)))
            .collect())
    }

    async fn entries(&self, store: &dyn Store) -> MigrateResult<Vec<LedgerEntry>> {
        let rows = store.query_text(&self.select_entries_sql(), &[]).await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let [version, applied_at] = <[String; 2]>::try_from(row).map_err(|row| {
                MigrateError::Store(format!(
                    "ledger query returned {} columns, expected 2",
                    row.len()
                ))
            })?;
            let applied_at = DateTime::parse_from_rfc3339(&applied_at)
                .map_err(|e| {
                    MigrateError::Store(format!("failed to parse applied_at '{}': {}", applied_at, e))
                })?
                .with_timezone(&Utc);
            entries.push(LedgerEntry {
                version,
                applied_at,
            });
        }
        Ok(entries)
    }

    async fn record_applied(&self, store: &dyn Store, version: &str) -> MigrateResult<()> {
        let affected = store.execute(&self.insert_sql(), &[version]).await?;
        if affected == 0 {
            return Err(MigrateError::DuplicateApplication {
                version: version.to_string(),
            });
        }
        Ok(())
    }

    async fn record_reverted(&self, store: &dyn Store, version: &str) -> MigrateResult<()> {
        let affected = store.execute(&self.delete_sql(), &[version]).await?;
        if affected == 0 {
            return Err(MigrateError::NotApplied {
                version: version.to_string(),
            });
        }
        Ok(())
    }
}
