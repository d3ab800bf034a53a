//! Store boundary: the capability set the engine requires from a
//! relational store.
//!
//! The engine, the ledger, and the [`crate::guard`] helpers depend only on
//! this trait, never on a concrete driver. Authored units may still embed
//! dialect-specific SQL in the statements they pass through it.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::MigrateResult;

pub mod postgres;

pub use postgres::PostgresStore;

/// Live metadata for one column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// Token for a held named lock.
///
/// Obtained from [`Store::acquire_named_lock`] and handed back to
/// [`Store::release_lock`]; it is not persisted beyond the holding session.
#[derive(Debug)]
pub struct LockHandle {
    pub(crate) name: String,
    pub(crate) key: i64,
}

impl LockHandle {
    /// The lock name this handle was acquired under.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Abstract relational store capabilities.
#[async_trait]
pub trait Store: Send + Sync {
    /// Execute a single statement, returning the affected row count.
    async fn execute(&self, sql: &str, params: &[&str]) -> MigrateResult<u64>;

    /// Run a query, decoding every column of every row as text.
    ///
    /// Callers cast non-text columns in the statement itself.
    async fn query_text(&self, sql: &str, params: &[&str]) -> MigrateResult<Vec<Vec<String>>>;

    /// Column metadata for a table; empty when the table does not exist.
    async fn columns_of(&self, table: &str) -> MigrateResult<Vec<ColumnInfo>>;

    /// Acquire the named exclusive lock, waiting up to `timeout`.
    ///
    /// Fails with [`crate::MigrateError::LockTimeout`] once the wait is
    /// exhausted; callers must never proceed without the handle.
    async fn acquire_named_lock(&self, name: &str, timeout: Duration)
        -> MigrateResult<LockHandle>;

    /// Release a previously acquired lock.
    async fn release_lock(&self, handle: LockHandle) -> MigrateResult<()>;
}
