//! PostgreSQL store implementation.
//!
//! Backs the [`Store`] capability set with sqlx over a single connection.
//! One engine run uses one session: the advisory lock, the DDL, and the
//! ledger writes all travel over the same connection, which is what makes
//! the lock-holding guarantee hold.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::{Connection, PgConnection, Row};
use tokio::sync::Mutex;

use super::{ColumnInfo, LockHandle, Store};
use crate::error::{MigrateError, MigrateResult};

/// How often a blocked lock acquisition re-probes the store.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// PostgreSQL-backed store over one connection.
pub struct PostgresStore {
    conn: Mutex<PgConnection>,
}

impl PostgresStore {
    /// Connect to the given database URL.
    pub async fn connect(database_url: &str) -> MigrateResult<Self> {
        let conn = PgConnection::connect(database_url)
            .await
            .map_err(|e| MigrateError::Store(format!("failed to connect to database: {}", e)))?;
        Ok(Self::new(conn))
    }

    /// Wrap an already-established connection.
    pub fn new(conn: PgConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn execute(&self, sql: &str, params: &[&str]) -> MigrateResult<u64> {
        let mut conn = self.conn.lock().await;
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }
        let result = query
            .execute(&mut *conn)
            .await
            .map_err(|e| MigrateError::Store(format!("failed to execute statement: {}", e)))?;
        Ok(result.rows_affected())
    }

    async fn query_text(&self, sql: &str, params: &[&str]) -> MigrateResult<Vec<Vec<String>>> {
        let mut conn = self.conn.lock().await;
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }
        let rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| MigrateError::Store(format!("failed to run query: {}", e)))?;

        let mut decoded = Vec::with_capacity(rows.len());
        for row in rows {
            let mut columns = Vec::with_capacity(row.columns().len());
            for index in 0..row.columns().len() {
                let value: Option<String> = row.try_get(index).map_err(|e| {
                    MigrateError::Store(format!("failed to decode column {}: {}", index, e))
                })?;
                columns.push(value.unwrap_or_default());
            }
            decoded.push(columns);
        }
        Ok(decoded)
    }

    async fn columns_of(&self, table: &str) -> MigrateResult<Vec<ColumnInfo>> {
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(
            "SELECT column_name, data_type, is_nullable \
             FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| MigrateError::Store(format!("failed to read column metadata: {}", e)))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("column_name")
                .map_err(|e| MigrateError::Store(format!("failed to decode column_name: {}", e)))?;
            let data_type: String = row
                .try_get("data_type")
                .map_err(|e| MigrateError::Store(format!("failed to decode data_type: {}", e)))?;
            let is_nullable: String = row
                .try_get("is_nullable")
                .map_err(|e| MigrateError::Store(format!("failed to decode is_nullable: {}", e)))?;
            columns.push(ColumnInfo {
                name,
                data_type,
                is_nullable: is_nullable == "YES",
            });
        }
        Ok(columns)
    }

    async fn acquire_named_lock(
        &self,
        name: &str,
        timeout: Duration,
    ) -> MigrateResult<LockHandle> {
        let key = lock_key(name);
        let started = Instant::now();

        loop {
            let acquired: bool = {
                let mut conn = self.conn.lock().await;
                sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
                    .bind(key)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(|e| {
                        MigrateError::Store(format!("failed to probe advisory lock: {}", e))
                    })?
            };

            if acquired {
                return Ok(LockHandle {
                    name: name.to_string(),
                    key,
                });
            }

            if started.elapsed() >= timeout {
                return Err(MigrateError::LockTimeout {
                    name: name.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }

            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    async fn release_lock(&self, handle: LockHandle) -> MigrateResult<()> {
        let released: bool = {
            let mut conn = self.conn.lock().await;
            sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
                .bind(handle.key)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| {
                    MigrateError::Store(format!("failed to release advisory lock: {}", e))
                })?
        };

        if !released {
            // The session teardown releases session-scoped locks; a false
            // here means the lock was not held on this session.
            tracing::warn!(lock = %handle.name, "advisory lock was not held at release");
        }
        Ok(())
    }
}

/// Fold a lock name into the 64-bit advisory-lock keyspace.
///
/// FNV-1a so every process derives the same key for the same name.
fn lock_key(name: &str) -> i64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in name.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash as i64
}
