//! Test doubles for exercising the engine without a live database.
//!
//! `MemoryStore` implements the full [`Store`] capability set with
//! scriptable results and a real (compare-and-swap) named lock, so
//! orchestration behavior (ordering, fail-fast, lock exclusivity) can be
//! driven end to end in plain async tests. `MemoryLedger` and
//! `RecordingUnit` stand in for the other two collaborators.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;

use crate::definitions::LedgerEntry;
use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Ledger;
use crate::store::{ColumnInfo, LockHandle, Store};
use crate::unit::MigrationUnit;

/// How often the in-memory lock re-probes while blocked.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// In-memory [`Store`] with scriptable results.
///
/// `execute` results and `query_text` rows are queues: push expected
/// outcomes before the call, or rely on the defaults (one affected row,
/// no rows). Column metadata is a per-table map mutated by the test.
#[derive(Default)]
pub struct MemoryStore {
    executed: Mutex<Vec<(String, Vec<String>)>>,
    execute_results: Mutex<VecDeque<MigrateResult<u64>>>,
    query_rows: Mutex<VecDeque<Vec<Vec<String>>>>,
    columns: Mutex<HashMap<String, Vec<ColumnInfo>>>,
    locks: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    /// Statements executed so far with their bound parameters.
    pub fn executed_with_params(&self) -> Vec<(String, Vec<String>)> {
        self.executed.lock().unwrap().clone()
    }

    /// Queue the outcome of the next `execute` call.
    pub fn push_execute_result(&self, result: MigrateResult<u64>) {
        self.execute_results.lock().unwrap().push_back(result);
    }

    /// Queue the rows of the next `query_text` call.
    pub fn push_query_rows(&self, rows: Vec<Vec<String>>) {
        self.query_rows.lock().unwrap().push_back(rows);
    }

    /// Set the live column metadata reported for a table.
    pub fn set_columns(&self, table: &str, columns: Vec<ColumnInfo>) {
        self.columns
            .lock()
            .unwrap()
            .insert(table.to_string(), columns);
    }

    /// Whether the named lock is currently held.
    pub fn is_locked(&self, name: &str) -> bool {
        self.locks.lock().unwrap().contains(name)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn execute(&self, sql: &str, params: &[&str]) -> MigrateResult<u64> {
        self.executed.lock().unwrap().push((
            sql.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        ));
        match self.execute_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(1),
        }
    }

    async fn query_text(&self, _sql: &str, _params: &[&str]) -> MigrateResult<Vec<Vec<String>>> {
        Ok(self
            .query_rows
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn columns_of(&self, table: &str) -> MigrateResult<Vec<ColumnInfo>> {
        Ok(self
            .columns
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default())
    }

    async fn acquire_named_lock(
        &self,
        name: &str,
        timeout: Duration,
    ) -> MigrateResult<LockHandle> {
        let started = Instant::now();
        loop {
            if self.locks.lock().unwrap().insert(name.to_string()) {
                return Ok(LockHandle {
                    name: name.to_string(),
                    key: 0,
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
        self.locks.lock().unwrap().remove(&handle.name);
        Ok(())
    }
}

/// In-memory [`Ledger`] with the same consistency checks as the
/// store-backed one.
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<BTreeMap<String, chrono::DateTime<Utc>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an entry, bypassing the duplicate check.
    pub fn seed(&self, version: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(version.to_string(), Utc::now());
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn ensure_schema(&self, _store: &dyn Store) -> MigrateResult<()> {
        Ok(())
    }

    async fn applied_versions(&self, _store: &dyn Store) -> MigrateResult<BTreeSet<String>> {
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }

    async fn entries(&self, _store: &dyn Store) -> MigrateResult<Vec<LedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(version, applied_at)| LedgerEntry {
                version: version.clone(),
                applied_at: *applied_at,
            })
            .collect())
    }

    async fn record_applied(&self, _store: &dyn Store, version: &str) -> MigrateResult<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(version) {
            return Err(MigrateError::DuplicateApplication {
                version: version.to_string(),
            });
        }
        entries.insert(version.to_string(), Utc::now());
        Ok(())
    }

    async fn record_reverted(&self, _store: &dyn Store, version: &str) -> MigrateResult<()> {
        if self.entries.lock().unwrap().remove(version).is_none() {
            return Err(MigrateError::NotApplied {
                version: version.to_string(),
            });
        }
        Ok(())
    }
}

/// A migration unit that records its invocations into a shared log.
pub struct RecordingUnit {
    version: String,
    log: Arc<Mutex<Vec<String>>>,
    fail_up: bool,
    fail_down: bool,
}

impl RecordingUnit {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            log: Arc::new(Mutex::new(Vec::new())),
            fail_up: false,
            fail_down: false,
        }
    }

    /// Share an event log across several units to observe ordering.
    pub fn with_log(version: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            log,
            ..Self::new(version)
        }
    }

    /// Make `up` fail after recording the attempt.
    pub fn failing_up(mut self) -> Self {
        self.fail_up = true;
        self
    }

    /// Make `down` fail after recording the attempt.
    pub fn failing_down(mut self) -> Self {
        self.fail_down = true;
        self
    }

    pub fn into_arc(self) -> Arc<dyn MigrationUnit> {
        Arc::new(self)
    }

    /// Shorthand for a plain unit as a trait object.
    pub fn arc(version: impl Into<String>) -> Arc<dyn MigrationUnit> {
        Self::new(version).into_arc()
    }
}

#[async_trait]
impl MigrationUnit for RecordingUnit {
    fn version(&self) -> &str {
        &self.version
    }

    fn description(&self) -> &str {
        "recording unit"
    }

    async fn up(&self, _store: &dyn Store) -> MigrateResult<()> {
        self.log.lock().unwrap().push(format!("up {}", self.version));
        if self.fail_up {
            return Err(MigrateError::Store("injected up failure".to_string()));
        }
        Ok(())
    }

    async fn down(&self, _store: &dyn Store) -> MigrateResult<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("down {}", self.version));
        if self.fail_down {
            return Err(MigrateError::Store("injected down failure".to_string()));
        }
        Ok(())
    }
}
