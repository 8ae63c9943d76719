//! SQLite-based persistence for production use.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::catalog::{CatalogEntry, ResourceKind};
use crate::encoding::Encoding;
use crate::error::{SchedError, SchedResult};
use crate::persistence::StateStore;
use crate::run::{BenchmarkResult, BenchmarkRun, RunId, RunUpdate};

/// SQLite-based state store.
///
/// Records are kept as JSON documents next to the columns used for lookup
/// and ordering. Recommended for anything that must survive a restart.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    pub fn new(path: impl AsRef<Path>) -> SchedResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema_sync()?;
        Ok(store)
    }

    /// Create a new in-memory SQLite store.
    pub fn in_memory() -> SchedResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema_sync()?;
        Ok(store)
    }

    fn lock(&self) -> SchedResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SchedError::DatabaseError(e.to_string()))
    }

    fn init_schema_sync(&self) -> SchedResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY,
                status TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

            CREATE TABLE IF NOT EXISTS results (
                run_id INTEGER PRIMARY KEY,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS encodings (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS catalog (
                kind TEXT NOT NULL,
                id INTEGER NOT NULL,
                name TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            );
            "#,
        )?;
        Ok(())
    }
}

fn to_i64(id: u64) -> SchedResult<i64> {
    i64::try_from(id).map_err(|_| SchedError::PersistenceError(format!("id {id} out of range")))
}

fn write_run(conn: &Connection, run: &BenchmarkRun) -> SchedResult<()> {
    let data = serde_json::to_string(run)?;
    conn.execute(
        "INSERT OR REPLACE INTO runs (id, status, data, updated_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            to_i64(run.id.0)?,
            run.status.name(),
            data,
            run.updated_at.to_rfc3339()
        ],
    )?;
    Ok(())
}

fn read_one<T: DeserializeOwned>(conn: &Connection, sql: &str, key: i64) -> SchedResult<Option<T>> {
    let data: Option<String> = conn
        .query_row(sql, rusqlite::params![key], |row| row.get(0))
        .optional()?;
    data.map(|d| serde_json::from_str(&d).map_err(SchedError::from))
        .transpose()
}

fn read_all<T: DeserializeOwned>(conn: &Connection, sql: &str) -> SchedResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut items = Vec::new();
    for data in rows {
        items.push(serde_json::from_str(&data?)?);
    }
    Ok(items)
}

fn write_doc<T: Serialize>(conn: &Connection, sql: &str, key: i64, doc: &T) -> SchedResult<()> {
    let data = serde_json::to_string(doc)?;
    conn.execute(sql, rusqlite::params![key, data])?;
    Ok(())
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn allocate_next_id(&self, counter: &str) -> SchedResult<u64> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO counters (name, value) VALUES (?1, 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            "#,
            rusqlite::params![counter],
        )?;
        let value: i64 = conn.query_row(
            "SELECT value FROM counters WHERE name = ?1",
            rusqlite::params![counter],
            |row| row.get(0),
        )?;
        u64::try_from(value)
            .map_err(|_| SchedError::PersistenceError(format!("counter {counter} is negative")))
    }

    async fn create_run(&self, run: &BenchmarkRun) -> SchedResult<()> {
        let conn = self.lock()?;
        write_run(&conn, run)
    }

    async fn find_run(&self, id: RunId) -> SchedResult<Option<BenchmarkRun>> {
        let conn = self.lock()?;
        read_one(&conn, "SELECT data FROM runs WHERE id = ?1", to_i64(id.0)?)
    }

    async fn update_run(&self, id: RunId, update: &RunUpdate) -> SchedResult<BenchmarkRun> {
        // Load, update, save under one lock
        let conn = self.lock()?;
        let mut run: BenchmarkRun =
            read_one(&conn, "SELECT data FROM runs WHERE id = ?1", to_i64(id.0)?)?
                .ok_or(SchedError::RunNotFound(id))?;
        run.apply(update);
        write_run(&conn, &run)?;
        Ok(run)
    }

    async fn list_runs(&self) -> SchedResult<Vec<BenchmarkRun>> {
        let conn = self.lock()?;
        read_all(&conn, "SELECT data FROM runs ORDER BY id")
    }

    async fn delete_run(&self, id: RunId) -> SchedResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM runs WHERE id = ?1",
            rusqlite::params![to_i64(id.0)?],
        )?;
        Ok(deleted > 0)
    }

    async fn save_result(&self, result: &BenchmarkResult) -> SchedResult<()> {
        let conn = self.lock()?;
        write_doc(
            &conn,
            "INSERT OR REPLACE INTO results (run_id, data) VALUES (?1, ?2)",
            to_i64(result.run_id.0)?,
            result,
        )
    }

    async fn find_result(&self, run_id: RunId) -> SchedResult<Option<BenchmarkResult>> {
        let conn = self.lock()?;
        read_one(
            &conn,
            "SELECT data FROM results WHERE run_id = ?1",
            to_i64(run_id.0)?,
        )
    }

    async fn list_results(&self) -> SchedResult<Vec<BenchmarkResult>> {
        let conn = self.lock()?;
        read_all(&conn, "SELECT data FROM results ORDER BY run_id")
    }

    async fn delete_result(&self, run_id: RunId) -> SchedResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM results WHERE run_id = ?1",
            rusqlite::params![to_i64(run_id.0)?],
        )?;
        Ok(deleted > 0)
    }

    async fn save_encoding(&self, encoding: &Encoding) -> SchedResult<()> {
        let conn = self.lock()?;
        let data = serde_json::to_string(encoding)?;
        conn.execute(
            "INSERT OR REPLACE INTO encodings (id, name, data) VALUES (?1, ?2, ?3)",
            rusqlite::params![to_i64(encoding.id)?, encoding.name, data],
        )?;
        Ok(())
    }

    async fn find_encoding(&self, id: u64) -> SchedResult<Option<Encoding>> {
        let conn = self.lock()?;
        read_one(&conn, "SELECT data FROM encodings WHERE id = ?1", to_i64(id)?)
    }

    async fn list_encodings(&self) -> SchedResult<Vec<Encoding>> {
        let conn = self.lock()?;
        read_all(&conn, "SELECT data FROM encodings ORDER BY id")
    }

    async fn delete_encoding(&self, id: u64) -> SchedResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM encodings WHERE id = ?1",
            rusqlite::params![to_i64(id)?],
        )?;
        Ok(deleted > 0)
    }

    async fn save_resource(&self, entry: &CatalogEntry) -> SchedResult<()> {
        let conn = self.lock()?;
        let data = serde_json::to_string(entry)?;
        conn.execute(
            "INSERT OR REPLACE INTO catalog (kind, id, name, data) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![entry.kind.name(), to_i64(entry.id)?, entry.name, data],
        )?;
        Ok(())
    }

    async fn find_resource(
        &self,
        kind: ResourceKind,
        id: u64,
    ) -> SchedResult<Option<CatalogEntry>> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM catalog WHERE kind = ?1 AND id = ?2",
                rusqlite::params![kind.name(), to_i64(id)?],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|d| serde_json::from_str(&d).map_err(SchedError::from))
            .transpose()
    }

    async fn list_resources(&self, kind: ResourceKind) -> SchedResult<Vec<CatalogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT data FROM catalog WHERE kind = ?1 ORDER BY id")?;
        let rows = stmt.query_map(rusqlite::params![kind.name()], |row| row.get::<_, String>(0))?;
        let mut entries = Vec::new();
        for data in rows {
            entries.push(serde_json::from_str(&data?)?);
        }
        Ok(entries)
    }

    async fn delete_resource(&self, kind: ResourceKind, id: u64) -> SchedResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM catalog WHERE kind = ?1 AND id = ?2",
            rusqlite::params![kind.name(), to_i64(id)?],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::conformance;
    use crate::run::RunStatus;

    #[tokio::test]
    async fn test_sqlite_store_conformance() {
        let store = SqliteStore::in_memory().unwrap();
        conformance::check_all(&store).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qbench.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            let id = store.allocate_next_id("benchmarkRuns").await.unwrap();
            store
                .create_run(&BenchmarkRun::new(RunId(id), 1, 2, 3))
                .await
                .unwrap();
            store
                .update_run(RunId(id), &RunUpdate::failed("Failed to send to worker"))
                .await
                .unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        let run = store.find_run(RunId(1)).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("Failed to send to worker"));
        assert_eq!(store.allocate_next_id("benchmarkRuns").await.unwrap(), 2);
    }
}
