//! Persistence layer for run state.
//!
//! The store is the single source of truth for runs: the dispatcher creates
//! runs through it and the result consumer applies worker updates through
//! it. Nothing caches run state elsewhere. It also holds the resources runs
//! refer to: encodings and the ansatz/dataset catalog.

mod memory_store;
mod sqlite_store;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;

use async_trait::async_trait;

use crate::catalog::{CatalogEntry, ResourceKind};
use crate::encoding::Encoding;
use crate::error::SchedResult;
use crate::run::{BenchmarkResult, BenchmarkRun, RunId, RunUpdate};

/// Trait for persistent state storage.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Allocate the next id of a named counter. Ids start at 1 and never
    /// repeat within a counter.
    async fn allocate_next_id(&self, counter: &str) -> SchedResult<u64>;

    /// Insert a run, replacing one with the same id.
    async fn create_run(&self, run: &BenchmarkRun) -> SchedResult<()>;

    /// Load a run.
    async fn find_run(&self, id: RunId) -> SchedResult<Option<BenchmarkRun>>;

    /// Apply a partial update to a run and return the updated record.
    ///
    /// Fails with [`SchedError::RunNotFound`](crate::SchedError::RunNotFound)
    /// if the run does not exist.
    async fn update_run(&self, id: RunId, update: &RunUpdate) -> SchedResult<BenchmarkRun>;

    /// List all runs, ordered by id.
    async fn list_runs(&self) -> SchedResult<Vec<BenchmarkRun>>;

    /// Delete a run. Returns whether it existed.
    async fn delete_run(&self, id: RunId) -> SchedResult<bool>;

    /// Save the result of a run, replacing any earlier one.
    async fn save_result(&self, result: &BenchmarkResult) -> SchedResult<()>;

    /// Load the result of a run.
    async fn find_result(&self, run_id: RunId) -> SchedResult<Option<BenchmarkResult>>;

    /// List all results, ordered by run id.
    async fn list_results(&self) -> SchedResult<Vec<BenchmarkResult>>;

    /// Delete the result of a run. Returns whether it existed.
    async fn delete_result(&self, run_id: RunId) -> SchedResult<bool>;

    /// Save an encoding, replacing one with the same id.
    async fn save_encoding(&self, encoding: &Encoding) -> SchedResult<()>;

    /// Load an encoding.
    async fn find_encoding(&self, id: u64) -> SchedResult<Option<Encoding>>;

    /// List all encodings, ordered by id.
    async fn list_encodings(&self) -> SchedResult<Vec<Encoding>>;

    /// Delete an encoding. Returns whether it existed.
    async fn delete_encoding(&self, id: u64) -> SchedResult<bool>;

    /// Save a catalog entry, replacing one with the same kind and id.
    async fn save_resource(&self, entry: &CatalogEntry) -> SchedResult<()>;

    /// Load a catalog entry.
    async fn find_resource(&self, kind: ResourceKind, id: u64)
    -> SchedResult<Option<CatalogEntry>>;

    /// List the catalog entries of one kind, ordered by id.
    async fn list_resources(&self, kind: ResourceKind) -> SchedResult<Vec<CatalogEntry>>;

    /// Delete a catalog entry. Returns whether it existed.
    async fn delete_resource(&self, kind: ResourceKind, id: u64) -> SchedResult<bool>;
}
