//! In-memory persistence for development and testing.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::catalog::{CatalogEntry, ResourceKind};
use crate::encoding::Encoding;
use crate::error::{SchedError, SchedResult};
use crate::persistence::StateStore;
use crate::run::{BenchmarkResult, BenchmarkRun, RunId, RunUpdate};

/// In-memory state store.
///
/// Nothing survives a restart. Suitable for tests and single-process
/// development setups.
#[derive(Default)]
pub struct MemoryStore {
    counters: RwLock<FxHashMap<String, u64>>,
    runs: RwLock<FxHashMap<RunId, BenchmarkRun>>,
    results: RwLock<FxHashMap<RunId, BenchmarkResult>>,
    encodings: RwLock<FxHashMap<u64, Encoding>>,
    catalog: RwLock<FxHashMap<(ResourceKind, u64), CatalogEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by<T: Clone, K: Ord>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(key);
    items
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn allocate_next_id(&self, counter: &str) -> SchedResult<u64> {
        let mut counters = self.counters.write().await;
        let value = counters.entry(counter.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn create_run(&self, run: &BenchmarkRun) -> SchedResult<()> {
        self.runs.write().await.insert(run.id, run.clone());
        Ok(())
    }

    async fn find_run(&self, id: RunId) -> SchedResult<Option<BenchmarkRun>> {
        Ok(self.runs.read().await.get(&id).cloned())
    }

    async fn update_run(&self, id: RunId, update: &RunUpdate) -> SchedResult<BenchmarkRun> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(&id).ok_or(SchedError::RunNotFound(id))?;
        run.apply(update);
        Ok(run.clone())
    }

    async fn list_runs(&self) -> SchedResult<Vec<BenchmarkRun>> {
        let runs = self.runs.read().await;
        Ok(sorted_by(runs.values().cloned(), |r| r.id))
    }

    async fn delete_run(&self, id: RunId) -> SchedResult<bool> {
        Ok(self.runs.write().await.remove(&id).is_some())
    }

    async fn save_result(&self, result: &BenchmarkResult) -> SchedResult<()> {
        self.results
            .write()
            .await
            .insert(result.run_id, result.clone());
        Ok(())
    }

    async fn find_result(&self, run_id: RunId) -> SchedResult<Option<BenchmarkResult>> {
        Ok(self.results.read().await.get(&run_id).cloned())
    }

    async fn list_results(&self) -> SchedResult<Vec<BenchmarkResult>> {
        let results = self.results.read().await;
        Ok(sorted_by(results.values().cloned(), |r| r.run_id))
    }

    async fn delete_result(&self, run_id: RunId) -> SchedResult<bool> {
        Ok(self.results.write().await.remove(&run_id).is_some())
    }

    async fn save_encoding(&self, encoding: &Encoding) -> SchedResult<()> {
        self.encodings
            .write()
            .await
            .insert(encoding.id, encoding.clone());
        Ok(())
    }

    async fn find_encoding(&self, id: u64) -> SchedResult<Option<Encoding>> {
        Ok(self.encodings.read().await.get(&id).cloned())
    }

    async fn list_encodings(&self) -> SchedResult<Vec<Encoding>> {
        let encodings = self.encodings.read().await;
        Ok(sorted_by(encodings.values().cloned(), |e| e.id))
    }

    async fn delete_encoding(&self, id: u64) -> SchedResult<bool> {
        Ok(self.encodings.write().await.remove(&id).is_some())
    }

    async fn save_resource(&self, entry: &CatalogEntry) -> SchedResult<()> {
        self.catalog
            .write()
            .await
            .insert((entry.kind, entry.id), entry.clone());
        Ok(())
    }

    async fn find_resource(
        &self,
        kind: ResourceKind,
        id: u64,
    ) -> SchedResult<Option<CatalogEntry>> {
        Ok(self.catalog.read().await.get(&(kind, id)).cloned())
    }

    async fn list_resources(&self, kind: ResourceKind) -> SchedResult<Vec<CatalogEntry>> {
        let catalog = self.catalog.read().await;
        Ok(sorted_by(
            catalog.values().filter(|e| e.kind == kind).cloned(),
            |e| e.id,
        ))
    }

    async fn delete_resource(&self, kind: ResourceKind, id: u64) -> SchedResult<bool> {
        Ok(self.catalog.write().await.remove(&(kind, id)).is_some())
    }
}
