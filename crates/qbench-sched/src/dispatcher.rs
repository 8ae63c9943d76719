//! Expands run requests into benchmark runs and dispatches their tasks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{SchedError, SchedResult};
use crate::message::TaskMessage;
use crate::persistence::StateStore;
use crate::publisher::TaskPublisher;
use crate::run::{BenchmarkRun, RunId, RunUpdate, counters};

/// Prefix of the error stored on runs whose task never reached the queue.
pub const SEND_FAILURE: &str = "Failed to send to worker";

/// Prefix of the error reported for combinations the store rejected.
pub const STORE_FAILURE: &str = "Failed to store run";

/// A single id or a list of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdSelection {
    One(u64),
    Many(Vec<u64>),
}

impl IdSelection {
    /// Selected ids, in the order given.
    pub fn ids(&self) -> &[u64] {
        match self {
            IdSelection::One(id) => std::slice::from_ref(id),
            IdSelection::Many(ids) => ids,
        }
    }
}

impl From<u64> for IdSelection {
    fn from(id: u64) -> Self {
        IdSelection::One(id)
    }
}

impl From<Vec<u64>> for IdSelection {
    fn from(ids: Vec<u64>) -> Self {
        IdSelection::Many(ids)
    }
}

/// Request to benchmark every combination of the selected resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub encoding_id: IdSelection,
    pub ansatz_id: IdSelection,
    pub data_id: IdSelection,
}

impl RunRequest {
    pub fn new(
        encoding_id: impl Into<IdSelection>,
        ansatz_id: impl Into<IdSelection>,
        data_id: impl Into<IdSelection>,
    ) -> Self {
        Self {
            encoding_id: encoding_id.into(),
            ansatz_id: ansatz_id.into(),
            data_id: data_id.into(),
        }
    }

    /// Every (encoding, ansatz, dataset) combination: encoding outermost,
    /// dataset innermost.
    pub fn combinations(&self) -> Vec<(u64, u64, u64)> {
        let mut combos = Vec::new();
        for &e in self.encoding_id.ids() {
            for &a in self.ansatz_id.ids() {
                for &d in self.data_id.ids() {
                    combos.push((e, a, d));
                }
            }
        }
        combos
    }
}

/// A combination that did not reach the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchFailure {
    /// Absent when no run id could be allocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub encoding_id: u64,
    pub ansatz_id: u64,
    pub data_id: u64,
    pub error: String,
}

/// Outcome of a run request with at least one dispatched task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Runs whose task reached the queue, in dispatch order.
    pub created: Vec<RunId>,
    /// Combinations that were not dispatched, either because the store
    /// rejected them or because their task could not be sent.
    pub failed: Vec<DispatchFailure>,
    /// Non-fatal problems, such as a missing qubit count hint.
    pub warnings: Vec<String>,
}

/// Creates benchmark runs and publishes one task per run.
pub struct Dispatcher {
    store: Arc<dyn StateStore>,
    publisher: Arc<TaskPublisher>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn StateStore>, publisher: Arc<TaskPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Dispatch every combination of a run request.
    ///
    /// Every combination is attempted on its own: a store error or a failed
    /// publish is recorded in the report and the batch moves on. Returns
    /// [`SchedError::AllTasksFailed`] only when nothing was dispatched.
    pub async fn start_run(&self, request: &RunRequest) -> SchedResult<DispatchReport> {
        for (field, selection) in [
            ("encoding_id", &request.encoding_id),
            ("ansatz_id", &request.ansatz_id),
            ("data_id", &request.data_id),
        ] {
            if selection.ids().is_empty() {
                return Err(SchedError::InvalidRequest(format!(
                    "'{field}' selects no ids"
                )));
            }
        }

        let combinations = request.combinations();
        let mut report = DispatchReport::default();
        let mut hints: Vec<(u64, u32)> = Vec::new();

        for (encoding_id, ansatz_id, data_id) in combinations.iter().copied() {
            let qubit_count = match hints.iter().find(|(e, _)| *e == encoding_id) {
                Some((_, hint)) => *hint,
                None => {
                    let hint = self.qubit_hint(encoding_id, &mut report.warnings).await;
                    hints.push((encoding_id, hint));
                    hint
                }
            };

            let combo = (encoding_id, ansatz_id, data_id);
            match self.dispatch_one(combo, qubit_count, &mut report.warnings).await {
                Ok(run_id) => report.created.push(run_id),
                Err(failure) => report.failed.push(failure),
            }
        }

        if report.created.is_empty() {
            return Err(SchedError::AllTasksFailed {
                attempted: combinations.len(),
                failures: report
                    .failed
                    .into_iter()
                    .map(|f| (f.run_id, f.error))
                    .collect(),
            });
        }

        tracing::info!(
            created = report.created.len(),
            failed = report.failed.len(),
            "run request dispatched"
        );
        Ok(report)
    }

    /// Store and publish one (encoding, ansatz, dataset) combination.
    async fn dispatch_one(
        &self,
        combo: (u64, u64, u64),
        qubit_count: u32,
        warnings: &mut Vec<String>,
    ) -> Result<RunId, DispatchFailure> {
        let (encoding_id, ansatz_id, data_id) = combo;
        let failure = move |run_id: Option<RunId>, error: String| DispatchFailure {
            run_id,
            encoding_id,
            ansatz_id,
            data_id,
            error,
        };

        let run_id = match self.store.allocate_next_id(counters::RUNS).await {
            Ok(id) => RunId(id),
            Err(e) => {
                tracing::error!(?combo, error = %e, "could not allocate run id");
                warnings.push(format!("combination {combo:?} not started: {e}"));
                return Err(failure(None, format!("{STORE_FAILURE}: {e}")));
            }
        };

        let run = BenchmarkRun::new(run_id, encoding_id, ansatz_id, data_id);
        if let Err(e) = self.store.create_run(&run).await {
            tracing::error!(%run_id, error = %e, "could not store run");
            return Err(failure(Some(run_id), format!("{STORE_FAILURE}: {e}")));
        }

        let task = TaskMessage {
            run_id,
            encoding_id,
            ansatz_id,
            data_id,
            measure_index: 0,
            qubit_count,
        };

        match self.publisher.publish(&task).await {
            Ok(()) => Ok(run_id),
            Err(e) => {
                let error = format!("{SEND_FAILURE}: {e}");
                tracing::warn!(%run_id, error = %e, "marking run failed");
                if let Err(store_err) = self
                    .store
                    .update_run(run_id, &RunUpdate::failed(error.clone()))
                    .await
                {
                    tracing::error!(%run_id, error = %store_err, "could not mark run failed");
                    warnings.push(format!("run {run_id} could not be marked failed: {store_err}"));
                }
                Err(failure(Some(run_id), error))
            }
        }
    }

    /// Best-effort qubit count for the task message. Falls back to 0, which
    /// tells the worker to recompute it, and records why.
    async fn qubit_hint(&self, encoding_id: u64, warnings: &mut Vec<String>) -> u32 {
        let reason = match self.store.find_encoding(encoding_id).await {
            Ok(Some(encoding)) => match encoding.qubit_hint() {
                Some(hint) => return hint,
                None => "stored circuit has no gate list".to_string(),
            },
            Ok(None) => SchedError::EncodingNotFound(encoding_id).to_string(),
            Err(e) => e.to_string(),
        };

        tracing::warn!(encoding_id, %reason, "qubit count hint unavailable, sending 0");
        warnings.push(format!(
            "qubit count hint unavailable for encoding {encoding_id} ({reason}); sent 0"
        ));
        0
    }
}
