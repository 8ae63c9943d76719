//! Benchmark run records and their lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counter names used with [`StateStore::allocate_next_id`](crate::persistence::StateStore::allocate_next_id).
pub mod counters {
    /// Benchmark run ids.
    pub const RUNS: &str = "benchmarkRuns";
    /// Encoding ids.
    pub const ENCODINGS: &str = "encodings";
    /// Ansatz ids.
    pub const ANSAETZE: &str = "ansaetze";
    /// Dataset ids.
    pub const DATASETS: &str = "datasets";
}

/// Integer identifier of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RunId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Status of a benchmark run.
///
/// `Pending -> Progress* -> Done | Failed`. Terminal states still accept
/// later writes; the last message for a run wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, waiting for the worker to pick it up.
    Pending,
    /// The worker reported that it started or made progress.
    Progress,
    /// The worker delivered a result.
    Done,
    /// Dispatch failed or the worker reported an error.
    Failed,
}

impl RunStatus {
    /// Check if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Failed)
    }

    /// Get the lowercase status name used in storage and on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Progress => "progress",
            RunStatus::Done => "done",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metrics reported by the worker for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Final training loss.
    pub loss: f64,
    /// Final test accuracy.
    pub accuracy: f64,
}

/// A benchmark run: one (encoding, ansatz, dataset) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub id: RunId,
    pub encoding_id: u64,
    pub ansatz_id: u64,
    pub data_id: u64,
    pub status: RunStatus,
    /// Percentage in `0..=100`, as last reported.
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BenchmarkRun {
    /// Create a pending run.
    pub fn new(id: RunId, encoding_id: u64, ansatz_id: u64, data_id: u64) -> Self {
        let now = Utc::now();
        Self {
            id,
            encoding_id,
            ansatz_id,
            data_id,
            status: RunStatus::Pending,
            progress: 0.0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, touching `updated_at`.
    ///
    /// Reaching `done` clears any error left by an earlier failure report.
    pub fn apply(&mut self, update: &RunUpdate) {
        if let Some(status) = update.status {
            self.status = status;
            if status == RunStatus::Done {
                self.error = None;
            }
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        if let Some(result) = update.result {
            self.result = Some(result);
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Fields to change on a run. Unset fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunUpdate {
    pub status: Option<RunStatus>,
    pub progress: Option<f64>,
    pub result: Option<RunResult>,
    pub error: Option<String>,
}

impl RunUpdate {
    /// The worker picked the task up.
    pub fn started() -> Self {
        Self {
            status: Some(RunStatus::Progress),
            progress: Some(0.0),
            ..Self::default()
        }
    }

    /// Percentage only; the status is left untouched.
    pub fn progress(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    /// Terminal success with the worker's metrics.
    pub fn done(result: RunResult) -> Self {
        Self {
            status: Some(RunStatus::Done),
            progress: Some(100.0),
            result: Some(result),
            error: None,
        }
    }

    /// Terminal failure with an explanation.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(RunStatus::Failed),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Stored outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub run_id: RunId,
    pub encoding_id: u64,
    pub ansatz_id: u64,
    pub data_id: u64,
    pub loss: f64,
    pub accuracy: f64,
    pub recorded_at: DateTime<Utc>,
}

impl BenchmarkResult {
    /// Build a result record stamped with the current time.
    pub fn new(
        run_id: RunId,
        encoding_id: u64,
        ansatz_id: u64,
        data_id: u64,
        result: RunResult,
    ) -> Self {
        Self {
            run_id,
            encoding_id,
            ansatz_id,
            data_id,
            loss: result.loss,
            accuracy: result.accuracy,
            recorded_at: Utc::now(),
        }
    }

    /// Build the result record for a run.
    pub fn for_run(run: &BenchmarkRun, result: RunResult) -> Self {
        Self::new(run.id, run.encoding_id, run.ansatz_id, run.data_id, result)
    }
}
