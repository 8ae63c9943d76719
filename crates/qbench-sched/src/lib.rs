//! qbench run pipeline
//!
//! This crate turns benchmark requests into queued worker tasks and folds
//! the workers' status reports back into run state.
//!
//! # Overview
//!
//! The pipeline has two independent halves sharing one store:
//! 1. **Dispatch**: [`Dispatcher`] expands a [`RunRequest`] into one
//!    [`BenchmarkRun`] per (encoding, ansatz, dataset) combination and
//!    publishes a [`TaskMessage`] for each through the [`TaskPublisher`]
//! 2. **Reconciliation**: [`ResultConsumer`] reads [`StatusMessage`]s from the
//!    result queue and moves runs through `pending -> progress -> done | failed`
//!
//! # Key Features
//!
//! - **Broker seam**: [`QueueConnector`] with an [`InMemoryBroker`] for tests
//!   and RabbitMQ through `lapin` behind the `amqp` feature
//! - **Retry**: bounded connection attempts and publish retries with forced
//!   reconnect after every broker error
//! - **Persistence**: [`StateStore`] with in-memory and SQLite backends,
//!   holding runs, results, encodings and the ansatz/dataset catalog
//!
//! # Example: Dispatching a Run
//!
//! ```ignore
//! use std::sync::Arc;
//! use qbench_sched::{
//!     Dispatcher, InMemoryBroker, MemoryStore, QueueSettings, RunRequest, TaskPublisher,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let broker = Arc::new(InMemoryBroker::new());
//!     let publisher = Arc::new(TaskPublisher::new(broker, QueueSettings::default()));
//!
//!     let dispatcher = Dispatcher::new(store, publisher);
//!     let report = dispatcher
//!         .start_run(&RunRequest::new(vec![1, 2], 1, vec![1, 2]))
//!         .await?;
//!     println!("Dispatched: {:?}", report.created);
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod catalog;
pub mod consumer;
pub mod dispatcher;
pub mod encoding;
pub mod error;
pub mod message;
pub mod persistence;
pub mod publisher;
pub mod run;

#[cfg(feature = "amqp")]
pub use broker::AmqpConnector;
pub use broker::{
    Delivery, DeliveryStream, InMemoryBroker, QueueChannel, QueueConnector, QueueSettings,
    connect_with_retry,
};
pub use catalog::{CatalogEntry, ResourceKind, ResourceSummary};
pub use consumer::{Disposition, ResultConsumer, UnknownStatusPolicy};
pub use dispatcher::{
    DispatchFailure, DispatchReport, Dispatcher, IdSelection, RunRequest, SEND_FAILURE,
    STORE_FAILURE,
};
pub use encoding::Encoding;
pub use error::{SchedError, SchedResult};
pub use message::{MessageError, StatusMessage, TaskMessage};
pub use persistence::{MemoryStore, SqliteStore, StateStore};
pub use publisher::TaskPublisher;
pub use run::{BenchmarkResult, BenchmarkRun, RunId, RunResult, RunStatus, RunUpdate, counters};
