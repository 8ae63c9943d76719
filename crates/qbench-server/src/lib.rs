//! qbench server - HTTP API over the benchmark run pipeline.
//!
//! The server validates and stores encoding circuits, turns run requests into
//! queued worker tasks, and runs the background consumer that records worker
//! progress and results.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qbench_sched::{InMemoryBroker, MemoryStore, QueueSettings};
//! use qbench_server::{AppState, create_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let state = Arc::new(AppState::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(InMemoryBroker::new()),
//!         QueueSettings::default(),
//!     ));
//!     state.start_consumer();
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, create_router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod dto;
pub mod error;
pub mod server;
pub mod state;
pub mod tracing_config;

pub use config::{Config, ConfigError};
pub use dto::{CreateEncodingRequest, CreateEncodingResponse, HealthResponse, StartRunResponse};
pub use error::ApiError;
pub use server::create_router;
pub use state::AppState;
pub use tracing_config::{TracingConfig, TracingFormat, init_tracing};
