//! Application state for the API server.

use std::sync::Arc;

use qbench_sched::{
    Dispatcher, QueueConnector, QueueSettings, ResultConsumer, StateStore, TaskPublisher,
    UnknownStatusPolicy,
};
use tokio::task::JoinHandle;

/// Shared application state.
///
/// The publisher and the consumer each get their own connection from the
/// same connector.
pub struct AppState {
    /// Run, result and encoding store.
    pub store: Arc<dyn StateStore>,
    /// Expands run requests into queued tasks.
    pub dispatcher: Dispatcher,
    /// Task publisher shared with the dispatcher.
    pub publisher: Arc<TaskPublisher>,
    /// Background result consumer.
    pub consumer: Arc<ResultConsumer>,
}

impl AppState {
    /// Create application state over a store and a broker connector.
    pub fn new(
        store: Arc<dyn StateStore>,
        connector: Arc<dyn QueueConnector>,
        settings: QueueSettings,
    ) -> Self {
        Self::with_policy(store, connector, settings, UnknownStatusPolicy::default())
    }

    /// Create application state with an explicit unknown-status policy.
    pub fn with_policy(
        store: Arc<dyn StateStore>,
        connector: Arc<dyn QueueConnector>,
        settings: QueueSettings,
        unknown_status: UnknownStatusPolicy,
    ) -> Self {
        let publisher = Arc::new(TaskPublisher::new(connector.clone(), settings.clone()));
        let consumer = Arc::new(
            ResultConsumer::new(store.clone(), connector, settings)
                .with_unknown_status_policy(unknown_status),
        );

        Self {
            dispatcher: Dispatcher::new(store.clone(), publisher.clone()),
            store,
            publisher,
            consumer,
        }
    }

    /// Start the result consumer. Only the first call spawns it.
    pub fn start_consumer(&self) -> Option<JoinHandle<()>> {
        self.consumer.start()
    }

    /// Close the publisher's broker connection.
    pub async fn shutdown(&self) {
        self.publisher.close().await;
        tracing::info!("publisher closed");
    }
}
