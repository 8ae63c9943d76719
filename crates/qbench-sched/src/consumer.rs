//! Background consumer applying worker status messages to run state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::broker::{DeliveryStream, QueueConnector, QueueSettings, connect_with_retry};
use crate::error::{SchedError, SchedResult};
use crate::message::StatusMessage;
use crate::persistence::StateStore;
use crate::run::{BenchmarkResult, RunUpdate};

/// What to do with a well-formed message whose status is not recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownStatusPolicy {
    /// Log and acknowledge.
    #[default]
    Ack,
    /// Log and reject without requeue.
    Reject,
}

/// Outcome of processing one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    /// Nack without requeue.
    Reject,
}

/// Consumes the result queue and updates the run store.
///
/// Runs as a single background task per process. The consumer owns its own
/// broker connection and reconnects whenever its delivery stream ends.
pub struct ResultConsumer {
    store: Arc<dyn StateStore>,
    connector: Arc<dyn QueueConnector>,
    settings: QueueSettings,
    unknown_status: UnknownStatusPolicy,
    started: AtomicBool,
}

impl ResultConsumer {
    pub fn new(
        store: Arc<dyn StateStore>,
        connector: Arc<dyn QueueConnector>,
        settings: QueueSettings,
    ) -> Self {
        Self {
            store,
            connector,
            settings,
            unknown_status: UnknownStatusPolicy::default(),
            started: AtomicBool::new(false),
        }
    }

    pub fn with_unknown_status_policy(mut self, policy: UnknownStatusPolicy) -> Self {
        self.unknown_status = policy;
        self
    }

    /// Whether the background task has been started.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Start the background consumer. Later calls return `None`.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("result consumer already running");
            return None;
        }

        let consumer = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                match consumer.consume_once().await {
                    Ok(()) => tracing::warn!(
                        queue = %consumer.settings.result_queue,
                        "result stream ended, reconnecting"
                    ),
                    Err(e) => tracing::error!(
                        queue = %consumer.settings.result_queue,
                        error = %e,
                        "result consumer error, reconnecting"
                    ),
                }
                tokio::time::sleep(consumer.settings.retry_delay).await;
            }
        }))
    }

    /// Open a connection and drain deliveries until the stream ends.
    async fn consume_once(&self) -> SchedResult<()> {
        let channel = connect_with_retry(
            self.connector.as_ref(),
            self.settings.connection_attempts,
            self.settings.retry_delay,
        )
        .await?;

        let outcome = async {
            channel.declare_queue(&self.settings.result_queue).await?;
            let tag = format!("qbench-results-{}", Uuid::new_v4());
            let deliveries = channel
                .consume(&self.settings.result_queue, self.settings.prefetch, &tag)
                .await?;
            tracing::info!(queue = %self.settings.result_queue, consumer_tag = %tag, "consuming results");
            self.drain(deliveries).await
        }
        .await;

        if let Err(e) = channel.close().await {
            tracing::debug!(error = %e, "error closing consumer channel");
        }
        outcome
    }

    async fn drain(&self, mut deliveries: Box<dyn DeliveryStream>) -> SchedResult<()> {
        while let Some(delivery) = deliveries.next().await {
            let delivery = delivery?;
            match self.process(&delivery.payload).await {
                Disposition::Ack => delivery.ack().await?,
                Disposition::Reject => delivery.nack(false).await?,
            }
        }
        Ok(())
    }

    /// Apply one message body to the store and decide how to settle it.
    ///
    /// Never fails: undecodable bodies and store errors become
    /// [`Disposition::Reject`].
    pub async fn process(&self, payload: &[u8]) -> Disposition {
        let message = match StatusMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    body = %String::from_utf8_lossy(payload),
                    "discarding malformed result message"
                );
                return Disposition::Reject;
            }
        };

        match self.apply(&message).await {
            Ok(disposition) => disposition,
            Err(e) => {
                tracing::error!(
                    run_id = %message.run_id(),
                    status = message.status(),
                    error = %e,
                    "failed to apply status message"
                );
                Disposition::Reject
            }
        }
    }

    async fn apply(&self, message: &StatusMessage) -> SchedResult<Disposition> {
        let run_id = message.run_id();
        match message {
            StatusMessage::Init { .. } => {
                self.store.update_run(run_id, &RunUpdate::started()).await?;
            }
            StatusMessage::Progress { progress, .. } => {
                self.store
                    .update_run(run_id, &RunUpdate::progress(*progress))
                    .await?;
            }
            StatusMessage::Done { result, .. } => {
                let run = self
                    .store
                    .find_run(run_id)
                    .await?
                    .ok_or(SchedError::RunNotFound(run_id))?;
                self.store
                    .save_result(&BenchmarkResult::for_run(&run, *result))
                    .await?;
                self.store.update_run(run_id, &RunUpdate::done(*result)).await?;
                tracing::info!(%run_id, loss = result.loss, accuracy = result.accuracy, "run finished");
            }
            StatusMessage::Failed { error, .. } => {
                self.store
                    .update_run(run_id, &RunUpdate::failed(error.clone()))
                    .await?;
                tracing::warn!(%run_id, %error, "worker reported failure");
            }
            StatusMessage::Unknown { status, .. } => {
                tracing::warn!(%run_id, %status, policy = ?self.unknown_status, "unknown run status");
                return Ok(match self.unknown_status {
                    UnknownStatusPolicy::Ack => Disposition::Ack,
                    UnknownStatusPolicy::Reject => Disposition::Reject,
                });
            }
        }

        tracing::debug!(%run_id, status = message.status(), "run updated");
        Ok(Disposition::Ack)
    }
}
