//! Task publisher with bounded retry and forced reconnect.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::broker::{QueueChannel, QueueConnector, QueueSettings, connect_with_retry};
use crate::error::{SchedError, SchedResult};
use crate::message::TaskMessage;

/// Publishes task messages to the durable task queue.
///
/// Owns one lazily opened channel behind a mutex. The lock covers a single
/// send but never a reconnect, so one publisher sleeping through connection
/// retries does not stall the others. Any broker error drops the channel it
/// was sent on so the next attempt starts from a fresh connection.
pub struct TaskPublisher {
    connector: Arc<dyn QueueConnector>,
    settings: QueueSettings,
    slot: Mutex<ChannelSlot>,
}

#[derive(Default)]
struct ChannelSlot {
    channel: Option<Box<dyn QueueChannel>>,
    /// Bumped every time a new channel is installed.
    generation: u64,
}

impl ChannelSlot {
    fn open(&self) -> Option<&dyn QueueChannel> {
        self.channel.as_deref().filter(|c| c.is_open())
    }
}

/// A failed attempt and the generation of the channel it used, if any.
type AttemptError = (SchedError, Option<u64>);

impl TaskPublisher {
    /// Create a publisher. No connection is opened until the first publish.
    pub fn new(connector: Arc<dyn QueueConnector>, settings: QueueSettings) -> Self {
        Self {
            connector,
            settings,
            slot: Mutex::new(ChannelSlot::default()),
        }
    }

    /// Queue settings in use.
    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Publish one task, retrying up to the configured number of attempts.
    pub async fn publish(&self, task: &TaskMessage) -> SchedResult<()> {
        let body = task.to_bytes()?;
        let attempts = self.settings.publish_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.try_publish(&body).await {
                Ok(()) => {
                    tracing::info!(run_id = %task.run_id, queue = %self.settings.task_queue, "task published");
                    return Ok(());
                }
                Err((e, generation)) => {
                    tracing::warn!(
                        run_id = %task.run_id,
                        attempt,
                        attempts,
                        error = %e,
                        "publish failed, reconnecting"
                    );
                    last_error = e.to_string();
                    if let Some(generation) = generation {
                        self.reset(generation).await;
                    }
                }
            }
        }

        tracing::error!(run_id = %task.run_id, attempts, "giving up on task");
        Err(SchedError::PublishFailed {
            attempts,
            reason: last_error,
        })
    }

    async fn try_publish(&self, body: &[u8]) -> Result<(), AttemptError> {
        {
            let slot = self.slot.lock().await;
            if let Some(channel) = slot.open() {
                let generation = slot.generation;
                return channel
                    .publish(&self.settings.task_queue, body)
                    .await
                    .map_err(|e| (e, Some(generation)));
            }
        }

        let fresh = self.open_channel().await.map_err(|e| (e, None))?;

        let mut slot = self.slot.lock().await;
        let spare = if slot.open().is_some() {
            // Another publisher reconnected first
            Some(fresh)
        } else {
            slot.generation += 1;
            slot.channel.replace(fresh)
        };
        let generation = slot.generation;
        let outcome = match slot.open() {
            Some(channel) => channel.publish(&self.settings.task_queue, body).await,
            None => Err(SchedError::Connection("channel closed before publish".to_string())),
        };
        drop(slot);

        if let Some(spare) = spare {
            close_quietly(spare).await;
        }
        outcome.map_err(|e| (e, Some(generation)))
    }

    /// Connect and declare both queues, without touching the shared slot.
    async fn open_channel(&self) -> SchedResult<Box<dyn QueueChannel>> {
        let channel = connect_with_retry(
            self.connector.as_ref(),
            self.settings.connection_attempts,
            self.settings.retry_delay,
        )
        .await?;
        channel.declare_queue(&self.settings.task_queue).await?;
        channel.declare_queue(&self.settings.result_queue).await?;
        Ok(channel)
    }

    /// Drop the channel of the given generation. A newer channel installed
    /// by another publisher in the meantime is left alone.
    async fn reset(&self, generation: u64) {
        let channel = {
            let mut slot = self.slot.lock().await;
            if slot.generation == generation {
                slot.channel.take()
            } else {
                None
            }
        };
        if let Some(channel) = channel {
            close_quietly(channel).await;
        }
    }

    /// Close the publisher's connection.
    pub async fn close(&self) {
        let channel = self.slot.lock().await.channel.take();
        if let Some(channel) = channel {
            close_quietly(channel).await;
        }
    }
}

async fn close_quietly(channel: Box<dyn QueueChannel>) {
    if let Err(e) = channel.close().await {
        tracing::debug!(error = %e, "error closing publisher channel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::run::RunId;
    use std::time::Duration;

    fn task(id: u64) -> TaskMessage {
        TaskMessage {
            run_id: RunId(id),
            encoding_id: 1,
            ansatz_id: 1,
            data_id: 1,
            measure_index: 0,
            qubit_count: 2,
        }
    }

    fn settings() -> QueueSettings {
        QueueSettings {
            retry_delay: Duration::from_millis(1),
            ..QueueSettings::default()
        }
    }

    #[tokio::test]
    async fn test_publish_reuses_connection() {
        let broker = InMemoryBroker::new();
        let publisher = TaskPublisher::new(Arc::new(broker.clone()), settings());

        publisher.publish(&task(1)).await.unwrap();
        publisher.publish(&task(2)).await.unwrap();

        assert_eq!(broker.connect_count(), 1);
        assert_eq!(broker.published("task_queue").len(), 2);
    }

    #[tokio::test]
    async fn test_publish_reconnects_after_error() {
        let broker = InMemoryBroker::new();
        let publisher = TaskPublisher::new(Arc::new(broker.clone()), settings());

        broker.fail_next_publishes(2);
        publisher.publish(&task(1)).await.unwrap();

        // One connection per attempt
        assert_eq!(broker.connect_count(), 3);
        let sent = broker.published("task_queue");
        assert_eq!(sent.len(), 1);
        assert_eq!(TaskMessage::from_bytes(&sent[0]).unwrap(), task(1));
    }

    #[tokio::test]
    async fn test_publish_gives_up_after_budget() {
        let broker = InMemoryBroker::new();
        let publisher = TaskPublisher::new(Arc::new(broker.clone()), settings());

        broker.fail_next_publishes(3);
        let err = publisher.publish(&task(1)).await.unwrap_err();
        assert!(matches!(err, SchedError::PublishFailed { attempts: 3, .. }));
        assert!(broker.published("task_queue").is_empty());

        // The next task gets a fresh budget
        publisher.publish(&task(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_survives_dropped_connection() {
        let broker = InMemoryBroker::new();
        let publisher = TaskPublisher::new(Arc::new(broker.clone()), settings());

        publisher.publish(&task(1)).await.unwrap();
        broker.disconnect_all();
        publisher.publish(&task(2)).await.unwrap();

        assert_eq!(broker.connect_count(), 2);
        assert_eq!(broker.published("task_queue").len(), 2);
    }

    #[tokio::test]
    async fn test_stale_reset_keeps_current_channel() {
        let broker = InMemoryBroker::new();
        let publisher = TaskPublisher::new(Arc::new(broker.clone()), settings());

        publisher.publish(&task(1)).await.unwrap();
        // A failure report for a channel that has since been replaced
        publisher.reset(0).await;
        publisher.publish(&task(2)).await.unwrap();

        assert_eq!(broker.connect_count(), 1);
        assert_eq!(broker.published("task_queue").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_does_not_block_other_publishers() {
        let broker = InMemoryBroker::new();
        let publisher = Arc::new(TaskPublisher::new(
            Arc::new(broker.clone()),
            QueueSettings {
                connection_attempts: 2,
                retry_delay: Duration::from_secs(3),
                ..QueueSettings::default()
            },
        ));

        broker.fail_next_connects(1);
        let slow = tokio::spawn({
            let publisher = publisher.clone();
            async move { publisher.publish(&task(1)).await }
        });
        // Let the first publisher hit the failed connect and start waiting
        tokio::time::sleep(Duration::from_millis(1)).await;

        publisher.publish(&task(2)).await.unwrap();
        assert!(!slow.is_finished());
        let sent = broker.published("task_queue");
        assert_eq!(sent.len(), 1);
        assert_eq!(TaskMessage::from_bytes(&sent[0]).unwrap(), task(2));

        slow.await.unwrap().unwrap();
        let sent = broker.published("task_queue");
        assert_eq!(sent.len(), 2);
        assert_eq!(TaskMessage::from_bytes(&sent[1]).unwrap(), task(1));
        assert_eq!(broker.connect_count(), 3);
    }
}
