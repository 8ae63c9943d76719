//! Message queue abstraction for the task and result queues.
//!
//! The pipeline talks to the broker through three seams:
//!
//! - [`QueueConnector`] opens connections (one per owner: the publisher and
//!   the consumer never share one),
//! - [`QueueChannel`] declares durable queues, publishes persistent messages
//!   and starts consumers,
//! - [`DeliveryStream`] yields [`Delivery`]s that must be acked or nacked.
//!
//! # Implementations
//!
//! - [`InMemoryBroker`]: in-process queues with fault injection, for tests and
//!   single-node development.
//! - `AmqpConnector`: RabbitMQ via `lapin`, available with `--features amqp`.

#[cfg(feature = "amqp")]
mod amqp;
mod memory;

#[cfg(feature = "amqp")]
pub use amqp::AmqpConnector;
pub use memory::InMemoryBroker;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{SchedError, SchedResult};

/// Default name of the queue tasks are published to.
pub const DEFAULT_TASK_QUEUE: &str = "task_queue";
/// Default name of the queue workers report to.
pub const DEFAULT_RESULT_QUEUE: &str = "result_queue";

/// Queue names and retry budgets shared by publisher and consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    pub task_queue: String,
    pub result_queue: String,
    /// Attempts to open a connection before giving up.
    pub connection_attempts: u32,
    /// Pause between connection attempts.
    pub retry_delay: Duration,
    /// Attempts to publish one task, reconnecting after every failure.
    pub publish_attempts: u32,
    /// Unacknowledged deliveries allowed per consumer.
    pub prefetch: u16,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            task_queue: DEFAULT_TASK_QUEUE.to_string(),
            result_queue: DEFAULT_RESULT_QUEUE.to_string(),
            connection_attempts: 3,
            retry_delay: Duration::from_secs(3),
            publish_attempts: 3,
            prefetch: 1,
        }
    }
}

/// Opens broker connections.
#[async_trait]
pub trait QueueConnector: Send + Sync {
    /// Open a new connection and channel.
    async fn connect(&self) -> SchedResult<Box<dyn QueueChannel>>;
}

/// An open channel on its own connection.
#[async_trait]
pub trait QueueChannel: Send + Sync {
    /// Declare a durable queue. Declaring an existing queue is a no-op.
    async fn declare_queue(&self, queue: &str) -> SchedResult<()>;

    /// Publish a persistent message to a queue through the default exchange.
    async fn publish(&self, queue: &str, payload: &[u8]) -> SchedResult<()>;

    /// Start consuming a queue with the given prefetch window.
    async fn consume(
        &self,
        queue: &str,
        prefetch: u16,
        consumer_tag: &str,
    ) -> SchedResult<Box<dyn DeliveryStream>>;

    /// Close the channel and its connection.
    async fn close(&self) -> SchedResult<()>;

    /// Whether the channel can still be used.
    fn is_open(&self) -> bool;
}

/// Stream of deliveries from a consumer.
#[async_trait]
pub trait DeliveryStream: Send {
    /// Next delivery; `None` once the consumer or its connection is gone.
    async fn next(&mut self) -> Option<SchedResult<Delivery>>;
}

/// Acknowledges one delivery on the channel it arrived on.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> SchedResult<()>;
    async fn nack(&self, requeue: bool) -> SchedResult<()>;
}

/// A message received from a queue.
pub struct Delivery {
    pub payload: Vec<u8>,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    /// Wrap a payload with the acknowledger of its channel.
    pub fn new(payload: Vec<u8>, acker: impl Acknowledger + 'static) -> Self {
        Self {
            payload,
            acker: Box::new(acker),
        }
    }

    /// Positively acknowledge the delivery.
    pub async fn ack(self) -> SchedResult<()> {
        self.acker.ack().await
    }

    /// Reject the delivery, optionally returning it to the queue.
    pub async fn nack(self, requeue: bool) -> SchedResult<()> {
        self.acker.nack(requeue).await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("payload", &String::from_utf8_lossy(&self.payload))
            .finish_non_exhaustive()
    }
}

/// Open a connection, retrying a bounded number of times with a fixed delay.
pub async fn connect_with_retry(
    connector: &dyn QueueConnector,
    attempts: u32,
    delay: Duration,
) -> SchedResult<Box<dyn QueueChannel>> {
    let attempts = attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match connector.connect().await {
            Ok(channel) => return Ok(channel),
            Err(e) => {
                tracing::warn!(attempt, attempts, error = %e, "broker connection failed");
                last_error = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(match last_error {
        Some(SchedError::Connection(msg)) => SchedError::Connection(msg),
        Some(other) => SchedError::Connection(other.to_string()),
        None => SchedError::Connection("no connection attempts made".to_string()),
    })
}
