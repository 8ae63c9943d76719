//! RabbitMQ connector built on `lapin`.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ConfirmSelectOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};

use super::{Acknowledger, Delivery, DeliveryStream, QueueChannel, QueueConnector};
use crate::error::{SchedError, SchedResult};

/// AMQP delivery mode for messages that survive a broker restart.
const PERSISTENT: u8 = 2;

/// Heartbeat interval requested from the broker, in seconds.
const HEARTBEAT_SECS: u16 = 60;

/// Opens RabbitMQ connections.
///
/// Credentials are kept as structured fields and never spliced into a URI
/// string, so passwords may contain any character.
#[derive(Clone)]
pub struct AmqpConnector {
    uri: AMQPUri,
}

impl AmqpConnector {
    /// Connector for a full `amqp://` URI.
    pub fn new(uri: &str) -> SchedResult<Self> {
        let uri = uri
            .parse::<AMQPUri>()
            .map_err(|e| SchedError::Connection(format!("invalid AMQP URI: {e}")))?;
        Ok(Self { uri })
    }

    /// Connector from individual connection settings.
    pub fn from_parts(host: &str, port: u16, user: &str, password: &str, vhost: &str) -> Self {
        let mut uri = AMQPUri::default();
        uri.authority = AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: user.to_string(),
                password: password.to_string(),
            },
            host: host.to_string(),
            port,
        };
        uri.vhost = vhost.to_string();
        uri.query.heartbeat = Some(HEARTBEAT_SECS);
        Self { uri }
    }
}

impl std::fmt::Debug for AmqpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let authority = &self.uri.authority;
        f.debug_struct("AmqpConnector")
            .field("user", &authority.userinfo.username)
            .field("host", &authority.host)
            .field("port", &authority.port)
            .field("vhost", &self.uri.vhost)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl QueueConnector for AmqpConnector {
    async fn connect(&self) -> SchedResult<Box<dyn QueueChannel>> {
        let connection = Connection::connect_uri(self.uri.clone(), ConnectionProperties::default())
            .await
            .map_err(|e| SchedError::Connection(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| SchedError::Connection(e.to_string()))?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        tracing::debug!(channel = channel.id(), "opened AMQP channel");
        Ok(Box::new(AmqpChannel {
            connection,
            channel,
        }))
    }
}

struct AmqpChannel {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl QueueChannel for AmqpChannel {
    async fn declare_queue(&self, queue: &str) -> SchedResult<()> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> SchedResult<()> {
        let confirmation = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await?
            .await?;
        if confirmation.is_nack() {
            return Err(SchedError::Broker(format!(
                "broker rejected message for queue {queue}"
            )));
        }
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        prefetch: u16,
        consumer_tag: &str,
    ) -> SchedResult<Box<dyn DeliveryStream>> {
        self.channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await?;
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(Box::new(AmqpDeliveries { consumer }))
    }

    async fn close(&self) -> SchedResult<()> {
        if self.channel.status().connected() {
            self.channel.close(200, "closing").await?;
        }
        if self.connection.status().connected() {
            self.connection.close(200, "closing").await?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }
}

struct AmqpDeliveries {
    consumer: lapin::Consumer,
}

#[async_trait]
impl DeliveryStream for AmqpDeliveries {
    async fn next(&mut self) -> Option<SchedResult<Delivery>> {
        let delivery = self.consumer.next().await?;
        Some(
            delivery
                .map(|d| Delivery::new(d.data, AmqpAcker { acker: d.acker }))
                .map_err(SchedError::from),
        )
    }
}

struct AmqpAcker {
    acker: lapin::acker::Acker,
}

#[async_trait]
impl Acknowledger for AmqpAcker {
    async fn ack(&self) -> SchedResult<()> {
        self.acker.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> SchedResult<()> {
        self.acker
            .nack(BasicNackOptions {
                requeue,
                ..BasicNackOptions::default()
            })
            .await?;
        Ok(())
    }
}
