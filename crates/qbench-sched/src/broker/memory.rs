//! In-process broker with fault injection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, watch};

use super::{Acknowledger, Delivery, DeliveryStream, QueueChannel, QueueConnector};
use crate::error::{SchedError, SchedResult};

type PublishFilter = Box<dyn Fn(&[u8]) -> bool + Send + Sync>;
type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>;

struct Queue {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: SharedReceiver,
}

impl Queue {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }
}

#[derive(Default)]
struct Faults {
    connects: usize,
    publishes: usize,
    publish_filter: Option<PublishFilter>,
}

#[derive(Default)]
struct BrokerState {
    queues: Mutex<FxHashMap<String, Queue>>,
    faults: Mutex<Faults>,
    connects: AtomicUsize,
    channels: Mutex<Vec<Weak<watch::Sender<bool>>>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
    prefetches: Mutex<Vec<u16>>,
    acked: Mutex<Vec<Vec<u8>>>,
    rejected: Mutex<Vec<(Vec<u8>, bool)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BrokerState {
    fn endpoints(&self, queue: &str) -> (mpsc::UnboundedSender<Vec<u8>>, SharedReceiver) {
        let mut queues = lock(&self.queues);
        let q = queues.entry(queue.to_string()).or_insert_with(Queue::new);
        (q.tx.clone(), q.rx.clone())
    }
}

/// In-memory message broker using tokio channels.
///
/// Cloning yields another handle to the same queues. Every
/// [`connect`](QueueConnector::connect) opens an independent channel, so the
/// publisher and consumer can each own one just as they would against
/// RabbitMQ. The fault hooks let tests exercise retry, reconnect and
/// redelivery paths without a real broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
}

impl InMemoryBroker {
    /// Create a new in-memory broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` connection attempts fail.
    pub fn fail_next_connects(&self, n: usize) {
        lock(&self.state.faults).connects = n;
    }

    /// Make the next `n` publishes fail.
    pub fn fail_next_publishes(&self, n: usize) {
        lock(&self.state.faults).publishes = n;
    }

    /// Make every publish whose payload matches `filter` fail.
    pub fn fail_publishes_matching(&self, filter: impl Fn(&[u8]) -> bool + Send + Sync + 'static) {
        lock(&self.state.faults).publish_filter = Some(Box::new(filter));
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        *lock(&self.state.faults) = Faults::default();
    }

    /// Connection attempts so far, failed ones included.
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Close every open channel, ending their consumers.
    pub fn disconnect_all(&self) {
        let mut channels = lock(&self.state.channels);
        for closed in channels.iter().filter_map(Weak::upgrade) {
            closed.send_replace(true);
        }
        channels.clear();
    }

    /// Enqueue a message directly, as an external producer would.
    pub fn push(&self, queue: &str, payload: impl Into<Vec<u8>>) {
        let (tx, _) = self.state.endpoints(queue);
        // The receiver lives in the queue map, so the send cannot fail.
        let _ = tx.send(payload.into());
    }

    /// Payloads successfully published to a queue, in order.
    pub fn published(&self, queue: &str) -> Vec<Vec<u8>> {
        lock(&self.state.published)
            .iter()
            .filter(|(q, _)| q == queue)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Prefetch windows requested by consumers, in order.
    pub fn prefetches(&self) -> Vec<u16> {
        lock(&self.state.prefetches).clone()
    }

    /// Payloads acknowledged by consumers.
    pub fn acked(&self) -> Vec<Vec<u8>> {
        lock(&self.state.acked).clone()
    }

    /// Payloads rejected by consumers, with their requeue flag.
    pub fn rejected(&self) -> Vec<(Vec<u8>, bool)> {
        lock(&self.state.rejected).clone()
    }
}

#[async_trait]
impl QueueConnector for InMemoryBroker {
    async fn connect(&self) -> SchedResult<Box<dyn QueueChannel>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        {
            let mut faults = lock(&self.state.faults);
            if faults.connects > 0 {
                faults.connects -= 1;
                return Err(SchedError::Connection(
                    "injected connection failure".to_string(),
                ));
            }
        }

        let (closed, _) = watch::channel(false);
        let closed = Arc::new(closed);
        lock(&self.state.channels).push(Arc::downgrade(&closed));

        Ok(Box::new(InMemoryChannel {
            state: self.state.clone(),
            closed,
        }))
    }
}

struct InMemoryChannel {
    state: Arc<BrokerState>,
    closed: Arc<watch::Sender<bool>>,
}

impl InMemoryChannel {
    fn ensure_open(&self) -> SchedResult<()> {
        if *self.closed.borrow() {
            Err(SchedError::Broker("channel is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QueueChannel for InMemoryChannel {
    async fn declare_queue(&self, queue: &str) -> SchedResult<()> {
        self.ensure_open()?;
        self.state.endpoints(queue);
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> SchedResult<()> {
        self.ensure_open()?;
        {
            let mut faults = lock(&self.state.faults);
            if faults.publishes > 0 {
                faults.publishes -= 1;
                return Err(SchedError::Broker("injected publish failure".to_string()));
            }
            if faults.publish_filter.as_ref().is_some_and(|f| f(payload)) {
                return Err(SchedError::Broker("injected publish failure".to_string()));
            }
        }

        let (tx, _) = self.state.endpoints(queue);
        tx.send(payload.to_vec())
            .map_err(|e| SchedError::Broker(e.to_string()))?;
        lock(&self.state.published).push((queue.to_string(), payload.to_vec()));
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        prefetch: u16,
        _consumer_tag: &str,
    ) -> SchedResult<Box<dyn DeliveryStream>> {
        self.ensure_open()?;
        lock(&self.state.prefetches).push(prefetch);
        let (tx, rx) = self.state.endpoints(queue);
        Ok(Box::new(InMemoryDeliveries {
            state: self.state.clone(),
            tx,
            rx,
            closed: self.closed.subscribe(),
        }))
    }

    async fn close(&self) -> SchedResult<()> {
        self.closed.send_replace(true);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !*self.closed.borrow()
    }
}

struct InMemoryDeliveries {
    state: Arc<BrokerState>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: SharedReceiver,
    closed: watch::Receiver<bool>,
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        if *closed.borrow_and_update() {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}

#[async_trait]
impl DeliveryStream for InMemoryDeliveries {
    async fn next(&mut self) -> Option<SchedResult<Delivery>> {
        let rx = self.rx.clone();
        let closed = &mut self.closed;

        let payload = tokio::select! {
            biased;
            _ = wait_closed(closed) => None,
            payload = async move { rx.lock().await.recv().await } => payload,
        }?;

        Some(Ok(Delivery::new(
            payload.clone(),
            InMemoryAcker {
                state: self.state.clone(),
                tx: self.tx.clone(),
                payload,
            },
        )))
    }
}

struct InMemoryAcker {
    state: Arc<BrokerState>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    payload: Vec<u8>,
}

#[async_trait]
impl Acknowledger for InMemoryAcker {
    async fn ack(&self) -> SchedResult<()> {
        lock(&self.state.acked).push(self.payload.clone());
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> SchedResult<()> {
        lock(&self.state.rejected).push((self.payload.clone(), requeue));
        if requeue {
            self.tx
                .send(self.payload.clone())
                .map_err(|e| SchedError::Broker(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_and_consume() {
        let broker = InMemoryBroker::new();
        let publisher = broker.connect().await.unwrap();
        let consumer = broker.connect().await.unwrap();

        publisher.declare_queue("task_queue").await.unwrap();
        publisher.publish("task_queue", b"hello").await.unwrap();

        let mut stream = consumer.consume("task_queue", 1, "test").await.unwrap();
        let delivery = stream.next().await.unwrap().unwrap();
        assert_eq!(delivery.payload, b"hello");
        delivery.ack().await.unwrap();

        assert_eq!(broker.acked(), vec![b"hello".to_vec()]);
        assert_eq!(broker.published("task_queue"), vec![b"hello".to_vec()]);
        assert_eq!(broker.prefetches(), vec![1]);
        assert_eq!(broker.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_publish_failures() {
        let broker = InMemoryBroker::new();
        let channel = broker.connect().await.unwrap();

        broker.fail_next_publishes(1);
        assert!(channel.publish("q", b"a").await.is_err());
        assert!(channel.publish("q", b"b").await.is_ok());

        broker.fail_publishes_matching(|p| p == b"c");
        assert!(channel.publish("q", b"c").await.is_err());
        assert!(channel.publish("q", b"d").await.is_ok());

        assert_eq!(broker.published("q"), vec![b"b".to_vec(), b"d".to_vec()]);
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_publish() {
        let broker = InMemoryBroker::new();
        let channel = broker.connect().await.unwrap();
        channel.close().await.unwrap();
        assert!(!channel.is_open());
        assert!(channel.publish("q", b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_ends_stream() {
        let broker = InMemoryBroker::new();
        let channel = broker.connect().await.unwrap();
        let mut stream = channel.consume("result_queue", 1, "test").await.unwrap();

        let waiter = tokio::spawn(async move { stream.next().await.is_none() });
        tokio::time::sleep(Duration::from_millis(10)).await;
        broker.disconnect_all();

        assert!(waiter.await.unwrap());
        assert!(!channel.is_open());
    }

    #[tokio::test]
    async fn test_nack_requeue() {
        let broker = InMemoryBroker::new();
        broker.push("q", b"again".to_vec());
        let channel = broker.connect().await.unwrap();
        let mut stream = channel.consume("q", 1, "test").await.unwrap();

        stream.next().await.unwrap().unwrap().nack(true).await.unwrap();
        let redelivered = stream.next().await.unwrap().unwrap();
        assert_eq!(redelivered.payload, b"again");
        redelivered.nack(false).await.unwrap();

        assert_eq!(
            broker.rejected(),
            vec![(b"again".to_vec(), true), (b"again".to_vec(), false)]
        );
    }
}
