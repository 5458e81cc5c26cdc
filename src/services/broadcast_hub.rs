//! Subscriber registry and fan-out for live status updates
//!
//! Every subscriber is an opaque [`SubscriberConnection`] with a non-blocking
//! `deliver`. The WebSocket layer backs it with a bounded channel drained by
//! the socket's writer task, so a slow client fills its own queue and is
//! evicted without holding up anyone else.
//!
//! Liveness follows the ping/pong cycle: each heartbeat evicts subscribers
//! that never answered the previous ping, then marks the rest as unconfirmed
//! and pings them again. [`BroadcastHub::acknowledge`] confirms a subscriber.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::HubError;
use crate::models::{ClientMessage, ServerMessage, StatusSnapshot};
use crate::services::snapshot_aggregator::SnapshotAggregator;

/// Identifies one registered subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle(Uuid);

impl SubscriberHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the hub asks a connection to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// An encoded `ServerMessage`, shared between all recipients
    Text(Arc<str>),
    /// Liveness ping
    Ping,
    /// Close the connection
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The connection is gone
    Closed,
    /// The connection is not keeping up
    Full,
}

impl DeliveryFailure {
    fn into_hub_error(self, handle: SubscriberHandle) -> HubError {
        match self {
            Self::Closed => HubError::Disconnected { id: handle.id() },
            Self::Full => HubError::QueueFull { id: handle.id() },
        }
    }
}

/// A live client connection as seen by the hub
pub trait SubscriberConnection: Send + Sync {
    /// Queue `message` without waiting
    fn deliver(&self, message: OutboundMessage) -> Result<(), DeliveryFailure>;
}

impl SubscriberConnection for mpsc::Sender<OutboundMessage> {
    fn deliver(&self, message: OutboundMessage) -> Result<(), DeliveryFailure> {
        self.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryFailure::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
    }
}

struct Subscriber {
    connection: Box<dyn SubscriberConnection>,
    /// Cleared by each heartbeat, set again by a pong
    alive: bool,
    connected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub attempted: usize,
    pub delivered: usize,
    pub evicted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    pub pinged: usize,
    pub evicted: usize,
}

pub struct BroadcastHub {
    aggregator: Arc<SnapshotAggregator>,
    subscribers: Mutex<HashMap<SubscriberHandle, Subscriber>>,
    /// Encoded form of the most recent publish, used as the welcome message
    last_message: RwLock<Option<Arc<str>>>,
    heartbeat_interval: Duration,
    shutdown_token: CancellationToken,
    heartbeat_task: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcastHub {
    pub fn new(aggregator: Arc<SnapshotAggregator>, heartbeat_interval: Duration) -> Self {
        Self {
            aggregator,
            subscribers: Mutex::new(HashMap::new()),
            last_message: RwLock::new(None),
            heartbeat_interval,
            shutdown_token: CancellationToken::new(),
            heartbeat_task: Mutex::new(None),
        }
    }

    /// Register `connection` and send it the current status.
    ///
    /// The welcome is the last published message, or a fresh resolution when
    /// nothing has been published yet. A connection that cannot take the
    /// welcome is not registered.
    pub async fn subscribe<C>(&self, connection: C) -> Result<SubscriberHandle, HubError>
    where
        C: SubscriberConnection + 'static,
    {
        if self.is_shut_down() {
            let _ = connection.deliver(OutboundMessage::Close);
            return Err(HubError::ShutDown);
        }

        let mut welcome = match self.last_message.read().await.clone() {
            Some(message) => message,
            None => Self::encode(&self.aggregator.resolve_status().await)?,
        };

        // Holding the registry lock orders us against publish and shutdown:
        // either the welcome already carries a publish, or the publish sees us.
        let mut subscribers = self.subscribers.lock().await;
        if self.is_shut_down() {
            let _ = connection.deliver(OutboundMessage::Close);
            return Err(HubError::ShutDown);
        }

        if let Some(latest) = self.last_message.read().await.clone() {
            welcome = latest;
        }

        let handle = SubscriberHandle::new();

        connection
            .deliver(OutboundMessage::Text(welcome))
            .map_err(|failure| failure.into_hub_error(handle))?;

        subscribers.insert(
            handle,
            Subscriber {
                connection: Box::new(connection),
                alive: true,
                connected_at: Utc::now(),
            },
        );
        debug!(
            subscribers = subscribers.len(),
            "Subscriber {} registered", handle
        );
        Ok(handle)
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub async fn unsubscribe(&self, handle: SubscriberHandle) -> bool {
        let removed = self.subscribers.lock().await.remove(&handle);
        if let Some(subscriber) = &removed {
            let connected_for = Utc::now() - subscriber.connected_at;
            debug!(
                "Subscriber {} left after {}s",
                handle,
                connected_for.num_seconds()
            );
        }
        removed.is_some()
    }

    /// Send `snapshot` to every registered subscriber, evicting those that fail
    pub async fn publish(&self, snapshot: &StatusSnapshot) -> Result<PublishReport, HubError> {
        let message = Self::encode(snapshot)?;
        *self.last_message.write().await = Some(message.clone());

        let mut report = PublishReport::default();
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|handle, subscriber| {
            report.attempted += 1;
            match subscriber
                .connection
                .deliver(OutboundMessage::Text(message.clone()))
            {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(failure) => {
                    warn!(
                        "Dropping subscriber {}: {}",
                        handle,
                        failure.into_hub_error(*handle)
                    );
                    report.evicted += 1;
                    false
                }
            }
        });

        debug!(
            attempted = report.attempted,
            evicted = report.evicted,
            "Published {} status",
            snapshot.origin
        );
        Ok(report)
    }

    /// Answer a request from one subscriber; nobody else receives the reply
    pub async fn on_client_query(
        &self,
        handle: SubscriberHandle,
        query: ClientMessage,
    ) -> Result<(), HubError> {
        match query {
            ClientMessage::GetServerStats => {
                if !self.subscribers.lock().await.contains_key(&handle) {
                    return Err(HubError::UnknownSubscriber { id: handle.id() });
                }

                let message = Self::encode(&self.aggregator.resolve_status().await)?;

                let mut subscribers = self.subscribers.lock().await;
                let subscriber = subscribers
                    .get(&handle)
                    .ok_or(HubError::UnknownSubscriber { id: handle.id() })?;

                if let Err(failure) = subscriber.connection.deliver(OutboundMessage::Text(message))
                {
                    subscribers.remove(&handle);
                    return Err(failure.into_hub_error(handle));
                }
                Ok(())
            }
        }
    }

    /// Mark a subscriber alive after it answered a ping
    pub async fn acknowledge(&self, handle: SubscriberHandle) -> bool {
        match self.subscribers.lock().await.get_mut(&handle) {
            Some(subscriber) => {
                subscriber.alive = true;
                true
            }
            None => false,
        }
    }

    /// One heartbeat round
    pub async fn heartbeat_sweep(&self) -> HeartbeatReport {
        let mut report = HeartbeatReport::default();
        let mut subscribers = self.subscribers.lock().await;

        subscribers.retain(|handle, subscriber| {
            if !subscriber.alive {
                debug!("Subscriber {} missed a heartbeat, closing", handle);
                let _ = subscriber.connection.deliver(OutboundMessage::Close);
                report.evicted += 1;
                return false;
            }

            subscriber.alive = false;
            match subscriber.connection.deliver(OutboundMessage::Ping) {
                Ok(()) => {
                    report.pinged += 1;
                    true
                }
                Err(failure) => {
                    debug!(
                        "Subscriber {} unreachable: {}",
                        handle,
                        failure.into_hub_error(*handle)
                    );
                    report.evicted += 1;
                    false
                }
            }
        });

        report
    }

    /// Run `heartbeat_sweep` every heartbeat interval until shutdown.
    ///
    /// Returns false if the heartbeat is already running or the hub is shut down.
    pub async fn start_heartbeat(self: &Arc<Self>) -> bool {
        let mut task = self.heartbeat_task.lock().await;
        if task.is_some() || self.is_shut_down() {
            return false;
        }

        let hub = Arc::clone(self);
        let token = self.shutdown_token.clone();
        let period = self.heartbeat_interval;

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!("Subscriber heartbeat started (interval: {:?})", period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = hub.heartbeat_sweep().await;
                        if report.evicted > 0 {
                            info!(
                                pinged = report.pinged,
                                "Heartbeat evicted {} subscriber(s)", report.evicted
                            );
                        }
                    }
                }
            }
            debug!("Subscriber heartbeat stopped");
        }));
        true
    }

    /// Stop the heartbeat, close every connection and refuse new subscribers
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();

        if let Some(task) = self.heartbeat_task.lock().await.take() {
            let _ = task.await;
        }

        let mut subscribers = self.subscribers.lock().await;
        let closed = subscribers.len();
        for subscriber in subscribers.values() {
            let _ = subscriber.connection.deliver(OutboundMessage::Close);
        }
        subscribers.clear();
        info!("Broadcast hub shut down, closed {} subscriber(s)", closed);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    fn encode(snapshot: &StatusSnapshot) -> Result<Arc<str>, HubError> {
        ServerMessage::server_stats(snapshot)
            .to_json()
            .map(Arc::from)
            .map_err(|e| HubError::Encoding {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameServerConfig;
    use crate::errors::FetchError;
    use crate::models::{PlayerBreakdown, SnapshotOrigin, StatusPayload};
    use crate::repositories::InMemorySettingsRepository;
    use crate::services::status_cache::StatusCache;
    use crate::services::upstream_client::MockStatusSource;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Clone, Default)]
    struct RecordingConnection {
        messages: Arc<StdMutex<Vec<OutboundMessage>>>,
        broken: Arc<AtomicBool>,
    }

    impl RecordingConnection {
        fn messages(&self) -> Vec<OutboundMessage> {
            self.messages.lock().unwrap().clone()
        }

        fn break_connection(&self) {
            self.broken.store(true, Ordering::SeqCst);
        }

        fn stats(&self) -> Vec<StatusPayload> {
            self.messages()
                .into_iter()
                .filter_map(|message| match message {
                    OutboundMessage::Text(text) => {
                        let ServerMessage::ServerStats(payload) =
                            serde_json::from_str(&text).unwrap();
                        Some(payload)
                    }
                    _ => None,
                })
                .collect()
        }
    }

    impl SubscriberConnection for RecordingConnection {
        fn deliver(&self, message: OutboundMessage) -> Result<(), DeliveryFailure> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(DeliveryFailure::Closed);
            }
            self.messages.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn live(players: u32) -> StatusSnapshot {
        StatusSnapshot {
            online: true,
            players,
            max_players: 64,
            server_name: "Test City".to_string(),
            ping_ms: Some(18),
            resource_count: None,
            player_breakdown: PlayerBreakdown {
                total: players,
                ..PlayerBreakdown::default()
            },
            captured_at: Utc::now(),
            origin: SnapshotOrigin::Live,
        }
    }

    fn hub_with(source: MockStatusSource) -> Arc<BroadcastHub> {
        let aggregator = Arc::new(SnapshotAggregator::new(
            Arc::new(source),
            Arc::new(StatusCache::new()),
            Arc::new(InMemorySettingsRepository::new()),
            &GameServerConfig::default(),
        ));
        Arc::new(BroadcastHub::new(aggregator, Duration::from_secs(30)))
    }

    fn live_hub(players: u32) -> Arc<BroadcastHub> {
        let mut source = MockStatusSource::new();
        source
            .expect_fetch_live()
            .returning(move |_, _| Ok(live(players)));
        hub_with(source)
    }

    #[tokio::test]
    async fn subscribe_sends_fresh_status_before_first_publish() {
        let hub = live_hub(5);
        let connection = RecordingConnection::default();

        hub.subscribe(connection.clone()).await.unwrap();

        let stats = connection.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].players, 5);
        assert_eq!(hub.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn subscribe_reuses_last_published_message() {
        let mut source = MockStatusSource::new();
        source
            .expect_fetch_live()
            .times(0)
            .returning(|_, _| Ok(live(0)));
        let hub = hub_with(source);

        hub.publish(&live(12)).await.unwrap();
        let connection = RecordingConnection::default();
        hub.subscribe(connection.clone()).await.unwrap();

        assert_eq!(connection.stats()[0].players, 12);
    }

    #[tokio::test]
    async fn publish_attempts_every_subscriber_once() {
        let hub = live_hub(1);
        let connections: Vec<RecordingConnection> =
            (0..4).map(|_| RecordingConnection::default()).collect();
        for connection in &connections {
            hub.subscribe(connection.clone()).await.unwrap();
        }

        let report = hub.publish(&live(20)).await.unwrap();

        assert_eq!(
            report,
            PublishReport {
                attempted: 4,
                delivered: 4,
                evicted: 0,
            }
        );
        for connection in &connections {
            let stats = connection.stats();
            assert_eq!(stats.len(), 2);
            assert_eq!(stats[1].players, 20);
        }
    }

    #[tokio::test]
    async fn failed_delivery_evicts_only_that_subscriber() {
        let hub = live_hub(1);
        let healthy = RecordingConnection::default();
        let failing = RecordingConnection::default();
        hub.subscribe(healthy.clone()).await.unwrap();
        hub.subscribe(failing.clone()).await.unwrap();
        failing.break_connection();

        let report = hub.publish(&live(3)).await.unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted, 1);
        assert_eq!(hub.subscriber_count().await, 1);
        assert_eq!(healthy.stats().last().unwrap().players, 3);

        let report = hub.publish(&live(4)).await.unwrap();
        assert_eq!(report.attempted, 1);
    }

    #[tokio::test]
    async fn connection_refusing_welcome_is_not_registered() {
        let hub = live_hub(1);
        let connection = RecordingConnection::default();
        connection.break_connection();

        let result = hub.subscribe(connection).await;

        assert!(matches!(result, Err(HubError::Disconnected { .. })));
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let hub = live_hub(1);
        let handle = hub.subscribe(RecordingConnection::default()).await.unwrap();

        assert!(hub.unsubscribe(handle).await);
        assert!(!hub.unsubscribe(handle).await);
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn client_query_answers_only_the_requester() {
        let hub = live_hub(8);
        let asking = RecordingConnection::default();
        let quiet = RecordingConnection::default();
        let handle = hub.subscribe(asking.clone()).await.unwrap();
        hub.subscribe(quiet.clone()).await.unwrap();

        hub.on_client_query(handle, ClientMessage::GetServerStats)
            .await
            .unwrap();

        assert_eq!(asking.stats().len(), 2);
        assert_eq!(quiet.stats().len(), 1);
    }

    #[tokio::test]
    async fn client_query_from_unknown_handle_is_rejected() {
        let hub = live_hub(8);
        let handle = hub.subscribe(RecordingConnection::default()).await.unwrap();
        hub.unsubscribe(handle).await;

        assert_eq!(
            hub.on_client_query(handle, ClientMessage::GetServerStats)
                .await,
            Err(HubError::UnknownSubscriber { id: handle.id() })
        );
    }

    #[tokio::test]
    async fn upstream_failure_does_not_disconnect_subscribers() {
        let mut source = MockStatusSource::new();
        source.expect_fetch_live().returning(|_, _| {
            Err(FetchError::unreachable("http://game/info.json", "refused"))
        });
        let hub = hub_with(source);
        let connection = RecordingConnection::default();
        let handle = hub.subscribe(connection.clone()).await.unwrap();

        hub.on_client_query(handle, ClientMessage::GetServerStats)
            .await
            .unwrap();

        let stats = connection.stats();
        assert_eq!(stats.len(), 2);
        assert!(stats.iter().all(|s| s.origin == SnapshotOrigin::Default));
        assert_eq!(hub.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn silent_subscriber_is_evicted_after_one_missed_heartbeat() {
        let hub = live_hub(1);
        let responsive = RecordingConnection::default();
        let silent = RecordingConnection::default();
        let responsive_handle = hub.subscribe(responsive.clone()).await.unwrap();
        hub.subscribe(silent.clone()).await.unwrap();

        let first = hub.heartbeat_sweep().await;
        assert_eq!(first, HeartbeatReport { pinged: 2, evicted: 0 });
        assert!(hub.acknowledge(responsive_handle).await);

        let second = hub.heartbeat_sweep().await;
        assert_eq!(second, HeartbeatReport { pinged: 1, evicted: 1 });
        assert_eq!(hub.subscriber_count().await, 1);
        assert_eq!(silent.messages().last(), Some(&OutboundMessage::Close));
        assert_eq!(responsive.messages().last(), Some(&OutboundMessage::Ping));
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_task_evicts_unresponsive_subscribers() {
        let hub = live_hub(1);
        let silent = RecordingConnection::default();
        hub.subscribe(silent.clone()).await.unwrap();

        assert!(hub.start_heartbeat().await);
        assert!(!hub.start_heartbeat().await);

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(hub.subscriber_count().await, 0);
        assert_eq!(
            silent.messages()[1..],
            [OutboundMessage::Ping, OutboundMessage::Close]
        );
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_everyone_and_refuses_new_subscribers() {
        let hub = live_hub(1);
        let connection = RecordingConnection::default();
        hub.subscribe(connection.clone()).await.unwrap();
        hub.start_heartbeat().await;

        hub.shutdown().await;

        assert!(hub.is_shut_down());
        assert_eq!(hub.subscriber_count().await, 0);
        assert_eq!(connection.messages().last(), Some(&OutboundMessage::Close));
        assert_eq!(
            hub.subscribe(RecordingConnection::default()).await,
            Err(HubError::ShutDown)
        );
        assert!(!hub.start_heartbeat().await);
    }

    /// Online with a fixed player count, after `delay`
    struct SlowSource {
        delay: Duration,
        players: u32,
    }

    #[async_trait::async_trait]
    impl crate::services::upstream_client::StatusSource for SlowSource {
        async fn fetch_live(
            &self,
            _address: &str,
            _timeout: Duration,
        ) -> crate::errors::FetchResult<StatusSnapshot> {
            tokio::time::sleep(self.delay).await;
            Ok(live(self.players))
        }
    }

    fn slow_hub(players: u32) -> Arc<BroadcastHub> {
        let aggregator = Arc::new(SnapshotAggregator::new(
            Arc::new(SlowSource {
                delay: Duration::from_secs(2),
                players,
            }),
            Arc::new(StatusCache::new()),
            Arc::new(InMemorySettingsRepository::new()),
            &GameServerConfig::default(),
        ));
        Arc::new(BroadcastHub::new(aggregator, Duration::from_secs(30)))
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_welcome_resolution_closes_the_newcomer() {
        let hub = slow_hub(3);
        let connection = RecordingConnection::default();

        let pending = {
            let hub = hub.clone();
            let connection = connection.clone();
            tokio::spawn(async move { hub.subscribe(connection).await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        hub.shutdown().await;

        assert_eq!(pending.await.unwrap(), Err(HubError::ShutDown));
        assert_eq!(hub.subscriber_count().await, 0);
        assert_eq!(connection.messages(), vec![OutboundMessage::Close]);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_during_welcome_resolution_is_not_missed() {
        let hub = slow_hub(3);
        let connection = RecordingConnection::default();

        let pending = {
            let hub = hub.clone();
            let connection = connection.clone();
            tokio::spawn(async move { hub.subscribe(connection).await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        let report = hub.publish(&live(12)).await.unwrap();
        assert_eq!(report.attempted, 0);

        pending.await.unwrap().unwrap();

        let stats = connection.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].players, 12);
    }

    #[tokio::test]
    async fn channel_connection_reports_full_and_closed() {
        let (tx, rx) = mpsc::channel(1);
        assert_eq!(tx.deliver(OutboundMessage::Ping), Ok(()));
        assert_eq!(
            tx.deliver(OutboundMessage::Ping),
            Err(DeliveryFailure::Full)
        );
        drop(rx);
        assert_eq!(
            tx.deliver(OutboundMessage::Ping),
            Err(DeliveryFailure::Closed)
        );
    }
}
