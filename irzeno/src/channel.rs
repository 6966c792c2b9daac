//! Canal de métadonnées live (abonnement SSE)
//!
//! Ce module gère l'abonnement push aux métadonnées "now playing" d'une station:
//! - Au plus un abonnement ouvert à la fois, chaque ouverture ferme le précédent
//! - Chaque abonnement porte un `SessionId` croissant
//! - Les événements d'une session périmée sont ignorés par [`MetadataChannel::accept`]
//! - Reconnexion bornée avec backoff exponentiel, annulée par `close()`
//!
//! # Architecture
//!
//! La connexion tourne dans une tâche tokio qui ne fait qu'envoyer des
//! [`ChannelEvent`] sur un canal. Le propriétaire les récupère avec
//! [`MetadataChannel::next_event`] et les repasse à [`MetadataChannel::accept`],
//! qui est le seul endroit où l'état et les dernières métadonnées changent.
//!
//! ```no_run
//! use irzeno::{HttpTransport, MetadataChannel};
//! use std::sync::Arc;
//!
//! # async fn demo() -> irzeno::Result<()> {
//! let mut channel = MetadataChannel::new(Arc::new(HttpTransport::new()?));
//! channel.open("https://api.zeno.fm/mounts/metadata/subscribe/fdgs82xkzhhvv");
//!
//! while let Some(event) = channel.next_event().await {
//!     if let Some(meta) = channel.accept(event) {
//!         println!("{:?}", meta.title());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::Error;
use crate::models::StreamMetadata;
use crate::sse::SseParser;
use crate::transport::MetadataTransport;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Types
// ============================================================================

/// Generation number of a metadata subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No subscription
    #[default]
    Idle,
    /// Subscription opened, not connected yet
    Subscribing,
    /// Connected and receiving
    Active,
    /// Last connection attempt failed (a retry may be pending)
    Errored,
}

/// Event emitted by a subscription task
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The push connection is established
    Connected { session: SessionId },
    /// A well-formed metadata message
    Metadata {
        session: SessionId,
        metadata: StreamMetadata,
    },
    /// The connection failed or was closed by the server
    TransportError {
        session: SessionId,
        error: String,
        /// Delay before the next attempt, `None` when giving up
        retry_in: Option<Duration>,
    },
}

impl ChannelEvent {
    /// Session this event belongs to
    pub fn session(&self) -> SessionId {
        match self {
            ChannelEvent::Connected { session }
            | ChannelEvent::Metadata { session, .. }
            | ChannelEvent::TransportError { session, .. } => *session,
        }
    }
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Bounded exponential backoff for the push connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failures tolerated before giving up (0 = never reconnect)
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound of the delay
    pub max_delay: Duration,
    /// A connection silent for this long counts as failed (zero disables)
    pub idle_timeout: Duration,
}

/// Uptime after which a connection that never delivered a message still
/// resets the failure count
const STABLE_CONNECTION: Duration = Duration::from_secs(60);

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
        }
    }
}

impl ReconnectPolicy {
    /// Policy that never reconnects
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), doubling from `base`
    pub fn delay_for(&self, attempt: u32, base: Duration) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        base.saturating_mul(factor).min(self.max_delay)
    }

    /// Bring a server `retry:` hint back within `initial_delay..=max_delay`
    pub fn clamp_hint(&self, hint: Duration) -> Duration {
        hint.max(self.initial_delay).min(self.max_delay)
    }
}

// ============================================================================
// MetadataChannel
// ============================================================================

struct Subscription {
    session: SessionId,
    url: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owner of the single metadata subscription
pub struct MetadataChannel {
    transport: Arc<dyn MetadataTransport>,
    policy: ReconnectPolicy,
    state: ChannelState,
    latest: StreamMetadata,
    subscription: Option<Subscription>,
    next_session: u64,
    events_tx: mpsc::UnboundedSender<ChannelEvent>,
    events_rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl fmt::Debug for MetadataChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataChannel")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("latest", &self.latest)
            .field("session", &self.session())
            .field("url", &self.url())
            .finish()
    }
}

impl MetadataChannel {
    /// Create an idle channel with the default reconnect policy
    pub fn new(transport: Arc<dyn MetadataTransport>) -> Self {
        Self::with_policy(transport, ReconnectPolicy::default())
    }

    pub fn with_policy(transport: Arc<dyn MetadataTransport>, policy: ReconnectPolicy) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            policy,
            state: ChannelState::Idle,
            latest: StreamMetadata::default(),
            subscription: None,
            next_session: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Last accepted metadata of the current subscription
    pub fn latest(&self) -> &StreamMetadata {
        &self.latest
    }

    /// Session of the open subscription
    pub fn session(&self) -> Option<SessionId> {
        self.subscription.as_ref().map(|s| s.session)
    }

    /// URL of the open subscription
    pub fn url(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.url.as_str())
    }

    pub fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    /// Open a subscription, closing the previous one first
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&mut self, url: impl Into<String>) -> SessionId {
        self.close();

        self.next_session += 1;
        let session = SessionId(self.next_session);
        let url = url.into();
        let cancel = CancellationToken::new();

        let task = SubscriptionTask {
            transport: self.transport.clone(),
            url: url.clone(),
            session,
            policy: self.policy,
            base_delay: self.policy.initial_delay,
            events: self.events_tx.clone(),
        };
        let handle = tokio::spawn(task.run(cancel.clone()));

        tracing::debug!("Metadata subscription {} opened: {}", session, url);
        self.subscription = Some(Subscription {
            session,
            url,
            cancel,
            task: handle,
        });
        self.state = ChannelState::Subscribing;
        session
    }

    /// Close the subscription and cancel any pending retry
    ///
    /// Calling it on an idle channel does nothing besides resetting the
    /// metadata.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel.cancel();
            subscription.task.abort();
            tracing::debug!("Metadata subscription {} closed", subscription.session);
        }
        self.latest = StreamMetadata::default();
        self.state = ChannelState::Idle;
    }

    /// Wait for the next event from any subscription task
    ///
    /// The events may belong to a closed session: pass them to
    /// [`accept`](Self::accept) which filters them.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events_rx.recv().await
    }

    /// Apply an event to the channel
    ///
    /// Returns the metadata when the event is a message of the current
    /// session. Events from any other session are dropped.
    pub fn accept(&mut self, event: ChannelEvent) -> Option<StreamMetadata> {
        let current = self.session();
        if current != Some(event.session()) {
            tracing::debug!(
                "Dropping event from stale session {} (current: {:?})",
                event.session(),
                current
            );
            return None;
        }

        match event {
            ChannelEvent::Connected { session } => {
                tracing::info!("Metadata stream {} connected", session);
                self.state = ChannelState::Active;
                None
            }
            ChannelEvent::Metadata { metadata, .. } => {
                self.state = ChannelState::Active;
                self.latest = metadata.clone();
                Some(metadata)
            }
            ChannelEvent::TransportError {
                session,
                error,
                retry_in,
            } => {
                self.state = ChannelState::Errored;
                match retry_in {
                    Some(delay) => tracing::warn!(
                        "Metadata stream {} failed: {} (retrying in {:?})",
                        session,
                        error,
                        delay
                    ),
                    None => tracing::warn!(
                        "Metadata stream {} failed: {} (giving up)",
                        session,
                        error
                    ),
                }
                None
            }
        }
    }
}

impl Drop for MetadataChannel {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Subscription task
// ============================================================================

struct SubscriptionTask {
    transport: Arc<dyn MetadataTransport>,
    url: String,
    session: SessionId,
    policy: ReconnectPolicy,
    base_delay: Duration,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

impl SubscriptionTask {
    async fn run(mut self, cancel: CancellationToken) {
        let mut failures: u32 = 0;

        loop {
            let (healthy, error) = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = self.follow() => outcome,
            };

            // A server that accepts then drops at once still uses up retries
            if healthy {
                failures = 0;
            }
            failures += 1;

            let retry_in = (failures <= self.policy.max_retries)
                .then(|| self.policy.delay_for(failures - 1, self.base_delay));

            if self
                .events
                .send(ChannelEvent::TransportError {
                    session: self.session,
                    error: error.to_string(),
                    retry_in,
                })
                .is_err()
            {
                return;
            }

            let Some(delay) = retry_in else {
                return;
            };

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One connection; returns whether it proved healthy and why it ended
    ///
    /// A connection is healthy once it delivered a metadata message or
    /// stayed up for [`STABLE_CONNECTION`].
    async fn follow(&mut self) -> (bool, Error) {
        let mut stream = match self.transport.connect(&self.url).await {
            Ok(stream) => stream,
            Err(e) => return (false, e),
        };

        if self
            .events
            .send(ChannelEvent::Connected {
                session: self.session,
            })
            .is_err()
        {
            return (false, Error::StreamClosed);
        }

        let connected_at = tokio::time::Instant::now();
        let mut delivered = false;
        let healthy =
            |delivered: bool| delivered || connected_at.elapsed() >= STABLE_CONNECTION;

        let idle = self.policy.idle_timeout;
        let mut parser = SseParser::new();
        loop {
            let next = if idle.is_zero() {
                Ok(stream.next().await)
            } else {
                tokio::time::timeout(idle, stream.next()).await
            };
            let chunk = match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => return (healthy(delivered), e),
                Ok(None) => break,
                Err(_) => return (healthy(delivered), Error::StreamIdle(idle)),
            };

            for event in parser.feed(&chunk) {
                if !event.is_message() {
                    continue;
                }
                match StreamMetadata::from_json(&event.data) {
                    Ok(metadata) => {
                        delivered = true;
                        let _ = self.events.send(ChannelEvent::Metadata {
                            session: self.session,
                            metadata,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Discarding malformed metadata on session {}: {}",
                            self.session,
                            e
                        );
                    }
                }
            }

            if let Some(retry) = parser.retry() {
                self.base_delay = self.policy.clamp_hint(retry);
            }
        }

        (healthy(delivered), Error::StreamClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ByteStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::channel::mpsc as fmpsc;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Feed = fmpsc::UnboundedSender<crate::Result<Bytes>>;

    /// Hands out scripted connections in order; extra connects never resolve
    #[derive(Default)]
    struct FakeTransport {
        connections: Mutex<VecDeque<crate::Result<ByteStream>>>,
        urls: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn push_stream(&self) -> Feed {
            let (tx, rx) = fmpsc::unbounded();
            self.connections.lock().unwrap().push_back(Ok(rx.boxed()));
            tx
        }

        fn push_failure(&self, status: u16) {
            self.connections
                .lock()
                .unwrap()
                .push_back(Err(Error::HttpStatus(status)));
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetadataTransport for FakeTransport {
        async fn connect(&self, url: &str) -> crate::Result<ByteStream> {
            self.urls.lock().unwrap().push(url.to_string());
            let next = self.connections.lock().unwrap().pop_front();
            match next {
                Some(result) => result,
                None => futures::future::pending().await,
            }
        }
    }

    fn send(feed: &Feed, text: &str) {
        feed.unbounded_send(Ok(Bytes::from(text.to_string()))).unwrap();
    }

    async fn next(channel: &mut MetadataChannel) -> ChannelEvent {
        tokio::time::timeout(Duration::from_secs(2), channel.next_event())
            .await
            .expect("timed out waiting for a channel event")
            .expect("event channel closed")
    }

    async fn pump(channel: &mut MetadataChannel) -> Option<StreamMetadata> {
        let event = next(channel).await;
        channel.accept(event)
    }

    fn fast_policy(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            max_retries,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            ..ReconnectPolicy::default()
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = ReconnectPolicy::default();
        let base = policy.initial_delay;
        let delays: Vec<u64> = (0..7).map(|n| policy.delay_for(n, base).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
        assert_eq!(policy.delay_for(64, base), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_open_connect_and_receive() {
        let transport = Arc::new(FakeTransport::default());
        let feed = transport.push_stream();
        let mut channel = MetadataChannel::new(transport.clone());

        let session = channel.open("http://meta/abc");
        assert_eq!(channel.state(), ChannelState::Subscribing);
        assert_eq!(channel.session(), Some(session));

        let event = next(&mut channel).await;
        assert_eq!(event, ChannelEvent::Connected { session });
        assert_eq!(channel.accept(event), None);
        assert_eq!(channel.state(), ChannelState::Active);

        send(&feed, "data: {\"streamTitle\":\"Song A\",\"artist\":\"Artist B\"}\n\n");
        let meta = pump(&mut channel).await.unwrap();
        assert_eq!(meta.title(), Some("Song A"));
        assert_eq!(channel.latest().artist(), Some("Artist B"));
        assert_eq!(transport.urls(), vec!["http://meta/abc".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_discarded() {
        let transport = Arc::new(FakeTransport::default());
        let feed = transport.push_stream();
        let mut channel = MetadataChannel::new(transport);

        channel.open("http://meta/abc");
        let connected = next(&mut channel).await;
        channel.accept(connected);

        send(&feed, "data: not-json\n\ndata: [1,2]\n\n");
        send(&feed, "event: ping\ndata: {\"streamTitle\":\"ignored\"}\n\n");
        send(&feed, "data: {\"streamTitle\":\"Valid\"}\n\n");

        let meta = pump(&mut channel).await.unwrap();
        assert_eq!(meta.title(), Some("Valid"));
        assert_eq!(channel.state(), ChannelState::Active);
    }

    #[tokio::test]
    async fn test_stale_session_events_are_dropped() {
        let transport = Arc::new(FakeTransport::default());
        let mut channel = MetadataChannel::new(transport);

        let first = channel.open("http://meta/a");
        let second = channel.open("http://meta/b");
        assert!(second > first);

        let stale = ChannelEvent::Metadata {
            session: first,
            metadata: StreamMetadata::from_json(r#"{"streamTitle":"Old"}"#).unwrap(),
        };
        assert_eq!(channel.accept(stale), None);
        assert!(channel.latest().is_empty());
        assert_eq!(channel.state(), ChannelState::Subscribing);
        assert_eq!(channel.url(), Some("http://meta/b"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_resets() {
        let transport = Arc::new(FakeTransport::default());
        let feed = transport.push_stream();
        let mut channel = MetadataChannel::new(transport);

        let session = channel.open("http://meta/abc");
        pump(&mut channel).await;
        send(&feed, "data: {\"streamTitle\":\"A\"}\n\n");
        pump(&mut channel).await;
        assert!(!channel.latest().is_empty());

        channel.close();
        channel.close();
        assert_eq!(channel.state(), ChannelState::Idle);
        assert!(!channel.is_open());
        assert!(channel.latest().is_empty());

        // A message already queued for the closed session changes nothing
        let late = ChannelEvent::Metadata {
            session,
            metadata: StreamMetadata::from_json(r#"{"streamTitle":"Late"}"#).unwrap(),
        };
        assert_eq!(channel.accept(late), None);
        assert!(channel.latest().is_empty());
    }

    #[tokio::test]
    async fn test_failure_without_reconnect() {
        let transport = Arc::new(FakeTransport::default());
        transport.push_failure(503);
        let mut channel = MetadataChannel::with_policy(transport.clone(), ReconnectPolicy::disabled());

        let session = channel.open("http://meta/abc");
        let event = next(&mut channel).await;
        match &event {
            ChannelEvent::TransportError { retry_in, error, .. } => {
                assert_eq!(*retry_in, None);
                assert!(error.contains("503"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        channel.accept(event);
        assert_eq!(channel.state(), ChannelState::Errored);
        assert_eq!(channel.session(), Some(session));
        assert_eq!(transport.urls().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnects_after_failure() {
        let transport = Arc::new(FakeTransport::default());
        transport.push_failure(500);
        let feed = transport.push_stream();
        let mut channel = MetadataChannel::with_policy(transport.clone(), fast_policy(3));

        channel.open("http://meta/abc");
        let failure = next(&mut channel).await;
        assert!(matches!(
            failure,
            ChannelEvent::TransportError { retry_in: Some(d), .. } if d == Duration::from_millis(10)
        ));
        channel.accept(failure);
        assert_eq!(channel.state(), ChannelState::Errored);

        let connected = next(&mut channel).await;
        assert!(matches!(connected, ChannelEvent::Connected { .. }));
        channel.accept(connected);
        assert_eq!(channel.state(), ChannelState::Active);

        send(&feed, "data: {\"streamTitle\":\"Back\"}\n\n");
        let meta = pump(&mut channel).await.unwrap();
        assert_eq!(meta.title(), Some("Back"));
        assert_eq!(transport.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let transport = Arc::new(FakeTransport::default());
        for _ in 0..3 {
            transport.push_failure(502);
        }
        let mut channel = MetadataChannel::with_policy(transport.clone(), fast_policy(2));

        channel.open("http://meta/abc");
        let mut retries = Vec::new();
        for _ in 0..3 {
            match next(&mut channel).await {
                ChannelEvent::TransportError { retry_in, .. } => retries.push(retry_in),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(
            retries,
            vec![
                Some(Duration::from_millis(10)),
                Some(Duration::from_millis(20)),
                None
            ]
        );
        assert_eq!(transport.urls().len(), 3);
    }

    #[tokio::test]
    async fn test_server_retry_hint_and_stream_close() {
        let transport = Arc::new(FakeTransport::default());
        let feed = transport.push_stream();
        let mut channel = MetadataChannel::with_policy(transport, fast_policy(1));

        channel.open("http://meta/abc");
        pump(&mut channel).await;

        send(&feed, "retry: 25\n\n");
        drop(feed);

        match next(&mut channel).await {
            ChannelEvent::TransportError { error, retry_in, .. } => {
                assert_eq!(error, Error::StreamClosed.to_string());
                assert_eq!(retry_in, Some(Duration::from_millis(25)));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_then_close_exhausts_retries() {
        let transport = Arc::new(FakeTransport::default());
        for _ in 0..10 {
            let feed = transport.push_stream();
            send(&feed, "retry: 0\n\n");
        }
        let mut channel = MetadataChannel::with_policy(transport.clone(), fast_policy(2));

        channel.open("http://meta/abc");
        let mut retries = Vec::new();
        while retries.last() != Some(&None) {
            match next(&mut channel).await {
                ChannelEvent::Connected { .. } => {}
                ChannelEvent::TransportError { retry_in, .. } => retries.push(retry_in),
                other => panic!("unexpected event {:?}", other),
            }
        }

        // The zero hint is raised to the initial delay
        assert_eq!(
            retries,
            vec![
                Some(Duration::from_millis(10)),
                Some(Duration::from_millis(20)),
                None
            ]
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.urls().len(), 3);
    }

    #[test]
    fn test_retry_hint_is_clamped() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.clamp_hint(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(policy.clamp_hint(Duration::from_secs(5)), Duration::from_secs(5));
        assert_eq!(policy.clamp_hint(Duration::from_secs(600)), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_delivered_message_resets_failures() {
        let transport = Arc::new(FakeTransport::default());
        transport.push_failure(500);
        let feed = transport.push_stream();
        let mut channel = MetadataChannel::with_policy(transport.clone(), fast_policy(1));

        channel.open("http://meta/abc");
        assert!(matches!(
            next(&mut channel).await,
            ChannelEvent::TransportError { retry_in: Some(_), .. }
        ));
        assert!(matches!(next(&mut channel).await, ChannelEvent::Connected { .. }));

        send(&feed, "data: {\"streamTitle\":\"A\"}\n\n");
        assert!(matches!(next(&mut channel).await, ChannelEvent::Metadata { .. }));
        drop(feed);

        match next(&mut channel).await {
            ChannelEvent::TransportError { retry_in, .. } => {
                assert_eq!(retry_in, Some(Duration::from_millis(10)));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_connection_times_out() {
        let transport = Arc::new(FakeTransport::default());
        let feed = transport.push_stream();
        let policy = ReconnectPolicy {
            idle_timeout: Duration::from_millis(50),
            ..ReconnectPolicy::disabled()
        };
        let mut channel = MetadataChannel::with_policy(transport, policy);

        channel.open("http://meta/abc");
        assert!(matches!(next(&mut channel).await, ChannelEvent::Connected { .. }));

        match next(&mut channel).await {
            ChannelEvent::TransportError {
                error, retry_in, ..
            } => {
                assert_eq!(error, Error::StreamIdle(Duration::from_millis(50)).to_string());
                assert_eq!(retry_in, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
        drop(feed);
    }

    #[tokio::test]
    async fn test_keepalive_comments_hold_the_connection() {
        let transport = Arc::new(FakeTransport::default());
        let feed = transport.push_stream();
        let policy = ReconnectPolicy {
            idle_timeout: Duration::from_millis(150),
            ..ReconnectPolicy::disabled()
        };
        let mut channel = MetadataChannel::with_policy(transport, policy);

        channel.open("http://meta/abc");
        pump(&mut channel).await;

        let pinger = tokio::spawn(async move {
            for _ in 0..6 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                send(&feed, ": keep-alive\n\n");
            }
        });

        let outcome = tokio::time::timeout(Duration::from_millis(250), channel.next_event()).await;
        assert!(outcome.is_err(), "keep-alives should hold the connection");
        assert_eq!(channel.state(), ChannelState::Active);
        pinger.await.unwrap();
    }

    #[tokio::test]
    async fn test_close_cancels_pending_retry() {
        let transport = Arc::new(FakeTransport::default());
        transport.push_failure(500);
        let policy = ReconnectPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(50),
            ..ReconnectPolicy::default()
        };
        let mut channel = MetadataChannel::with_policy(transport.clone(), policy);

        channel.open("http://meta/abc");
        let failure = next(&mut channel).await;
        channel.accept(failure);
        channel.close();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(transport.urls().len(), 1);
    }
}
