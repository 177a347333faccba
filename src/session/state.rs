//! Session state
//!
//! A session is the owner side of every subscription: it knows which remote
//! streams exist, hands out subscribers bound to them, and shares one
//! channel governor, one event dispatcher and one transport between all of
//! them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use tokio::sync::RwLock;

use crate::dispatch::{EventDispatcher, SubscriberObserver};
use crate::error::{Error, Result};
use crate::governor::ResourceGovernor;
use crate::stream::{StreamDescriptor, StreamId};
use crate::subscriber::{SubscribeOptions, Subscriber, SubscriberConfig, SubscriptionId};
use crate::transport::MediaTransport;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Owner of stream discovery and subscriber lifetimes
pub struct Session {
    /// Unique session ID
    id: u64,

    /// Configuration shared by all subscribers
    config: SubscriberConfig,

    /// Channel budget
    governor: ResourceGovernor,

    /// Observer delivery context
    dispatcher: EventDispatcher,

    /// Media engine
    transport: Arc<dyn MediaTransport>,

    /// Announced remote streams
    streams: RwLock<HashMap<StreamId, Arc<StreamDescriptor>>>,

    /// Live subscribers (held weakly; callers own them)
    subscribers: RwLock<HashMap<SubscriptionId, Weak<Subscriber>>>,

    /// Set by `disconnect()`
    closed: AtomicBool,

    created_at: Instant,
}

impl Session {
    /// Create a session with its own governor sized from `config`
    ///
    /// The channel budget is per session. Use [`Session::with_governor`]
    /// with one shared [`ResourceGovernor`] to enforce a device-wide
    /// ceiling across sessions.
    ///
    /// Spawns the dispatch task, so it must be called from within a Tokio
    /// runtime.
    pub fn new(config: SubscriberConfig, transport: Arc<dyn MediaTransport>) -> Arc<Self> {
        let governor = ResourceGovernor::new(config.max_active_channels);
        Self::with_governor(config, transport, governor)
    }

    /// Create a session that shares an existing governor
    ///
    /// Use this when several sessions in one process must respect a single
    /// device-wide ceiling.
    pub fn with_governor(
        config: SubscriberConfig,
        transport: Arc<dyn MediaTransport>,
        governor: ResourceGovernor,
    ) -> Arc<Self> {
        let (dispatcher, _task) = EventDispatcher::spawn();
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = id,
            ceiling = governor.ceiling(),
            "Session created"
        );

        Arc::new(Self {
            id,
            config,
            governor,
            dispatcher,
            transport,
            streams: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            created_at: Instant::now(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }

    pub fn governor(&self) -> &ResourceGovernor {
        &self.governor
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn transport(&self) -> &Arc<dyn MediaTransport> {
        &self.transport
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Time since the session was created
    pub fn duration(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Announce a remote stream
    ///
    /// Descriptors are immutable: announcing an ID that is already known
    /// returns the existing descriptor unchanged.
    pub async fn add_stream(&self, descriptor: StreamDescriptor) -> Arc<StreamDescriptor> {
        let mut streams = self.streams.write().await;

        if let Some(existing) = streams.get(descriptor.id()) {
            tracing::debug!(stream = %descriptor.id(), "Stream already known");
            return Arc::clone(existing);
        }

        let descriptor = Arc::new(descriptor);
        streams.insert(descriptor.id().clone(), Arc::clone(&descriptor));

        tracing::info!(
            session_id = self.id,
            stream = %descriptor.id(),
            audio = descriptor.has_audio(),
            video = descriptor.has_video(),
            "Stream added"
        );

        descriptor
    }

    /// Look up an announced stream
    pub async fn stream(&self, id: &StreamId) -> Option<Arc<StreamDescriptor>> {
        self.streams.read().await.get(id).cloned()
    }

    /// All announced streams
    pub async fn streams(&self) -> Vec<Arc<StreamDescriptor>> {
        self.streams.read().await.values().cloned().collect()
    }

    /// Forget a stream and close every subscriber bound to it
    pub async fn remove_stream(&self, id: &StreamId) -> Option<Arc<StreamDescriptor>> {
        let removed = self.streams.write().await.remove(id)?;

        let bound: Vec<Arc<Subscriber>> = self
            .subscribers()
            .await
            .into_iter()
            .filter(|s| s.stream().id() == id)
            .collect();

        tracing::info!(
            session_id = self.id,
            stream = %id,
            subscribers = bound.len(),
            "Stream removed"
        );

        for subscriber in bound {
            subscriber.close().await;
        }

        Some(removed)
    }

    /// Bind a subscriber to an announced stream
    pub async fn subscribe<O>(
        self: &Arc<Self>,
        stream_id: &StreamId,
        observer: &Arc<O>,
        options: SubscribeOptions,
    ) -> Result<Arc<Subscriber>>
    where
        O: SubscriberObserver + 'static,
    {
        let stream = self
            .stream(stream_id)
            .await
            .ok_or_else(|| Error::StreamNotFound(stream_id.clone()))?;

        Subscriber::bind_with(self, stream, observer, options).await
    }

    /// Track a newly bound subscriber
    ///
    /// Checked under the write lock so a concurrent `disconnect()` either
    /// sees the subscriber or makes this fail.
    pub(crate) async fn register(&self, subscriber: &Arc<Subscriber>) -> Result<()> {
        let mut subscribers = self.subscribers.write().await;
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        subscribers.retain(|_, s| s.strong_count() > 0);
        subscribers.insert(subscriber.id(), Arc::downgrade(subscriber));
        Ok(())
    }

    /// Subscribers that are still alive
    pub async fn subscribers(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers
            .read()
            .await
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers().await.len()
    }

    /// Wait until all queued observer callbacks have run
    pub async fn flush_events(&self) {
        self.dispatcher.flush().await;
    }

    /// Close every subscriber and refuse new ones
    pub async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let subscribers = self.subscribers().await;
        tracing::info!(
            session_id = self.id,
            subscribers = subscribers.len(),
            "Session disconnecting"
        );

        for subscriber in subscribers {
            subscriber.close().await;
        }
        self.subscribers.write().await.clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("ceiling", &self.governor.ceiling())
            .field("closed", &self.is_closed())
            .finish()
    }
}
