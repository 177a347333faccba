//! Subscriber facade
//!
//! A [`Subscriber`] binds one stream of one session to an observer. It owns
//! the state machine, the delivery channels and the channel budget for that
//! binding.
//!
//! Two contexts touch a subscriber: the caller (start, close, toggles) and
//! the transport pump, a task spawned by `start()` that drains the
//! transport's event queue. Both go through the same `tokio::sync::Mutex`,
//! and every event is emitted while that lock is held, so the order events
//! reach the dispatcher is the order state changed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::dispatch::{EventDispatcher, SubscriberEvent, SubscriberObserver};
use crate::error::{Error, Result};
use crate::governor::{ChannelReservation, ResourceGovernor};
use crate::media::{DeliveryOutcome, FrameSink, MediaDeliveryChannel, MediaFrame, Modality};
use crate::session::Session;
use crate::stats::SubscriberStats;
use crate::stream::StreamDescriptor;
use crate::transport::{MediaTransport, OpenRequest, TransportEvent, TransportEvents};

use super::config::{SubscribeOptions, SubscriberConfig};
use super::context::{SubscriberContext, SubscriptionId};
use super::state::{StateMachine, SubscriptionState};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Mutable state shared between the caller and the transport pump
struct Inner {
    machine: StateMachine,
    options: SubscribeOptions,
    observer: Weak<dyn SubscriberObserver>,
    audio: Option<MediaDeliveryChannel>,
    video: Option<MediaDeliveryChannel>,
    audio_enabled: bool,
    video_enabled: bool,
    audio_sink: Option<Arc<dyn FrameSink>>,
    video_sink: Option<Arc<dyn FrameSink>>,
    reservation: Option<ChannelReservation>,
    transport_open: bool,
    pump: Option<JoinHandle<()>>,
    connected_at: Option<Instant>,
}

impl Inner {
    fn channel_mut(&mut self, modality: Modality) -> Option<&mut MediaDeliveryChannel> {
        match modality {
            Modality::Audio => self.audio.as_mut(),
            Modality::Video => self.video.as_mut(),
        }
    }
}

/// Release channels, budget and the transport binding
fn teardown(inner: &mut Inner, transport: &dyn MediaTransport, id: SubscriptionId) {
    inner.audio = None;
    inner.video = None;
    if let Some(reservation) = inner.reservation.take() {
        reservation.release();
    }
    if inner.transport_open {
        inner.transport_open = false;
        transport.stop(id);
    }
}

/// Client-side binding of a remote stream
///
/// Created in [`SubscriptionState::Idle`]. Nothing is received until
/// [`start`](Subscriber::start). Dropping the last handle tears the
/// subscription down like [`close`](Subscriber::close), without waiting
/// for pending observer callbacks.
pub struct Subscriber {
    id: SubscriptionId,
    session_id: u64,
    session: Weak<Session>,
    stream: Arc<StreamDescriptor>,
    config: SubscriberConfig,
    governor: ResourceGovernor,
    dispatcher: EventDispatcher,
    transport: Arc<dyn MediaTransport>,
    bound_at: Instant,
    inner: Mutex<Inner>,
}

impl Subscriber {
    /// Bind to `stream` with both modalities subscribed
    pub async fn bind<O>(
        session: &Arc<Session>,
        stream: Arc<StreamDescriptor>,
        observer: &Arc<O>,
    ) -> Result<Arc<Self>>
    where
        O: SubscriberObserver + 'static,
    {
        Self::bind_with(session, stream, observer, SubscribeOptions::default()).await
    }

    /// Bind to `stream` with explicit options
    ///
    /// The observer is held weakly: the caller keeps it alive.
    pub async fn bind_with<O>(
        session: &Arc<Session>,
        stream: Arc<StreamDescriptor>,
        observer: &Arc<O>,
        options: SubscribeOptions,
    ) -> Result<Arc<Self>>
    where
        O: SubscriberObserver + 'static,
    {
        if session.is_closed() {
            return Err(Error::SessionClosed);
        }

        let observer: Weak<O> = Arc::downgrade(observer);
        let observer: Weak<dyn SubscriberObserver> = observer;
        let id = SubscriptionId::from_raw(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed));

        let subscriber = Arc::new(Self {
            id,
            session_id: session.id(),
            session: Arc::downgrade(session),
            stream,
            config: session.config().clone(),
            governor: session.governor().clone(),
            dispatcher: session.dispatcher().clone(),
            transport: Arc::clone(session.transport()),
            bound_at: Instant::now(),
            inner: Mutex::new(Inner {
                machine: StateMachine::new(),
                options,
                observer,
                audio: None,
                video: None,
                audio_enabled: true,
                video_enabled: true,
                audio_sink: None,
                video_sink: None,
                reservation: None,
                transport_open: false,
                pump: None,
                connected_at: None,
            }),
        });

        session.register(&subscriber).await?;

        tracing::debug!(
            subscription = %id,
            session_id = subscriber.session_id,
            stream = %subscriber.stream.id(),
            audio = options.subscribe_audio,
            video = options.subscribe_video,
            "Subscriber bound"
        );

        Ok(subscriber)
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The stream this subscriber is bound to
    pub fn stream(&self) -> &Arc<StreamDescriptor> {
        &self.stream
    }

    /// The owning session, if it is still alive
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.upgrade()
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Context handed to observer callbacks
    pub fn context(&self) -> SubscriberContext {
        SubscriberContext::new(self.id, self.session_id, Arc::clone(&self.stream))
    }

    pub async fn state(&self) -> SubscriptionState {
        self.inner.lock().await.machine.state()
    }

    /// Replace the observer; events already queued still go to the old one
    pub async fn set_observer<O>(&self, observer: &Arc<O>)
    where
        O: SubscriberObserver + 'static,
    {
        let observer: Weak<O> = Arc::downgrade(observer);
        let observer: Weak<dyn SubscriberObserver> = observer;
        self.inner.lock().await.observer = observer;
    }

    pub async fn subscribe_audio(&self) -> bool {
        self.inner.lock().await.options.subscribe_audio
    }

    /// Choose whether to receive audio
    ///
    /// Only takes effect before `start()`. Afterwards the call is ignored
    /// and returns `false`.
    pub async fn set_subscribe_audio(&self, enabled: bool) -> bool {
        let mut inner = self.inner.lock().await;
        self.set_option(&mut inner, "subscribe_audio", |o| o.subscribe_audio = enabled)
    }

    pub async fn subscribe_video(&self) -> bool {
        self.inner.lock().await.options.subscribe_video
    }

    /// Choose whether to receive video
    ///
    /// Only takes effect before `start()`. Afterwards the call is ignored
    /// and returns `false`.
    pub async fn set_subscribe_video(&self, enabled: bool) -> bool {
        let mut inner = self.inner.lock().await;
        self.set_option(&mut inner, "subscribe_video", |o| o.subscribe_video = enabled)
    }

    fn set_option(
        &self,
        inner: &mut Inner,
        option: &'static str,
        apply: impl FnOnce(&mut SubscribeOptions),
    ) -> bool {
        let state = inner.machine.state();
        if state != SubscriptionState::Idle {
            tracing::debug!(
                subscription = %self.id,
                option = option,
                state = ?state,
                "Option change ignored after start"
            );
            return false;
        }
        apply(&mut inner.options);
        true
    }

    /// Enable or disable local audio playback
    pub async fn set_audio_enabled(&self, enabled: bool) {
        let mut inner = self.inner.lock().await;
        inner.audio_enabled = enabled;
        if let Some(channel) = inner.audio.as_mut() {
            channel.set_enabled(enabled);
        }
    }

    /// Enable or disable local video playback
    pub async fn set_video_enabled(&self, enabled: bool) {
        let mut inner = self.inner.lock().await;
        inner.video_enabled = enabled;
        if let Some(channel) = inner.video.as_mut() {
            channel.set_enabled(enabled);
        }
    }

    pub async fn audio_enabled(&self) -> bool {
        self.inner.lock().await.audio_enabled
    }

    pub async fn video_enabled(&self) -> bool {
        self.inner.lock().await.video_enabled
    }

    /// Custom video renderer, if set
    pub async fn video_sink(&self) -> Option<Arc<dyn FrameSink>> {
        self.inner.lock().await.video_sink.clone()
    }

    /// Route decoded video frames to `sink`; applies immediately
    pub async fn set_video_sink(&self, sink: Option<Arc<dyn FrameSink>>) {
        let mut inner = self.inner.lock().await;
        if let Some(channel) = inner.video.as_mut() {
            channel.set_sink(sink.clone());
        }
        inner.video_sink = sink;
    }

    /// Custom audio consumer, if set
    pub async fn audio_sink(&self) -> Option<Arc<dyn FrameSink>> {
        self.inner.lock().await.audio_sink.clone()
    }

    /// Route decoded audio frames to `sink`; applies immediately
    pub async fn set_audio_sink(&self, sink: Option<Arc<dyn FrameSink>>) {
        let mut inner = self.inner.lock().await;
        if let Some(channel) = inner.audio.as_mut() {
            channel.set_sink(sink.clone());
        }
        inner.audio_sink = sink;
    }

    /// Start receiving the stream
    ///
    /// Reserves channel budget, creates the delivery channels and asks the
    /// transport to connect. Returns as soon as the request is issued; the
    /// outcome arrives through the observer. Budget denial or a synchronous
    /// transport rejection fail the subscription (reported via
    /// `on_failed`), not this call. Calling `start` twice is an error.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.machine.start()?;

        let receive_audio = inner.options.subscribe_audio && self.stream.has_audio();
        let receive_video = inner.options.subscribe_video && self.stream.has_video();
        let requested = usize::from(receive_audio) + usize::from(receive_video);

        tracing::info!(
            subscription = %self.id,
            stream = %self.stream.id(),
            audio = receive_audio,
            video = receive_video,
            "Subscription starting"
        );

        let Some(reservation) = self.governor.reserve(requested) else {
            let error = Error::ResourceExhausted {
                requested,
                available: self.governor.available(),
            };
            self.fail_locked(&mut inner, error);
            return Ok(());
        };
        inner.reservation = Some(reservation);

        if receive_audio {
            let mut channel = MediaDeliveryChannel::audio();
            channel.set_enabled(inner.audio_enabled);
            channel.set_sink(inner.audio_sink.clone());
            inner.audio = Some(channel);
        }
        if receive_video {
            let mut channel = MediaDeliveryChannel::video(self.stream.video_dimensions());
            channel.set_enabled(inner.video_enabled);
            channel.set_sink(inner.video_sink.clone());
            inner.video = Some(channel);
        }

        let (events, rx) =
            TransportEvents::channel(self.id, self.config.transport_queue_capacity);
        let request = OpenRequest {
            subscription_id: self.id,
            session_id: self.session_id,
            stream: Arc::clone(&self.stream),
            receive_audio,
            receive_video,
        };

        if let Err(e) = self.transport.open(request, events) {
            self.fail_locked(&mut inner, Error::ConnectionFailure(e.to_string()));
            return Ok(());
        }
        inner.transport_open = true;
        inner.pump = Some(tokio::spawn(pump(
            Arc::downgrade(self),
            rx,
            self.config.connect_timeout,
        )));

        Ok(())
    }

    /// Tear the subscription down
    ///
    /// Valid in any state and idempotent. Waits for in-flight frame
    /// delivery and for every observer callback already queued for this
    /// subscription, so the observer is not called once this returns.
    /// Must not be awaited from an observer callback.
    pub async fn close(&self) {
        let pump = {
            let mut inner = self.inner.lock().await;
            if let Some(transition) = inner.machine.close() {
                teardown(&mut inner, self.transport.as_ref(), self.id);
                self.dispatcher.retire(self.id);
                tracing::info!(
                    subscription = %self.id,
                    stream = %self.stream.id(),
                    from = ?transition.from,
                    "Subscription closed"
                );
            }
            inner.pump.take()
        };

        if let Some(pump) = pump {
            pump.abort();
        }

        self.dispatcher.flush().await;
    }

    /// Snapshot of this subscription's counters
    pub async fn stats(&self) -> SubscriberStats {
        let inner = self.inner.lock().await;
        let video_dimensions = inner
            .video
            .as_ref()
            .map(|c| c.dimensions())
            .unwrap_or_else(|| self.stream.video_dimensions());

        SubscriberStats {
            subscription_id: self.id,
            stream_id: self.stream.id().clone(),
            state: inner.machine.state(),
            audio: inner.audio.as_ref().map(|c| c.stats()),
            video: inner.video.as_ref().map(|c| c.stats()),
            video_dimensions,
            bound_at: self.bound_at,
            connected_at: inner.connected_at,
        }
    }

    /// Apply one transport event; returns the resulting state
    async fn handle_transport_event(&self, event: TransportEvent) -> SubscriptionState {
        let mut inner = self.inner.lock().await;

        match event {
            TransportEvent::Connected => {
                if inner.machine.connected().is_some() {
                    inner.connected_at = Some(Instant::now());
                    if let Some(channel) = inner.audio.as_mut() {
                        channel.start();
                    }
                    if let Some(channel) = inner.video.as_mut() {
                        channel.start();
                    }
                    tracing::info!(
                        subscription = %self.id,
                        stream = %self.stream.id(),
                        "Subscription connected"
                    );
                    self.emit(&inner, SubscriberEvent::Connected);
                } else {
                    self.ignored(&inner, "connected");
                }
            }
            TransportEvent::ConnectFailed { reason } => {
                if inner.machine.state() == SubscriptionState::Connecting {
                    self.fail_locked(&mut inner, Error::ConnectionFailure(reason));
                } else {
                    self.ignored(&inner, "connect_failed");
                }
            }
            TransportEvent::Frame(frame) => self.deliver_locked(&mut inner, &frame),
            TransportEvent::VideoDropped => {
                if inner.video.is_some() && inner.machine.video_dropped().is_some() {
                    if let Some(channel) = inner.video.as_mut() {
                        channel.set_suspended(true);
                    }
                    tracing::info!(
                        subscription = %self.id,
                        code = ?Error::TransportDegraded.code(),
                        "Video disabled by transport"
                    );
                    self.emit(&inner, SubscriberEvent::VideoDisabled);
                } else {
                    self.ignored(&inner, "video_dropped");
                }
            }
            TransportEvent::VideoRestored => {
                if inner.machine.video_restored().is_some() {
                    if let Some(channel) = inner.video.as_mut() {
                        channel.set_suspended(false);
                    }
                    tracing::info!(subscription = %self.id, "Video restored by transport");
                    self.emit(&inner, SubscriberEvent::VideoEnabled);
                } else {
                    self.ignored(&inner, "video_restored");
                }
            }
            TransportEvent::Disconnected { reason } => {
                if inner.machine.disconnected().is_some() {
                    teardown(&mut inner, self.transport.as_ref(), self.id);
                    tracing::info!(
                        subscription = %self.id,
                        reason = %reason,
                        "Stream disconnected by transport"
                    );
                    self.emit(&inner, SubscriberEvent::Disconnected { reason });
                    self.dispatcher.retire(self.id);
                } else {
                    self.ignored(&inner, "disconnected");
                }
            }
        }

        inner.machine.state()
    }

    /// Route a frame to its channel and turn the outcome into events
    fn deliver_locked(&self, inner: &mut Inner, frame: &MediaFrame) {
        let Some(channel) = inner.channel_mut(frame.modality) else {
            tracing::trace!(
                subscription = %self.id,
                modality = %frame.modality,
                "No channel for frame"
            );
            return;
        };

        if let DeliveryOutcome::Delivered {
            first_video_frame,
            dimensions_changed,
        } = channel.deliver(frame)
        {
            if first_video_frame {
                tracing::debug!(subscription = %self.id, "First video frame");
                self.emit(inner, SubscriberEvent::FirstVideoFrame);
            }
            if let Some(dimensions) = dimensions_changed {
                tracing::debug!(
                    subscription = %self.id,
                    dimensions = %dimensions,
                    "Video dimensions changed"
                );
                self.emit(inner, SubscriberEvent::DimensionsChanged(dimensions));
            }
        }
    }

    /// Connecting → Failed, releasing everything and reporting once
    fn fail_locked(&self, inner: &mut Inner, error: Error) {
        if inner.machine.fail().is_none() {
            return;
        }
        teardown(inner, self.transport.as_ref(), self.id);

        tracing::info!(
            subscription = %self.id,
            stream = %self.stream.id(),
            error = %error,
            "Subscription failed"
        );
        self.emit(inner, SubscriberEvent::Failed(error));
        self.dispatcher.retire(self.id);
    }

    fn emit(&self, inner: &Inner, event: SubscriberEvent) {
        self.dispatcher
            .emit(self.context(), inner.observer.clone(), event);
    }

    fn ignored(&self, inner: &Inner, input: &'static str) {
        tracing::debug!(
            subscription = %self.id,
            input = input,
            state = ?inner.machine.state(),
            "Transport input ignored"
        );
    }

    /// Connect deadline expired
    async fn connect_timed_out(&self, after: Duration) {
        let mut inner = self.inner.lock().await;
        let reason = format!("connect timed out after {}ms", after.as_millis());
        self.fail_locked(&mut inner, Error::ConnectionFailure(reason));
    }

    /// Transport dropped its event sender
    async fn transport_gone(&self) {
        let mut inner = self.inner.lock().await;
        let state = inner.machine.state();
        match state {
            SubscriptionState::Connecting => {
                self.fail_locked(&mut inner, Error::ConnectionFailure("transport closed".into()));
            }
            state if state.is_connected() => {
                drop(inner);
                self.handle_transport_event(TransportEvent::Disconnected {
                    reason: "transport closed".into(),
                })
                .await;
            }
            _ => {}
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let Subscriber {
            id,
            inner,
            transport,
            dispatcher,
            ..
        } = self;
        let inner = inner.get_mut();

        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        if inner.machine.close().is_some() {
            teardown(inner, &**transport, *id);
            dispatcher.retire(*id);
            tracing::debug!(subscription = %id, "Subscriber dropped");
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("session_id", &self.session_id)
            .field("stream", &self.stream.id())
            .finish()
    }
}

/// Transport-side context of a subscription
///
/// Holds the subscriber weakly so that dropping the last caller handle
/// ends the subscription.
async fn pump(
    subscriber: Weak<Subscriber>,
    mut rx: mpsc::Receiver<TransportEvent>,
    connect_timeout: Option<Duration>,
) {
    // A timeout too large to represent as an instant never fires
    let deadline = connect_timeout
        .and_then(|t| tokio::time::Instant::now().checked_add(t).map(|at| (at, t)));
    let mut state = SubscriptionState::Connecting;

    loop {
        let next = match deadline {
            Some((at, after)) if state == SubscriptionState::Connecting => {
                match tokio::time::timeout_at(at, rx.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        if let Some(subscriber) = subscriber.upgrade() {
                            subscriber.connect_timed_out(after).await;
                        }
                        return;
                    }
                }
            }
            _ => rx.recv().await,
        };

        let Some(subscriber) = subscriber.upgrade() else {
            return;
        };

        match next {
            Some(event) => {
                state = subscriber.handle_transport_event(event).await;
                if state.is_terminal() {
                    return;
                }
            }
            None => {
                subscriber.transport_gone().await;
                return;
            }
        }
    }
}
