#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use media_subscriber::{
    Error, MediaFrame, MediaTransport, Modality, OpenRequest, StreamDescriptor, Subscriber,
    SubscriberContext, SubscriberErrorCode, SubscriberObserver, SubscriptionId,
    SubscriptionState, TransportError, TransportEvents, VideoDimensions,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Transport double: records requests and exposes each subscription's
/// event sender so tests can play the network side.
#[derive(Default)]
pub struct MockTransport {
    links: Mutex<HashMap<SubscriptionId, TransportEvents>>,
    requests: Mutex<Vec<OpenRequest>>,
    stopped: Mutex<Vec<SubscriptionId>>,
    reject: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject_opens(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn events(&self, id: SubscriptionId) -> TransportEvents {
        self.links
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .expect("subscription was never opened")
    }

    pub fn requests(&self) -> Vec<OpenRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request(&self, id: SubscriptionId) -> Option<OpenRequest> {
        self.requests()
            .into_iter()
            .find(|r| r.subscription_id == id)
    }

    pub fn stopped(&self) -> Vec<SubscriptionId> {
        self.stopped.lock().unwrap().clone()
    }
}

impl MediaTransport for MockTransport {
    fn open(&self, request: OpenRequest, events: TransportEvents) -> Result<(), TransportError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("media server unreachable".into()));
        }
        self.links
            .lock()
            .unwrap()
            .insert(request.subscription_id, events);
        self.requests.lock().unwrap().push(request);
        Ok(())
    }

    fn stop(&self, subscription_id: SubscriptionId) {
        self.stopped.lock().unwrap().push(subscription_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Connected,
    Failed(SubscriberErrorCode),
    FirstVideoFrame,
    Dimensions(VideoDimensions),
    VideoDisabled,
    VideoEnabled,
    Disconnected,
}

/// Observer that records every callback
#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<Seen>>,
    in_callback: AtomicBool,
    overlapped: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every callback block for `delay`
    pub fn slow(delay: Duration) -> Arc<Self> {
        let recorder = Self::default();
        *recorder.delay.lock().unwrap() = Some(delay);
        Arc::new(recorder)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    pub async fn wait_for_len(&self, len: usize) {
        eventually(|| self.seen.lock().unwrap().len() >= len).await;
    }

    fn record(&self, seen: Seen) {
        if self.in_callback.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        if let Some(delay) = *self.delay.lock().unwrap() {
            std::thread::sleep(delay);
        }
        self.seen.lock().unwrap().push(seen);
        self.in_callback.store(false, Ordering::SeqCst);
    }
}

impl SubscriberObserver for Recorder {
    fn on_connected(&self, _ctx: &SubscriberContext) {
        self.record(Seen::Connected);
    }

    fn on_failed(&self, _ctx: &SubscriberContext, error: &Error) {
        self.record(Seen::Failed(error.code()));
    }

    fn on_first_video_frame(&self, _ctx: &SubscriberContext) {
        self.record(Seen::FirstVideoFrame);
    }

    fn on_dimensions_changed(&self, _stream: &StreamDescriptor, dimensions: VideoDimensions) {
        self.record(Seen::Dimensions(dimensions));
    }

    fn on_video_disabled(&self, _ctx: &SubscriberContext) {
        self.record(Seen::VideoDisabled);
    }

    fn on_video_enabled(&self, _ctx: &SubscriberContext) {
        self.record(Seen::VideoEnabled);
    }

    fn on_disconnected(&self, _ctx: &SubscriberContext, _reason: &str) {
        self.record(Seen::Disconnected);
    }
}

pub fn camera(id: &str) -> StreamDescriptor {
    StreamDescriptor::new(id, true, true, VideoDimensions::new(640, 480))
}

pub fn video(ts: u32, width: u32, height: u32) -> MediaFrame {
    MediaFrame::video(ts, Bytes::from_static(&[0u8; 16]), VideoDimensions::new(width, height))
}

pub fn audio(ts: u32) -> MediaFrame {
    MediaFrame::audio(ts, Bytes::from_static(&[0u8; 8]))
}

/// Poll a condition until it holds (2 s limit)
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

pub async fn wait_for_state(subscriber: &Subscriber, state: SubscriptionState) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while subscriber.state().await != state {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("subscriber did not reach state in time");
}

/// Wait until a channel has delivered `count` frames
pub async fn wait_for_delivered(subscriber: &Subscriber, modality: Modality, count: u64) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let stats = subscriber.stats().await;
            let channel = match modality {
                Modality::Audio => stats.audio,
                Modality::Video => stats.video,
            };
            if channel.map_or(0, |c| c.frames_delivered) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("frames not delivered in time");
}
