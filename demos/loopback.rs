//! Loopback subscription demo
//!
//! Run with: cargo run --example loopback
//!
//! A fake transport "connects" after a short delay and then plays a
//! scripted stream: audio and video frames, a device rotation, a bandwidth
//! drop that disables video, and a recovery. A third subscription is
//! refused because the three-channel budget is already used.
//!
//! Set RUST_LOG=media_subscriber=debug to see the internal transitions.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use media_subscriber::{
    Error, MediaFrame, MediaTransport, OpenRequest, Session, StreamDescriptor, SubscribeOptions,
    Subscriber, SubscriberConfig, SubscriberContext, SubscriberObserver, SubscriptionId,
    TransportError, TransportEvent, TransportEvents, VideoDimensions,
};

/// Transport that synthesizes a short stream for every open request
struct LoopbackTransport;

impl MediaTransport for LoopbackTransport {
    fn open(&self, request: OpenRequest, events: TransportEvents) -> Result<(), TransportError> {
        tokio::spawn(play(request, events));
        Ok(())
    }

    fn stop(&self, subscription_id: SubscriptionId) {
        println!("[transport] stop {}", subscription_id);
    }
}

async fn play(request: OpenRequest, events: TransportEvents) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if !events.send(TransportEvent::Connected).await {
        return;
    }

    let landscape = request.stream.video_dimensions();
    let portrait = VideoDimensions::new(landscape.height, landscape.width);

    for i in 0..60u32 {
        let ts = i * 33;
        if request.receive_audio {
            events.try_send(TransportEvent::Frame(MediaFrame::audio(
                ts,
                Bytes::from(vec![0u8; 320]),
            )));
        }
        if request.receive_video {
            let dims = if (20..40).contains(&i) { portrait } else { landscape };
            events.try_send(TransportEvent::Frame(MediaFrame::video(
                ts,
                Bytes::from(vec![0u8; 1024]),
                dims,
            )));
        }
        match i {
            45 => {
                events.send(TransportEvent::VideoDropped).await;
            }
            52 => {
                events.send(TransportEvent::VideoRestored).await;
            }
            _ => {}
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Observer that prints every callback
struct PrintObserver;

impl SubscriberObserver for PrintObserver {
    fn on_connected(&self, ctx: &SubscriberContext) {
        println!("[{}] connected to {}", ctx.subscription_id, ctx.stream.id());
    }

    fn on_failed(&self, ctx: &SubscriberContext, error: &Error) {
        println!(
            "[{}] failed ({:?}): {}",
            ctx.subscription_id,
            error.code(),
            error
        );
    }

    fn on_first_video_frame(&self, ctx: &SubscriberContext) {
        println!("[{}] first video frame", ctx.subscription_id);
    }

    fn on_dimensions_changed(&self, stream: &StreamDescriptor, dimensions: VideoDimensions) {
        println!("[{}] dimensions now {}", stream.id(), dimensions);
    }

    fn on_video_disabled(&self, ctx: &SubscriberContext) {
        println!("[{}] video disabled", ctx.subscription_id);
    }

    fn on_video_enabled(&self, ctx: &SubscriberContext) {
        println!("[{}] video enabled", ctx.subscription_id);
    }
}

#[tokio::main]
async fn main() -> media_subscriber::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("media_subscriber=info")),
        )
        .init();

    let session = Session::new(
        SubscriberConfig::default().max_active_channels(3),
        Arc::new(LoopbackTransport),
    );
    let observer = Arc::new(PrintObserver);

    let camera = session
        .add_stream(
            StreamDescriptor::new("camera", true, true, VideoDimensions::new(640, 480))
                .with_name("Front camera"),
        )
        .await;
    let voice = session
        .add_stream(StreamDescriptor::audio_only("voice"))
        .await;
    let screen = session
        .add_stream(StreamDescriptor::new("screen", false, true, VideoDimensions::new(1280, 720)))
        .await;

    let full = Subscriber::bind(&session, camera, &observer).await?;
    full.start().await?;

    let audio = session
        .subscribe(voice.id(), &observer, SubscribeOptions::default())
        .await?;
    audio.start().await?;

    // Budget is 3 and both subscriptions above hold 3 channels
    let refused = Subscriber::bind(&session, screen, &observer).await?;
    refused.start().await?;

    tokio::time::sleep(Duration::from_millis(600)).await;

    for subscriber in [&full, &audio, &refused] {
        let stats = subscriber.stats().await;
        println!(
            "{} {:?}: {} frames, {} video dims",
            stats.subscription_id,
            stats.state,
            stats.total_frames_delivered(),
            stats.video_dimensions
        );
    }

    session.disconnect().await;
    Ok(())
}
