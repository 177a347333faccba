//! Real-time media subscription core
//!
//! Binds local subscribers to remote audio/video streams announced by a
//! [`Session`], enforces a device-wide ceiling on concurrently decoded
//! channels, and reports lifecycle and quality events to an observer on a
//! single, ordered delivery context.
//!
//! The media transport (network, jitter buffer, decode) is supplied by the
//! application through the [`MediaTransport`] trait.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use media_subscriber::{
//!     Error, MediaTransport, Session, StreamDescriptor, SubscribeOptions, SubscriberConfig,
//!     SubscriberContext, SubscriberObserver, VideoDimensions,
//! };
//!
//! struct Logger;
//!
//! impl SubscriberObserver for Logger {
//!     fn on_connected(&self, ctx: &SubscriberContext) {
//!         println!("{} connected", ctx.subscription_id);
//!     }
//!
//!     fn on_failed(&self, ctx: &SubscriberContext, error: &Error) {
//!         println!("{} failed: {}", ctx.subscription_id, error);
//!     }
//! }
//!
//! # async fn example(transport: Arc<dyn MediaTransport>) -> media_subscriber::Result<()> {
//! let session = Session::new(SubscriberConfig::default(), transport);
//! let stream = session
//!     .add_stream(StreamDescriptor::new("stream-1", true, true, VideoDimensions::new(640, 480)))
//!     .await;
//!
//! let observer = Arc::new(Logger);
//! let subscriber = session
//!     .subscribe(stream.id(), &observer, SubscribeOptions::audio_only())
//!     .await?;
//! subscriber.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod governor;
pub mod media;
pub mod session;
pub mod stats;
pub mod stream;
pub mod subscriber;
pub mod transport;

pub use dispatch::{EventDispatcher, SubscriberEvent, SubscriberObserver};
pub use error::{Error, Result, SubscriberErrorCode};
pub use governor::{ChannelReservation, ResourceGovernor};
pub use media::{FrameSink, MediaDeliveryChannel, MediaFrame, Modality};
pub use session::Session;
pub use stats::{ChannelStats, SubscriberStats};
pub use stream::{StreamDescriptor, StreamId, VideoDimensions};
pub use subscriber::{
    DeviceClass, SubscribeOptions, Subscriber, SubscriberConfig, SubscriberContext,
    SubscriptionId, SubscriptionState,
};
pub use transport::{MediaTransport, OpenRequest, TransportError, TransportEvent, TransportEvents};
