//! Observer callback contract
//!
//! `on_connected` and `on_failed` are required. The quality callbacks
//! default to no-ops so an observer only implements what it cares about.
//!
//! All callbacks run on the session's dispatch task, one at a time and in
//! the order the events happened. They should return quickly; a slow
//! observer delays every subscription in the session.

use crate::error::Error;
use crate::stream::{StreamDescriptor, VideoDimensions};
use crate::subscriber::SubscriberContext;

/// Receives lifecycle and quality events for a subscription
pub trait SubscriberObserver: Send + Sync {
    /// The subscription connected to its stream
    fn on_connected(&self, ctx: &SubscriberContext);

    /// The subscription could not connect. No further events follow.
    fn on_failed(&self, ctx: &SubscriberContext, error: &Error);

    /// The first video frame was decoded
    fn on_first_video_frame(&self, _ctx: &SubscriberContext) {}

    /// The stream's encoded video size changed (e.g. device rotation)
    fn on_dimensions_changed(&self, _stream: &StreamDescriptor, _dimensions: VideoDimensions) {}

    /// The transport stopped sending video because connectivity degraded
    fn on_video_disabled(&self, _ctx: &SubscriberContext) {}

    /// Video resumed after degradation
    fn on_video_enabled(&self, _ctx: &SubscriberContext) {}

    /// The transport ended the stream after it had connected
    fn on_disconnected(&self, _ctx: &SubscriberContext, _reason: &str) {}
}
