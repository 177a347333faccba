//! Subscriber lifecycle and quality events

use crate::error::Error;
use crate::stream::VideoDimensions;
use crate::subscriber::SubscriberContext;

use super::observer::SubscriberObserver;

/// Event emitted by a subscription towards its observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberEvent {
    /// Stream connected
    Connected,
    /// Stream could not be connected (terminal)
    Failed(Error),
    /// First video frame decoded after connect
    FirstVideoFrame,
    /// Encoded video size changed
    DimensionsChanged(VideoDimensions),
    /// Transport stopped sending video; audio continues
    VideoDisabled,
    /// Transport resumed sending video
    VideoEnabled,
    /// Transport ended a connected stream (terminal)
    Disconnected { reason: String },
}

impl SubscriberEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SubscriberEvent::Connected => "connected",
            SubscriberEvent::Failed(_) => "failed",
            SubscriberEvent::FirstVideoFrame => "first_video_frame",
            SubscriberEvent::DimensionsChanged(_) => "dimensions_changed",
            SubscriberEvent::VideoDisabled => "video_disabled",
            SubscriberEvent::VideoEnabled => "video_enabled",
            SubscriberEvent::Disconnected { .. } => "disconnected",
        }
    }

    /// No further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriberEvent::Failed(_) | SubscriberEvent::Disconnected { .. }
        )
    }

    /// Invoke the matching observer callback
    pub(crate) fn notify(&self, observer: &dyn SubscriberObserver, ctx: &SubscriberContext) {
        match self {
            SubscriberEvent::Connected => observer.on_connected(ctx),
            SubscriberEvent::Failed(error) => observer.on_failed(ctx, error),
            SubscriberEvent::FirstVideoFrame => observer.on_first_video_frame(ctx),
            SubscriberEvent::DimensionsChanged(dims) => {
                observer.on_dimensions_changed(&ctx.stream, *dims)
            }
            SubscriberEvent::VideoDisabled => observer.on_video_disabled(ctx),
            SubscriberEvent::VideoEnabled => observer.on_video_enabled(ctx),
            SubscriberEvent::Disconnected { reason } => observer.on_disconnected(ctx, reason),
        }
    }
}
