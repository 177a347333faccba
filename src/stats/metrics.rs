//! Statistics snapshots for subscriptions

use std::time::{Duration, Instant};

use crate::media::Modality;
use crate::stream::{StreamId, VideoDimensions};
use crate::subscriber::{SubscriptionId, SubscriptionState};

/// Counters for a single delivery channel
#[derive(Debug, Clone)]
pub struct ChannelStats {
    /// Channel modality
    pub modality: Modality,
    /// Local playback enabled
    pub enabled: bool,
    /// Suspended by transport degradation
    pub suspended: bool,
    /// Frames handed to the sink
    pub frames_delivered: u64,
    /// Frames discarded by the gate
    pub frames_dropped: u64,
    /// Payload bytes delivered
    pub bytes_delivered: u64,
}

impl ChannelStats {
    /// Fraction of offered frames that were dropped
    pub fn drop_ratio(&self) -> f64 {
        let total = self.frames_delivered + self.frames_dropped;
        if total > 0 {
            self.frames_dropped as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Subscription-level statistics
#[derive(Debug, Clone)]
pub struct SubscriberStats {
    /// Subscription ID
    pub subscription_id: SubscriptionId,
    /// Bound stream
    pub stream_id: StreamId,
    /// Current lifecycle state
    pub state: SubscriptionState,
    /// Audio channel counters, if an audio channel exists
    pub audio: Option<ChannelStats>,
    /// Video channel counters, if a video channel exists
    pub video: Option<ChannelStats>,
    /// Last known video dimensions
    pub video_dimensions: VideoDimensions,
    /// When the subscription was bound
    pub bound_at: Instant,
    /// When the transport reported the stream connected
    pub connected_at: Option<Instant>,
}

impl SubscriberStats {
    /// Time since the subscription was bound
    pub fn duration(&self) -> Duration {
        self.bound_at.elapsed()
    }

    /// Time from bind to connect
    pub fn time_to_connect(&self) -> Option<Duration> {
        self.connected_at
            .map(|at| at.saturating_duration_since(self.bound_at))
    }

    /// Frames delivered across both channels
    pub fn total_frames_delivered(&self) -> u64 {
        self.audio.as_ref().map_or(0, |c| c.frames_delivered)
            + self.video.as_ref().map_or(0, |c| c.frames_delivered)
    }

    /// Video frame rate over the connected lifetime
    pub fn video_framerate(&self) -> f64 {
        let (Some(video), Some(connected_at)) = (self.video.as_ref(), self.connected_at) else {
            return 0.0;
        };
        let secs = connected_at.elapsed().as_secs_f64();
        if secs > 0.0 {
            video.frames_delivered as f64 / secs
        } else {
            0.0
        }
    }
}
