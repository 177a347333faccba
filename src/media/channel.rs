//! Per-modality delivery channel
//!
//! One channel exists per subscribed modality. It is created when the
//! subscription enters Connecting and armed with [`MediaDeliveryChannel::start`]
//! once the transport reports the stream connected. Until then, and whenever
//! playback is disabled or video is suspended by degradation, frames are
//! dropped and counted.
//!
//! The channel itself never talks to the observer. [`deliver`] returns a
//! [`DeliveryOutcome`] and the owning subscription turns that into events,
//! which keeps event emission under the subscription's state lock.
//!
//! [`deliver`]: MediaDeliveryChannel::deliver

use std::sync::Arc;

use crate::stats::ChannelStats;
use crate::stream::VideoDimensions;

use super::frame::{MediaFrame, Modality};
use super::sink::FrameSink;

/// Result of offering a frame to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Frame was discarded (not started, disabled, suspended or wrong modality)
    Dropped,
    /// Frame was consumed
    Delivered {
        /// First video frame since `start()`
        first_video_frame: bool,
        /// Dimensions differ from the last known value
        dimensions_changed: Option<VideoDimensions>,
    },
}

/// Delivery pipe for one modality of a subscription
pub struct MediaDeliveryChannel {
    modality: Modality,
    enabled: bool,
    started: bool,
    suspended: bool,
    first_frame_seen: bool,
    last_dimensions: VideoDimensions,
    frames_delivered: u64,
    frames_dropped: u64,
    bytes_delivered: u64,
    sink: Option<Arc<dyn FrameSink>>,
}

impl MediaDeliveryChannel {
    /// Create an audio channel
    pub fn audio() -> Self {
        Self::new(Modality::Audio, VideoDimensions::default())
    }

    /// Create a video channel seeded with the stream's announced dimensions
    pub fn video(initial_dimensions: VideoDimensions) -> Self {
        Self::new(Modality::Video, initial_dimensions)
    }

    fn new(modality: Modality, last_dimensions: VideoDimensions) -> Self {
        Self {
            modality,
            enabled: true,
            started: false,
            suspended: false,
            first_frame_seen: false,
            last_dimensions,
            frames_delivered: 0,
            frames_dropped: 0,
            bytes_delivered: 0,
            sink: None,
        }
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// Begin accepting frames
    pub fn start(&mut self) {
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Toggle local consumption without touching the subscription
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Transport-side pause (video degradation)
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn set_sink(&mut self, sink: Option<Arc<dyn FrameSink>>) {
        self.sink = sink;
    }

    pub fn sink(&self) -> Option<&Arc<dyn FrameSink>> {
        self.sink.as_ref()
    }

    /// Last dimensions seen on this channel
    pub fn dimensions(&self) -> VideoDimensions {
        self.last_dimensions
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Offer a decoded frame to this channel
    pub fn deliver(&mut self, frame: &MediaFrame) -> DeliveryOutcome {
        if frame.modality != self.modality
            || !self.started
            || !self.enabled
            || self.suspended
        {
            self.frames_dropped += 1;
            return DeliveryOutcome::Dropped;
        }

        self.frames_delivered += 1;
        self.bytes_delivered += frame.len() as u64;

        if let Some(ref sink) = self.sink {
            sink.render_frame(frame);
        }

        if self.modality == Modality::Audio {
            return DeliveryOutcome::Delivered {
                first_video_frame: false,
                dimensions_changed: None,
            };
        }

        let first_video_frame = !self.first_frame_seen;
        self.first_frame_seen = true;

        let dimensions_changed = match frame.dimensions {
            Some(dims) if !dims.is_empty() && dims != self.last_dimensions => {
                self.last_dimensions = dims;
                Some(dims)
            }
            _ => None,
        };

        DeliveryOutcome::Delivered {
            first_video_frame,
            dimensions_changed,
        }
    }

    /// Snapshot of this channel's counters
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            modality: self.modality,
            enabled: self.enabled,
            suspended: self.suspended,
            frames_delivered: self.frames_delivered,
            frames_dropped: self.frames_dropped,
            bytes_delivered: self.bytes_delivered,
        }
    }
}

impl std::fmt::Debug for MediaDeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaDeliveryChannel")
            .field("modality", &self.modality)
            .field("enabled", &self.enabled)
            .field("started", &self.started)
            .field("suspended", &self.suspended)
            .field("frames_delivered", &self.frames_delivered)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;

    use super::*;

    fn video_frame(ts: u32, width: u32, height: u32) -> MediaFrame {
        MediaFrame::video(ts, Bytes::from_static(&[0u8; 4]), VideoDimensions::new(width, height))
    }

    #[test]
    fn test_drops_before_start() {
        let mut channel = MediaDeliveryChannel::audio();

        let outcome = channel.deliver(&MediaFrame::audio(0, Bytes::from_static(&[1])));
        assert_eq!(outcome, DeliveryOutcome::Dropped);
        assert_eq!(channel.frames_dropped(), 1);
        assert_eq!(channel.frames_delivered(), 0);
    }

    #[test]
    fn test_first_video_frame_once() {
        let mut channel = MediaDeliveryChannel::video(VideoDimensions::new(640, 480));
        channel.start();

        let first = channel.deliver(&video_frame(0, 640, 480));
        assert_eq!(
            first,
            DeliveryOutcome::Delivered {
                first_video_frame: true,
                dimensions_changed: None
            }
        );

        let second = channel.deliver(&video_frame(33, 640, 480));
        assert_eq!(
            second,
            DeliveryOutcome::Delivered {
                first_video_frame: false,
                dimensions_changed: None
            }
        );
    }

    #[test]
    fn test_dimension_change_fires_once_per_transition() {
        let mut channel = MediaDeliveryChannel::video(VideoDimensions::new(640, 480));
        channel.start();
        channel.deliver(&video_frame(0, 640, 480));

        let rotated = channel.deliver(&video_frame(33, 480, 640));
        assert!(matches!(
            rotated,
            DeliveryOutcome::Delivered {
                dimensions_changed: Some(VideoDimensions { width: 480, height: 640 }),
                ..
            }
        ));

        // Same size again: no repeat
        let repeat = channel.deliver(&video_frame(66, 480, 640));
        assert!(matches!(
            repeat,
            DeliveryOutcome::Delivered {
                dimensions_changed: None,
                ..
            }
        ));

        // Rotating back counts as a new transition
        let back = channel.deliver(&video_frame(99, 640, 480));
        assert!(matches!(
            back,
            DeliveryOutcome::Delivered {
                dimensions_changed: Some(_),
                ..
            }
        ));
        assert_eq!(channel.dimensions(), VideoDimensions::new(640, 480));
    }

    #[test]
    fn test_disabled_channel_drops_frames() {
        let mut channel = MediaDeliveryChannel::video(VideoDimensions::new(640, 480));
        channel.start();
        channel.set_enabled(false);

        assert_eq!(channel.deliver(&video_frame(0, 320, 240)), DeliveryOutcome::Dropped);
        // Dropped frames do not move the dimension baseline
        assert_eq!(channel.dimensions(), VideoDimensions::new(640, 480));

        channel.set_enabled(true);
        let outcome = channel.deliver(&video_frame(33, 640, 480));
        assert!(matches!(
            outcome,
            DeliveryOutcome::Delivered {
                first_video_frame: true,
                ..
            }
        ));
    }

    #[test]
    fn test_suspended_channel_drops_frames() {
        let mut channel = MediaDeliveryChannel::video(VideoDimensions::new(640, 480));
        channel.start();
        channel.set_suspended(true);

        assert_eq!(channel.deliver(&video_frame(0, 640, 480)), DeliveryOutcome::Dropped);
        assert!(channel.is_suspended());
    }

    #[test]
    fn test_wrong_modality_dropped() {
        let mut channel = MediaDeliveryChannel::audio();
        channel.start();

        assert_eq!(channel.deliver(&video_frame(0, 640, 480)), DeliveryOutcome::Dropped);
    }

    #[test]
    fn test_sink_receives_delivered_frames() {
        let rendered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&rendered);
        let sink: Arc<dyn FrameSink> = Arc::new(move |_: &MediaFrame| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut channel = MediaDeliveryChannel::audio();
        channel.set_sink(Some(sink));
        channel.deliver(&MediaFrame::audio(0, Bytes::from_static(&[1])));
        channel.start();
        channel.deliver(&MediaFrame::audio(20, Bytes::from_static(&[1, 2])));
        channel.deliver(&MediaFrame::audio(40, Bytes::from_static(&[1, 2])));

        assert_eq!(rendered.load(Ordering::SeqCst), 2);

        let stats = channel.stats();
        assert_eq!(stats.frames_delivered, 2);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.bytes_delivered, 4);
    }
}
