//! Subscriber configuration

use std::time::Duration;

/// Device capacity class, used to pick the channel ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Phones and older tablets: two concurrent channels
    Constrained,
    /// Higher-capacity devices: four concurrent channels
    HighCapacity,
}

impl DeviceClass {
    /// Default channel ceiling for this class
    pub fn channel_ceiling(self) -> usize {
        match self {
            DeviceClass::Constrained => 2,
            DeviceClass::HighCapacity => 4,
        }
    }
}

/// Session-wide subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Maximum simultaneously active audio + video channels
    pub max_active_channels: usize,

    /// Capacity of each subscription's transport event queue
    pub transport_queue_capacity: usize,

    /// Fail the subscription if the transport has not connected within this
    /// time (None = wait indefinitely)
    pub connect_timeout: Option<Duration>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            max_active_channels: DeviceClass::Constrained.channel_ceiling(),
            transport_queue_capacity: 256,
            connect_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl SubscriberConfig {
    /// Config with the ceiling for a device class
    pub fn for_device(class: DeviceClass) -> Self {
        Self {
            max_active_channels: class.channel_ceiling(),
            ..Default::default()
        }
    }

    /// Set the channel ceiling
    pub fn max_active_channels(mut self, max: usize) -> Self {
        self.max_active_channels = max;
        self
    }

    /// Set the transport event queue capacity (minimum 1)
    pub fn transport_queue_capacity(mut self, capacity: usize) -> Self {
        self.transport_queue_capacity = capacity.max(1);
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Never time out while connecting
    pub fn disable_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }
}

/// Per-subscription options
///
/// Both modalities are subscribed by default. Options are fixed once the
/// subscription starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub subscribe_audio: bool,
    pub subscribe_video: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            subscribe_audio: true,
            subscribe_video: true,
        }
    }
}

impl SubscribeOptions {
    /// Audio only
    pub fn audio_only() -> Self {
        Self {
            subscribe_audio: true,
            subscribe_video: false,
        }
    }

    /// Video only
    pub fn video_only() -> Self {
        Self {
            subscribe_audio: false,
            subscribe_video: true,
        }
    }

    pub fn subscribe_audio(mut self, enabled: bool) -> Self {
        self.subscribe_audio = enabled;
        self
    }

    pub fn subscribe_video(mut self, enabled: bool) -> Self {
        self.subscribe_video = enabled;
        self
    }
}
