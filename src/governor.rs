//! Channel budget enforcement
//!
//! Devices can only decode a limited number of simultaneous audio/video
//! channels. The governor holds that ceiling as semaphore permits; a
//! subscription reserves one permit per channel before any channel is
//! created and gives them back when it is torn down.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Process- or session-wide ceiling on active media channels
#[derive(Debug, Clone)]
pub struct ResourceGovernor {
    ceiling: usize,
    permits: Arc<Semaphore>,
}

impl ResourceGovernor {
    /// Create a governor allowing `ceiling` concurrent channels
    ///
    /// Ceilings above [`Semaphore::MAX_PERMITS`] are clamped to it, so
    /// `usize::MAX` can be used for "unlimited".
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.min(Semaphore::MAX_PERMITS);
        Self {
            ceiling,
            permits: Arc::new(Semaphore::new(ceiling)),
        }
    }

    /// Configured ceiling
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Channels that can still be reserved
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Channels currently reserved
    pub fn active(&self) -> usize {
        self.ceiling.saturating_sub(self.available())
    }

    /// Atomically reserve budget for `channels` channels
    ///
    /// Never waits: if the full amount is not available right now the
    /// request is denied and nothing is taken.
    pub fn reserve(&self, channels: usize) -> Option<ChannelReservation> {
        if channels == 0 {
            return Some(ChannelReservation {
                channels: 0,
                _permit: None,
            });
        }

        let n = u32::try_from(channels).ok()?;
        match Arc::clone(&self.permits).try_acquire_many_owned(n) {
            Ok(permit) => {
                tracing::debug!(
                    channels = channels,
                    active = self.active(),
                    ceiling = self.ceiling,
                    "Channel budget reserved"
                );
                Some(ChannelReservation {
                    channels,
                    _permit: Some(permit),
                })
            }
            Err(_) => {
                tracing::warn!(
                    requested = channels,
                    available = self.available(),
                    ceiling = self.ceiling,
                    "Channel budget denied"
                );
                None
            }
        }
    }
}

/// Budget held by one subscription
///
/// Dropping the reservation returns its channels to the governor.
#[derive(Debug)]
pub struct ChannelReservation {
    channels: usize,
    _permit: Option<OwnedSemaphorePermit>,
}

impl ChannelReservation {
    /// Number of channels held
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Return the budget now
    pub fn release(self) {
        tracing::debug!(channels = self.channels, "Channel budget released");
    }
}
