//! Media transport contract
//!
//! The transport (network receipt, jitter buffering, decode) is not part of
//! this crate. A subscription asks it to [`open`](MediaTransport::open) a
//! stream and hands over a [`TransportEvents`] sender; from then on the
//! transport reports connection progress, decoded frames and degradation
//! through that sender, from whatever threads it runs on.
//!
//! `open` must not block on network I/O. Anything slow happens after it
//! returns and is reported as events.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::media::MediaFrame;
use crate::stream::StreamDescriptor;
use crate::subscriber::SubscriptionId;

/// Event reported by the transport for one subscription
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Stream established, media will follow
    Connected,
    /// Stream could not be established
    ConnectFailed { reason: String },
    /// A decoded audio or video frame
    Frame(MediaFrame),
    /// Video is no longer being sent (bandwidth degradation)
    VideoDropped,
    /// Video is being sent again
    VideoRestored,
    /// A connected stream ended
    Disconnected { reason: String },
}

/// Synchronous rejection of an open request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("stream not found: {0}")]
    StreamNotFound(String),
    #[error("{0}")]
    Other(String),
}

/// What a subscription asks the transport to receive
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub subscription_id: SubscriptionId,
    pub session_id: u64,
    pub stream: Arc<StreamDescriptor>,
    pub receive_audio: bool,
    pub receive_video: bool,
}

/// Sender half of a subscription's transport event queue
#[derive(Debug, Clone)]
pub struct TransportEvents {
    subscription_id: SubscriptionId,
    tx: mpsc::Sender<TransportEvent>,
}

impl TransportEvents {
    pub(crate) fn channel(
        subscription_id: SubscriptionId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { subscription_id, tx }, rx)
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Send an event, waiting for queue space
    ///
    /// Returns `false` if the subscription has gone away.
    pub async fn send(&self, event: TransportEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Send without waiting
    ///
    /// Intended for frames: if the subscription is not keeping up the frame
    /// is dropped rather than stalling the decoder. Returns `false` if the
    /// event was not queued.
    pub fn try_send(&self, event: TransportEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!(
                    subscription = %self.subscription_id,
                    "Transport queue full, event dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the subscription stopped listening
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Media engine that connects subscriptions to remote streams
pub trait MediaTransport: Send + Sync {
    /// Begin receiving `request.stream`. Must return without waiting on
    /// the network.
    fn open(&self, request: OpenRequest, events: TransportEvents) -> Result<(), TransportError>;

    /// Stop receiving for a subscription. Called at most once per
    /// successful `open`.
    fn stop(&self, subscription_id: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn test_try_send_drops_when_full() {
        let (events, mut rx) = TransportEvents::channel(SubscriptionId::from_raw(1), 1);

        assert!(events.try_send(TransportEvent::Connected));
        assert!(!events.try_send(TransportEvent::Frame(MediaFrame::audio(0, Bytes::new()))));

        assert!(matches!(rx.recv().await, Some(TransportEvent::Connected)));
        assert!(events.send(TransportEvent::VideoDropped).await);
    }

    #[tokio::test]
    async fn test_closed_after_receiver_dropped() {
        let (events, rx) = TransportEvents::channel(SubscriptionId::from_raw(1), 4);
        drop(rx);

        assert!(events.is_closed());
        assert!(!events.send(TransportEvent::Connected).await);
        assert!(!events.try_send(TransportEvent::Connected));
    }
}
