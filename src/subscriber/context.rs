//! Subscription identity passed to observers

use std::sync::Arc;

use crate::stream::StreamDescriptor;

/// Unique subscription identifier within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Context passed to observer callbacks
///
/// Carries identity only, never a handle to the subscriber itself, so an
/// observer cannot re-enter the subscription from the dispatch context.
#[derive(Debug, Clone)]
pub struct SubscriberContext {
    /// Subscription that generated the event
    pub subscription_id: SubscriptionId,

    /// Session the subscription belongs to
    pub session_id: u64,

    /// Stream the subscription is bound to
    pub stream: Arc<StreamDescriptor>,
}

impl SubscriberContext {
    pub fn new(subscription_id: SubscriptionId, session_id: u64, stream: Arc<StreamDescriptor>) -> Self {
        Self {
            subscription_id,
            session_id,
            stream,
        }
    }
}
