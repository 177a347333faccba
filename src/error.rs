//! Error types
//!
//! A single error enum covers both the failures reported to observers
//! (connection failure, resource exhaustion) and the contract violations
//! returned synchronously to callers.

use thiserror::Error;

use crate::stream::StreamId;
use crate::subscriber::SubscriptionState;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Stable numeric classification of subscriber errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SubscriberErrorCode {
    /// The transport could not establish the stream
    ConnectionFailure = 1500,
    /// The channel budget for this device is used up
    ResourceExhausted = 1501,
    /// An operation was invoked in a state that does not allow it
    InvalidStateTransition = 1502,
    /// Non-fatal bandwidth/connectivity shortfall
    TransportDegraded = 1503,
    /// The owning session has been disconnected
    SessionClosed = 1504,
    /// The session does not know the requested stream
    StreamNotFound = 1505,
}

impl SubscriberErrorCode {
    /// Whether an error with this code ends the subscription
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubscriberErrorCode::ConnectionFailure | SubscriberErrorCode::ResourceExhausted
        )
    }
}

/// Error type for subscription operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The transport could not establish (or keep establishing) the stream
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// The resource governor denied the channel budget
    #[error("resource exhausted: requested {requested} channels, {available} available")]
    ResourceExhausted { requested: usize, available: usize },

    /// Caller invoked an operation that is illegal in the current state
    #[error("cannot {operation} while {state:?}")]
    InvalidStateTransition {
        operation: &'static str,
        state: SubscriptionState,
    },

    /// Video was dropped by the transport; audio continues
    #[error("transport degraded")]
    TransportDegraded,

    /// The owning session no longer accepts subscriptions
    #[error("session closed")]
    SessionClosed,

    /// No stream with this ID has been announced to the session
    #[error("stream not found: {0}")]
    StreamNotFound(StreamId),
}

impl Error {
    /// Numeric code for this error
    pub fn code(&self) -> SubscriberErrorCode {
        match self {
            Error::ConnectionFailure(_) => SubscriberErrorCode::ConnectionFailure,
            Error::ResourceExhausted { .. } => SubscriberErrorCode::ResourceExhausted,
            Error::InvalidStateTransition { .. } => SubscriberErrorCode::InvalidStateTransition,
            Error::TransportDegraded => SubscriberErrorCode::TransportDegraded,
            Error::SessionClosed => SubscriberErrorCode::SessionClosed,
            Error::StreamNotFound(_) => SubscriberErrorCode::StreamNotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::ConnectionFailure("refused".into()).code(),
            SubscriberErrorCode::ConnectionFailure
        );
        assert_eq!(
            Error::ResourceExhausted {
                requested: 2,
                available: 0
            }
            .code() as u32,
            1501
        );
        assert!(SubscriberErrorCode::ResourceExhausted.is_terminal());
        assert!(!SubscriberErrorCode::TransportDegraded.is_terminal());
        assert!(!SubscriberErrorCode::InvalidStateTransition.is_terminal());
    }

    #[test]
    fn test_display() {
        let err = Error::InvalidStateTransition {
            operation: "start",
            state: SubscriptionState::Connected,
        };
        assert_eq!(err.to_string(), "cannot start while Connected");

        let err = Error::ResourceExhausted {
            requested: 2,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "resource exhausted: requested 2 channels, 1 available"
        );
    }
}
