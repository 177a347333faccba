//! Subscription state machine
//!
//! Tracks a subscription from bind to teardown:
//!
//! ```text
//!   Idle ──start──► Connecting ──connected──► Connected ◄──restored── Disabled
//!                       │                        │  └──video_dropped──►  │
//!                       │ fail                   │ disconnect / close    │
//!                       ▼                        ▼                       │
//!                    Failed                   Closed ◄───────────────────┘
//! ```
//!
//! Failed and Closed are terminal. Failed is only reachable before the stream
//! connected, so a failed subscription never reported anything else.

use crate::error::{Error, Result};

/// Subscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    /// Bound to a stream, not started
    Idle,
    /// Budget reserved, transport connecting
    Connecting,
    /// Media flowing
    Connected,
    /// Video dropped by the transport, audio still flowing
    Disabled,
    /// Could not connect
    Failed,
    /// Torn down by the caller, the session or the transport
    Closed,
}

impl SubscriptionState {
    /// No transition leaves this state
    pub fn is_terminal(self) -> bool {
        matches!(self, SubscriptionState::Failed | SubscriptionState::Closed)
    }

    /// Connected, with or without video
    pub fn is_connected(self) -> bool {
        matches!(self, SubscriptionState::Connected | SubscriptionState::Disabled)
    }
}

/// A state change that took place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SubscriptionState,
    pub to: SubscriptionState,
}

/// Transition table for a single subscription
///
/// Caller operations (`start`) return an error when illegal. Transport
/// inputs return `None` when they do not apply to the current state; the
/// caller decides whether that is worth logging.
#[derive(Debug)]
pub struct StateMachine {
    state: SubscriptionState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: SubscriptionState::Idle,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Idle → Connecting
    pub fn start(&mut self) -> Result<Transition> {
        match self.state {
            SubscriptionState::Idle => Ok(self.enter(SubscriptionState::Connecting)),
            state => Err(Error::InvalidStateTransition {
                operation: "start",
                state,
            }),
        }
    }

    /// Connecting → Connected
    pub fn connected(&mut self) -> Option<Transition> {
        self.advance(SubscriptionState::Connecting, SubscriptionState::Connected)
    }

    /// Connecting → Failed
    pub fn fail(&mut self) -> Option<Transition> {
        self.advance(SubscriptionState::Connecting, SubscriptionState::Failed)
    }

    /// Connected → Disabled
    pub fn video_dropped(&mut self) -> Option<Transition> {
        self.advance(SubscriptionState::Connected, SubscriptionState::Disabled)
    }

    /// Disabled → Connected
    pub fn video_restored(&mut self) -> Option<Transition> {
        self.advance(SubscriptionState::Disabled, SubscriptionState::Connected)
    }

    /// Connected/Disabled → Closed, initiated by the transport
    pub fn disconnected(&mut self) -> Option<Transition> {
        if self.state.is_connected() {
            Some(self.enter(SubscriptionState::Closed))
        } else {
            None
        }
    }

    /// Any non-terminal state → Closed
    ///
    /// Returns `None` when already terminal, which makes close idempotent.
    pub fn close(&mut self) -> Option<Transition> {
        if self.state.is_terminal() {
            None
        } else {
            Some(self.enter(SubscriptionState::Closed))
        }
    }

    fn advance(&mut self, from: SubscriptionState, to: SubscriptionState) -> Option<Transition> {
        if self.state == from {
            Some(self.enter(to))
        } else {
            None
        }
    }

    fn enter(&mut self, to: SubscriptionState) -> Transition {
        let from = self.state;
        self.state = to;
        Transition { from, to }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
