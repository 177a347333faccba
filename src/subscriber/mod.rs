//! Subscriber: the public face of a stream subscription
//!
//! This module provides:
//! - `Subscriber`, which binds a stream to an observer and drives it
//! - The subscription state machine
//! - Session-wide configuration and per-subscription options

pub mod config;
pub mod context;
pub mod handle;
pub mod state;

pub use config::{DeviceClass, SubscribeOptions, SubscriberConfig};
pub use context::{SubscriberContext, SubscriptionId};
pub use handle::Subscriber;
pub use state::{StateMachine, SubscriptionState, Transition};
