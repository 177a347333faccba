//! Statistics for subscriptions and their delivery channels

pub mod metrics;

pub use metrics::{ChannelStats, SubscriberStats};
