//! Media delivery
//!
//! This module provides:
//! - Decoded frame types shared between transport and consumers
//! - The `FrameSink` hook for custom renderers and audio players
//! - Per-modality delivery channels with enable/disable gating

pub mod channel;
pub mod frame;
pub mod sink;

pub use channel::{DeliveryOutcome, MediaDeliveryChannel};
pub use frame::{MediaFrame, Modality};
pub use sink::FrameSink;
