//! Remote stream identity
//!
//! A [`StreamDescriptor`] is the immutable record a session produces when it
//! discovers a remote participant's published media. Subscribers reference it
//! through an `Arc` and never modify it.

pub mod descriptor;

pub use descriptor::{StreamDescriptor, StreamId, VideoDimensions};
