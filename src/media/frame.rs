//! Decoded media frames
//!
//! Frames are handed over by the transport after decode. The payload is a
//! `bytes::Bytes`, so passing a frame to a sink or cloning it for a test
//! only bumps a reference count.

use bytes::Bytes;

use crate::stream::VideoDimensions;

/// Media modality of a channel or frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Audio,
    Video,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Audio => f.write_str("audio"),
            Modality::Video => f.write_str("video"),
        }
    }
}

/// A decoded unit of audio or video
#[derive(Debug, Clone)]
pub struct MediaFrame {
    /// Which channel this frame belongs to
    pub modality: Modality,
    /// Presentation timestamp in milliseconds
    pub timestamp: u32,
    /// Decoded payload (PCM samples or raw picture planes)
    pub data: Bytes,
    /// Picture size carried by the frame (video only)
    pub dimensions: Option<VideoDimensions>,
}

impl MediaFrame {
    /// Create a decoded video frame
    pub fn video(timestamp: u32, data: Bytes, dimensions: VideoDimensions) -> Self {
        Self {
            modality: Modality::Video,
            timestamp,
            data,
            dimensions: Some(dimensions),
        }
    }

    /// Create a decoded audio frame
    pub fn audio(timestamp: u32, data: Bytes) -> Self {
        Self {
            modality: Modality::Audio,
            timestamp,
            data,
            dimensions: None,
        }
    }

    pub fn is_video(&self) -> bool {
        self.modality == Modality::Video
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
