//! Stream descriptor types

use std::sync::Arc;

/// Opaque server-side identifier of a remote stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(Arc<str>);

impl StreamId {
    /// Create a new stream ID
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Encoded video size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    /// Create dimensions from width and height
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either side is zero (unknown size)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the frame is taller than it is wide
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

impl std::fmt::Display for VideoDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Immutable identity and capability record for a remote media stream
///
/// Fields are private: once a session has announced a stream, its
/// capabilities cannot change underneath the subscribers bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    id: StreamId,
    name: Option<String>,
    has_audio: bool,
    has_video: bool,
    video_dimensions: VideoDimensions,
}

impl StreamDescriptor {
    /// Create a descriptor for a stream carrying audio and/or video
    pub fn new(
        id: impl Into<StreamId>,
        has_audio: bool,
        has_video: bool,
        video_dimensions: VideoDimensions,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            has_audio,
            has_video,
            video_dimensions,
        }
    }

    /// Descriptor for an audio-only stream
    pub fn audio_only(id: impl Into<StreamId>) -> Self {
        Self::new(id, true, false, VideoDimensions::default())
    }

    /// Attach a display name (as published by the remote side)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    pub fn has_video(&self) -> bool {
        self.has_video
    }

    /// Dimensions announced when the stream was discovered
    pub fn video_dimensions(&self) -> VideoDimensions {
        self.video_dimensions
    }
}
