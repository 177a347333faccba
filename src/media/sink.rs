//! Frame sinks
//!
//! A sink replaces the default renderer: it receives every frame a channel
//! delivers. Sinks are called on the transport's delivery context, so they
//! should hand work off rather than block.

use super::frame::MediaFrame;

/// Consumer of decoded frames (custom video renderer or audio player)
pub trait FrameSink: Send + Sync {
    /// Called once per delivered frame
    fn render_frame(&self, frame: &MediaFrame);
}

impl<F> FrameSink for F
where
    F: Fn(&MediaFrame) + Send + Sync,
{
    fn render_frame(&self, frame: &MediaFrame) {
        self(frame)
    }
}
