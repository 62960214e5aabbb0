//! Video metadata types.
//!
//! [`VideoInfo`] is what a [`FrameReader`](crate::FrameReader) reports about
//! an open video: the negotiated output dimensions, the container duration
//! and the nominal frame rate. Every field tolerates missing data by falling
//! back to zero, so querying metadata never fails.

use std::time::Duration;

/// Metadata for one open video.
///
/// # Example
///
/// ```no_run
/// use drag2frames::{FrameReader, VideoSource};
///
/// let source = VideoSource::open_path("input.mp4")?;
/// let info = source.info();
/// println!("{}x{} @ {:.2} fps, {:.2}s", info.width, info.height,
///     info.frames_per_second, info.duration.as_secs_f64());
/// # Ok::<(), drag2frames::ExtractError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[must_use]
pub struct VideoInfo {
    /// Output frame width in pixels (after pixel-format negotiation).
    pub width: u32,
    /// Output frame height in pixels.
    pub height: u32,
    /// Container presentation duration. Zero if the container reports none.
    pub duration: Duration,
    /// Nominal frame rate. `0.0` if undeterminable.
    pub frames_per_second: f64,
}

impl VideoInfo {
    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Duration in seconds as a float.
    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
