//! Internal conversion helpers.
//!
//! Pixel-plane copying and timestamp rescaling shared by the decode session.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Bytes per pixel of the fixed packed RGB24 output layout.
pub(crate) const RGB_BYTES_PER_PIXEL: usize = 3;

/// Copy the first plane of a scaled RGB24 frame into a tightly-packed buffer.
///
/// See [`copy_rows`] for the bounds policy.
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    copy_rows(
        video_frame.data(0),
        video_frame.stride(0),
        width as usize * RGB_BYTES_PER_PIXEL,
        height as usize,
    )
}

/// Copy `height` rows of `row_bytes` each out of a strided plane.
///
/// Every row is checked against the plane's length before it is copied. The
/// copy stops at the first row that would read past the end of `plane`; the
/// rows that were not copied stay zero-filled, so the result is always
/// exactly `row_bytes * height` bytes.
pub(crate) fn copy_rows(plane: &[u8], stride: usize, row_bytes: usize, height: usize) -> Vec<u8> {
    let expected_len = row_bytes * height;

    if stride == row_bytes && plane.len() >= expected_len {
        return plane[..expected_len].to_vec();
    }

    let mut buffer = vec![0u8; expected_len];
    for row in 0..height {
        let source_start = row * stride;
        let source_end = source_start + row_bytes;
        if source_end > plane.len() {
            log::debug!(
                "Decoded plane is short: copied {row}/{height} rows ({} of {} bytes available)",
                plane.len(),
                (height - 1) * stride + row_bytes,
            );
            break;
        }
        let target_start = row * row_bytes;
        buffer[target_start..target_start + row_bytes]
            .copy_from_slice(&plane[source_start..source_end]);
    }
    buffer
}

/// Convert a [`Rational`] frame rate to frames per second.
///
/// Returns `None` when the denominator (or the numerator) is zero.
pub(crate) fn rational_to_f64(rate: Rational) -> Option<f64> {
    if rate.denominator() == 0 || rate.numerator() == 0 {
        None
    } else {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    }
}

/// Rescale a PTS value from the stream time base to a [`Duration`].
///
/// Negative timestamps (pre-roll frames) clamp to zero.
pub(crate) fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    if time_base.denominator() == 0 {
        return Duration::ZERO;
    }
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

/// Convert seconds to a container-level seek timestamp in AV_TIME_BASE
/// (microseconds), as expected by `Input::seek`.
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds.max(0.0) * 1_000_000.0) as i64
}
