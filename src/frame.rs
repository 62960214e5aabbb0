//! Decoded frames and crop regions.
//!
//! A [`FrameSample`] is one decoded frame in the fixed packed RGB24 layout
//! that every [`FrameReader`](crate::FrameReader) hands back. Because the
//! layout never varies, cropping and JPEG encoding need no per-format
//! branching.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    str::FromStr,
    time::Duration,
};

use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgb, codecs::jpeg::JpegEncoder, imageops};

use crate::{conversion::RGB_BYTES_PER_PIXEL, error::ExtractError};

/// Quality used for every JPEG written by the extraction engine.
pub const JPEG_QUALITY: u8 = 90;

/// File extension of extracted frame images.
pub const OUTPUT_EXTENSION: &str = "jpg";

/// One decoded video frame in packed RGB24.
///
/// Created by [`FrameReader::read_next_frame`](crate::FrameReader::read_next_frame)
/// and owned by the caller. Never mutated after creation; cropping produces
/// a new sample.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameSample {
    width: u32,
    height: u32,
    timestamp: Duration,
    data: Vec<u8>,
}

impl std::fmt::Debug for FrameSample {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameSample")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("timestamp", &self.timestamp)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl FrameSample {
    /// Wrap a packed RGB24 buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::VideoDecodeError`] if `data` is not exactly
    /// `width * height * 3` bytes long.
    pub fn from_rgb(
        width: u32,
        height: u32,
        timestamp: Duration,
        data: Vec<u8>,
    ) -> Result<Self, ExtractError> {
        let expected = width as usize * height as usize * RGB_BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(ExtractError::VideoDecodeError(format!(
                "RGB buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            timestamp,
            data,
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Presentation timestamp of the frame.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// The packed RGB24 pixel data, row-major, no padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copy the sub-rectangle `region` out of this frame.
    ///
    /// `region` is clipped to the frame bounds first; a region that is empty
    /// after clipping yields a copy of the full frame.
    pub fn crop(&self, region: &CropRegion) -> FrameSample {
        let clipped = region.clip(self.width, self.height);
        if clipped.is_full_frame(self.width, self.height) {
            return self.clone();
        }

        let view: Option<ImageBuffer<Rgb<u8>, &[u8]>> =
            ImageBuffer::from_raw(self.width, self.height, self.data.as_slice());
        let Some(view) = view else {
            return self.clone();
        };

        let cropped = imageops::crop_imm(
            &view,
            clipped.left as u32,
            clipped.top as u32,
            clipped.width() as u32,
            clipped.height() as u32,
        )
        .to_image();

        FrameSample {
            width: cropped.width(),
            height: cropped.height(),
            timestamp: self.timestamp,
            data: cropped.into_raw(),
        }
    }

    /// Encode the frame as a JPEG at [`JPEG_QUALITY`] and write it to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FrameWrite`] if the file cannot be created or
    /// the encoder fails.
    pub fn write_jpeg<P: AsRef<Path>>(&self, path: P) -> Result<(), ExtractError> {
        let path = path.as_ref();
        let write_error = |reason: String| ExtractError::FrameWrite {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::create(path).map_err(|error| write_error(error.to_string()))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
            .write_image(&self.data, self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|error| write_error(error.to_string()))?;
        writer
            .flush()
            .map_err(|error| write_error(error.to_string()))
    }
}

/// A crop rectangle in source-pixel coordinates.
///
/// `right` and `bottom` are exclusive, so the region is
/// `(right - left) x (bottom - top)` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CropRegion {
    /// Left edge (inclusive).
    pub left: i32,
    /// Top edge (inclusive).
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl CropRegion {
    /// Create a region from its four edges.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The region covering a whole `width x height` frame.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, clamp_to_i32(width), clamp_to_i32(height))
    }

    /// `right - left`.
    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    /// `bottom - top`.
    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// `true` if the width or height is not positive.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// `true` if this region is exactly the whole `width x height` frame.
    pub fn is_full_frame(&self, width: u32, height: u32) -> bool {
        *self == Self::full_frame(width, height)
    }

    /// Intersect with the `width x height` frame.
    ///
    /// Falls back to the full frame when the intersection is empty.
    pub fn clip(&self, width: u32, height: u32) -> Self {
        let max_x = clamp_to_i32(width);
        let max_y = clamp_to_i32(height);
        let clipped = Self::new(
            self.left.clamp(0, max_x),
            self.top.clamp(0, max_y),
            self.right.clamp(0, max_x),
            self.bottom.clamp(0, max_y),
        );
        if clipped.is_degenerate() {
            Self::full_frame(width, height)
        } else {
            clipped
        }
    }

    /// Resolve the crop actually applied to one file.
    ///
    /// The full frame is used when the batch is inconsistent, when no region
    /// was supplied, or when the supplied region is degenerate. Otherwise the
    /// supplied region is clipped to this file's frame.
    pub fn resolve(
        supplied: Option<&CropRegion>,
        batch_consistent: bool,
        width: u32,
        height: u32,
    ) -> Self {
        match supplied {
            Some(region) if batch_consistent && !region.is_degenerate() => {
                region.clip(width, height)
            }
            _ => Self::full_frame(width, height),
        }
    }
}

impl Display for CropRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{},{},{},{} ({}x{})",
            self.left,
            self.top,
            self.right,
            self.bottom,
            self.width(),
            self.height()
        )
    }
}

impl FromStr for CropRegion {
    type Err = ExtractError;

    /// Parse `"left,top,right,bottom"`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ExtractError::InvalidCropRegion(value.to_string());
        let parts = value
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        match parts.as_slice() {
            [left, top, right, bottom] => Ok(Self::new(*left, *top, *right, *bottom)),
            _ => Err(invalid()),
        }
    }
}

fn clamp_to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> FrameSample {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        FrameSample::from_rgb(width, height, Duration::ZERO, data).unwrap()
    }

    #[test]
    fn from_rgb_rejects_wrong_length() {
        let result = FrameSample::from_rgb(2, 2, Duration::ZERO, vec![0; 11]);
        assert!(matches!(result, Err(ExtractError::VideoDecodeError(_))));
    }

    #[test]
    fn crop_copies_sub_rectangle() {
        let frame = gradient(8, 6);
        let cropped = frame.crop(&CropRegion::new(2, 1, 5, 4));
        assert_eq!((cropped.width(), cropped.height()), (3, 3));
        // Top-left pixel of the crop is source pixel (2, 1).
        assert_eq!(&cropped.data()[..3], &[2, 1, 0]);
        // Bottom-right pixel is source pixel (4, 3).
        assert_eq!(&cropped.data()[cropped.data().len() - 3..], &[4, 3, 0]);
    }

    #[test]
    fn crop_clips_to_frame() {
        let frame = gradient(8, 6);
        let cropped = frame.crop(&CropRegion::new(6, 4, 100, 100));
        assert_eq!((cropped.width(), cropped.height()), (2, 2));
    }

    #[test]
    fn resolve_uses_full_frame_when_inconsistent_or_degenerate() {
        let region = CropRegion::new(10, 10, 50, 40);
        assert_eq!(
            CropRegion::resolve(Some(&region), false, 640, 480),
            CropRegion::full_frame(640, 480)
        );
        assert_eq!(
            CropRegion::resolve(Some(&CropRegion::new(10, 10, 10, 40)), true, 640, 480),
            CropRegion::full_frame(640, 480)
        );
        assert_eq!(CropRegion::resolve(None, true, 640, 480), CropRegion::full_frame(640, 480));
        assert_eq!(CropRegion::resolve(Some(&region), true, 640, 480), region);
    }

    #[test]
    fn parse_crop_region() {
        let region: CropRegion = "0, 10,320,250".parse().unwrap();
        assert_eq!(region, CropRegion::new(0, 10, 320, 250));
        assert_eq!((region.width(), region.height()), (320, 240));
        assert!("1,2,3".parse::<CropRegion>().is_err());
        assert!("a,b,c,d".parse::<CropRegion>().is_err());
    }
}
