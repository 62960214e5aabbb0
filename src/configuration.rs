//! Extraction job configuration.
//!
//! [`ExtractionConfig`] is the read-only snapshot of user settings handed to
//! the extraction worker when a job starts.
//!
//! # Example
//!
//! ```
//! use drag2frames::{CropRegion, ExtractionConfig};
//!
//! let config = ExtractionConfig::new("out/frames")
//!     .with_interval(4)
//!     .with_crop(CropRegion::new(0, 0, 1280, 720));
//! assert_eq!(config.interval(), 4);
//! ```

use std::path::{Path, PathBuf};

use crate::frame::CropRegion;

/// Settings for one extraction job.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ExtractionConfig {
    output_root: PathBuf,
    interval: u32,
    crop: Option<CropRegion>,
}

impl ExtractionConfig {
    /// Create a configuration writing under `output_root`.
    ///
    /// Defaults: interval 0 (keep every frame), no crop.
    pub fn new<P: Into<PathBuf>>(output_root: P) -> Self {
        Self {
            output_root: output_root.into(),
            interval: 0,
            crop: None,
        }
    }

    /// Keep one frame out of every `interval + 1` decoded frames.
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    /// Crop every kept frame to `region`.
    ///
    /// Ignored for inconsistent batches and for degenerate regions.
    pub fn with_crop(mut self, region: CropRegion) -> Self {
        self.crop = Some(region);
        self
    }

    /// Set or clear the crop region.
    pub fn with_crop_option(mut self, region: Option<CropRegion>) -> Self {
        self.crop = region;
        self
    }

    /// Directory under which one subdirectory per video is created.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// The sampling interval.
    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// The requested crop region, if any.
    pub fn crop(&self) -> Option<&CropRegion> {
        self.crop.as_ref()
    }
}
