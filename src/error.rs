//! Error types for the `drag2frames` crate.
//!
//! This module defines [`ExtractError`], the unified error type returned by
//! all fallible operations in the crate. Per-file and per-frame failures
//! inside a running extraction job never surface as an `Err`; they are
//! reported through [`ExtractionEvent`](crate::ExtractionEvent)s and counted
//! in the [`ExtractionSummary`](crate::ExtractionSummary).

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `drag2frames` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// No supported video files were found for a selection.
    #[error("No supported video files found in {path}")]
    NoVideoFiles {
        /// The path (file or directory) that was scanned.
        path: PathBuf,
    },

    /// A multi-file selection held no supported video files.
    #[error("No supported video files in the selection")]
    EmptySelection,

    /// A video file could not be opened or its output format negotiated.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`VideoSource::open`](crate::VideoSource::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// An operation was issued against a source with no open decode session.
    #[error("Video source is not open")]
    SourceClosed,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// A frame could not be encoded or written to disk.
    #[error("Failed to write frame to {path}: {reason}")]
    FrameWrite {
        /// Destination image path.
        path: PathBuf,
        /// Underlying reason the write failed.
        reason: String,
    },

    /// A crop rectangle string could not be parsed.
    #[error("Invalid crop region {0:?}: expected \"left,top,right,bottom\"")]
    InvalidCropRegion(String),

    /// The output root path is empty.
    #[error("Output path must not be empty")]
    EmptyOutputPath,

    /// A job was requested with no files staged.
    #[error("No files to process")]
    EmptyBatch,

    /// A job was requested (or job parameters edited) while another job is running.
    #[error("An extraction job is already running")]
    JobRunning,

    /// The background worker thread panicked.
    #[error("Extraction worker terminated abnormally")]
    WorkerPanicked,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during frame conversion or encoding.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for ExtractError {
    fn from(error: FfmpegError) -> Self {
        ExtractError::FfmpegError(error.to_string())
    }
}

impl ExtractError {
    /// Returns `true` for the configuration errors that block a job from
    /// starting (empty output path, empty batch, job already running).
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ExtractError::EmptyOutputPath | ExtractError::EmptyBatch | ExtractError::JobRunning
        )
    }
}
