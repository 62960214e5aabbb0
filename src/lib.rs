//! # drag2frames
//!
//! Batch video-to-image extraction: turn every frame (or every Nth frame) of
//! one or many videos into numbered JPEG files, optionally cropped, with
//! progress reporting and cancellation.
//!
//! Decoding goes through FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, and images are
//! encoded with the [`image`](https://crates.io/crates/image) crate.
//!
//! ## Quick Start
//!
//! ### Extract a Folder
//!
//! ```no_run
//! use drag2frames::{ExtractionEvent, Session};
//!
//! let mut session = Session::default();
//! session.select_path("videos/")?;
//! session.set_interval(4)?;
//!
//! let job = session.start()?;
//! for event in job.events() {
//!     if let ExtractionEvent::Finished(summary) = event {
//!         println!("{} frames written", summary.frames_written);
//!     }
//! }
//! # Ok::<(), drag2frames::ExtractError>(())
//! ```
//!
//! ### Read Frames Directly
//!
//! ```no_run
//! use drag2frames::{CropRegion, FrameReader, VideoSource};
//!
//! let mut source = VideoSource::open_path("input.mp4")?;
//! if let Some(frame) = source.read_next_frame()? {
//!     frame
//!         .crop(&CropRegion::new(0, 0, 640, 360))
//!         .write_jpeg("first_frame.jpg")?;
//! }
//! # Ok::<(), drag2frames::ExtractError>(())
//! ```
//!
//! ## Output Layout
//!
//! For every video `<stem>.<ext>` in the batch, images are written to
//! `<output_root>/<stem>/<stem>_<NNNNN>.jpg`, where `NNNNN` is the 1-based
//! index of the frame in decode order, zero-padded to five digits.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | `ExtractionEngine::start_stream` delivers events as a Tokio stream |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
mod conversion;
pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod metadata;
pub mod progress;
pub mod scanner;
pub mod session;
pub mod source;
#[cfg(feature = "async")]
pub mod stream;

pub use configuration::ExtractionConfig;
pub use engine::{
    EngineState, EventSink, ExtractionEngine, ExtractionEvent, ExtractionJob, ExtractionSummary,
    FrameSampler, JobHandle,
};
pub use error::ExtractError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::{CropRegion, FrameSample};
pub use metadata::VideoInfo;
pub use progress::{CancellationToken, ProgressThrottle};
pub use scanner::{BatchState, ScanReport, SelectionKind};
pub use session::Session;
pub use source::{FfmpegBackend, FrameReader, VideoBackend, VideoSource};
#[cfg(feature = "async")]
pub use stream::ExtractionEventStream;
