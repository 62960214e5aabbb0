//! Video sources: one decode session per open file.
//!
//! [`VideoSource`] wraps an FFmpeg demuxer, a decoder for the best video
//! stream, and a software scaler that converts every decoded frame to packed
//! RGB24 at the stream's own resolution. Frames are pulled strictly in
//! decode order with [`FrameReader::read_next_frame`].
//!
//! The batch scanner and extraction engine never talk to FFmpeg directly.
//! They go through [`VideoBackend`] (which opens files) and [`FrameReader`]
//! (which reads them), so any decoder can stand in for [`FfmpegBackend`].
//!
//! # Example
//!
//! ```no_run
//! use drag2frames::{FrameReader, VideoSource};
//!
//! let mut source = VideoSource::open_path("input.mp4")?;
//! source.seek(0.0)?;
//! while let Some(frame) = source.read_next_frame()? {
//!     println!("frame at {:?}", frame.timestamp());
//! }
//! source.close();
//! # Ok::<(), drag2frames::ExtractError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{
    conversion,
    error::ExtractError,
    frame::FrameSample,
    metadata::VideoInfo,
};

/// Sequential access to the decoded frames of one open video.
pub trait FrameReader {
    /// Metadata of the open video. Zeroed when nothing is open.
    fn info(&self) -> VideoInfo;

    /// Reposition to the keyframe at or before `seconds`.
    ///
    /// Implementations must not flush pending decoder state.
    fn seek(&mut self, seconds: f64) -> Result<(), ExtractError>;

    /// Decode the next frame in decode order.
    ///
    /// Returns `Ok(None)` at end of stream.
    fn read_next_frame(&mut self) -> Result<Option<FrameSample>, ExtractError>;
}

/// Opens video files into [`FrameReader`]s.
///
/// Shared between the calling thread and the extraction worker, hence
/// `Send + Sync`. The readers it returns stay on the thread that opened them.
pub trait VideoBackend: Send + Sync {
    /// Open `path` for sequential decoding.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileOpen`] if the file is not a decodable
    /// video container.
    fn open(&self, path: &Path) -> Result<Box<dyn FrameReader>, ExtractError>;
}

/// The production backend: decodes with FFmpeg through [`VideoSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl VideoBackend for FfmpegBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameReader>, ExtractError> {
        Ok(Box::new(VideoSource::open_path(path)?))
    }
}

/// An FFmpeg decode session for a single video file.
///
/// At most one session is open per source; [`open`](VideoSource::open)
/// closes any previous session first, and [`close`](VideoSource::close)
/// (or dropping the source) releases the decoder.
#[derive(Default)]
pub struct VideoSource {
    session: Option<DecodeSession>,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("path", &self.session.as_ref().map(|session| &session.path))
            .field("info", &self.info())
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Create a source with no open session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source and open `path` in one step.
    ///
    /// # Errors
    ///
    /// See [`open`](VideoSource::open).
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let mut source = Self::new();
        source.open(path)?;
        Ok(source)
    }

    /// Open `path`, replacing any session that is already open.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileOpen`] if the container cannot be opened,
    /// has no video stream, or cannot be converted to RGB24.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ExtractError> {
        self.close();
        self.session = Some(DecodeSession::open(path.as_ref())?);
        Ok(())
    }

    /// Release all decoder resources. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            log::debug!("Closed video source: {}", session.path.display());
        }
    }

    /// `true` while a decode session is open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Open `path`, seek to the start and decode exactly one frame.
    ///
    /// Returns `Ok(None)` if the file opens but yields no frame.
    ///
    /// # Errors
    ///
    /// See [`open`](VideoSource::open).
    pub fn preview_frame<P: AsRef<Path>>(path: P) -> Result<Option<FrameSample>, ExtractError> {
        let mut source = Self::open_path(path)?;
        source.seek(0.0)?;
        source.read_next_frame()
    }
}

impl FrameReader for VideoSource {
    fn info(&self) -> VideoInfo {
        self.session
            .as_ref()
            .map(|session| session.info)
            .unwrap_or_default()
    }

    fn seek(&mut self, seconds: f64) -> Result<(), ExtractError> {
        let session = self.session.as_mut().ok_or(ExtractError::SourceClosed)?;

        // A drained decoder cannot take new packets without a flush, so start
        // a fresh session instead.
        if session.eof_sent {
            *session = DecodeSession::open(&session.path)?;
        }

        let target = conversion::seconds_to_seek_timestamp(seconds);
        session.input_context.seek(target, ..target)?;
        Ok(())
    }

    fn read_next_frame(&mut self) -> Result<Option<FrameSample>, ExtractError> {
        self.session
            .as_mut()
            .ok_or(ExtractError::SourceClosed)?
            .read_next_frame()
    }
}

struct DecodeSession {
    path: PathBuf,
    input_context: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    time_base: Rational,
    info: VideoInfo,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    eof_sent: bool,
}

impl DecodeSession {
    fn open(path: &Path) -> Result<Self, ExtractError> {
        let open_error = |reason: String| ExtractError::FileOpen {
            path: path.to_path_buf(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| open_error(ExtractError::NoVideoStream.to_string()))?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();

        let frames_per_second = conversion::rational_to_f64(stream.avg_frame_rate())
            .or_else(|| conversion::rational_to_f64(stream.rate()))
            .unwrap_or(0.0);

        let decoder_context = CodecContext::from_parameters(stream.parameters())
            .map_err(|error| open_error(format!("Failed to read codec parameters: {error}")))?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| {
            open_error(format!(
                "Cannot convert {:?} {width}x{height} to RGB24: {error}",
                decoder.format()
            ))
        })?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let info = VideoInfo {
            width,
            height,
            duration,
            frames_per_second,
        };

        log::debug!(
            "Opened video source: {} ({}x{}, {:.2}s, {:.2} fps, stream {})",
            path.display(),
            width,
            height,
            duration.as_secs_f64(),
            frames_per_second,
            video_stream_index,
        );

        Ok(Self {
            path: path.to_path_buf(),
            input_context,
            decoder,
            scaler,
            video_stream_index,
            time_base,
            info,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            eof_sent: false,
        })
    }

    fn read_next_frame(&mut self) -> Result<Option<FrameSample>, ExtractError> {
        loop {
            // Drain frames the decoder has already produced.
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                return self.convert_decoded_frame().map(Some);
            }

            if self.eof_sent {
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        self.decoder
                            .send_packet(&packet)
                            .map_err(|error| ExtractError::VideoDecodeError(error.to_string()))?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => {
                    return Err(ExtractError::VideoDecodeError(format!(
                        "Failed to read packet from {}: {error}",
                        self.path.display()
                    )));
                }
            }
        }
    }

    fn convert_decoded_frame(&mut self) -> Result<FrameSample, ExtractError> {
        let timestamp = self
            .decoded_frame
            .timestamp()
            .or_else(|| self.decoded_frame.pts())
            .map(|pts| conversion::pts_to_duration(pts, self.time_base))
            .unwrap_or(Duration::ZERO);

        self.scaler
            .run(&self.decoded_frame, &mut self.rgb_frame)
            .map_err(|error| ExtractError::VideoDecodeError(error.to_string()))?;

        let buffer =
            conversion::frame_to_rgb_buffer(&self.rgb_frame, self.info.width, self.info.height);
        FrameSample::from_rgb(self.info.width, self.info.height, timestamp, buffer)
    }
}
