//! Synthetic decoding backend shared by the integration tests.
//!
//! Videos are looked up by file name, so tests can stage paths that do not
//! exist on disk. Every frame is a flat RGB fill whose red channel encodes
//! the frame index.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use drag2frames::{
    BatchState, ExtractError, FrameReader, FrameSample, VideoBackend, VideoInfo, scanner,
};

pub fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

#[derive(Debug, Clone)]
pub struct SyntheticVideo {
    pub width: u32,
    pub height: u32,
    pub frames: u64,
    pub frames_per_second: f64,
    pub fail_open: bool,
    pub fail_decode_after: Option<u64>,
    pub frame_delay: Option<Duration>,
}

impl SyntheticVideo {
    pub fn new(width: u32, height: u32, frames: u64) -> Self {
        Self {
            width,
            height,
            frames,
            frames_per_second: 25.0,
            fail_open: false,
            fail_decode_after: None,
            frame_delay: None,
        }
    }

    pub fn unopenable() -> Self {
        Self {
            fail_open: true,
            ..Self::new(0, 0, 0)
        }
    }

    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = Some(delay);
        self
    }

    pub fn with_decode_failure_after(mut self, frames: u64) -> Self {
        self.fail_decode_after = Some(frames);
        self
    }

    fn info(&self) -> VideoInfo {
        VideoInfo {
            width: self.width,
            height: self.height,
            duration: Duration::from_secs_f64(self.frames as f64 / self.frames_per_second),
            frames_per_second: self.frames_per_second,
        }
    }
}

#[derive(Debug, Default)]
pub struct SyntheticBackend {
    videos: HashMap<String, SyntheticVideo>,
    opens: AtomicUsize,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, file_name: &str, video: SyntheticVideo) -> Self {
        self.videos.insert(file_name.to_string(), video);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl VideoBackend for SyntheticBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameReader>, ExtractError> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let open_error = |reason: &str| ExtractError::FileOpen {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let video = self
            .videos
            .get(&name)
            .ok_or_else(|| open_error("unknown synthetic video"))?;
        if video.fail_open {
            return Err(open_error("synthetic open failure"));
        }

        Ok(Box::new(SyntheticReader {
            video: video.clone(),
            next: 0,
        }))
    }
}

struct SyntheticReader {
    video: SyntheticVideo,
    next: u64,
}

impl FrameReader for SyntheticReader {
    fn info(&self) -> VideoInfo {
        self.video.info()
    }

    fn seek(&mut self, seconds: f64) -> Result<(), ExtractError> {
        self.next = (seconds * self.video.frames_per_second).max(0.0) as u64;
        Ok(())
    }

    fn read_next_frame(&mut self) -> Result<Option<FrameSample>, ExtractError> {
        if self.video.fail_decode_after == Some(self.next) {
            return Err(ExtractError::VideoDecodeError("synthetic decode failure".into()));
        }
        if self.next >= self.video.frames {
            return Ok(None);
        }
        if let Some(delay) = self.video.frame_delay {
            thread::sleep(delay);
        }

        let index = self.next;
        self.next += 1;

        let pixels = self.video.width as usize * self.video.height as usize;
        let data = [(index % 256) as u8, 64, 128].repeat(pixels);
        let timestamp = Duration::from_secs_f64(index as f64 / self.video.frames_per_second);
        FrameSample::from_rgb(self.video.width, self.video.height, timestamp, data).map(Some)
    }
}

/// Stage `names` (relative to `directory`) as an explicit file list.
pub fn stage(backend: &SyntheticBackend, directory: &Path, names: &[&str]) -> BatchState {
    let files: Vec<PathBuf> = names.iter().map(|name| directory.join(name)).collect();
    scanner::scan_file_list(backend, files)
        .expect("non-empty file list")
        .batch
}

/// Sorted file names inside `directory`.
pub fn list_files(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(directory)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
