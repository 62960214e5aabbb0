//! FFmpeg-backed video source tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`
//! and return early when they are missing.

mod common;

use std::{path::Path, sync::Arc};

use common::{list_files, sample_video_path};
use drag2frames::{
    ExtractError, ExtractionConfig, ExtractionEngine, FfmpegBackend, FrameReader, VideoInfo, VideoSource,
    scanner,
};

// ── Open and close ─────────────────────────────────────────────────

#[test]
fn open_reports_metadata() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let source = VideoSource::open_path(path).unwrap();
    let info = source.info();
    assert!(source.is_open());
    assert!(info.width > 0 && info.height > 0);
    assert!(info.duration_seconds() > 0.0);
    assert!(info.frames_per_second > 0.0);
}

#[test]
fn open_nonexistent_file_fails() {
    let result = VideoSource::open_path("tests/fixtures/does_not_exist.mp4");
    assert!(matches!(result, Err(ExtractError::FileOpen { .. })));
}

#[test]
fn closed_source_reports_zeroed_info_and_refuses_reads() {
    let mut source = VideoSource::new();
    assert!(!source.is_open());
    assert_eq!(source.info(), VideoInfo::default());
    assert!(matches!(source.read_next_frame(), Err(ExtractError::SourceClosed)));
    assert!(matches!(source.seek(0.0), Err(ExtractError::SourceClosed)));

    source.close();
    source.close();
}

// ── Decoding ───────────────────────────────────────────────────────

#[test]
fn frames_are_rgb_at_native_size_with_rising_timestamps() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = VideoSource::open_path(path).unwrap();
    let info = source.info();

    let mut previous = None;
    for _ in 0..10 {
        let frame = source.read_next_frame().unwrap().expect("frame available");
        assert_eq!((frame.width(), frame.height()), (info.width, info.height));
        assert_eq!(frame.data().len(), (info.width * info.height * 3) as usize);
        if let Some(previous) = previous {
            assert!(frame.timestamp() >= previous);
        }
        previous = Some(frame.timestamp());
    }
}

#[test]
fn seek_after_end_of_stream_restarts_decoding() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = VideoSource::open_path(path).unwrap();
    let mut decoded = 0_u64;
    while source.read_next_frame().unwrap().is_some() {
        decoded += 1;
    }
    assert!(decoded > 0);
    assert!(source.read_next_frame().unwrap().is_none());

    source.seek(0.0).unwrap();
    assert!(source.read_next_frame().unwrap().is_some());
}

// ── End to end ─────────────────────────────────────────────────────

#[test]
fn extract_sample_video_every_tenth_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().unwrap();
    let backend = Arc::new(FfmpegBackend);
    let report = scanner::scan_path(backend.as_ref(), path).unwrap();
    assert!(report.preview.is_some());

    let engine = ExtractionEngine::new(backend);
    let job = engine
        .start(
            &report.batch,
            ExtractionConfig::new(output.path()).with_interval(9),
        )
        .unwrap();
    let summary = job.wait().unwrap();

    let files = list_files(&output.path().join("sample_video"));
    assert_eq!(files.len() as u64, summary.frames_written);
    assert_eq!(files.first().map(String::as_str), Some("sample_video_00001.jpg"));
    assert!(files.iter().any(|name| name == "sample_video_00011.jpg"));
}

#[test]
fn preview_frame_decodes_the_first_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let info = VideoSource::open_path(path).unwrap().info();
    let frame = VideoSource::preview_frame(path).unwrap().expect("preview frame");
    assert_eq!((frame.width(), frame.height()), (info.width, info.height));
}
