//! Batch scanner integration tests.
//!
//! Uses a synthetic backend; file contents on disk are irrelevant, only
//! names and extensions matter.

mod common;

use std::{fs, path::PathBuf};

use common::{SyntheticBackend, SyntheticVideo};
use drag2frames::{ExtractError, SelectionKind, scanner};

fn touch(directory: &std::path::Path, name: &str) -> PathBuf {
    let path = directory.join(name);
    fs::write(&path, b"").unwrap();
    path
}

// ── Directory selection ────────────────────────────────────────────

#[test]
fn directory_scan_filters_extensions_and_skips_subdirectories() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a.mp4");
    touch(dir.path(), "b.MKV");
    touch(dir.path(), "notes.txt");
    fs::create_dir(dir.path().join("nested.mp4")).unwrap();
    touch(&dir.path().join("nested.mp4"), "c.mp4");

    let backend = SyntheticBackend::new()
        .with_video("a.mp4", SyntheticVideo::new(64, 48, 3))
        .with_video("b.MKV", SyntheticVideo::new(64, 48, 3));

    let report = scanner::scan_path(&backend, dir.path()).unwrap();
    assert_eq!(report.kind, SelectionKind::Directory);

    let enumerated: Vec<PathBuf> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_file() && scanner::is_supported_video(path))
        .collect();
    assert_eq!(enumerated.len(), 2);
    assert_eq!(report.batch.files(), enumerated.as_slice());
}

#[test]
fn directory_default_output_root_gets_frames_suffix() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a.mp4");
    let backend = SyntheticBackend::new().with_video("a.mp4", SyntheticVideo::new(64, 48, 3));

    let report = scanner::scan_path(&backend, dir.path()).unwrap();

    let mut expected = dir.path().as_os_str().to_owned();
    expected.push("_frames");
    assert_eq!(report.default_output_root, PathBuf::from(expected));
}

#[test]
fn empty_directory_has_no_video_files() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "readme.md");

    let result = scanner::scan_path(&SyntheticBackend::new(), dir.path());
    assert!(matches!(result, Err(ExtractError::NoVideoFiles { .. })));
}

// ── Single file selection ──────────────────────────────────────────

#[test]
fn single_file_report_and_output_root() {
    let dir = tempfile::tempdir().unwrap();
    let path = touch(dir.path(), "clip.mov");
    let backend = SyntheticBackend::new().with_video("clip.mov", SyntheticVideo::new(320, 240, 50));

    let report = scanner::scan_path(&backend, &path).unwrap();

    assert_eq!(report.kind, SelectionKind::SingleFile);
    assert_eq!(report.batch.files(), &[path.clone()]);
    assert_eq!(report.default_output_root, dir.path().join("clip"));
    assert_eq!(report.batch.dimensions(), Some((320, 240)));
    assert!(report.to_string().starts_with("Single file | 320x240, 2.00s, 25.00 fps"));

    let preview = report.preview.expect("first frame decoded");
    assert_eq!((preview.width(), preview.height()), (320, 240));
}

#[test]
fn unsupported_single_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = touch(dir.path(), "photo.png");

    let result = scanner::scan_path(&SyntheticBackend::new(), path);
    assert!(matches!(result, Err(ExtractError::NoVideoFiles { .. })));
}

// ── Consistency ────────────────────────────────────────────────────

#[test]
fn matching_resolutions_are_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SyntheticBackend::new()
        .with_video("a.mp4", SyntheticVideo::new(640, 480, 2))
        .with_video("b.mp4", SyntheticVideo::new(640, 480, 2));

    let report = scanner::scan_file_list(
        &backend,
        vec![dir.path().join("a.mp4"), dir.path().join("b.mp4")],
    )
    .unwrap();

    assert!(report.batch.is_consistent());
    assert_eq!(report.batch.dimensions(), Some((640, 480)));
    assert_eq!(
        report.to_string(),
        "Batch: 2 files | consistent resolution (640x480) | cropping available"
    );
}

#[test]
fn mismatched_resolutions_disable_cropping() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SyntheticBackend::new()
        .with_video("a.mp4", SyntheticVideo::new(640, 480, 2))
        .with_video("b.mp4", SyntheticVideo::new(1280, 720, 2));

    let report = scanner::scan_file_list(
        &backend,
        vec![dir.path().join("a.mp4"), dir.path().join("b.mp4")],
    )
    .unwrap();

    assert!(!report.batch.is_consistent());
    assert_eq!(report.batch.dimensions(), None);
    assert_eq!(
        report.to_string(),
        "Batch: 2 files | inconsistent resolution | cropping disabled"
    );
}

#[test]
fn unopenable_files_stay_staged_but_do_not_set_the_reference() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SyntheticBackend::new()
        .with_video("broken.mp4", SyntheticVideo::unopenable())
        .with_video("a.mp4", SyntheticVideo::new(640, 480, 2))
        .with_video("b.mp4", SyntheticVideo::new(640, 480, 2));

    let report = scanner::scan_file_list(
        &backend,
        vec![
            dir.path().join("broken.mp4"),
            dir.path().join("a.mp4"),
            dir.path().join("b.mp4"),
        ],
    )
    .unwrap();

    assert_eq!(report.batch.len(), 3);
    assert_eq!(report.batch.dimensions(), Some((640, 480)));
    assert!(report.reference_info.is_none());
    assert!(report.preview.is_none());
}

// ── File lists ─────────────────────────────────────────────────────

#[test]
fn file_list_output_root_derives_from_first_parent() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SyntheticBackend::new().with_video("a.mp4", SyntheticVideo::new(8, 8, 1));

    let report = scanner::scan_file_list(&backend, vec![dir.path().join("a.mp4")]).unwrap();

    assert_eq!(report.kind, SelectionKind::FileList);
    let mut expected = dir.path().as_os_str().to_owned();
    expected.push("_frames");
    assert_eq!(report.default_output_root, PathBuf::from(expected));
}

#[test]
fn empty_file_list_is_an_empty_selection() {
    let error = scanner::scan_file_list(&SyntheticBackend::new(), Vec::new()).unwrap_err();
    assert!(matches!(error, ExtractError::EmptySelection));
    assert_eq!(error.to_string(), "No supported video files in the selection");
}

#[test]
fn dropped_paths_keep_order_and_drop_directories() {
    let dir = tempfile::tempdir().unwrap();
    let video_dir = dir.path().join("folder.mp4");
    fs::create_dir(&video_dir).unwrap();

    let dropped = vec![
        dir.path().join("z.avi"),
        dir.path().join("notes.txt"),
        video_dir,
        dir.path().join("a.WMV"),
    ];

    assert_eq!(
        scanner::filter_dropped_paths(dropped),
        vec![dir.path().join("z.avi"), dir.path().join("a.WMV")]
    );
}
