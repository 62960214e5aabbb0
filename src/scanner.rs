//! Batch scanning: turning a selection into a staged batch of videos.
//!
//! A selection is a single file, a directory (scanned non-recursively), or an
//! explicit list of files. Scanning filters to the supported container
//! extensions, opens every file once to check that they all decode to the
//! same frame size, and decodes the first frame of the first file as a
//! preview.
//!
//! # Example
//!
//! ```no_run
//! use drag2frames::{FfmpegBackend, scanner};
//!
//! let report = scanner::scan_path(&FfmpegBackend, "videos/")?;
//! println!("{report}");
//! if let Some((width, height)) = report.batch.dimensions() {
//!     println!("every file is {width}x{height}; cropping is available");
//! }
//! # Ok::<(), drag2frames::ExtractError>(())
//! ```

use std::{
    ffi::OsString,
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::ExtractError,
    frame::FrameSample,
    metadata::VideoInfo,
    source::{FrameReader, VideoBackend},
};

/// Container extensions accepted by the scanner (matched case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "mpg"];

/// Suffix appended to a directory to derive the default output root.
const OUTPUT_SUFFIX: &str = "_frames";

/// Returns `true` if `path` has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_video<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| extension.eq_ignore_ascii_case(supported))
        })
}

/// How a batch was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// A single video file.
    SingleFile,
    /// Every supported file directly inside a directory.
    Directory,
    /// An explicit list of files (e.g. several files dropped at once).
    FileList,
}

/// The set of files staged for extraction.
///
/// The consistency flag is computed once, at selection time, over the whole
/// list. Files that failed to open during that pass stay in the list; they
/// are simply skipped again when the job reaches them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchState {
    files: Vec<PathBuf>,
    consistent: bool,
    reference_dimensions: Option<(u32, u32)>,
}

impl BatchState {
    /// The staged files, in discovery order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of staged files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// `true` if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `true` if every openable file matched the first openable file's size.
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    /// The shared frame size, when the batch is consistent and at least one
    /// file could be opened.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        if self.consistent {
            self.reference_dimensions
        } else {
            None
        }
    }
}

/// Everything a scan produces for the presentation surface.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// What kind of selection produced this batch.
    pub kind: SelectionKind,
    /// The staged files and their consistency.
    pub batch: BatchState,
    /// Metadata of the first file, if it could be opened.
    pub reference_info: Option<VideoInfo>,
    /// The first decoded frame of the first file.
    pub preview: Option<FrameSample>,
    /// Suggested output root for this selection.
    pub default_output_root: PathBuf,
}

impl Display for ScanReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let count = self.batch.len();
        if count == 1 {
            let info = self.reference_info.unwrap_or_default();
            return write!(
                f,
                "Single file | {}x{}, {:.2}s, {:.2} fps",
                info.width,
                info.height,
                info.duration_seconds(),
                info.frames_per_second
            );
        }

        match self.batch.dimensions() {
            Some((width, height)) => write!(
                f,
                "Batch: {count} files | consistent resolution ({width}x{height}) | cropping available"
            ),
            None => write!(
                f,
                "Batch: {count} files | inconsistent resolution | cropping disabled"
            ),
        }
    }
}

/// Scan a file or directory.
///
/// A directory is enumerated non-recursively and its supported files kept in
/// enumeration order. A single file forms a one-file batch if supported.
///
/// # Errors
///
/// Returns [`ExtractError::NoVideoFiles`] if nothing matches.
pub fn scan_path<P: AsRef<Path>>(
    backend: &dyn VideoBackend,
    path: P,
) -> Result<ScanReport, ExtractError> {
    let path = path.as_ref();
    let kind = if path.is_dir() {
        SelectionKind::Directory
    } else {
        SelectionKind::SingleFile
    };

    let files = collect_video_files(path);
    if files.is_empty() {
        return Err(ExtractError::NoVideoFiles {
            path: path.to_path_buf(),
        });
    }

    let default_output_root = match kind {
        SelectionKind::Directory => append_suffix(path, OUTPUT_SUFFIX),
        _ => path.with_extension(""),
    };

    Ok(build_report(backend, kind, files, default_output_root))
}

/// Stage an explicit, already-filtered list of files verbatim.
///
/// # Errors
///
/// Returns [`ExtractError::EmptySelection`] if `paths` is empty.
pub fn scan_file_list(
    backend: &dyn VideoBackend,
    paths: Vec<PathBuf>,
) -> Result<ScanReport, ExtractError> {
    let Some(first) = paths.first() else {
        return Err(ExtractError::EmptySelection);
    };

    let default_output_root = match first.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => append_suffix(parent, OUTPUT_SUFFIX),
        _ => PathBuf::from(OUTPUT_SUFFIX.trim_start_matches('_')),
    };

    Ok(build_report(
        backend,
        SelectionKind::FileList,
        paths,
        default_output_root,
    ))
}

/// Keep only the dropped paths that are supported video files, preserving
/// drop order. Directories are discarded.
pub fn filter_dropped_paths<I, P>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    paths
        .into_iter()
        .map(Into::into)
        .filter(|path| !path.is_dir() && is_supported_video(path))
        .collect()
}

/// List the supported videos a path refers to.
///
/// Directories are read one level deep; subdirectories are skipped. A path
/// that does not exist or cannot be read yields an empty list.
pub fn collect_video_files<P: AsRef<Path>>(path: P) -> Vec<PathBuf> {
    let path = path.as_ref();

    if !path.is_dir() {
        return if is_supported_video(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(error) => {
            log::warn!("Cannot read directory {}: {error}", path.display());
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|entry| !entry.is_dir() && is_supported_video(entry))
        .collect()
}

/// Open every file in order and compare frame sizes against the first file
/// that opens.
///
/// Files that fail to open are skipped from the comparison but kept in the
/// returned batch.
pub fn compute_consistency(backend: &dyn VideoBackend, files: Vec<PathBuf>) -> BatchState {
    let mut consistent = true;
    let mut reference_dimensions: Option<(u32, u32)> = None;

    for file in &files {
        let reader = match backend.open(file) {
            Ok(reader) => reader,
            Err(error) => {
                log::warn!("Skipping {} in consistency check: {error}", file.display());
                continue;
            }
        };

        let dimensions = reader.info().dimensions();
        match reference_dimensions {
            None => reference_dimensions = Some(dimensions),
            Some(reference) if reference != dimensions => {
                log::debug!(
                    "Resolution mismatch: {} is {}x{}, expected {}x{}",
                    file.display(),
                    dimensions.0,
                    dimensions.1,
                    reference.0,
                    reference.1
                );
                consistent = false;
            }
            Some(_) => {}
        }
    }

    BatchState {
        files,
        consistent,
        reference_dimensions,
    }
}

/// Open `path`, seek to the start and decode exactly one frame.
///
/// Returns the file's metadata along with the frame, if one decoded.
pub fn preview_frame<P: AsRef<Path>>(
    backend: &dyn VideoBackend,
    path: P,
) -> Result<(VideoInfo, Option<FrameSample>), ExtractError> {
    let path = path.as_ref();
    let mut reader = backend.open(path)?;
    let info = reader.info();

    if let Err(error) = reader.seek(0.0) {
        log::debug!("Seek to start failed for {}: {error}", path.display());
    }

    let frame = match reader.read_next_frame() {
        Ok(frame) => frame,
        Err(error) => {
            log::warn!("Cannot decode preview frame of {}: {error}", path.display());
            None
        }
    };

    Ok((info, frame))
}

fn build_report(
    backend: &dyn VideoBackend,
    kind: SelectionKind,
    files: Vec<PathBuf>,
    default_output_root: PathBuf,
) -> ScanReport {
    let batch = compute_consistency(backend, files);

    let (reference_info, preview) = match batch.files().first() {
        Some(first) => match preview_frame(backend, first) {
            Ok((info, frame)) => (Some(info), frame),
            Err(error) => {
                log::warn!("Cannot open {} for preview: {error}", first.display());
                (None, None)
            }
        },
        None => (None, None),
    };

    log::info!(
        "Scanned {} file(s): consistent={}, dimensions={:?}",
        batch.len(),
        batch.is_consistent(),
        batch.dimensions(),
    );

    ScanReport {
        kind,
        batch,
        reference_info,
        preview,
        default_output_root,
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    // Normalise away trailing separators so "videos/" becomes "videos_frames".
    let mut name: OsString = path.components().as_path().as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
