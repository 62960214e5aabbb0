//! Interactive session state.
//!
//! [`Session`] is what a front end (GUI, CLI, drag-and-drop handler) talks
//! to. It holds the staged batch, the user's output folder, interval and
//! crop, and owns the [`ExtractionEngine`]. Selecting files resets those
//! settings to per-selection defaults; editing them is refused while a job
//! is running, since the worker only sees the snapshot taken at start.

use std::{path::PathBuf, sync::Arc};

use crate::{
    configuration::ExtractionConfig,
    engine::{EngineState, ExtractionEngine, ExtractionJob},
    error::ExtractError,
    frame::CropRegion,
    scanner::{self, ScanReport},
    source::{FfmpegBackend, VideoBackend},
};

/// The staged batch plus user settings, and the engine that acts on them.
pub struct Session {
    backend: Arc<dyn VideoBackend>,
    engine: ExtractionEngine,
    report: Option<ScanReport>,
    output_root: PathBuf,
    interval: u32,
    crop: Option<CropRegion>,
    auto_start: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("engine", &self.engine)
            .field("report", &self.report)
            .field("output_root", &self.output_root)
            .field("interval", &self.interval)
            .field("crop", &self.crop)
            .field("auto_start", &self.auto_start)
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Arc::new(FfmpegBackend))
    }
}

impl Session {
    /// Create an empty session decoding through `backend`.
    pub fn new(backend: Arc<dyn VideoBackend>) -> Self {
        Self {
            engine: ExtractionEngine::new(Arc::clone(&backend)),
            backend,
            report: None,
            output_root: PathBuf::new(),
            interval: 0,
            crop: None,
            auto_start: false,
        }
    }

    /// Start extraction automatically after every successful selection.
    pub fn set_auto_start(&mut self, enabled: bool) {
        self.auto_start = enabled;
    }

    /// Whether selections start extraction automatically.
    pub fn auto_start(&self) -> bool {
        self.auto_start
    }

    /// Select a single file or a directory.
    ///
    /// On success the batch, output root and crop are replaced with the new
    /// selection's defaults. If auto-start is on, the started job is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::JobRunning`] while a job is running.
    /// - [`ExtractError::NoVideoFiles`] if nothing matched; the previous
    ///   selection is kept.
    /// - Any error from [`start`](Session::start) when auto-starting. The
    ///   selection itself has been applied in that case.
    pub fn select_path<P: Into<PathBuf>>(
        &mut self,
        path: P,
    ) -> Result<Option<ExtractionJob>, ExtractError> {
        self.ensure_idle()?;
        let report = scanner::scan_path(self.backend.as_ref(), path.into())?;
        self.apply_selection(report)
    }

    /// Select a set of dropped paths.
    ///
    /// A single path behaves like [`select_path`](Session::select_path).
    /// Several paths are filtered to supported files (directories are
    /// dropped) and staged in drop order.
    ///
    /// # Errors
    ///
    /// Same as [`select_path`](Session::select_path), except that a
    /// multi-path selection with no supported file fails with
    /// [`ExtractError::EmptySelection`].
    pub fn select_files<I, P>(&mut self, paths: I) -> Result<Option<ExtractionJob>, ExtractError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ensure_idle()?;

        let mut paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.len() == 1 {
            let path = paths.remove(0);
            return self.select_path(path);
        }

        let files = scanner::filter_dropped_paths(paths);
        let report = scanner::scan_file_list(self.backend.as_ref(), files)?;
        self.apply_selection(report)
    }

    /// The last successful scan.
    pub fn report(&self) -> Option<&ScanReport> {
        self.report.as_ref()
    }

    /// Current output root.
    pub fn output_root(&self) -> &std::path::Path {
        &self.output_root
    }

    /// Current sampling interval.
    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Current crop region, if cropping is available for this batch.
    pub fn crop(&self) -> Option<&CropRegion> {
        self.crop.as_ref()
    }

    /// Change the output root.
    ///
    /// # Errors
    ///
    /// [`ExtractError::JobRunning`] while a job is running.
    pub fn set_output_root<P: Into<PathBuf>>(&mut self, path: P) -> Result<(), ExtractError> {
        self.ensure_idle()?;
        self.output_root = path.into();
        Ok(())
    }

    /// Change the sampling interval.
    ///
    /// # Errors
    ///
    /// [`ExtractError::JobRunning`] while a job is running.
    pub fn set_interval(&mut self, interval: u32) -> Result<(), ExtractError> {
        self.ensure_idle()?;
        self.interval = interval;
        Ok(())
    }

    /// Change the crop region.
    ///
    /// Accepted for any batch, but only applied when the batch is
    /// consistent.
    ///
    /// # Errors
    ///
    /// [`ExtractError::JobRunning`] while a job is running.
    pub fn set_crop(&mut self, region: CropRegion) -> Result<(), ExtractError> {
        self.ensure_idle()?;
        self.crop = Some(region);
        Ok(())
    }

    /// The configuration a job started now would receive.
    pub fn config(&self) -> ExtractionConfig {
        ExtractionConfig::new(self.output_root.clone())
            .with_interval(self.interval)
            .with_crop_option(self.crop)
    }

    /// Start extracting the staged batch with the current settings.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::EmptyBatch`] if nothing is staged.
    /// - Anything [`ExtractionEngine::start`] reports.
    pub fn start(&self) -> Result<ExtractionJob, ExtractError> {
        let report = self.report.as_ref().ok_or(ExtractError::EmptyBatch)?;
        self.engine.start(&report.batch, self.config())
    }

    /// Request cancellation of the running job.
    ///
    /// Returns `true` if a running job was asked to stop.
    pub fn stop(&self) -> bool {
        self.engine.stop()
    }

    /// Lifecycle state of the engine.
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// The engine, e.g. to hand a clone to another thread for stopping.
    pub fn engine(&self) -> &ExtractionEngine {
        &self.engine
    }

    fn ensure_idle(&self) -> Result<(), ExtractError> {
        if self.engine.is_busy() {
            return Err(ExtractError::JobRunning);
        }
        Ok(())
    }

    fn apply_selection(&mut self, report: ScanReport) -> Result<Option<ExtractionJob>, ExtractError> {
        log::info!("{report}");

        self.output_root = report.default_output_root.clone();
        self.crop = report
            .batch
            .dimensions()
            .map(|(width, height)| CropRegion::full_frame(width, height));
        self.report = Some(report);

        if self.auto_start {
            return self.start().map(Some);
        }
        Ok(None)
    }
}
