//! The extraction engine.
//!
//! [`ExtractionEngine`] runs one job at a time on a single background worker
//! thread. The worker walks every file of the batch in list order, decodes
//! every frame in decode order, keeps frames according to the sampling
//! interval, crops them, and writes one JPEG per kept frame to
//! `<output_root>/<stem>/<stem>_<index>.jpg`. Progress, status and completion
//! are streamed back as [`ExtractionEvent`]s.
//!
//! Failures inside the walk never abort the job. A file that cannot be
//! opened is skipped, a decode error ends that file, and a frame that cannot
//! be written is counted and passed over. Only cancellation stops a job
//! early.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use drag2frames::{ExtractionConfig, ExtractionEngine, ExtractionEvent, FfmpegBackend, scanner};
//!
//! let backend = Arc::new(FfmpegBackend);
//! let report = scanner::scan_path(backend.as_ref(), "videos/")?;
//! let engine = ExtractionEngine::new(backend);
//!
//! let job = engine.start(&report.batch, ExtractionConfig::new("videos_frames"))?;
//! for event in job.events() {
//!     match event {
//!         ExtractionEvent::Progress { percent, .. } => println!("{percent}%"),
//!         ExtractionEvent::Finished(summary) => println!("{summary:?}"),
//!         _ => {}
//!     }
//! }
//! # Ok::<(), drag2frames::ExtractError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU8, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use crate::{
    configuration::ExtractionConfig,
    error::ExtractError,
    frame::{CropRegion, OUTPUT_EXTENSION},
    progress::{CancellationToken, ProgressThrottle},
    scanner::BatchState,
    source::{FrameReader, VideoBackend},
};

const WORKER_THREAD_NAME: &str = "drag2frames-worker";

/// Lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No job is running.
    Idle,
    /// A job is running.
    Running,
    /// A stop was requested and the worker has not yet acknowledged it.
    Cancelling,
}

impl EngineState {
    fn to_u8(self) -> u8 {
        match self {
            EngineState::Idle => 0,
            EngineState::Running => 1,
            EngineState::Cancelling => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => EngineState::Running,
            2 => EngineState::Cancelling,
            _ => EngineState::Idle,
        }
    }
}

/// Notifications streamed from the worker, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionEvent {
    /// The worker has started.
    Started {
        /// Number of files in the batch.
        total_files: usize,
    },
    /// The worker moved on to a new file.
    FileStarted {
        /// 1-based position of the file in the batch.
        index: usize,
        /// Number of files in the batch.
        total: usize,
        /// File name (without directories).
        file_name: String,
    },
    /// A file was skipped without producing output.
    FileSkipped {
        /// The skipped file.
        path: PathBuf,
        /// Why it was skipped.
        reason: String,
    },
    /// Progress through the current file, 0 to 100.
    Progress {
        /// 1-based position of the file in the batch.
        file_index: usize,
        /// Percentage of the current file's duration reached.
        percent: u8,
    },
    /// The job is over. Sent exactly once per job, completed or cancelled.
    Finished(ExtractionSummary),
}

/// Aggregate outcome of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractionSummary {
    /// Files that were opened and walked (fully, or until cancellation).
    pub files_processed: usize,
    /// Files that could not be opened or prepared.
    pub files_skipped: usize,
    /// Images written successfully.
    pub frames_written: u64,
    /// Kept frames that could not be encoded or written.
    pub frame_failures: u64,
    /// `true` if the job stopped because of a cancellation request.
    pub cancelled: bool,
}

/// Destination for [`ExtractionEvent`]s.
///
/// Emitting must never fail the job: if the receiving side has gone away the
/// event is dropped.
pub trait EventSink: Send {
    /// Deliver one event.
    fn emit(&self, event: ExtractionEvent);
}

impl EventSink for Sender<ExtractionEvent> {
    fn emit(&self, event: ExtractionEvent) {
        if self.send(event).is_err() {
            log::trace!("Event receiver dropped; discarding event");
        }
    }
}

/// Decides which decoded frames are kept.
///
/// With interval `N`, the first decoded frame is kept and then one frame out
/// of every `N + 1`: frames 1, N+2, 2N+3, … in 1-based decode order.
///
/// ```
/// use drag2frames::FrameSampler;
///
/// let mut sampler = FrameSampler::new(2);
/// let kept: Vec<u64> = (0..8).filter_map(|_| sampler.next_frame()).collect();
/// assert_eq!(kept, vec![1, 4, 7]);
/// ```
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: u64,
    since_last_keep: u64,
    decoded: u64,
}

impl FrameSampler {
    /// Create a sampler for the given interval.
    pub fn new(interval: u32) -> Self {
        let interval = u64::from(interval);
        Self {
            interval,
            // Primed so the very first frame is kept.
            since_last_keep: interval,
            decoded: 0,
        }
    }

    /// Account for one decoded frame.
    ///
    /// Returns its 1-based decode index if the frame is kept.
    pub fn next_frame(&mut self) -> Option<u64> {
        self.decoded += 1;
        self.since_last_keep += 1;
        if self.since_last_keep > self.interval {
            self.since_last_keep = 0;
            Some(self.decoded)
        } else {
            None
        }
    }

    /// Frames decoded so far.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }
}

/// The base name (no directories, no extension) used for a video's output.
pub fn video_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

/// Directory that receives every image extracted from `video`.
pub fn video_output_directory(output_root: &Path, video: &Path) -> PathBuf {
    output_root.join(video_stem(video))
}

/// Path of the image written for the kept frame at 1-based decode `index`.
pub fn frame_output_path(output_root: &Path, video: &Path, index: u64) -> PathBuf {
    let stem = video_stem(video);
    video_output_directory(output_root, video)
        .join(format!("{stem}_{index:05}.{OUTPUT_EXTENSION}"))
}

/// Run a whole job synchronously on the calling thread.
///
/// Emits [`ExtractionEvent::Started`] and the per-file events, and returns
/// the summary. [`ExtractionEvent::Finished`] is left to the caller so it
/// can reset its own state first.
pub fn run_extraction(
    backend: &dyn VideoBackend,
    batch: &BatchState,
    config: &ExtractionConfig,
    token: &CancellationToken,
    sink: &dyn EventSink,
) -> ExtractionSummary {
    let files = batch.files();
    let total = files.len();
    let mut summary = ExtractionSummary::default();

    log::info!(
        "Extraction started: {total} file(s) -> {} (interval={}, crop={:?}, consistent={})",
        config.output_root().display(),
        config.interval(),
        config.crop(),
        batch.is_consistent(),
    );
    sink.emit(ExtractionEvent::Started { total_files: total });

    for (position, file) in files.iter().enumerate() {
        if token.is_cancelled() {
            summary.cancelled = true;
            break;
        }

        let index = position + 1;
        sink.emit(ExtractionEvent::FileStarted {
            index,
            total,
            file_name: file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        });

        match extract_file(backend, file, index, batch.is_consistent(), config, token, sink) {
            Ok(outcome) => {
                summary.files_processed += 1;
                summary.frames_written += outcome.written;
                summary.frame_failures += outcome.failures;
            }
            Err(error) => {
                log::warn!("Skipping {}: {error}", file.display());
                summary.files_skipped += 1;
                sink.emit(ExtractionEvent::FileSkipped {
                    path: file.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    if token.is_cancelled() {
        summary.cancelled = true;
    }

    log::info!(
        "Extraction finished: {} processed, {} skipped, {} frames written, {} failed{}",
        summary.files_processed,
        summary.files_skipped,
        summary.frames_written,
        summary.frame_failures,
        if summary.cancelled { " (cancelled)" } else { "" },
    );

    summary
}

struct FileOutcome {
    written: u64,
    failures: u64,
}

fn extract_file(
    backend: &dyn VideoBackend,
    file: &Path,
    file_index: usize,
    batch_consistent: bool,
    config: &ExtractionConfig,
    token: &CancellationToken,
    sink: &dyn EventSink,
) -> Result<FileOutcome, ExtractError> {
    let output_directory = video_output_directory(config.output_root(), file);
    fs::create_dir_all(&output_directory)?;

    let mut reader = backend.open(file)?;

    // Re-query per file: even a consistent batch may contain files that did
    // not open during the scan.
    let info = reader.info();
    let region = CropRegion::resolve(config.crop(), batch_consistent, info.width, info.height);
    let crop = (!region.is_full_frame(info.width, info.height)).then_some(region);

    log::debug!(
        "Extracting {} ({}x{}, {:.2}s, {:.2} fps, crop={:?})",
        file.display(),
        info.width,
        info.height,
        info.duration_seconds(),
        info.frames_per_second,
        crop,
    );

    if let Err(error) = reader.seek(0.0) {
        log::debug!("Seek to start failed for {}: {error}", file.display());
    }

    let mut sampler = FrameSampler::new(config.interval());
    let mut throttle = ProgressThrottle::new(info.duration);
    let mut outcome = FileOutcome {
        written: 0,
        failures: 0,
    };

    while !token.is_cancelled() {
        let frame = match reader.read_next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(error) => {
                log::warn!(
                    "Decode failed in {} after {} frame(s); stopping this file: {error}",
                    file.display(),
                    sampler.decoded(),
                );
                break;
            }
        };

        let Some(frame_index) = sampler.next_frame() else {
            continue;
        };

        let timestamp = frame.timestamp();
        let image = match &crop {
            Some(region) => frame.crop(region),
            None => frame,
        };

        let path = frame_output_path(config.output_root(), file, frame_index);
        match image.write_jpeg(&path) {
            Ok(()) => outcome.written += 1,
            Err(error) => {
                log::warn!("{error}");
                outcome.failures += 1;
            }
        }

        if let Some(percent) = throttle.record_kept(timestamp) {
            sink.emit(ExtractionEvent::Progress {
                file_index,
                percent,
            });
        }
    }

    Ok(outcome)
}

struct EngineShared {
    state: AtomicU8,
    token: Mutex<Option<CancellationToken>>,
}

impl EngineShared {
    fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn request_stop(&self) -> bool {
        self.stop_job(None)
    }

    /// Move `Running` to `Cancelling` and cancel the current token. With
    /// `job` set, only acts while that job's token is the current one.
    fn stop_job(&self, job: Option<&CancellationToken>) -> bool {
        // Held across the transition so a concurrent start cannot slip in
        // between the state change and the token it guards.
        let token = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(job) = job {
            if !token.as_ref().is_some_and(|current| current.same_as(job)) {
                return false;
            }
        }

        let transitioned = self
            .state
            .compare_exchange(
                EngineState::Running.to_u8(),
                EngineState::Cancelling.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if transitioned {
            if let Some(token) = token.as_ref() {
                token.cancel();
            }
            log::info!("Extraction stop requested");
        }
        transitioned
    }

    fn reset(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.state
            .store(EngineState::Idle.to_u8(), Ordering::Release);
    }
}

/// Returns the engine to idle when the worker exits, including by panic.
struct IdleOnExit(Arc<EngineShared>);

impl Drop for IdleOnExit {
    fn drop(&mut self) {
        self.0.reset();
    }
}

/// Runs extraction jobs on a background worker, one at a time.
///
/// Cloning yields another handle to the same engine, so a stop request can
/// come from any thread.
#[derive(Clone)]
pub struct ExtractionEngine {
    backend: Arc<dyn VideoBackend>,
    shared: Arc<EngineShared>,
}

impl std::fmt::Debug for ExtractionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionEngine")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ExtractionEngine {
    /// Create an idle engine decoding through `backend`.
    pub fn new(backend: Arc<dyn VideoBackend>) -> Self {
        Self {
            backend,
            shared: Arc::new(EngineShared {
                state: AtomicU8::new(EngineState::Idle.to_u8()),
                token: Mutex::new(None),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    /// `true` unless the engine is idle.
    pub fn is_busy(&self) -> bool {
        self.state() != EngineState::Idle
    }

    /// Start a job whose events arrive on an [`mpsc`] channel.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::EmptyBatch`] if the batch has no files.
    /// - [`ExtractError::EmptyOutputPath`] if the output root is empty.
    /// - [`ExtractError::JobRunning`] if a job is already running.
    /// - [`ExtractError::IoError`] if the output root cannot be created or
    ///   the worker cannot be spawned.
    pub fn start(
        &self,
        batch: &BatchState,
        config: ExtractionConfig,
    ) -> Result<ExtractionJob, ExtractError> {
        let (sender, receiver) = mpsc::channel();
        let handle = self.start_with_sink(batch, config, sender)?;
        Ok(ExtractionJob {
            handle,
            events: receiver,
        })
    }

    /// Start a job delivering events to a custom [`EventSink`].
    ///
    /// # Errors
    ///
    /// Same as [`start`](ExtractionEngine::start).
    pub fn start_with_sink<S>(
        &self,
        batch: &BatchState,
        config: ExtractionConfig,
        sink: S,
    ) -> Result<JobHandle, ExtractError>
    where
        S: EventSink + 'static,
    {
        if batch.is_empty() {
            return Err(ExtractError::EmptyBatch);
        }
        if config.output_root().as_os_str().is_empty() {
            return Err(ExtractError::EmptyOutputPath);
        }

        let token = CancellationToken::new();
        {
            let mut current = self
                .shared
                .token
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.shared
                .state
                .compare_exchange(
                    EngineState::Idle.to_u8(),
                    EngineState::Running.to_u8(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .map_err(|_| ExtractError::JobRunning)?;
            *current = Some(token.clone());
        }

        if let Err(error) = fs::create_dir_all(config.output_root()) {
            self.shared.reset();
            return Err(error.into());
        }

        // Snapshot everything the worker reads.
        let batch = batch.clone();
        let backend = Arc::clone(&self.backend);
        let worker_token = token.clone();
        let guard = IdleOnExit(Arc::clone(&self.shared));

        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let summary = {
                    let _guard = guard;
                    run_extraction(backend.as_ref(), &batch, &config, &worker_token, &sink)
                };
                sink.emit(ExtractionEvent::Finished(summary));
                summary
            });

        match spawned {
            Ok(worker) => Ok(JobHandle {
                shared: Arc::clone(&self.shared),
                token,
                worker,
            }),
            Err(error) => {
                self.shared.reset();
                Err(error.into())
            }
        }
    }

    /// Request cancellation of the running job.
    ///
    /// Returns `true` if a running job moved to
    /// [`Cancelling`](EngineState::Cancelling).
    pub fn stop(&self) -> bool {
        self.shared.request_stop()
    }
}

/// Control over a running job's worker thread.
#[derive(Debug)]
pub struct JobHandle {
    shared: Arc<EngineShared>,
    token: CancellationToken,
    worker: JoinHandle<ExtractionSummary>,
}

impl std::fmt::Debug for EngineShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineShared")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl JobHandle {
    /// Request cancellation of this job.
    ///
    /// The engine only moves to [`Cancelling`](EngineState::Cancelling) while
    /// this job is still its current one; a later job is never affected.
    pub fn cancel(&self) {
        self.shared.stop_job(Some(&self.token));
        self.token.cancel();
    }

    /// `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the worker exits and return its summary.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::WorkerPanicked`] if the worker panicked.
    pub fn wait(self) -> Result<ExtractionSummary, ExtractError> {
        self.worker.join().map_err(|_| ExtractError::WorkerPanicked)
    }
}

/// A running job with an [`mpsc`] event channel.
#[derive(Debug)]
pub struct ExtractionJob {
    handle: JobHandle,
    events: Receiver<ExtractionEvent>,
}

impl ExtractionJob {
    /// The event receiver. Iterating it ends after
    /// [`ExtractionEvent::Finished`] once the worker has exited.
    pub fn events(&self) -> &Receiver<ExtractionEvent> {
        &self.events
    }

    /// Request cancellation of this job.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker exits and return its summary.
    ///
    /// Unread events are dropped; drain [`events`](ExtractionJob::events)
    /// first if they matter.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::WorkerPanicked`] if the worker panicked.
    pub fn wait(self) -> Result<ExtractionSummary, ExtractError> {
        self.handle.wait()
    }
}
