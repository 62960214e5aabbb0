//! Async event streaming for extraction jobs.
//!
//! [`ExtractionEventStream`] delivers a job's [`ExtractionEvent`]s through a
//! Tokio channel so an async front end can `.await` them instead of blocking
//! on [`std::sync::mpsc`]. Decoding still happens on the engine's own worker
//! thread; only the event hand-off is async.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio_stream::StreamExt;
//!
//! use drag2frames::{ExtractError, ExtractionConfig, ExtractionEngine, ExtractionEvent, FfmpegBackend, scanner};
//!
//! # async fn example() -> Result<(), ExtractError> {
//! let backend = Arc::new(FfmpegBackend);
//! let report = scanner::scan_path(backend.as_ref(), "videos/")?;
//! let engine = ExtractionEngine::new(backend);
//!
//! let mut stream = engine.start_stream(&report.batch, ExtractionConfig::new("out"))?;
//! while let Some(event) = stream.next().await {
//!     if let ExtractionEvent::Finished(summary) = event {
//!         println!("{} frames written", summary.frames_written);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_stream::Stream;

use crate::{
    configuration::ExtractionConfig,
    engine::{EventSink, ExtractionEngine, ExtractionEvent, JobHandle},
    error::ExtractError,
    scanner::BatchState,
};

impl EventSink for UnboundedSender<ExtractionEvent> {
    fn emit(&self, event: ExtractionEvent) {
        if self.send(event).is_err() {
            log::trace!("Event stream dropped; discarding event");
        }
    }
}

/// The events of one running job, as a [`Stream`].
///
/// The stream ends after [`ExtractionEvent::Finished`]. Dropping it does not
/// stop the job; call [`cancel`](ExtractionEventStream::cancel) for that.
#[derive(Debug)]
pub struct ExtractionEventStream {
    receiver: UnboundedReceiver<ExtractionEvent>,
    handle: JobHandle,
}

impl ExtractionEventStream {
    /// Request cancellation of the job.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Stream for ExtractionEventStream {
    type Item = ExtractionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl ExtractionEngine {
    /// Start a job whose events arrive as an [`ExtractionEventStream`].
    ///
    /// # Errors
    ///
    /// Same as [`start`](ExtractionEngine::start).
    pub fn start_stream(
        &self,
        batch: &BatchState,
        config: ExtractionConfig,
    ) -> Result<ExtractionEventStream, ExtractError> {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        let handle = self.start_with_sink(batch, config, sender)?;
        Ok(ExtractionEventStream { receiver, handle })
    }
}
