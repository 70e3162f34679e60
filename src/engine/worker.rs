//! Background workers for rewrite and analysis runs
//!
//! A run executes on tokio's blocking pool. The caller gets a bounded
//! progress receiver and a handle resolving to the terminal result. The
//! progress channel closes when the run ends; an error never shows up on the
//! progress side.

use std::io::{Read, Write};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::avi::FrameType;
use crate::engine::analyze::{FrameAnalyzer, FrameStats};
use crate::engine::rewrite::{FrameRewriter, RewriteSummary};
use crate::error::{MoshError, MoshResult};

/// Handle to a running worker
pub struct WorkerHandle<T, S> {
    /// Per-frame progress, closed when the run is over
    pub progress: mpsc::Receiver<T>,
    task: JoinHandle<MoshResult<S>>,
    cancel: CancellationToken,
}

impl<T, S> WorkerHandle<T, S> {
    /// Ask the worker to stop at the next chunk boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token controlling this worker
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the terminal result
    ///
    /// Any progress not yet received is discarded; a worker still blocked on
    /// a full channel sees the closed receiver and stops.
    pub async fn join(self) -> MoshResult<S> {
        let Self { progress, task, .. } = self;
        drop(progress);

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Worker task failed: {}", e);
                Err(MoshError::Worker {
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Run a frame rewrite in the background
pub fn spawn_rewrite<R, W>(
    rewriter: FrameRewriter,
    source: R,
    sink: W,
    capacity: usize,
    cancel: CancellationToken,
) -> WorkerHandle<u64, RewriteSummary>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let (mut tx, rx) = mpsc::channel(capacity.max(1));
    let token = cancel.clone();
    let task = tokio::task::spawn_blocking(move || rewriter.run(source, sink, &mut tx, &token));

    WorkerHandle {
        progress: rx,
        task,
        cancel,
    }
}

/// Run a frame analysis in the background
pub fn spawn_analysis<R>(
    analyzer: FrameAnalyzer,
    source: R,
    capacity: usize,
    cancel: CancellationToken,
) -> WorkerHandle<FrameType, FrameStats>
where
    R: Read + Send + 'static,
{
    let (mut tx, rx) = mpsc::channel(capacity.max(1));
    let token = cancel.clone();
    let task = tokio::task::spawn_blocking(move || analyzer.run(source, &mut tx, &token));

    WorkerHandle {
        progress: rx,
        task,
        cancel,
    }
}
