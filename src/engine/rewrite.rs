//! Frame removal and duplication
//!
//! Copies an AVI stream chunk by chunk. Everything up to and including the
//! first I-frame chunk is the header and passes through untouched. After
//! that every chunk gets a frame index; chunks whose index is in the removal
//! set are dropped and the next kept chunk is written once more for each
//! dropped one, so the decoder replays its residual against the wrong
//! reference picture.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{Read, Write};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::avi::{FrameScanner, FrameType, StartCodeProbe, DEFAULT_MAX_FRAME_BYTES};
use crate::engine::progress::ProgressSink;
use crate::error::{MoshError, MoshResult};

/// Outcome of one rewrite run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteSummary {
    /// Chunks copied before indexing started, first I-frame included
    pub header_chunks: u64,
    /// Chunks that were assigned a frame index
    pub frames_indexed: u64,
    /// Indexed chunks left out of the output
    pub frames_removed: u64,
    /// Chunk writes performed, header and duplicates included
    pub chunks_written: u64,
    /// Bytes written to the sink
    pub bytes_written: u64,
    /// Duplicates still owed when the stream ended
    pub dropped_duplicates: u64,
    /// The run stopped early on request
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewriteState {
    /// Copying header chunks until the first I-frame
    Header,
    /// Indexing frames and applying the removal set
    Moshing { next_index: u64, pending: u64 },
}

/// Rewrites a stream, removing the frames at the given indices
#[derive(Debug, Clone)]
pub struct FrameRewriter {
    removal: BTreeSet<u64>,
    probe: StartCodeProbe,
    max_frame_bytes: usize,
}

impl FrameRewriter {
    /// Create a rewriter for the given post-header frame indices
    pub fn new(removal: impl IntoIterator<Item = u64>) -> Self {
        Self {
            removal: removal.into_iter().collect(),
            probe: StartCodeProbe::default(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    /// Use a different start code layout to detect the first I-frame
    pub fn with_probe(mut self, probe: StartCodeProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Set the scanner's frame size cap
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Run the rewrite to completion, cancellation or the first error
    ///
    /// Each indexed frame is reported to `progress` after it is handled.
    /// On error the sink keeps whatever was already written.
    pub fn run<R, W, P>(
        &self,
        source: R,
        mut sink: W,
        progress: &mut P,
        cancel: &CancellationToken,
    ) -> MoshResult<RewriteSummary>
    where
        R: Read,
        W: Write,
        P: ProgressSink<u64> + ?Sized,
    {
        info!(
            frames_to_remove = self.removal.len(),
            max_frame_bytes = self.max_frame_bytes,
            "Starting frame rewrite"
        );

        let mut scanner = FrameScanner::new(source).with_max_frame_bytes(self.max_frame_bytes);
        let mut summary = RewriteSummary::default();
        let mut state = RewriteState::Header;

        loop {
            if cancel.is_cancelled() {
                info!("Frame rewrite cancelled");
                summary.cancelled = true;
                break;
            }

            let Some(chunk) = scanner.next_frame()? else {
                break;
            };

            state = match state {
                RewriteState::Header => {
                    write_chunk(&mut sink, &chunk, 1, &mut summary)?;
                    summary.header_chunks += 1;

                    if self.probe.classify(&chunk) == FrameType::IFrame {
                        debug!(
                            header_chunks = summary.header_chunks,
                            "First I-frame found, moshing starts with the next chunk"
                        );
                        RewriteState::Moshing {
                            next_index: 0,
                            pending: 0,
                        }
                    } else {
                        RewriteState::Header
                    }
                }
                RewriteState::Moshing {
                    next_index: index,
                    pending,
                } => {
                    summary.frames_indexed += 1;
                    let pending = pending + 1;

                    let pending = if self.removal.contains(&index) {
                        summary.frames_removed += 1;
                        debug!(index, pending, "Removing frame");
                        pending
                    } else {
                        if pending > 1 {
                            debug!(index, copies = pending, "Duplicating frame");
                        }
                        write_chunk(&mut sink, &chunk, pending, &mut summary)?;
                        0
                    };

                    if !progress.report(index) {
                        info!(index, "Progress consumer went away, stopping rewrite");
                        summary.cancelled = true;
                        break;
                    }

                    RewriteState::Moshing {
                        next_index: index + 1,
                        pending,
                    }
                }
            };
        }

        if let RewriteState::Moshing { pending, .. } = state {
            if pending > 0 && !summary.cancelled {
                warn!(
                    pending,
                    "Stream ended after removed frames, dropping the owed duplicates"
                );
                summary.dropped_duplicates = pending;
            }
        } else if !summary.cancelled {
            warn!("No I-frame found, the stream was copied without changes");
        }

        sink.flush().map_err(MoshError::SinkWrite)?;

        info!(
            header_chunks = summary.header_chunks,
            frames = summary.frames_indexed,
            removed = summary.frames_removed,
            bytes = summary.bytes_written,
            "Frame rewrite finished"
        );
        Ok(summary)
    }
}

fn write_chunk<W: Write>(
    sink: &mut W,
    chunk: &[u8],
    copies: u64,
    summary: &mut RewriteSummary,
) -> MoshResult<()> {
    for _ in 0..copies {
        sink.write_all(chunk).map_err(MoshError::SinkWrite)?;
        summary.chunks_written += 1;
        summary.bytes_written += chunk.len() as u64;
    }
    Ok(())
}
