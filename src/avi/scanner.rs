//! Streaming frame scanner
//!
//! Splits a forward-only byte stream into frame chunks, each ending with the
//! `00dc` marker. Memory is bounded by the configured maximum frame size.

use std::io::{ErrorKind, Read};
use tracing::{debug, trace};

use crate::avi::{DEFAULT_MAX_FRAME_BYTES, FRAME_MARKER};
use crate::error::{MoshError, MoshResult};

/// Size of a single read from the source
const READ_BLOCK_BYTES: usize = 64 * 1024;

/// Scanner yielding marker-delimited frame chunks from a reader
pub struct FrameScanner<R> {
    reader: R,
    block: Vec<u8>,
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known not to contain a marker
    searched: usize,
    max_frame_bytes: usize,
    finished: bool,
    chunks_emitted: u64,
}

impl<R: Read> FrameScanner<R> {
    /// Create a scanner with the default frame cap
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            block: vec![0u8; READ_BLOCK_BYTES],
            buffer: Vec::with_capacity(READ_BLOCK_BYTES),
            searched: 0,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            finished: false,
            chunks_emitted: 0,
        }
    }

    /// Set the maximum size of a single frame chunk
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Read the next frame chunk
    ///
    /// Returns `Ok(None)` once the source is exhausted. The last chunk of a
    /// stream that does not end with a marker is returned as-is.
    pub fn next_frame(&mut self) -> MoshResult<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if let Some(end) = self.find_marker() {
                if end > self.max_frame_bytes {
                    return Err(self.too_large());
                }
                return Ok(Some(self.take_chunk(end)));
            }

            if self.buffer.len() > self.max_frame_bytes {
                return Err(self.too_large());
            }

            let read = match self.reader.read(&mut self.block) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(MoshError::SourceRead(e));
                }
            };

            if read == 0 {
                self.finished = true;
                if self.buffer.is_empty() {
                    debug!(chunks = self.chunks_emitted, "Frame scan reached end of stream");
                    return Ok(None);
                }
                debug!(
                    bytes = self.buffer.len(),
                    "Returning trailing bytes without marker as final chunk"
                );
                let end = self.buffer.len();
                return Ok(Some(self.take_chunk(end)));
            }

            self.buffer.extend_from_slice(&self.block[..read]);
        }
    }

    /// Position just past the first marker in the buffer, if any
    fn find_marker(&mut self) -> Option<usize> {
        let start = self.searched.saturating_sub(FRAME_MARKER.len() - 1);
        let found = self.buffer[start..]
            .windows(FRAME_MARKER.len())
            .position(|window| window == FRAME_MARKER)
            .map(|pos| start + pos + FRAME_MARKER.len());

        if found.is_none() {
            self.searched = self.buffer.len();
        }
        found
    }

    /// Fail the scan, the pending frame has outgrown the cap
    fn too_large(&mut self) -> MoshError {
        self.finished = true;
        self.buffer.clear();
        MoshError::FrameTooLarge {
            limit: self.max_frame_bytes,
        }
    }

    /// Split off `buffer[..end]` as a chunk, keeping the leftovers
    fn take_chunk(&mut self, end: usize) -> Vec<u8> {
        let rest = self.buffer.split_off(end);
        let chunk = std::mem::replace(&mut self.buffer, rest);
        self.searched = 0;
        self.chunks_emitted += 1;
        trace!(len = chunk.len(), index = self.chunks_emitted - 1, "Frame chunk");
        chunk
    }
}

impl<R: Read> Iterator for FrameScanner<R> {
    type Item = MoshResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl<R: Read> std::iter::FusedIterator for FrameScanner<R> {}
