//! Frame type analysis

use serde::{Deserialize, Serialize};
use std::io::Read;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::avi::{FrameScanner, FrameType, StartCodeProbe, DEFAULT_MAX_FRAME_BYTES};
use crate::engine::progress::ProgressSink;
use crate::error::MoshResult;

/// Per-type chunk counts of a scanned stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Chunks classified as I-frames
    pub iframes: u64,
    /// Chunks classified as P-frames
    pub pframes: u64,
    /// Chunks with no recognised start code
    pub unknown: u64,
    /// Bytes scanned
    pub bytes: u64,
    /// Chunk index of the first I-frame, if any
    pub first_iframe: Option<u64>,
    /// The run stopped early on request
    pub cancelled: bool,
}

impl FrameStats {
    /// Total number of chunks scanned
    pub fn total(&self) -> u64 {
        self.iframes + self.pframes + self.unknown
    }

    fn record(&mut self, frame_type: FrameType, len: usize) {
        if frame_type == FrameType::IFrame && self.first_iframe.is_none() {
            self.first_iframe = Some(self.total());
        }
        match frame_type {
            FrameType::IFrame => self.iframes += 1,
            FrameType::PFrame => self.pframes += 1,
            FrameType::Unknown => self.unknown += 1,
        }
        self.bytes += len as u64;
    }
}

/// Classifies every chunk of a stream
#[derive(Debug, Clone)]
pub struct FrameAnalyzer {
    probe: StartCodeProbe,
    max_frame_bytes: usize,
}

impl Default for FrameAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnalyzer {
    /// Create an analyzer with the default start code layout
    pub fn new() -> Self {
        Self {
            probe: StartCodeProbe::default(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    /// Use a different start code layout
    pub fn with_probe(mut self, probe: StartCodeProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Set the scanner's frame size cap
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Scan the whole stream, reporting the type of every chunk
    pub fn run<R, P>(
        &self,
        source: R,
        progress: &mut P,
        cancel: &CancellationToken,
    ) -> MoshResult<FrameStats>
    where
        R: Read,
        P: ProgressSink<FrameType> + ?Sized,
    {
        let mut scanner = FrameScanner::new(source).with_max_frame_bytes(self.max_frame_bytes);
        let mut stats = FrameStats::default();

        loop {
            if cancel.is_cancelled() {
                info!(chunks = stats.total(), "Frame analysis cancelled");
                stats.cancelled = true;
                break;
            }

            let Some(chunk) = scanner.next_frame()? else {
                break;
            };

            let frame_type = self.probe.classify(&chunk);
            stats.record(frame_type, chunk.len());

            if !progress.report(frame_type) {
                debug!("Progress consumer went away, stopping analysis");
                stats.cancelled = true;
                break;
            }
        }

        info!(
            chunks = stats.total(),
            iframes = stats.iframes,
            pframes = stats.pframes,
            unknown = stats.unknown,
            "Frame analysis finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avi::{FRAME_MARKER, IFRAME_PREFIX, PFRAME_PREFIX};
    use crate::engine::progress::NoOpProgress;
    use std::io::Cursor;

    fn chunk(code: [u8; 3]) -> Vec<u8> {
        let mut c = vec![0xEE; 5];
        c.extend_from_slice(&code);
        c.extend_from_slice(&FRAME_MARKER);
        c
    }

    #[test]
    fn test_reports_type_of_every_chunk() {
        let data = [
            b"RIFF header 00dc".to_vec(),
            chunk(IFRAME_PREFIX),
            chunk(PFRAME_PREFIX),
            chunk(PFRAME_PREFIX),
            chunk(IFRAME_PREFIX),
        ]
        .concat();
        let mut types = Vec::new();
        let stats = FrameAnalyzer::new()
            .run(Cursor::new(data.clone()), &mut types, &CancellationToken::new())
            .unwrap();

        assert_eq!(
            types,
            vec![
                FrameType::Unknown,
                FrameType::IFrame,
                FrameType::PFrame,
                FrameType::PFrame,
                FrameType::IFrame,
            ]
        );
        assert_eq!(stats.iframes, 2);
        assert_eq!(stats.pframes, 2);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.first_iframe, Some(1));
        assert_eq!(stats.bytes, data.len() as u64);
        assert!(!stats.cancelled);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = FrameAnalyzer::new()
            .run(Cursor::new(chunk(IFRAME_PREFIX)), &mut NoOpProgress, &cancel)
            .unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_empty_stream() {
        let stats = FrameAnalyzer::new()
            .run(Cursor::new(Vec::new()), &mut NoOpProgress, &CancellationToken::new())
            .unwrap();
        assert_eq!(stats, FrameStats::default());
    }
}
