//! AVI chunk-level primitives
//!
//! This module locates compressed-video data chunks inside an AVI byte
//! stream and classifies their picture type. It does not parse the RIFF tree;
//! a chunk is simply everything up to and including the next `00dc` marker.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod scanner;

pub use scanner::FrameScanner;

/// The AVI video data chunk marker, ASCII `00dc`
pub const FRAME_MARKER: [u8; 4] = [0x30, 0x30, 0x64, 0x63];

/// Start code of an intra-coded picture (`0x0001B0`)
pub const IFRAME_PREFIX: [u8; 3] = [0x00, 0x01, 0xB0];

/// Start code of a predicted picture (`0x0001B6`)
pub const PFRAME_PREFIX: [u8; 3] = [0x00, 0x01, 0xB6];

/// Offset of the picture start code within a chunk
pub const START_CODE_OFFSET: usize = 5;

/// Default cap on a single frame chunk, large enough for 4K at 60 fps
pub const DEFAULT_MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

/// Picture type of a frame chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameType {
    /// No known start code at the probed offset
    Unknown,
    /// Intra-coded picture
    IFrame,
    /// Predicted picture
    PFrame,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::Unknown => write!(f, "unknown"),
            FrameType::IFrame => write!(f, "I"),
            FrameType::PFrame => write!(f, "P"),
        }
    }
}

/// Where and what to look for when classifying a chunk
///
/// The default matches the legacy codec layout where the picture start code
/// sits right after the chunk header at offset 5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartCodeProbe {
    /// Byte offset of the start code within the chunk
    pub offset: usize,
    /// Start code identifying an I-frame
    pub iframe_prefix: Vec<u8>,
    /// Start code identifying a P-frame
    pub pframe_prefix: Vec<u8>,
}

impl Default for StartCodeProbe {
    fn default() -> Self {
        Self {
            offset: START_CODE_OFFSET,
            iframe_prefix: IFRAME_PREFIX.to_vec(),
            pframe_prefix: PFRAME_PREFIX.to_vec(),
        }
    }
}

impl StartCodeProbe {
    /// Classify a chunk by exact comparison at the probed offset
    pub fn classify(&self, chunk: &[u8]) -> FrameType {
        if chunk.len() < self.offset {
            return FrameType::Unknown;
        }
        let window = &chunk[self.offset..];

        if Self::matches(window, &self.pframe_prefix) {
            FrameType::PFrame
        } else if Self::matches(window, &self.iframe_prefix) {
            FrameType::IFrame
        } else {
            FrameType::Unknown
        }
    }

    fn matches(window: &[u8], prefix: &[u8]) -> bool {
        !prefix.is_empty() && window.len() >= prefix.len() && &window[..prefix.len()] == prefix
    }
}

/// Classify a frame chunk using the default start code layout
///
/// Chunks shorter than 8 bytes are [`FrameType::Unknown`].
pub fn classify(chunk: &[u8]) -> FrameType {
    if chunk.len() < START_CODE_OFFSET + IFRAME_PREFIX.len() {
        return FrameType::Unknown;
    }

    let window = &chunk[START_CODE_OFFSET..START_CODE_OFFSET + 3];
    if window == PFRAME_PREFIX {
        FrameType::PFrame
    } else if window == IFRAME_PREFIX {
        FrameType::IFrame
    } else {
        FrameType::Unknown
    }
}
