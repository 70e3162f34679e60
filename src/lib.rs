//! moshpit library
//!
//! Chunk-level AVI datamoshing: split a stream on `00dc` frame markers,
//! classify each chunk by its MPEG-4 start code, and rewrite the stream with
//! chosen frames removed and their successors duplicated. Scene changes found
//! by ffmpeg can pick the frames to remove.

pub mod adapters;
pub mod avi;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod ports;
pub mod scenes;
pub mod utils;

// Re-export commonly used types
pub use avi::{classify, FrameScanner, FrameType, StartCodeProbe};
pub use config::MoshConfig;
pub use engine::analyze::{FrameAnalyzer, FrameStats};
pub use engine::rewrite::{FrameRewriter, RewriteSummary};
pub use error::{MoshError, MoshResult};
pub use scenes::SceneChange;
