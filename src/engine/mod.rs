//! Frame processing engine
//!
//! The rewrite and analysis loops are plain synchronous code over
//! `std::io` readers and writers. [`worker`] runs them in the background with
//! channel-based progress.

pub mod analyze;
pub mod progress;
pub mod rewrite;
pub mod worker;

pub use analyze::{FrameAnalyzer, FrameStats};
pub use progress::{FnProgress, NoOpProgress, ProgressSink};
pub use rewrite::{FrameRewriter, RewriteSummary};
pub use worker::{spawn_analysis, spawn_rewrite, WorkerHandle};
