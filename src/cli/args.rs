//! Command-line argument definitions

use clap::Args;
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Arguments for the analyze command
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Input AVI file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Largest frame chunk to buffer, in bytes
    #[arg(long)]
    pub max_frame_bytes: Option<usize>,
}

impl AnalyzeArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            max_frame_bytes: self.max_frame_bytes,
            ..Default::default()
        }
    }
}

/// Arguments for the scenes command
#[derive(Args, Debug, Clone)]
pub struct ScenesArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Scene change threshold between 0 and 1
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// ffmpeg binary
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Copy ffmpeg's output to this file
    #[arg(long)]
    pub ffmpeg_log: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl ScenesArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            ffmpeg_path: self.ffmpeg.clone(),
            ffmpeg_log_path: self.ffmpeg_log.clone(),
            scene_threshold: self.threshold,
            ..Default::default()
        }
    }
}

/// Arguments for the mosh command
#[derive(Args, Debug, Clone)]
pub struct MoshArgs {
    /// Input AVI file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output AVI file path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Frame indices to remove, counted from the frame after the first I-frame
    #[arg(short, long, value_delimiter = ',')]
    pub remove: Vec<u64>,

    /// Also remove the frame at every detected scene change
    #[arg(long)]
    pub scenes: bool,

    /// Scene change threshold between 0 and 1
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// ffmpeg binary
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Copy ffmpeg's output to this file
    #[arg(long)]
    pub ffmpeg_log: Option<PathBuf>,

    /// Largest frame chunk to buffer, in bytes
    #[arg(long)]
    pub max_frame_bytes: Option<usize>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl MoshArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            max_frame_bytes: self.max_frame_bytes,
            ffmpeg_path: self.ffmpeg.clone(),
            ffmpeg_log_path: self.ffmpeg_log.clone(),
            scene_threshold: self.threshold,
            ..Default::default()
        }
    }
}
