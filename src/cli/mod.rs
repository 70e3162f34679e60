//! CLI module for moshpit
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

/// moshpit
///
/// Datamosh AVI files by removing frames at the container level and
/// replaying their neighbours in their place.
#[derive(Parser, Debug)]
#[command(name = "moshpit")]
#[command(about = "moshpit - chunk-level AVI datamoshing")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Configuration file (default: ./moshpit.toml if present)
    #[arg(long, global = true, env = "MOSHPIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify every frame chunk of an AVI file
    Analyze(args::AnalyzeArgs),
    /// Detect scene changes with ffmpeg
    Scenes(args::ScenesArgs),
    /// Remove frames and duplicate their successors
    Mosh(args::MoshArgs),
}
