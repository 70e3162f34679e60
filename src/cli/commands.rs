//! Command implementations

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::FfmpegSceneAdapter;
use crate::cli::args::{AnalyzeArgs, MoshArgs, ScenesArgs};
use crate::cli::Cli;
use crate::config::MoshConfig;
use crate::engine::analyze::{FrameAnalyzer, FrameStats};
use crate::engine::rewrite::{FrameRewriter, RewriteSummary};
use crate::engine::worker::{spawn_analysis, spawn_rewrite};
use crate::error::MoshError;
use crate::ports::collect_scenes;
use crate::scenes::{removal_indices, SceneChange};
use crate::utils::format_file_size;
use crate::utils::logging::ProgressReporter;

/// Frames between progress log lines
const PROGRESS_EVERY: u64 = 250;

/// Execute the analyze command
pub async fn analyze(args: AnalyzeArgs, cli: &Cli) -> Result<()> {
    info!("Starting analyze operation");
    info!("Input: {}", args.input.display());

    let config = MoshConfig::resolve(cli.config.as_deref(), &args.overrides())
        .context("Failed to load configuration")?;
    let source = open_input(&args.input)?;

    let analyzer = FrameAnalyzer::new()
        .with_probe(config.probe.clone())
        .with_max_frame_bytes(config.max_frame_bytes);
    let mut handle = spawn_analysis(
        analyzer,
        source,
        config.progress_capacity,
        CancellationToken::new(),
    );
    let interrupt = cancel_on_interrupt(handle.cancellation_token());

    let mut reporter = ProgressReporter::start("Analyzing frames", PROGRESS_EVERY);
    while let Some(frame_type) = handle.progress.recv().await {
        reporter.tick(frame_type);
    }
    let result = handle.join().await;
    interrupt.abort();

    let stats = result.context("Frame analysis failed")?;
    reporter.complete(!stats.cancelled);

    if args.json {
        let json = serde_json::to_string_pretty(&stats)
            .context("Failed to serialize frame statistics to JSON")?;
        println!("{}", json);
    } else {
        display_frame_stats(&args.input, &stats);
    }

    if stats.cancelled {
        anyhow::bail!("Analysis interrupted");
    }
    info!("Analyze operation completed successfully");
    Ok(())
}

/// Execute the scenes command
pub async fn scenes(args: ScenesArgs, cli: &Cli) -> Result<()> {
    info!("Starting scenes operation");
    info!("Input: {}", args.input.display());

    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let config = MoshConfig::resolve(cli.config.as_deref(), &args.overrides())
        .context("Failed to load configuration")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());
    let result = detect_scenes(&config, &args.input, cancel.clone()).await;
    interrupt.abort();
    let scenes = result?;

    if args.json {
        let json = serde_json::to_string_pretty(&scenes)
            .context("Failed to serialize scene changes to JSON")?;
        println!("{}", json);
    } else {
        display_scenes(&scenes);
    }

    if cancel.is_cancelled() {
        anyhow::bail!("Scene detection interrupted");
    }
    info!("Scenes operation completed successfully");
    Ok(())
}

/// Execute the mosh command
pub async fn mosh(args: MoshArgs, cli: &Cli) -> Result<()> {
    info!("Starting mosh operation");
    info!("Input: {}", args.input.display());
    info!("Output: {}", args.output.display());

    let config = MoshConfig::resolve(cli.config.as_deref(), &args.overrides())
        .context("Failed to load configuration")?;

    if same_file(&args.input, &args.output) {
        anyhow::bail!("Output would overwrite the input file: {}", args.output.display());
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());

    let mut removal: BTreeSet<u64> = args.remove.iter().copied().collect();
    if args.scenes {
        let scenes = detect_scenes(&config, &args.input, cancel.clone()).await;
        let scenes = match scenes {
            Ok(scenes) => scenes,
            Err(e) => {
                interrupt.abort();
                return Err(e);
            }
        };
        if cancel.is_cancelled() {
            interrupt.abort();
            anyhow::bail!("Scene detection interrupted");
        }
        let from_scenes = removal_indices(&scenes);
        info!("Removing {} frames at scene changes", from_scenes.len());
        removal.extend(from_scenes);
    }

    if removal.is_empty() {
        warn!("No frames selected for removal; output will be a plain copy");
    } else {
        info!("Removing {} frames", removal.len());
    }

    let source = open_input(&args.input)?;
    let sink = File::create(&args.output)
        .map_err(MoshError::Io)
        .with_context(|| format!("Failed to create output file: {}", args.output.display()))?;

    let rewriter = FrameRewriter::new(removal)
        .with_probe(config.probe.clone())
        .with_max_frame_bytes(config.max_frame_bytes);
    let mut handle = spawn_rewrite(
        rewriter,
        source,
        BufWriter::new(sink),
        config.progress_capacity,
        cancel,
    );

    let mut reporter = ProgressReporter::start("Moshing frames", PROGRESS_EVERY);
    while let Some(index) = handle.progress.recv().await {
        reporter.tick(format!("frame {}", index));
    }
    let result = handle.join().await;
    interrupt.abort();

    let summary = result.context("Frame rewrite failed")?;
    reporter.complete(!summary.cancelled);

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .context("Failed to serialize rewrite summary to JSON")?;
        println!("{}", json);
    } else {
        display_rewrite_summary(&args.output, &summary);
    }

    if summary.cancelled {
        anyhow::bail!("Mosh interrupted; output is truncated at a frame boundary");
    }
    info!("Mosh operation completed successfully");
    Ok(())
}

/// Run ffmpeg scene detection with the configured binary
async fn detect_scenes(
    config: &MoshConfig,
    input: &Path,
    cancel: CancellationToken,
) -> Result<Vec<SceneChange>> {
    info!(
        "Detecting scene changes with threshold {:.2}",
        config.scene_threshold
    );

    let adapter = FfmpegSceneAdapter::new(config.ffmpeg_path.clone())
        .with_log_path(config.ffmpeg_log_path.clone());
    let reporter = ProgressReporter::start("Detecting scenes", PROGRESS_EVERY);
    let mut last_decile = 0;

    let scenes = collect_scenes(&adapter, input, config.scene_threshold, cancel, |fraction| {
        let decile = (fraction * 10.0).floor() as u32;
        if decile > last_decile {
            last_decile = decile;
            reporter.fraction(fraction);
        }
    })
    .await
    .context("Scene detection failed")?;

    info!("Found {} scene changes", scenes.len());
    reporter.complete(true);
    Ok(scenes)
}

/// Cancel `token` when Ctrl-C is pressed
fn cancel_on_interrupt(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    warn!("Interrupted, stopping at the next frame");
                    token.cancel();
                }
            }
        }
    })
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path)
        .map_err(MoshError::Io)
        .with_context(|| format!("Failed to open input file: {}", path.display()))
}

fn same_file(input: &Path, output: &Path) -> bool {
    match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Display frame statistics in human-readable format
fn display_frame_stats(input: &Path, stats: &FrameStats) {
    println!("Frame Analysis");
    println!("==============");
    println!("File: {}", input.display());
    println!("Scanned: {}", format_file_size(stats.bytes));
    println!("Chunks: {}", stats.total());
    println!("  I-frames: {}", stats.iframes);
    println!("  P-frames: {}", stats.pframes);
    println!("  Unknown:  {}", stats.unknown);
    match stats.first_iframe {
        Some(index) => println!("First I-frame: chunk {}", index),
        None => println!("First I-frame: none (nothing would be moshed)"),
    }
}

/// Display scene changes in human-readable format
fn display_scenes(scenes: &[SceneChange]) {
    println!("Scene Changes");
    println!("=============");
    if scenes.is_empty() {
        println!("(none)");
        return;
    }
    for scene in scenes {
        println!(
            "{}  frame {:>6}  {:>10.3}s",
            scene.timecode,
            scene.frame,
            scene.time.as_secs_f64()
        );
    }
}

/// Display a rewrite summary in human-readable format
fn display_rewrite_summary(output: &Path, summary: &RewriteSummary) {
    println!("Mosh Summary");
    println!("============");
    println!("Output: {}", output.display());
    println!("Header chunks: {}", summary.header_chunks);
    println!("Frames indexed: {}", summary.frames_indexed);
    println!("Frames removed: {}", summary.frames_removed);
    println!("Chunks written: {}", summary.chunks_written);
    println!("Bytes written: {}", format_file_size(summary.bytes_written));
    if summary.dropped_duplicates > 0 {
        println!("Dropped duplicates: {}", summary.dropped_duplicates);
    }
}
