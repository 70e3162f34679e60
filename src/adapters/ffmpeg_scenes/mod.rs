//! FFmpeg scene detection adapter
//!
//! Spawns ffmpeg with a `select`/`showinfo` filter chain and parses its
//! stderr while it runs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{MoshError, MoshResult};
use crate::ports::ScenePort;
use crate::scenes::{
    scene_detection_args, validate_threshold, SceneChange, SceneEvent, SceneOutputParser,
};

/// Longest output line kept; the rest of a longer line is skipped
const MAX_LINE_BYTES: usize = 64 * 1024;

/// FFmpeg-based scene detection adapter
#[derive(Debug, Clone)]
pub struct FfmpegSceneAdapter {
    ffmpeg_path: PathBuf,
    log_path: Option<PathBuf>,
}

impl Default for FfmpegSceneAdapter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegSceneAdapter {
    /// Create an adapter running the given ffmpeg binary
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            log_path: None,
        }
    }

    /// Also write ffmpeg's output to a log file
    pub fn with_log_path(mut self, log_path: Option<PathBuf>) -> Self {
        self.log_path = log_path;
        self
    }

    fn tool_name(&self) -> String {
        self.ffmpeg_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.ffmpeg_path.to_string_lossy().to_string())
    }
}

#[async_trait]
impl ScenePort for FfmpegSceneAdapter {
    async fn detect_scenes(
        &self,
        input: &Path,
        threshold: f64,
        scenes: mpsc::Sender<SceneChange>,
        progress: mpsc::Sender<f64>,
        cancel: CancellationToken,
    ) -> MoshResult<()> {
        let threshold = validate_threshold(threshold)?;
        let tool = self.tool_name();
        let args = scene_detection_args(input, threshold);

        info!(input = %input.display(), threshold, "Starting scene detection");
        debug!("Running {} {}", self.ffmpeg_path.display(), args.join(" "));

        let mut log = match &self.log_path {
            Some(path) => Some(tokio::fs::File::create(path).await.map_err(|e| {
                MoshError::tool(&tool, format!("failed to create log {}: {}", path.display(), e))
            })?),
            None => None,
        };

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MoshError::tool(&tool, format!("failed to spawn: {}", e)))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MoshError::tool(&tool, "stderr was not captured"))?;

        // Progress lines end in '\r', everything else in '\n'.
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        let mut parser = SceneOutputParser::new();
        let mut last_line = String::new();
        let mut found = 0u64;

        loop {
            let more = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(found, "Scene detection cancelled");
                    let _ = child.kill().await;
                    return Ok(());
                }
                more = read_output_line(&mut reader, &mut buf) => more
                    .map_err(|e| MoshError::tool(&tool, format!("failed to read output: {}", e)))?,
            };
            if !more {
                break;
            }
            if buf.is_empty() {
                continue;
            }

            let line = String::from_utf8_lossy(&buf).into_owned();

            let log_error = match log.as_mut() {
                Some(file) => file.write_all(format!("{}\n", line).as_bytes()).await.err(),
                None => None,
            };
            if let Some(e) = log_error {
                warn!("Failed to write ffmpeg log, disabling it: {}", e);
                log = None;
            }

            let event = match parser.feed_line(&line) {
                Ok(event) => event,
                Err(e) => {
                    let _ = child.kill().await;
                    return Err(e);
                }
            };

            match event {
                Some(SceneEvent::Scene(scene)) => {
                    found += 1;
                    debug!(frame = scene.frame, timecode = %scene.timecode, "Scene change");
                    if scenes.send(scene).await.is_err() {
                        info!("Scene consumer went away, stopping ffmpeg");
                        let _ = child.kill().await;
                        return Ok(());
                    }
                }
                Some(SceneEvent::Progress(fraction)) => {
                    let _ = progress.send(fraction).await;
                }
                None => {}
            }

            if !line.trim().is_empty() {
                last_line = line;
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| MoshError::tool(&tool, format!("I/O error waiting for process: {}", e)))?;

        if !status.success() {
            return Err(MoshError::tool(
                &tool,
                format!("exited with status {}: {}", status, last_line.trim()),
            ));
        }

        if let Some(log) = log.as_mut() {
            let _ = log.flush().await;
        }

        let _ = progress.send(1.0).await;
        info!(found, "Scene detection finished");
        Ok(())
    }
}

/// Read one line of ffmpeg output into `line`, ending at `\r` or `\n`
///
/// The delimiter is not kept. Returns `false` once the output is exhausted
/// and nothing was read.
async fn read_output_line<R>(reader: &mut R, line: &mut Vec<u8>) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(!line.is_empty());
        }

        let (take, done) = match available.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(pos) => (pos, true),
            None => (available.len(), false),
        };
        let room = MAX_LINE_BYTES.saturating_sub(line.len());
        line.extend_from_slice(&available[..take.min(room)]);
        reader.consume(if done { take + 1 } else { take });

        if done {
            return Ok(true);
        }
    }
}
