//! Scene change detection model and ffmpeg output parsing
//!
//! Scene detection runs ffmpeg's `select` filter with a scene score
//! threshold and `showinfo`, then reads the diagnostic text ffmpeg prints to
//! stderr. Nothing here spawns processes; see
//! [`crate::adapters::FfmpegSceneAdapter`] for that.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{MoshError, MoshResult};
use crate::utils::time::{parse_clock, Timecode};

/// Default scene score threshold
pub const DEFAULT_SCENE_THRESHOLD: f64 = 0.4;

/// A detected scene change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneChange {
    /// Offset from the start of the stream
    #[serde(serialize_with = "serialize_seconds")]
    pub time: Duration,
    /// Frame index in decode order
    pub frame: u64,
    /// Frame rate the index was computed at
    pub fps: f64,
    /// `HH:MM:SS:FF` timecode
    pub timecode: String,
}

impl SceneChange {
    /// Build a scene change from a timestamp and frame rate
    pub fn at(time: Duration, fps: f64) -> Self {
        let tc = Timecode::from_duration(time, fps);
        Self {
            time,
            frame: tc.frame(),
            fps,
            timecode: tc.to_string(),
        }
    }
}

fn serialize_seconds<S: Serializer>(time: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(time.as_secs_f64())
}

/// Reject thresholds outside [0, 1]
pub fn validate_threshold(threshold: f64) -> MoshResult<f64> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(MoshError::InvalidThreshold { value: threshold })
    }
}

/// ffmpeg arguments for scene detection on `input`
///
/// Output goes to the null muxer; only stderr is of interest.
pub fn scene_detection_args(input: &Path, threshold: f64) -> Vec<String> {
    vec![
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-filter:v".to_string(),
        format!("select='gte(scene,{:.6})',showinfo", threshold),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ]
}

/// Post-header frame indices to remove so that each scene cut is moshed
///
/// Scene frames count in decode order from the first picture, which is the
/// I-frame ending the header region. Frame `f` therefore has post-header
/// index `f - 1`; a scene change on frame 0 has nothing to remove.
pub fn removal_indices(scenes: &[SceneChange]) -> BTreeSet<u64> {
    scenes
        .iter()
        .filter_map(|scene| scene.frame.checked_sub(1))
        .collect()
}

/// Something worth reporting from a line of ffmpeg output
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// Fraction of the input processed, in [0, 1]
    Progress(f64),
    /// A scene change was found
    Scene(SceneChange),
}

/// Incremental parser for ffmpeg scene detection output
pub struct SceneOutputParser {
    fps_re: Regex,
    duration_re: Regex,
    time_re: Regex,
    scene_re: Regex,
    fps: Option<f64>,
    duration: Option<f64>,
}

impl Default for SceneOutputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneOutputParser {
    /// Create a parser with no frame rate known yet
    pub fn new() -> Self {
        // The patterns are literals; failing to compile them is a bug.
        let compile = |pattern: &str| Regex::new(pattern).expect("valid regex literal");
        Self {
            fps_re: compile(r"Stream #0:0\D.* ([0-9]+(?:\.[0-9]+)?) fps"),
            duration_re: compile(r"Duration: ([0-9]+:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?)"),
            time_re: compile(r"time=([0-9]+:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?)"),
            scene_re: compile(r"Parsed_showinfo_[0-9]+.* pts_time:\s*(-?[0-9]+(?:\.[0-9]+)?)"),
            fps: None,
            duration: None,
        }
    }

    /// Frame rate of the first video stream, once announced
    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    /// Input duration in seconds, once announced
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Feed one line of ffmpeg stderr
    pub fn feed_line(&mut self, line: &str) -> MoshResult<Option<SceneEvent>> {
        if self.fps.is_none() {
            if let Some(caps) = self.fps_re.captures(line) {
                let fps: f64 = caps[1]
                    .parse()
                    .map_err(|e| MoshError::tool("ffmpeg", format!("error parsing fps value: {}", e)))?;
                if fps.is_finite() && fps > 0.0 {
                    tracing::debug!(fps, "Found frame rate of input stream");
                    self.fps = Some(fps);
                }
                return Ok(None);
            }
        }

        if self.duration.is_none() {
            if let Some(caps) = self.duration_re.captures(line) {
                self.duration = parse_clock(&caps[1]).filter(|d| *d > 0.0);
                return Ok(None);
            }
        }

        if let Some(caps) = self.scene_re.captures(line) {
            let Some(fps) = self.fps else {
                return Err(MoshError::MissingFrameRate);
            };
            let seconds: f64 = caps[1].parse().map_err(|e| {
                MoshError::tool("ffmpeg", format!("error parsing timestamp value: {}", e))
            })?;
            let time = Duration::from_secs_f64(seconds.max(0.0));
            return Ok(Some(SceneEvent::Scene(SceneChange::at(time, fps))));
        }

        if let Some(caps) = self.time_re.captures(line) {
            if let (Some(total), Some(done)) = (self.duration, parse_clock(&caps[1])) {
                return Ok(Some(SceneEvent::Progress((done / total).clamp(0.0, 1.0))));
            }
        }

        Ok(None)
    }
}
