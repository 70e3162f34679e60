//! Time parsing and timecode formatting

use std::fmt;
use std::time::Duration;

/// Parse an ffmpeg clock value (`HH:MM:SS.xx`) into seconds
///
/// Returns `None` for anything else, including ffmpeg's `N/A`.
pub fn parse_clock(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    if hours < 0.0 || !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// A frame position at a given frame rate
///
/// Displayed as non-drop-frame `HH:MM:SS:FF`, where `FF` counts frames
/// within the second at the nominal (rounded) rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timecode {
    frame: u64,
    fps: f64,
}

impl Timecode {
    /// Timecode of the frame shown at `time`
    pub fn from_duration(time: Duration, fps: f64) -> Self {
        let frame = (time.as_secs_f64() * fps).round().max(0.0) as u64;
        Self { frame, fps }
    }

    /// Absolute frame index
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn nominal_rate(&self) -> u64 {
        (self.fps.round() as u64).max(1)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = self.nominal_rate();
        let frames = self.frame % rate;
        let total_seconds = self.frame / rate;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        write!(f, "{:02}:{:02}:{:02}:{:02}", hours, minutes, seconds, frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("00:00:10.50"), Some(10.5));
        assert_eq!(parse_clock("01:02:03.00"), Some(3723.0));
        assert_eq!(parse_clock(" 00:01:00.00 "), Some(60.0));
        assert_eq!(parse_clock("N/A"), None);
        assert_eq!(parse_clock("10.5"), None);
        assert_eq!(parse_clock("00:61:00.00"), None);
    }

    #[test]
    fn test_timecode_frame_index() {
        let tc = Timecode::from_duration(Duration::from_secs_f64(2.5), 24.0);
        assert_eq!(tc.frame(), 60);
        assert_eq!(tc.to_string(), "00:00:02:12");
    }

    #[test]
    fn test_timecode_rounds_to_nearest_frame() {
        // 1.001s at 29.97 fps is frame 30.00003
        let tc = Timecode::from_duration(Duration::from_secs_f64(1.001), 29.97);
        assert_eq!(tc.frame(), 30);
        assert_eq!(tc.to_string(), "00:00:01:00");
    }

    #[test]
    fn test_timecode_hours() {
        let tc = Timecode::from_duration(Duration::from_secs(3725), 25.0);
        assert_eq!(tc.to_string(), "01:02:05:00");
    }

    #[test]
    fn test_timecode_zero() {
        let tc = Timecode::from_duration(Duration::ZERO, 30.0);
        assert_eq!(tc.frame(), 0);
        assert_eq!(tc.to_string(), "00:00:00:00");
    }
}
