//! Scene detection against stand-in ffmpeg scripts
//!
//! Everything runs inside one test so that no other thread forks while a
//! script is still open for writing.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use moshpit::adapters::FfmpegSceneAdapter;
use moshpit::avi::{FRAME_MARKER, IFRAME_PREFIX, PFRAME_PREFIX};
use moshpit::ports::collect_scenes;
use moshpit::MoshError;

const SCENES_SCRIPT: &str = r#"#!/bin/sh
echo "ffmpeg version 6.1 Copyright (c) 2000-2023 the FFmpeg developers" >&2
echo "Input #0, avi, from '$2':" >&2
echo "  Duration: 00:00:10.00, start: 0.000000, bitrate: 1205 kb/s" >&2
echo "  Stream #0:0: Video: mpeg4 (Simple Profile) (FMP4 / 0x34504D46), yuv420p, 320x240, 25 fps, 25 tbr, 25 tbn" >&2
echo "[Parsed_showinfo_1 @ 0x55d0] n:   0 pts:     50 pts_time:2       duration:      1" >&2
printf 'frame=  125 fps=0.0 q=-0.0 size=N/A time=00:00:05.00 bitrate=N/A speed=10x\r' >&2
echo "[Parsed_showinfo_1 @ 0x55d0] n:   1 pts:    180 pts_time:7.2     duration:      1" >&2
exit 0
"#;

const NO_FPS_SCRIPT: &str = r#"#!/bin/sh
echo "[Parsed_showinfo_1 @ 0x55d0] n:   0 pts:     50 pts_time:2       duration:      1" >&2
exit 0
"#;

const FAILING_SCRIPT: &str = r#"#!/bin/sh
echo "  Stream #0:0: Video: mpeg4, yuv420p, 25 fps, 25 tbr" >&2
echo "in.avi: Invalid data found when processing input" >&2
exit 1
"#;

/// Scene changes at frames 2 and 4 of a 25 fps stream
const EARLY_SCENES_SCRIPT: &str = r#"#!/bin/sh
echo "  Stream #0:0: Video: mpeg4, yuv420p, 25 fps, 25 tbr" >&2
echo "[Parsed_showinfo_1 @ 0x1] n:   0 pts:      2 pts_time:0.08 duration: 1" >&2
echo "[Parsed_showinfo_1 @ 0x1] n:   1 pts:      4 pts_time:0.16 duration: 1" >&2
exit 0
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn chunk(tag: u8, code: [u8; 3]) -> Vec<u8> {
    let mut c = vec![tag; 5];
    c.extend_from_slice(&code);
    c.extend_from_slice(&[tag; 8]);
    c.extend_from_slice(&FRAME_MARKER);
    c
}

#[tokio::test]
async fn test_ffmpeg_scene_detection() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.avi");

    let mut chunks = vec![chunk(0x01, IFRAME_PREFIX)];
    chunks.extend((0..6).map(|i| chunk(0x40 + i, PFRAME_PREFIX)));
    fs::write(&input, chunks.concat()).unwrap();

    let scenes_bin = write_script(dir.path(), "ffmpeg-scenes", SCENES_SCRIPT);
    let no_fps_bin = write_script(dir.path(), "ffmpeg-no-fps", NO_FPS_SCRIPT);
    let failing_bin = write_script(dir.path(), "ffmpeg-failing", FAILING_SCRIPT);
    let early_bin = write_script(dir.path(), "ffmpeg-early", EARLY_SCENES_SCRIPT);

    // Scene changes and progress come out of the stderr stream.
    let log_path = dir.path().join("ffmpeg.log");
    let adapter = FfmpegSceneAdapter::new(&scenes_bin).with_log_path(Some(log_path.clone()));
    let mut progress = Vec::new();
    let scenes = collect_scenes(&adapter, &input, 0.3, CancellationToken::new(), |f| {
        progress.push(f)
    })
    .await
    .unwrap();

    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[0].frame, 50);
    assert_eq!(scenes[0].timecode, "00:00:02:00");
    assert_eq!(scenes[0].time, Duration::from_secs(2));
    assert_eq!(scenes[1].frame, 180);
    assert_eq!(scenes[1].timecode, "00:00:07:05");
    assert_eq!(progress, vec![0.5, 1.0]);

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("pts_time:7.2"));
    assert!(log.contains("time=00:00:05.00"));

    // A scene line before any frame rate cannot be turned into a frame index.
    let adapter = FfmpegSceneAdapter::new(&no_fps_bin);
    let result = collect_scenes(&adapter, &input, 0.3, CancellationToken::new(), |_| {}).await;
    assert!(matches!(result, Err(MoshError::MissingFrameRate)));

    // Nonzero exit carries the last line ffmpeg printed.
    let adapter = FfmpegSceneAdapter::new(&failing_bin);
    match collect_scenes(&adapter, &input, 0.3, CancellationToken::new(), |_| {}).await {
        Err(MoshError::ExternalTool { tool, message }) => {
            assert_eq!(tool, "ffmpeg-failing");
            assert!(message.contains("Invalid data found"));
        }
        other => panic!("expected tool failure, got {:?}", other),
    }

    // A binary that is not there fails to spawn.
    let adapter = FfmpegSceneAdapter::new(dir.path().join("no-such-ffmpeg"));
    let result = collect_scenes(&adapter, &input, 0.3, CancellationToken::new(), |_| {}).await;
    assert!(matches!(result, Err(MoshError::ExternalTool { .. })));

    // Thresholds are checked before anything is spawned.
    let adapter = FfmpegSceneAdapter::new(&scenes_bin);
    let result = collect_scenes(&adapter, &input, -0.5, CancellationToken::new(), |_| {}).await;
    assert!(matches!(result, Err(MoshError::InvalidThreshold { .. })));

    // A cancelled token stops detection without an error.
    let cancel = CancellationToken::new();
    cancel.cancel();
    let adapter = FfmpegSceneAdapter::new(&scenes_bin);
    assert!(collect_scenes(&adapter, &input, 0.3, cancel, |_| {}).await.is_ok());

    // The scenes command prints what ffmpeg found.
    let assert = Command::cargo_bin("moshpit")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("MOSHPIT_CONFIG")
        .args(["--log-level", "warn", "scenes", "--json", "--input"])
        .arg(&input)
        .arg("--ffmpeg")
        .arg(&scenes_bin)
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(json[0]["frame"], 50);
    assert_eq!(json[1]["timecode"], "00:00:07:05");

    // Scene frames 2 and 4 become post-header indices 1 and 3.
    let output = dir.path().join("moshed.avi");
    let mosh_log = dir.path().join("mosh-ffmpeg.log");
    Command::cargo_bin("moshpit")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("MOSHPIT_CONFIG")
        .args(["--log-level", "warn", "mosh", "--scenes", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--ffmpeg")
        .arg(&early_bin)
        .arg("--ffmpeg-log")
        .arg(&mosh_log)
        .assert()
        .success()
        .stdout(predicate::str::contains("Frames removed: 2"));
    assert!(fs::read_to_string(&mosh_log).unwrap().contains("pts_time:0.16"));

    let expected = [0, 1, 3, 3, 5, 5, 6]
        .iter()
        .flat_map(|&i| chunks[i].clone())
        .collect::<Vec<u8>>();
    assert_eq!(fs::read(&output).unwrap(), expected);

    // ffmpeg failures fail the command.
    Command::cargo_bin("moshpit")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("MOSHPIT_CONFIG")
        .args(["--log-level", "warn", "scenes", "--input"])
        .arg(&input)
        .arg("--ffmpeg")
        .arg(&failing_bin)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Scene detection failed"));
}
