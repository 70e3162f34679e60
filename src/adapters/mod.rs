// Adapters - External system implementations

pub mod ffmpeg_scenes;

// Re-export adapters
pub use ffmpeg_scenes::FfmpegSceneAdapter;
