//! Configuration loading and precedence
//!
//! Values are resolved in layers: defaults, then a TOML file, then
//! `MOSHPIT_*` environment variables, then command-line overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::avi::{StartCodeProbe, DEFAULT_MAX_FRAME_BYTES};
use crate::error::{MoshError, MoshResult};
use crate::scenes::{validate_threshold, DEFAULT_SCENE_THRESHOLD};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "moshpit.toml";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MoshConfig {
    /// Largest frame chunk the scanner will buffer
    pub max_frame_bytes: usize,
    /// ffmpeg binary used for scene detection
    pub ffmpeg_path: PathBuf,
    /// Where to copy ffmpeg's output, if anywhere
    pub ffmpeg_log_path: Option<PathBuf>,
    /// Scene score threshold in [0, 1]
    pub scene_threshold: f64,
    /// Capacity of worker progress channels
    pub progress_capacity: usize,
    /// Start code layout used to classify frames
    pub probe: StartCodeProbe,
}

impl Default for MoshConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffmpeg_log_path: None,
            scene_threshold: DEFAULT_SCENE_THRESHOLD,
            progress_capacity: 64,
            probe: StartCodeProbe::default(),
        }
    }
}

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_frame_bytes: Option<usize>,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffmpeg_log_path: Option<PathBuf>,
    pub scene_threshold: Option<f64>,
}

impl MoshConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> MoshResult<Self> {
        toml::from_str(content)
            .map_err(|e| MoshError::config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> MoshResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MoshError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Resolve the full configuration hierarchy
    ///
    /// An explicitly given file must exist; otherwise `moshpit.toml` in the
    /// working directory is used when present.
    pub fn resolve(config_path: Option<&Path>, overrides: &ConfigOverrides) -> MoshResult<Self> {
        info!("Initializing configuration hierarchy");

        let mut config = match config_path {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::load(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                Self::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        let env: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with("MOSHPIT_"))
            .collect();
        config.apply_env(&env)?;
        config.apply_overrides(overrides);
        config.validate()?;

        debug!(?config, "Configuration resolved");
        Ok(config)
    }

    /// Apply `MOSHPIT_*` variables
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> MoshResult<()> {
        let mut env_overrides = 0;

        if let Some(value) = env.get("MOSHPIT_MAX_FRAME_BYTES") {
            self.max_frame_bytes = value.trim().parse().map_err(|e| {
                MoshError::config(format!("Invalid MOSHPIT_MAX_FRAME_BYTES '{}': {}", value, e))
            })?;
            env_overrides += 1;
        }
        if let Some(value) = env.get("MOSHPIT_FFMPEG") {
            self.ffmpeg_path = PathBuf::from(value);
            env_overrides += 1;
        }
        if let Some(value) = env.get("MOSHPIT_FFMPEG_LOG") {
            self.ffmpeg_log_path = Some(PathBuf::from(value));
            env_overrides += 1;
        }
        if let Some(value) = env.get("MOSHPIT_SCENE_THRESHOLD") {
            self.scene_threshold = value.trim().parse().map_err(|e| {
                MoshError::config(format!("Invalid MOSHPIT_SCENE_THRESHOLD '{}': {}", value, e))
            })?;
            env_overrides += 1;
        }

        if env_overrides > 0 {
            info!("Applied {} environment variable overrides", env_overrides);
        }
        Ok(())
    }

    /// Apply command-line values
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(max) = overrides.max_frame_bytes {
            self.max_frame_bytes = max;
        }
        if let Some(path) = &overrides.ffmpeg_path {
            self.ffmpeg_path = path.clone();
        }
        if let Some(path) = &overrides.ffmpeg_log_path {
            self.ffmpeg_log_path = Some(path.clone());
        }
        if let Some(threshold) = overrides.scene_threshold {
            self.scene_threshold = threshold;
        }
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> MoshResult<()> {
        if self.max_frame_bytes == 0 {
            return Err(MoshError::config("max_frame_bytes must be greater than zero"));
        }
        if self.progress_capacity == 0 {
            return Err(MoshError::config("progress_capacity must be greater than zero"));
        }
        if self.probe.iframe_prefix.is_empty() || self.probe.pframe_prefix.is_empty() {
            return Err(MoshError::config("probe start code prefixes must not be empty"));
        }
        validate_threshold(self.scene_threshold)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MoshConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_frame_bytes, 10 * 1024 * 1024);
        assert_eq!(config.probe.offset, 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MoshConfig::from_toml(
            r#"
            max_frame_bytes = 2097152
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

            [probe]
            offset = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.max_frame_bytes, 2 * 1024 * 1024);
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.probe.offset, 8);
        assert_eq!(config.probe.iframe_prefix, vec![0x00, 0x01, 0xB0]);
        assert_eq!(config.scene_threshold, DEFAULT_SCENE_THRESHOLD);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(matches!(
            MoshConfig::from_toml("max_frame_size = 1"),
            Err(MoshError::Config { .. })
        ));
    }

    #[test]
    fn test_precedence_env_then_cli() {
        let mut config = MoshConfig::from_toml("scene_threshold = 0.2\nmax_frame_bytes = 100").unwrap();

        let env: HashMap<String, String> = [
            ("MOSHPIT_SCENE_THRESHOLD", "0.6"),
            ("MOSHPIT_FFMPEG", "/usr/local/bin/ffmpeg"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        config.apply_env(&env).unwrap();
        assert_eq!(config.scene_threshold, 0.6);
        assert_eq!(config.max_frame_bytes, 100);

        config.apply_overrides(&ConfigOverrides {
            scene_threshold: Some(0.9),
            ..Default::default()
        });
        assert_eq!(config.scene_threshold, 0.9);
        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = MoshConfig::default();
        let env = HashMap::from([("MOSHPIT_MAX_FRAME_BYTES".to_string(), "lots".to_string())]);
        assert!(matches!(config.apply_env(&env), Err(MoshError::Config { .. })));
    }

    #[test]
    fn test_validation_errors() {
        let config = MoshConfig {
            max_frame_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MoshConfig {
            scene_threshold: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MoshError::InvalidThreshold { .. })
        ));

        let mut config = MoshConfig::default();
        config.probe.pframe_prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moshpit.toml");
        std::fs::write(&path, "progress_capacity = 8\n").unwrap();
        let config = MoshConfig::resolve(Some(&path), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.progress_capacity, 8);

        let missing = dir.path().join("nope.toml");
        assert!(MoshConfig::resolve(Some(&missing), &ConfigOverrides::default()).is_err());
    }
}
