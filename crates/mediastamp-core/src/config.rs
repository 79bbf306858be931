use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Encoder settings for converting legacy containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeSettings {
    /// Extension of the converted file (without the dot)
    pub output_extension: String,
    pub video_codec: String,
    /// Constant rate factor (lower = better quality)
    pub crf: u8,
    pub preset: String,
    /// Pixel format forced through a `format=` filter
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub audio_channels: u8,
    /// Move the moov atom to the front for progressive playback
    pub faststart: bool,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            output_extension: "mp4".to_string(),
            video_codec: "libx264".to_string(),
            crf: 20,
            preset: "slow".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            audio_channels: 2,
            faststart: true,
        }
    }
}

/// Tool configuration, loadable from TOML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the ffmpeg binary
    pub ffmpeg_bin: PathBuf,
    pub transcode: TranscodeSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            transcode: TranscodeSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(config_path) = path else {
            return Ok(Self::default());
        };
        if !config_path.exists() {
            log::warn!("Config file {} not found, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        if config_path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
        let missing = Config::load(Some(Path::new("/nonexistent/mediastamp.toml"))).unwrap();
        assert_eq!(missing, Config::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediastamp.toml");
        std::fs::write(
            &path,
            "ffmpeg_bin = \"/opt/ffmpeg/bin/ffmpeg\"\n\n[transcode]\ncrf = 23\nfaststart = false\n",
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.ffmpeg_bin, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(cfg.transcode.crf, 23);
        assert!(!cfg.transcode.faststart);
        assert_eq!(cfg.transcode.video_codec, "libx264");
        assert_eq!(cfg.transcode.audio_bitrate, "192k");
    }

    #[test]
    fn test_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediastamp.json");
        std::fs::write(&path, r#"{"transcode": {"output_extension": "mkv", "audio_channels": 1}}"#).unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.ffmpeg_bin, PathBuf::from("ffmpeg"));
        assert_eq!(cfg.transcode.output_extension, "mkv");
        assert_eq!(cfg.transcode.audio_channels, 1);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediastamp.toml");
        std::fs::write(&path, "transcode = 5").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
