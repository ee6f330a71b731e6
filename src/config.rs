use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for the Splice-Compositor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Speed and BGM settings shared by every job in a batch
    pub composition: CompositionConfig,

    /// Filename markers used to tell lead clips from body clips
    pub classifier: ClassifierConfig,

    /// FFmpeg binary and encoder settings
    pub encoder: EncoderConfig,

    /// Output naming and packaging
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|_| ConfigError::ParseFailed {
                path: path.as_ref().display().to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.composition.validate()?;
        self.classifier.validate()?;
        self.encoder.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

/// Batch-wide composition parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Playback speed multiplier (1.0 = unchanged)
    pub speed_factor: f64,

    /// BGM gain (0.0-1.0); ignored when no BGM is loaded
    pub bgm_volume: f64,

    /// Speed deviations at or below this are treated as 1.0
    pub speed_epsilon: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            speed_factor: 1.0,
            bgm_volume: 0.3,
            speed_epsilon: 0.001,
        }
    }
}

/// Range accepted by FFmpeg's `atempo` filter
pub const ATEMPO_RANGE: std::ops::RangeInclusive<f64> = 0.5..=100.0;

impl CompositionConfig {
    fn validate(&self) -> Result<()> {
        if !self.speed_factor.is_finite() || !ATEMPO_RANGE.contains(&self.speed_factor) {
            return Err(ConfigError::InvalidValue {
                key: "composition.speed_factor".to_string(),
                value: self.speed_factor.to_string()
            }.into());
        }

        if !(0.0..=1.0).contains(&self.bgm_volume) {
            return Err(ConfigError::InvalidValue {
                key: "composition.bgm_volume".to_string(),
                value: self.bgm_volume.to_string()
            }.into());
        }

        if !(self.speed_epsilon >= 0.0 && self.speed_epsilon < 0.5) {
            return Err(ConfigError::InvalidValue {
                key: "composition.speed_epsilon".to_string(),
                value: self.speed_epsilon.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Lead/body filename markers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Any of these marks a lead clip
    pub lead_markers: Vec<String>,

    /// Marks a body clip
    pub body_marker: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            lead_markers: vec!["キャッチ".to_string(), "冒頭".to_string()],
            body_marker: "ボディ".to_string(),
        }
    }
}

impl ClassifierConfig {
    fn validate(&self) -> Result<()> {
        if self.lead_markers.is_empty() || self.lead_markers.iter().any(|m| m.is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "classifier.lead_markers".to_string(),
                value: format!("{:?}", self.lead_markers)
            }.into());
        }

        if self.body_marker.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "classifier.body_marker".to_string(),
                value: String::new()
            }.into());
        }

        Ok(())
    }
}

/// Audio settings for one encoding profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioProfile {
    /// Bitrate passed to `-b:a`
    pub bitrate: String,

    /// Sample rate passed to `-ar`, when set
    pub sample_rate: Option<u32>,

    /// Add `-tune zerolatency` to the video encoder
    pub zero_latency: bool,
}

impl Default for AudioProfile {
    fn default() -> Self {
        Self {
            bitrate: "128k".to_string(),
            sample_rate: None,
            zero_latency: false,
        }
    }
}

/// FFmpeg encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// FFmpeg executable
    pub ffmpeg_path: PathBuf,

    /// Parent directory for the scratch namespace (system temp dir when unset)
    pub scratch_root: Option<PathBuf>,

    pub video_codec: String,
    pub preset: String,

    /// Constant rate factor (0-51, higher is faster and smaller)
    pub crf: u8,

    pub pixel_format: String,
    pub audio_codec: String,

    /// Encoder threads (0 = FFmpeg decides)
    pub threads: u32,

    /// Re-encode fallback after a failed copy concat
    pub copy_fallback_audio: AudioProfile,

    /// Copy-speed concat with BGM mixed in
    pub bgm_mix_audio: AudioProfile,

    /// Full re-encode with speed change
    pub reencode_audio: AudioProfile,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            scratch_root: None,
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            crf: 28,
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            threads: 0,
            copy_fallback_audio: AudioProfile {
                bitrate: "128k".to_string(),
                sample_rate: None,
                zero_latency: true,
            },
            bgm_mix_audio: AudioProfile {
                bitrate: "192k".to_string(),
                sample_rate: Some(48000),
                zero_latency: false,
            },
            reencode_audio: AudioProfile {
                bitrate: "128k".to_string(),
                sample_rate: Some(44100),
                zero_latency: true,
            },
        }
    }
}

impl EncoderConfig {
    fn validate(&self) -> Result<()> {
        if self.crf > 51 {
            return Err(ConfigError::InvalidValue {
                key: "encoder.crf".to_string(),
                value: self.crf.to_string()
            }.into());
        }

        if self.ffmpeg_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "encoder.ffmpeg_path".to_string(),
                value: String::new()
            }.into());
        }

        Ok(())
    }
}

/// Output naming and archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Container extension for every output
    pub extension: String,

    /// Folder inside the ZIP archive holding the outputs
    pub archive_folder: String,

    /// Archive file name prefix; the date is appended
    pub archive_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: "mp4".to_string(),
            archive_folder: "連結動画".to_string(),
            archive_prefix: "連結動画".to_string(),
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(ConfigError::InvalidValue {
                key: "output.extension".to_string(),
                value: self.extension.clone()
            }.into());
        }

        Ok(())
    }
}
