use crate::defaults;
use crate::error::{PerceptError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub vad: VadConfig,
    pub stt: SttConfig,
    pub scene: SceneConfig,
    pub events: EventsConfig,
}

/// Audio chunk shape configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub chunk_size: usize,
}

/// Utterance segmentation thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    pub onset_threshold: f32,
    pub offset_threshold: f32,
    pub min_speech_frames: u32,
    pub silence_frames: u32,
    pub max_speech_seconds: f32,
}

/// Transcript scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub confidence_threshold: f32,
}

/// Whether change detection gates classification or merely annotates it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChangePolicy {
    /// Always classify; attach the change magnitude as side information.
    #[default]
    Annotate,
    /// Skip the expensive classifier when the change threshold is not exceeded.
    Gate,
}

/// Vision watch loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    pub interval_seconds: f32,
    pub change_threshold: f32,
    pub change_policy: ChangePolicy,
}

/// One tracked event label and its confirmation threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRule {
    pub label: String,
    #[serde(default = "default_confirm_frames")]
    pub confirm_frames: u32,
}

fn default_confirm_frames() -> u32 {
    defaults::CONFIRM_FRAMES
}

/// Event detection scenario: ordered label rules plus an optional override
/// that replaces every per-label threshold with one value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EventsConfig {
    pub rules: Vec<EventRule>,
    pub confirm_override: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            chunk_size: defaults::CHUNK_SIZE,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            onset_threshold: defaults::ONSET_THRESHOLD,
            offset_threshold: defaults::OFFSET_THRESHOLD,
            min_speech_frames: defaults::MIN_SPEECH_FRAMES,
            silence_frames: defaults::SILENCE_FRAMES,
            max_speech_seconds: defaults::MAX_SPEECH_SECONDS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: defaults::CONFIDENCE_THRESHOLD,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            interval_seconds: defaults::WATCH_INTERVAL_SECONDS,
            change_threshold: defaults::CHANGE_MAD_THRESHOLD,
            change_policy: ChangePolicy::default(),
        }
    }
}

impl VadConfig {
    /// Maximum buffered sample count before a forced flush.
    pub fn max_samples(&self, sample_rate: u32) -> usize {
        (self.max_speech_seconds * sample_rate as f32) as usize
    }
}

impl SceneConfig {
    /// Tick interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f32(self.interval_seconds.max(0.0))
    }
}

impl EventsConfig {
    /// Effective confirmation threshold for a rule, honoring the override.
    pub fn effective_threshold(&self, rule: &EventRule) -> u32 {
        self.confirm_override.unwrap_or(rule.confirm_frames)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PerceptError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                PerceptError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if it doesn't exist.
    ///
    /// Invalid TOML in an existing file is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(PerceptError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported:
    /// - PERCEPT_AUDIO_DEVICE → audio.device
    /// - PERCEPT_CONFIRM_FRAMES → events.confirm_override
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("PERCEPT_AUDIO_DEVICE") {
            if !device.is_empty() {
                self.audio.device = Some(device);
            }
        }

        if let Ok(frames) = std::env::var("PERCEPT_CONFIRM_FRAMES") {
            if let Ok(n) = frames.parse::<u32>() {
                self.events.confirm_override = Some(n);
            }
        }

        self
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> PerceptError {
            PerceptError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            }
        }

        if self.audio.chunk_size == 0 {
            return Err(invalid("audio.chunk_size", "must be positive"));
        }
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must be positive"));
        }
        for (key, value) in [
            ("vad.onset_threshold", self.vad.onset_threshold),
            ("vad.offset_threshold", self.vad.offset_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(key, "must be in [0, 1]"));
            }
        }
        if self.vad.onset_threshold < self.vad.offset_threshold {
            return Err(invalid(
                "vad.onset_threshold",
                "must be >= vad.offset_threshold (hysteresis)",
            ));
        }
        if self.vad.min_speech_frames == 0 {
            return Err(invalid("vad.min_speech_frames", "must be at least 1"));
        }
        if self.vad.silence_frames == 0 {
            return Err(invalid("vad.silence_frames", "must be at least 1"));
        }
        if self.vad.max_speech_seconds <= 0.0 {
            return Err(invalid("vad.max_speech_seconds", "must be positive"));
        }
        if self.scene.interval_seconds < 0.0 {
            return Err(invalid("scene.interval_seconds", "must not be negative"));
        }
        for rule in &self.events.rules {
            if rule.label.trim().is_empty() {
                return Err(invalid("events.rules.label", "must not be empty"));
            }
            if self.events.effective_threshold(rule) == 0 {
                return Err(invalid(
                    "events.rules.confirm_frames",
                    "must be at least 1",
                ));
            }
        }
        Ok(())
    }
}
