//! Recorder configuration
//!
//! Loaded from a JSON file; every field has a default.

use crate::capture::AudioFormat;
use crate::utils::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the recording coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Encodings to ask the device for, most preferred first
    pub preferred_formats: Vec<AudioFormat>,

    /// How often the device should emit a fragment
    pub fragment_interval_ms: u64,

    pub keep_alive: KeepAliveConfig,

    pub upload: UploadConfig,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            preferred_formats: AudioFormat::DEFAULT_PREFERENCES.to_vec(),
            fragment_interval_ms: 1000,
            keep_alive: KeepAliveConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeepAliveConfig {
    /// Play a silent loop while recording
    pub silent_audio: bool,

    /// Hold a screen wake lock while recording
    pub wake_lock: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            silent_audio: true,
            wake_lock: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfig {
    /// Prepended to every storage path
    pub path_prefix: String,

    /// Query parameter carrying the cache-busting token
    pub cache_bust_param: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path_prefix: String::new(),
            cache_bust_param: "t".to_string(),
        }
    }
}

impl RecorderConfig {
    /// Read a configuration file
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RecorderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded recorder config from {:?}", path);
        Ok(config)
    }

    /// Read a configuration file, using defaults if it does not exist
    pub fn load_or_default(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No recorder config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.fragment_interval_ms == 0 {
            return Err(AppError::Config("fragmentIntervalMs must be positive".into()));
        }
        if self.upload.cache_bust_param.is_empty() {
            return Err(AppError::Config("upload.cacheBustParam must not be empty".into()));
        }
        Ok(())
    }

    pub fn fragment_interval(&self) -> Duration {
        Duration::from_millis(self.fragment_interval_ms)
    }
}
