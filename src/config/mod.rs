//! # Config Module
//!
//! Settings for the booth collaborators.
//!
//! The state machine itself reads none of these; it only learns the
//! number of shots from the camera's `ready` event.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete booth configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoothConfig {
    /// Skip the welcome screen and start the camera right away
    pub omit_welcome: bool,
    pub storage: StorageConfig,
    pub camera: CameraConfig,
    pub timing: TimingConfig,
    pub lighting: LightingConfig,
    pub worker: WorkerConfig,
}

/// Where pictures are stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub basedir: PathBuf,
    /// File prefix, may contain `strftime` placeholders
    pub basename: String,
    /// Keep the single shots next to the assembled picture
    pub keep_pictures: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            basedir: dirs::picture_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("photobooth"),
            basename: "%Y-%m-%d/photobooth".to_string(),
            keep_pictures: false,
        }
    }
}

impl StorageConfig {
    /// Full basename below the base directory
    pub fn full_basename(&self) -> String {
        self.basedir.join(&self.basename).to_string_lossy().into_owned()
    }
}

/// Camera and template settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Shots assembled into one picture
    pub num_shots: u32,
    /// Stream preview frames to the display
    pub show_preview: bool,
    /// Pause between preview frames
    pub preview_interval_ms: u64,
    /// Attempts to open the camera before reporting an error
    pub startup_attempts: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            num_shots: 4,
            show_preview: true,
            preview_interval_ms: 40,
            startup_attempts: 3,
        }
    }
}

impl CameraConfig {
    pub fn preview_interval(&self) -> Duration {
        Duration::from_millis(self.preview_interval_ms)
    }
}

/// Delays used by the display driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Time on the welcome and idle screens before a session is triggered
    pub idle_ms: u64,
    pub greeter_ms: u64,
    pub countdown_ms: u64,
    /// Time the assembled picture is shown
    pub review_ms: u64,
    pub postprocess_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            idle_ms: 2_000,
            greeter_ms: 4_000,
            countdown_ms: 5_000,
            review_ms: 5_000,
            postprocess_ms: 10_000,
        }
    }
}

impl TimingConfig {
    /// Every delay set to `ms`, handy for demos and tests
    pub fn uniform(ms: u64) -> Self {
        Self {
            idle_ms: ms,
            greeter_ms: ms,
            countdown_ms: ms,
            review_ms: ms,
            postprocess_ms: ms,
        }
    }
}

/// Buttons and lights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub enable_button: bool,
    pub enable_light: bool,
    /// Pause between hue steps of the idle animation
    pub idle_step_ms: u64,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            enable_button: true,
            enable_light: true,
            idle_step_ms: 100,
        }
    }
}

/// Background worker tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Write pictures to disk
    pub save_pictures: bool,
    /// Print every picture without asking
    pub print_automatically: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            save_pictures: true,
            print_automatically: false,
        }
    }
}

impl BoothConfig {
    /// Set the number of shots per picture
    pub fn with_num_shots(mut self, num_shots: u32) -> Self {
        self.camera.num_shots = num_shots;
        self
    }

    /// Set the directory pictures are stored below
    pub fn with_basedir(mut self, basedir: impl Into<PathBuf>) -> Self {
        self.storage.basedir = basedir.into();
        self
    }

    /// Set the display delays
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Skip the welcome screen
    pub fn with_omit_welcome(mut self, omit_welcome: bool) -> Self {
        self.omit_welcome = omit_welcome;
        self
    }

    /// Load a JSON config file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Reading config file");

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check values the collaborators cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.num_shots == 0 {
            return Err(ConfigError::Invalid {
                key: "camera.num_shots",
                reason: "at least one shot per picture is required".to_string(),
            });
        }
        if self.camera.startup_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "camera.startup_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.storage.basename.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "storage.basename",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
