//! Settings management
//!
//! Timer settings persisted as TOML in the user config directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::{CustomAudioPayload, EngineConfig, Sound};
use crate::error::{ConfigError, ConfigResult};
use crate::i18n::Language;

/// Whether the alarm plays once or repeats until acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmMode {
    /// Play the alarm once
    #[default]
    Single,
    /// Repeat the alarm until it is acknowledged
    Continuous,
}

impl AlarmMode {
    /// Whether the alarm repeats
    pub fn is_looping(self) -> bool {
        self == AlarmMode::Continuous
    }
}

/// Persisted timer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Countdown minutes
    #[serde(default = "default_minutes")]
    pub minutes: u32,

    /// Countdown seconds (0-59)
    #[serde(default)]
    pub seconds: u32,

    /// Alarm sound
    #[serde(default)]
    pub sound: Sound,

    /// Play once or loop
    #[serde(default)]
    pub alarm_mode: AlarmMode,

    /// Interface language
    #[serde(default)]
    pub language: Language,

    /// Synthesis tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Uploaded custom sound; too large to persist, kept for the session only
    #[serde(skip)]
    pub custom_sound_data: Option<CustomAudioPayload>,
}

fn default_minutes() -> u32 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            minutes: default_minutes(),
            seconds: 0,
            sound: Sound::default(),
            alarm_mode: AlarmMode::default(),
            language: Language::default(),
            engine: EngineConfig::default(),
            custom_sound_data: None,
        }
    }
}

impl Settings {
    /// Load settings from the user config directory or create defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load settings from `path`, writing defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("Failed to read settings file")?;

            let settings: Self =
                toml::from_str(&content).context("Failed to parse settings file")?;
            settings.validate().context("Invalid settings file")?;
            Ok(settings)
        } else {
            let settings = Self::default();
            settings.save_to(path)?;
            Ok(settings)
        }
    }

    /// Save settings to the user config directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save settings to `path`, creating its directory if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(path, content).context("Failed to write settings file")?;

        Ok(())
    }

    /// Get the path to the settings file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;

        Ok(config_dir.join("fittimer").join("settings.toml"))
    }

    /// Total countdown length
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.minutes) * 60 + u64::from(self.seconds))
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.seconds > 59 {
            return Err(ConfigError::InvalidValue(format!(
                "seconds must be 0-59, got {}",
                self.seconds
            )));
        }
        if self.duration().is_zero() {
            return Err(ConfigError::InvalidValue(
                "countdown duration must be positive".into(),
            ));
        }
        if !(self.engine.staccato > 0.0 && self.engine.staccato <= 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "engine.staccato must be in (0, 1], got {}",
                self.engine.staccato
            )));
        }
        if !(0.0..=1.0).contains(&self.engine.gain) {
            return Err(ConfigError::InvalidValue(format!(
                "engine.gain must be in [0, 1], got {}",
                self.engine.gain
            )));
        }
        Ok(())
    }
}
