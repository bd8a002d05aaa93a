//! Error types for FitTimer
//!
//! This module defines error types using thiserror for better error handling
//! and debugging throughout the application.

use std::path::PathBuf;

use thiserror::Error;

/// Alarm engine and audio backend errors
#[derive(Error, Debug)]
pub enum AlarmError {
    /// No usable output device
    #[error("Failed to open audio output: {0}")]
    OutputUnavailable(String),

    /// The clip could not be decoded
    #[error("Failed to decode audio: {0}")]
    DecodeError(String),

    /// Malformed data URL or base64 body
    #[error("Invalid custom audio payload: {0}")]
    InvalidPayload(String),

    /// Custom sound file does not exist
    #[error("Sound file not found: {0}")]
    FileNotFound(PathBuf),

    /// Voice id not owned by the backend
    #[error("Unknown voice: {0}")]
    UnknownVoice(u64),

    /// Built without the `audio` feature
    #[error("Audio feature not enabled")]
    NotEnabled,
}

impl AlarmError {
    /// Whether this error came from turning user-supplied audio into samples.
    ///
    /// These are the errors the engine recovers from by falling back to a
    /// built-in melody.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            AlarmError::DecodeError(_) | AlarmError::InvalidPayload(_) | AlarmError::NotEnabled
        )
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file could not be read
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Settings file is not valid TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Settings could not be written as TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// The platform has no config directory
    #[error("Config directory not found")]
    NoConfigDir,

    /// A value is out of range
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result of an alarm or backend operation
pub type AlarmResult<T> = std::result::Result<T, AlarmError>;
/// Result of a settings operation
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failures_are_recoverable() {
        assert!(AlarmError::DecodeError("bad".into()).is_decode_failure());
        assert!(AlarmError::InvalidPayload("bad".into()).is_decode_failure());
        assert!(AlarmError::NotEnabled.is_decode_failure());
        assert!(!AlarmError::OutputUnavailable("no device".into()).is_decode_failure());
        assert!(!AlarmError::UnknownVoice(3).is_decode_failure());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AlarmError::NotEnabled.to_string(),
            "Audio feature not enabled"
        );
        assert_eq!(
            ConfigError::InvalidValue("seconds".into()).to_string(),
            "Invalid configuration value: seconds"
        );
    }
}
