//! FitTimer Library
//!
//! This library provides the core functionality for the interval timer.
//! It exposes modules for settings, the countdown, and the alarm engine that
//! schedules chiptune melodies or user-supplied audio on an audio backend.

#![warn(missing_docs)]

pub mod audio;
pub mod config;
pub mod config_watcher;
pub mod console;
pub mod error;
pub mod i18n;
pub mod timer;

// Re-export commonly used types
pub use audio::{
    AlarmEngine, AudioBackend, CustomAudioPayload, DefaultBackend, EngineConfig, PlaybackState,
    Sound,
};
pub use config::{AlarmMode, Settings};
pub use config_watcher::{SettingsChanged, SettingsWatcher};
pub use error::{AlarmError, ConfigError};
pub use i18n::Language;
pub use timer::{Countdown, CountdownState, TickOutcome};
