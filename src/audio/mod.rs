//! Alarm sound scheduling and synthesis
//!
//! This module provides the alarm engine, the built-in chiptune melodies and
//! the audio backends it can drive: a rodio-based player when the `audio`
//! feature is enabled and a silent stub otherwise.

pub mod backend;
pub mod engine;
pub mod melody;
pub mod payload;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tone;

#[cfg(feature = "audio")]
mod player;

#[cfg(feature = "audio")]
pub use player::{DecodedAudio, RodioBackend};

/// Backend used by the application
#[cfg(feature = "audio")]
pub type DefaultBackend = RodioBackend;

#[cfg(not(feature = "audio"))]
mod stub;

#[cfg(not(feature = "audio"))]
pub use stub::SilentBackend;

/// Backend used by the application
#[cfg(not(feature = "audio"))]
pub type DefaultBackend = SilentBackend;

pub use backend::{AudioBackend, VoiceId, Waveform};
pub use engine::{AlarmEngine, PlaybackHandle, PlaybackState, ScheduledNote};
pub use melody::{Melody, Note, Pitch, Sound};
pub use payload::CustomAudioPayload;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning constants for synthesized alarms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Gain of a sounding note (0.0 to 1.0)
    #[serde(default = "default_gain")]
    pub gain: f32,

    /// Fraction of each note's duration before its gain drops to silence
    #[serde(default = "default_staccato")]
    pub staccato: f64,

    /// Pause between loop iterations in milliseconds
    #[serde(default = "default_loop_pause_ms")]
    pub loop_pause_ms: u64,
}

fn default_gain() -> f32 {
    0.2
}

fn default_staccato() -> f64 {
    0.9
}

fn default_loop_pause_ms() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gain: default_gain(),
            staccato: default_staccato(),
            loop_pause_ms: default_loop_pause_ms(),
        }
    }
}

impl EngineConfig {
    /// Pause between loop iterations
    pub fn loop_pause(&self) -> Duration {
        Duration::from_millis(self.loop_pause_ms)
    }
}
