//! Audio graph abstraction
//!
//! The alarm engine only talks to audio hardware through [`AudioBackend`].
//! A backend hands out voices (tone generators or decoded-buffer players)
//! addressed by [`VoiceId`] and accepts automation scheduled against its own
//! audio clock, which is measured in seconds.

use std::fmt;

use crate::error::AlarmResult;

/// Opaque handle to a voice owned by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

impl VoiceId {
    /// Wrap a backend-assigned number
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The backend-assigned number
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Oscillator shape for tone generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    /// 50% duty square wave
    #[default]
    Square,
    /// Pure sine
    Sine,
}

impl Waveform {
    /// Sample value at `phase` in [0, 1)
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
        }
    }
}

/// Minimal audio graph used by the alarm engine
///
/// Automation calls (`schedule_*`, `start`) only register future events and
/// return immediately. Tone automation should be scheduled before the voice is
/// started; backends that render ahead may ignore late events.
#[allow(async_fn_in_trait)]
pub trait AudioBackend {
    /// A decoded, playable audio clip
    type Buffer: Clone;

    /// Bring the output device into the running state. Idempotent.
    fn resume(&mut self) -> AlarmResult<()>;

    /// Whether the output device is running
    fn is_running(&self) -> bool;

    /// Current audio clock time in seconds
    fn current_time(&self) -> f64;

    /// Decode an encoded audio clip (wav, mp3, ogg, ...)
    async fn decode(&mut self, bytes: Vec<u8>) -> AlarmResult<Self::Buffer>;

    /// Create a tone generator voice, silent until started
    fn create_tone_generator(&mut self, waveform: Waveform) -> AlarmResult<VoiceId>;

    /// Create a voice that plays a decoded buffer
    fn create_buffer_player(&mut self, buffer: &Self::Buffer, looping: bool)
        -> AlarmResult<VoiceId>;

    /// Set the voice gain to `level` at audio time `at`
    fn schedule_gain(&mut self, voice: VoiceId, level: f32, at: f64) -> AlarmResult<()>;

    /// Set the tone frequency to `hz` at audio time `at`
    fn schedule_frequency(&mut self, voice: VoiceId, hz: f32, at: f64) -> AlarmResult<()>;

    /// Start producing sound at audio time `at`
    fn start(&mut self, voice: VoiceId, at: f64) -> AlarmResult<()>;

    /// Stop producing sound at audio time `at`
    fn schedule_stop(&mut self, voice: VoiceId, at: f64) -> AlarmResult<()>;

    /// Route the voice to the output device
    fn connect_to_output(&mut self, voice: VoiceId) -> AlarmResult<()>;

    /// Halt the voice immediately. Unknown voices are ignored.
    fn stop(&mut self, voice: VoiceId);

    /// Detach the voice from the output and free it. Unknown voices are ignored.
    fn disconnect(&mut self, voice: VoiceId);
}
