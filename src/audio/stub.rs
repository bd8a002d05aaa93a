//! Stub backend when the audio feature is disabled

use std::collections::HashSet;
use std::time::Instant;

use tracing::debug;

use super::backend::{AudioBackend, VoiceId, Waveform};
use crate::error::{AlarmError, AlarmResult};

/// Backend that accepts every call and produces no sound
///
/// Custom sounds cannot be decoded, so the engine always falls back to the
/// synthesized melody.
pub struct SilentBackend {
    epoch: Instant,
    running: bool,
    next_voice: u64,
    voices: HashSet<VoiceId>,
}

impl SilentBackend {
    /// Create the stub backend
    pub fn new() -> Self {
        debug!("Audio feature not enabled, using silent backend");
        Self {
            epoch: Instant::now(),
            running: false,
            next_voice: 0,
            voices: HashSet::new(),
        }
    }

    fn known(&self, voice: VoiceId) -> AlarmResult<()> {
        if self.voices.contains(&voice) {
            Ok(())
        } else {
            Err(AlarmError::UnknownVoice(voice.raw()))
        }
    }

    fn insert(&mut self) -> VoiceId {
        self.next_voice += 1;
        let voice = VoiceId::new(self.next_voice);
        self.voices.insert(voice);
        voice
    }
}

impl Default for SilentBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for SilentBackend {
    type Buffer = ();

    fn resume(&mut self) -> AlarmResult<()> {
        self.running = true;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    async fn decode(&mut self, _bytes: Vec<u8>) -> AlarmResult<()> {
        Err(AlarmError::NotEnabled)
    }

    fn create_tone_generator(&mut self, _waveform: Waveform) -> AlarmResult<VoiceId> {
        Ok(self.insert())
    }

    fn create_buffer_player(&mut self, _buffer: &(), _looping: bool) -> AlarmResult<VoiceId> {
        Ok(self.insert())
    }

    fn schedule_gain(&mut self, voice: VoiceId, _level: f32, _at: f64) -> AlarmResult<()> {
        self.known(voice)
    }

    fn schedule_frequency(&mut self, voice: VoiceId, _hz: f32, _at: f64) -> AlarmResult<()> {
        self.known(voice)
    }

    fn start(&mut self, voice: VoiceId, _at: f64) -> AlarmResult<()> {
        debug!(%voice, "Audio playback skipped (feature not enabled)");
        self.known(voice)
    }

    fn schedule_stop(&mut self, voice: VoiceId, _at: f64) -> AlarmResult<()> {
        self.known(voice)
    }

    fn connect_to_output(&mut self, voice: VoiceId) -> AlarmResult<()> {
        self.known(voice)
    }

    fn stop(&mut self, _voice: VoiceId) {}

    fn disconnect(&mut self, voice: VoiceId) {
        self.voices.remove(&voice);
    }
}
