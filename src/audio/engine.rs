//! Alarm engine
//!
//! Owns the single active playback resource and drives an [`AudioBackend`].
//! Built-in sounds are synthesized as a square-wave note timeline scheduled on
//! the backend's audio clock; custom sounds are decoded and played as a
//! buffer, falling back to the default melody when decoding fails.
//!
//! Looping melodies re-schedule themselves from [`AlarmEngine::poll`], which
//! the host event loop calls the same way it polls its other timers.

use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use super::backend::{AudioBackend, VoiceId, Waveform};
use super::melody::{self, Melody, Note, Pitch, Sound};
use super::payload::CustomAudioPayload;
use super::EngineConfig;
use crate::error::AlarmResult;

/// What the engine is currently producing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing is sounding
    Idle,
    /// A built-in melody is playing
    Synthesizing {
        /// Whether the melody repeats
        looping: bool,
    },
    /// A decoded custom clip is playing
    PlayingBuffer {
        /// Whether the clip repeats
        looping: bool,
    },
}

/// One note as it was placed on the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    /// `None` for rests
    pub pitch: Option<Pitch>,
    /// Audio clock time the note begins
    pub start: f64,
    /// When the gain drops back to silence; `None` for rests
    pub gate_off: Option<f64>,
    /// Audio clock time the next note begins
    pub end: f64,
}

#[derive(Debug)]
struct PendingLoop {
    due_at: f64,
    melody: Melody,
}

#[derive(Debug)]
enum PlaybackSource {
    Synth { notes: Vec<ScheduledNote> },
    Buffer { looping: bool },
}

/// The active audio-producing voice plus its pending loop, if any
#[derive(Debug)]
pub struct PlaybackHandle {
    voice: VoiceId,
    source: PlaybackSource,
    pending_loop: Option<PendingLoop>,
}

impl PlaybackHandle {
    /// Backend voice producing the sound
    pub fn voice(&self) -> VoiceId {
        self.voice
    }

    /// Audio clock time at which the next loop iteration starts
    pub fn loop_due_at(&self) -> Option<f64> {
        self.pending_loop.as_ref().map(|pending| pending.due_at)
    }
}

/// Releases a freshly created voice unless it is committed
///
/// Keeps error paths from leaking a half-built voice into the output.
struct VoiceGuard<'a, B: AudioBackend> {
    backend: &'a mut B,
    voice: VoiceId,
    committed: bool,
}

impl<'a, B: AudioBackend> VoiceGuard<'a, B> {
    fn new(backend: &'a mut B, voice: VoiceId) -> Self {
        Self {
            backend,
            voice,
            committed: false,
        }
    }

    fn backend(&mut self) -> &mut B {
        self.backend
    }

    fn commit(mut self) -> VoiceId {
        self.committed = true;
        self.voice
    }
}

impl<B: AudioBackend> Drop for VoiceGuard<'_, B> {
    fn drop(&mut self) {
        if !self.committed {
            warn!(voice = %self.voice, "Releasing partially built voice");
            self.backend.stop(self.voice);
            self.backend.disconnect(self.voice);
        }
    }
}

/// Alarm playback controller
pub struct AlarmEngine<B: AudioBackend> {
    backend: B,
    config: EngineConfig,
    active: Option<PlaybackHandle>,
}

impl<B: AudioBackend> AlarmEngine<B> {
    /// Create an engine with default gain, articulation and loop pause
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    /// Create an engine with explicit tuning
    pub fn with_config(backend: B, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            active: None,
        }
    }

    /// The driven backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the driven backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Current tuning constants
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the tuning constants; applies from the next iteration on
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// Make sure the output device is running
    ///
    /// Must be called from a user interaction at least once before any sound
    /// is audible on platforms that gate audio output. Cheap to call again.
    pub fn resume_context(&mut self) -> AlarmResult<()> {
        if self.backend.is_running() {
            return Ok(());
        }
        self.backend.resume()?;
        info!("Audio output resumed");
        Ok(())
    }

    /// Stop whatever is playing and start `sound`
    ///
    /// `Sound::Custom` with a payload decodes and plays it; if decoding fails
    /// the default built-in melody plays instead. Every other case synthesizes
    /// the sound's melody. Only output/device errors are returned.
    pub async fn play(
        &mut self,
        sound: Sound,
        payload: Option<&CustomAudioPayload>,
        looping: bool,
    ) -> AlarmResult<()> {
        self.stop();

        let melody = match (sound, payload) {
            (Sound::Custom, Some(payload)) => match self.start_buffer(payload, looping).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_decode_failure() => {
                    error!(error = %e, "Error decoding custom audio data");
                    warn!(fallback = %Sound::default(), "Falling back to built-in alarm");
                    melody::melody_for(Sound::default())
                }
                Err(e) => return Err(e),
            },
            _ => melody::melody_for(sound),
        };

        info!(sound = %sound, looping, notes = melody.len(), "Starting alarm melody");
        self.start_melody(melody, looping)
    }

    /// Halt playback and cancel any pending loop. Safe to call when idle.
    pub fn stop(&mut self) {
        if let Some(handle) = self.active.take() {
            self.release(handle);
        }
    }

    /// Fire the pending loop iteration if its time has come
    ///
    /// Returns `true` when a new iteration was scheduled.
    pub fn poll(&mut self) -> AlarmResult<bool> {
        let Some(pending) = self
            .active
            .as_ref()
            .and_then(|handle| handle.pending_loop.as_ref())
        else {
            return Ok(false);
        };

        if self.backend.current_time() < pending.due_at {
            return Ok(false);
        }

        let melody = pending.melody;
        if let Some(finished) = self.active.take() {
            self.release(finished);
        }

        debug!("Starting next alarm loop iteration");
        self.start_melody(melody, true)?;
        Ok(true)
    }

    /// Time until [`poll`](Self::poll) would start the next loop iteration
    pub fn time_until_next_loop(&self) -> Option<Duration> {
        let due_at = self.active.as_ref()?.loop_due_at()?;
        let remaining = (due_at - self.backend.current_time()).max(0.0);
        Some(Duration::from_secs_f64(remaining))
    }

    /// What is currently playing
    pub fn state(&self) -> PlaybackState {
        match &self.active {
            None => PlaybackState::Idle,
            Some(handle) => match &handle.source {
                PlaybackSource::Synth { .. } => PlaybackState::Synthesizing {
                    looping: handle.pending_loop.is_some(),
                },
                PlaybackSource::Buffer { looping } => PlaybackState::PlayingBuffer {
                    looping: *looping,
                },
            },
        }
    }

    /// Whether any voice is active
    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// The active playback, if any
    pub fn active_handle(&self) -> Option<&PlaybackHandle> {
        self.active.as_ref()
    }

    /// Note timeline of the current melody iteration
    pub fn scheduled_notes(&self) -> &[ScheduledNote] {
        match self.active.as_ref().map(|handle| &handle.source) {
            Some(PlaybackSource::Synth { notes }) => notes,
            _ => &[],
        }
    }

    fn release(&mut self, handle: PlaybackHandle) {
        if handle.pending_loop.is_some() {
            debug!(voice = %handle.voice, "Cancelled pending alarm loop");
        }
        self.backend.stop(handle.voice);
        self.backend.disconnect(handle.voice);
        debug!(voice = %handle.voice, "Released playback voice");
    }

    async fn start_buffer(
        &mut self,
        payload: &CustomAudioPayload,
        looping: bool,
    ) -> AlarmResult<()> {
        let bytes = payload.decode_bytes()?;
        let buffer = self.backend.decode(bytes).await?;

        let voice = self.backend.create_buffer_player(&buffer, looping)?;
        let mut guard = VoiceGuard::new(&mut self.backend, voice);
        guard.backend().connect_to_output(voice)?;
        let now = guard.backend().current_time();
        guard.backend().start(voice, now)?;
        let voice = guard.commit();

        info!(%voice, looping, "Playing custom alarm sound");
        self.active = Some(PlaybackHandle {
            voice,
            source: PlaybackSource::Buffer { looping },
            pending_loop: None,
        });
        Ok(())
    }

    fn start_melody(&mut self, melody: Melody, looping: bool) -> AlarmResult<()> {
        let (voice, notes) = schedule_melody(&mut self.backend, &self.config, melody)?;

        let pending_loop = if looping {
            let start = notes.first().map_or(0.0, |note| note.start);
            let end = notes.last().map_or(start, |note| note.end);
            let due_at = end + self.config.loop_pause().as_secs_f64();
            debug!(%voice, due_at, "Scheduled next alarm loop");
            Some(PendingLoop { due_at, melody })
        } else {
            None
        };

        self.active = Some(PlaybackHandle {
            voice,
            source: PlaybackSource::Synth { notes },
            pending_loop,
        });
        Ok(())
    }
}

impl<B: AudioBackend> Drop for AlarmEngine<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lay a melody out on the audio clock starting now
///
/// Each sounding note opens the gain at its start and closes it after the
/// configured staccato fraction of its duration; rests only advance time.
fn schedule_melody<B: AudioBackend>(
    backend: &mut B,
    config: &EngineConfig,
    notes: &[Note],
) -> AlarmResult<(VoiceId, Vec<ScheduledNote>)> {
    let start = backend.current_time();
    let voice = backend.create_tone_generator(Waveform::Square)?;
    let mut guard = VoiceGuard::new(backend, voice);
    let backend = guard.backend();

    backend.schedule_gain(voice, 0.0, start)?;

    let mut at = start;
    let mut scheduled = Vec::with_capacity(notes.len());
    for note in notes {
        let end = at + note.duration;
        let gate_off = match note.pitch {
            Some(pitch) => {
                let off = at + note.duration * config.staccato;
                backend.schedule_gain(voice, config.gain, at)?;
                backend.schedule_frequency(voice, pitch.frequency(), at)?;
                backend.schedule_gain(voice, 0.0, off)?;
                trace!(%voice, pitch = pitch.name(), at, off, "Note");
                Some(off)
            }
            None => None,
        };
        scheduled.push(ScheduledNote {
            pitch: note.pitch,
            start: at,
            gate_off,
            end,
        });
        at = end;
    }

    backend.schedule_stop(voice, at)?;
    backend.connect_to_output(voice)?;
    backend.start(voice, start)?;

    debug!(
        %voice,
        notes = scheduled.len(),
        duration = at - start,
        "Scheduled melody"
    );

    Ok((guard.commit(), scheduled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::melody::{FALLBACK, RALLY_X};
    use crate::audio::testing::{GraphEvent, RecordingBackend};

    fn engine() -> AlarmEngine<RecordingBackend> {
        AlarmEngine::new(RecordingBackend::new())
    }

    #[tokio::test]
    async fn test_play_schedules_every_note() {
        let mut engine = engine();
        engine.play(Sound::RallyX, None, false).await.unwrap();

        let notes = engine.scheduled_notes();
        assert_eq!(notes.len(), RALLY_X.len());
        for pair in notes.windows(2) {
            assert!(pair[0].start <= pair[1].start);
            assert!((pair[0].end - pair[1].start).abs() < 1e-9);
        }
        for note in notes {
            match note.gate_off {
                Some(off) => {
                    assert!(off < note.end);
                    assert!((off - note.start - 0.9 * (note.end - note.start)).abs() < 1e-9);
                }
                None => assert!(note.pitch.is_none()),
            }
        }
    }

    #[tokio::test]
    async fn test_play_then_stop_releases_voice() {
        let mut engine = engine();
        engine.play(Sound::MoonPatrol, None, false).await.unwrap();
        assert_eq!(engine.backend().active_voices().len(), 1);

        engine.stop();
        assert!(engine.backend().active_voices().is_empty());
        assert_eq!(engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_stop_when_idle() {
        let mut engine = engine();
        engine.stop();
        engine.stop();
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(engine.backend().events().is_empty());
    }

    #[tokio::test]
    async fn test_custom_without_payload_uses_fallback_tone() {
        let mut engine = engine();
        engine.play(Sound::Custom, None, true).await.unwrap();
        assert_eq!(engine.scheduled_notes().len(), FALLBACK.len());
        assert_eq!(
            engine.state(),
            PlaybackState::Synthesizing { looping: true }
        );
    }

    #[tokio::test]
    async fn test_loop_pause_is_configurable() {
        let config = EngineConfig {
            loop_pause_ms: 1000,
            ..EngineConfig::default()
        };
        let mut engine = AlarmEngine::with_config(RecordingBackend::new(), config);
        engine.play(Sound::Custom, None, true).await.unwrap();

        let due = engine.active_handle().and_then(|h| h.loop_due_at());
        assert_eq!(due, Some(2.0));
    }

    #[tokio::test]
    async fn test_failed_connect_releases_voice() {
        let mut engine = AlarmEngine::new(RecordingBackend::new().with_failing_connect());
        let result = engine.play(Sound::RallyX, None, false).await;
        assert!(result.is_err());
        assert!(engine.backend().active_voices().is_empty());
        assert!(!engine.is_playing());
        assert!(engine
            .backend()
            .events()
            .iter()
            .any(|e| matches!(e, GraphEvent::Disconnect { .. })));
    }

    #[test]
    fn test_resume_context_is_idempotent() {
        let mut engine = engine();
        engine.resume_context().unwrap();
        engine.resume_context().unwrap();
        let resumes = engine
            .backend()
            .events()
            .iter()
            .filter(|e| matches!(e, GraphEvent::Resume))
            .count();
        assert_eq!(resumes, 1);
    }
}
