//! Recording backend for tests
//!
//! [`RecordingBackend`] implements [`AudioBackend`] without touching any audio
//! device. It logs every graph operation, runs on a manual clock and can be
//! told to fail at specific points.

use std::collections::BTreeMap;

use super::backend::{AudioBackend, VoiceId, Waveform};
use crate::error::{AlarmError, AlarmResult};

/// A graph operation as seen by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// Output device resumed
    Resume,
    /// A clip was handed to the decoder
    Decode {
        /// Encoded size
        bytes: usize,
        /// Whether decoding succeeded
        ok: bool,
    },
    /// Tone generator created
    CreateTone {
        /// New voice
        voice: VoiceId,
        /// Oscillator shape
        waveform: Waveform,
    },
    /// Buffer player created
    CreateBufferPlayer {
        /// New voice
        voice: VoiceId,
        /// Whether the clip repeats
        looping: bool,
    },
    /// Gain automation
    Gain {
        /// Target voice
        voice: VoiceId,
        /// Gain level
        level: f32,
        /// Audio clock time
        at: f64,
    },
    /// Frequency automation
    Frequency {
        /// Target voice
        voice: VoiceId,
        /// Frequency in Hz
        hz: f32,
        /// Audio clock time
        at: f64,
    },
    /// Voice start
    Start {
        /// Target voice
        voice: VoiceId,
        /// Audio clock time
        at: f64,
    },
    /// Scheduled stop
    ScheduleStop {
        /// Target voice
        voice: VoiceId,
        /// Audio clock time
        at: f64,
    },
    /// Voice routed to the output
    Connect {
        /// Target voice
        voice: VoiceId,
    },
    /// Immediate halt
    Stop {
        /// Target voice
        voice: VoiceId,
    },
    /// Voice detached and freed
    Disconnect {
        /// Target voice
        voice: VoiceId,
    },
}

impl GraphEvent {
    /// Voice the event applies to, if any
    pub fn voice(&self) -> Option<VoiceId> {
        match self {
            GraphEvent::Resume | GraphEvent::Decode { .. } => None,
            GraphEvent::CreateTone { voice, .. }
            | GraphEvent::CreateBufferPlayer { voice, .. }
            | GraphEvent::Gain { voice, .. }
            | GraphEvent::Frequency { voice, .. }
            | GraphEvent::Start { voice, .. }
            | GraphEvent::ScheduleStop { voice, .. }
            | GraphEvent::Connect { voice }
            | GraphEvent::Stop { voice }
            | GraphEvent::Disconnect { voice } => Some(*voice),
        }
    }
}

/// Decoded clip produced by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedClip {
    /// Encoded size of the clip
    pub bytes: usize,
}

/// What a recorded voice plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceKind {
    /// Tone generator
    Tone,
    /// Buffer player
    Buffer {
        /// Whether the clip repeats
        looping: bool,
    },
}

#[derive(Debug, Clone)]
struct VoiceRecord {
    kind: VoiceKind,
    connected: bool,
    halted: bool,
}

// Magic numbers of the containers the real player understands
const KNOWN_HEADERS: [&[u8]; 4] = [b"RIFF", b"OggS", b"ID3", b"fLaC"];

/// In-memory [`AudioBackend`] that records what it is asked to do
#[derive(Debug, Default)]
pub struct RecordingBackend {
    now: f64,
    running: bool,
    next_voice: u64,
    events: Vec<GraphEvent>,
    voices: BTreeMap<VoiceId, VoiceRecord>,
    fail_decode: bool,
    fail_create: bool,
    fail_connect: bool,
}

impl RecordingBackend {
    /// Backend with the clock at zero and no injected failures
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every clip, even ones with a known header
    pub fn with_failing_decode(mut self) -> Self {
        self.fail_decode = true;
        self
    }

    /// Report the output device as unavailable when creating voices
    pub fn with_failing_output(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Fail when routing a voice to the output
    pub fn with_failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Move the audio clock forward
    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds;
    }

    /// Every recorded event, in call order
    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Forget recorded events; voices are kept
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Events recorded for one voice, in call order
    pub fn events_for(&self, voice: VoiceId) -> Vec<GraphEvent> {
        self.events
            .iter()
            .filter(|event| event.voice() == Some(voice))
            .cloned()
            .collect()
    }

    /// Voices created and not yet disconnected
    pub fn active_voices(&self) -> Vec<VoiceId> {
        self.voices.keys().copied().collect()
    }

    /// Voices routed to the output and not halted
    pub fn connected_voices(&self) -> Vec<VoiceId> {
        self.voices
            .iter()
            .filter(|(_, record)| record.connected && !record.halted)
            .map(|(voice, _)| *voice)
            .collect()
    }

    /// Kind of a live voice
    pub fn voice_kind(&self, voice: VoiceId) -> Option<VoiceKind> {
        self.voices.get(&voice).map(|record| record.kind)
    }

    /// Number of tone generators ever created
    pub fn tone_voices_created(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, GraphEvent::CreateTone { .. }))
            .count()
    }

    fn create(&mut self, kind: VoiceKind) -> AlarmResult<VoiceId> {
        if self.fail_create {
            return Err(AlarmError::OutputUnavailable("no output device".into()));
        }
        self.next_voice += 1;
        let voice = VoiceId::new(self.next_voice);
        self.voices.insert(
            voice,
            VoiceRecord {
                kind,
                connected: false,
                halted: false,
            },
        );
        Ok(voice)
    }

    fn check(&self, voice: VoiceId) -> AlarmResult<()> {
        if self.voices.contains_key(&voice) {
            Ok(())
        } else {
            Err(AlarmError::UnknownVoice(voice.raw()))
        }
    }
}

impl AudioBackend for RecordingBackend {
    type Buffer = RecordedClip;

    fn resume(&mut self) -> AlarmResult<()> {
        self.running = true;
        self.events.push(GraphEvent::Resume);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn current_time(&self) -> f64 {
        self.now
    }

    async fn decode(&mut self, bytes: Vec<u8>) -> AlarmResult<RecordedClip> {
        let recognized = KNOWN_HEADERS.iter().any(|magic| bytes.starts_with(magic));
        let ok = recognized && !self.fail_decode;
        self.events.push(GraphEvent::Decode {
            bytes: bytes.len(),
            ok,
        });

        if ok {
            Ok(RecordedClip { bytes: bytes.len() })
        } else {
            Err(AlarmError::DecodeError("unrecognized audio format".into()))
        }
    }

    fn create_tone_generator(&mut self, waveform: Waveform) -> AlarmResult<VoiceId> {
        let voice = self.create(VoiceKind::Tone)?;
        self.events.push(GraphEvent::CreateTone { voice, waveform });
        Ok(voice)
    }

    fn create_buffer_player(
        &mut self,
        _buffer: &RecordedClip,
        looping: bool,
    ) -> AlarmResult<VoiceId> {
        let voice = self.create(VoiceKind::Buffer { looping })?;
        self.events
            .push(GraphEvent::CreateBufferPlayer { voice, looping });
        Ok(voice)
    }

    fn schedule_gain(&mut self, voice: VoiceId, level: f32, at: f64) -> AlarmResult<()> {
        self.check(voice)?;
        self.events.push(GraphEvent::Gain { voice, level, at });
        Ok(())
    }

    fn schedule_frequency(&mut self, voice: VoiceId, hz: f32, at: f64) -> AlarmResult<()> {
        self.check(voice)?;
        self.events.push(GraphEvent::Frequency { voice, hz, at });
        Ok(())
    }

    fn start(&mut self, voice: VoiceId, at: f64) -> AlarmResult<()> {
        self.check(voice)?;
        self.events.push(GraphEvent::Start { voice, at });
        Ok(())
    }

    fn schedule_stop(&mut self, voice: VoiceId, at: f64) -> AlarmResult<()> {
        self.check(voice)?;
        self.events.push(GraphEvent::ScheduleStop { voice, at });
        Ok(())
    }

    fn connect_to_output(&mut self, voice: VoiceId) -> AlarmResult<()> {
        self.check(voice)?;
        if self.fail_connect {
            return Err(AlarmError::OutputUnavailable("connect failed".into()));
        }
        if let Some(record) = self.voices.get_mut(&voice) {
            record.connected = true;
        }
        self.events.push(GraphEvent::Connect { voice });
        Ok(())
    }

    fn stop(&mut self, voice: VoiceId) {
        if let Some(record) = self.voices.get_mut(&voice) {
            record.halted = true;
            self.events.push(GraphEvent::Stop { voice });
        }
    }

    fn disconnect(&mut self, voice: VoiceId) {
        if self.voices.remove(&voice).is_some() {
            self.events.push(GraphEvent::Disconnect { voice });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_lifecycle() {
        let mut backend = RecordingBackend::new();
        let voice = backend.create_tone_generator(Waveform::Square).unwrap();
        assert_eq!(backend.active_voices(), vec![voice]);
        assert!(backend.connected_voices().is_empty());

        backend.connect_to_output(voice).unwrap();
        assert_eq!(backend.connected_voices(), vec![voice]);

        backend.stop(voice);
        backend.disconnect(voice);
        assert!(backend.active_voices().is_empty());
        assert_eq!(backend.events_for(voice).len(), 4);
    }

    #[test]
    fn test_unknown_voice_rejected() {
        let mut backend = RecordingBackend::new();
        let result = backend.schedule_gain(VoiceId::new(42), 0.5, 0.0);
        assert!(matches!(result, Err(AlarmError::UnknownVoice(42))));
        backend.stop(VoiceId::new(42));
        backend.disconnect(VoiceId::new(42));
        assert!(backend.events().is_empty());
    }

    #[tokio::test]
    async fn test_decode_checks_header() {
        let mut backend = RecordingBackend::new();
        assert!(backend.decode(b"RIFF....WAVE".to_vec()).await.is_ok());
        assert!(backend.decode(b"garbage".to_vec()).await.is_err());

        let mut failing = RecordingBackend::new().with_failing_decode();
        assert!(failing.decode(b"RIFF....WAVE".to_vec()).await.is_err());
    }

    #[test]
    fn test_clock_advances() {
        let mut backend = RecordingBackend::new();
        assert_eq!(backend.current_time(), 0.0);
        backend.advance(1.5);
        assert_eq!(backend.current_time(), 1.5);
    }
}
