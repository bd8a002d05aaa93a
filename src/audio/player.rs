//! Audio backend implementation using rodio

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, info, trace, warn};

use super::backend::{AudioBackend, VoiceId, Waveform};
use super::tone::{Automation, ToneRenderer, ToneTimeline};
use crate::error::{AlarmError, AlarmResult};

/// Sample rate used for synthesized tones
const TONE_SAMPLE_RATE: u32 = 44100;

/// A clip decoded into interleaved f32 samples
#[derive(Clone)]
pub struct DecodedAudio {
    channels: u16,
    sample_rate: u32,
    samples: Arc<Vec<f32>>,
}

impl DecodedAudio {
    /// Playing time of one pass through the clip
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as f64 / self.channels.max(1) as f64;
        Duration::from_secs_f64(frames / self.sample_rate.max(1) as f64)
    }

    fn source(&self) -> SamplesBuffer<f32> {
        SamplesBuffer::new(self.channels, self.sample_rate, self.samples.as_ref().clone())
    }
}

impl std::fmt::Debug for DecodedAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedAudio")
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("samples", &self.samples.len())
            .finish()
    }
}

enum VoiceSource {
    Tone(ToneTimeline),
    Buffer { audio: DecodedAudio, looping: bool },
}

struct Voice {
    source: VoiceSource,
    sink: Option<Sink>,
    started: bool,
}

/// Plays alarms through the default output device
///
/// The output stream opens lazily on the first `resume` or connect and stays
/// open for the lifetime of the backend.
pub struct RodioBackend {
    output: Option<(OutputStream, OutputStreamHandle)>,
    epoch: Instant,
    next_voice: u64,
    voices: HashMap<VoiceId, Voice>,
}

impl RodioBackend {
    /// Create a backend; the output device is opened on first use
    pub fn new() -> Self {
        Self {
            output: None,
            epoch: Instant::now(),
            next_voice: 0,
            voices: HashMap::new(),
        }
    }

    fn output_handle(&mut self) -> AlarmResult<&OutputStreamHandle> {
        if self.output.is_none() {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| AlarmError::OutputUnavailable(e.to_string()))?;
            info!("Audio output stream opened");
            self.output = Some((stream, handle));
        }
        match &self.output {
            Some((_, handle)) => Ok(handle),
            None => Err(AlarmError::OutputUnavailable("output stream missing".into())),
        }
    }

    fn insert(&mut self, source: VoiceSource) -> VoiceId {
        self.next_voice += 1;
        let voice = VoiceId::new(self.next_voice);
        self.voices.insert(
            voice,
            Voice {
                source,
                sink: None,
                started: false,
            },
        );
        voice
    }

    fn voice_mut(&mut self, voice: VoiceId) -> AlarmResult<&mut Voice> {
        self.voices
            .get_mut(&voice)
            .ok_or(AlarmError::UnknownVoice(voice.raw()))
    }

    fn automate(&mut self, voice: VoiceId, at: f64, automation: Automation) -> AlarmResult<()> {
        let entry = self.voice_mut(voice)?;
        match &mut entry.source {
            VoiceSource::Tone(timeline) => {
                if entry.started {
                    warn!(%voice, ?automation, "Ignoring automation on a started voice");
                } else {
                    timeline.push(at, automation);
                }
            }
            VoiceSource::Buffer { .. } => {
                trace!(%voice, ?automation, "Buffer voices take no automation");
            }
        }
        Ok(())
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for RodioBackend {
    type Buffer = DecodedAudio;

    fn resume(&mut self) -> AlarmResult<()> {
        self.output_handle().map(|_| ())
    }

    fn is_running(&self) -> bool {
        self.output.is_some()
    }

    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    async fn decode(&mut self, bytes: Vec<u8>) -> AlarmResult<DecodedAudio> {
        tokio::task::spawn_blocking(move || decode_clip(bytes))
            .await
            .map_err(|e| AlarmError::DecodeError(e.to_string()))?
    }

    fn create_tone_generator(&mut self, waveform: Waveform) -> AlarmResult<VoiceId> {
        let voice = self.insert(VoiceSource::Tone(ToneTimeline::new(waveform)));
        trace!(%voice, ?waveform, "Created tone generator");
        Ok(voice)
    }

    fn create_buffer_player(
        &mut self,
        buffer: &DecodedAudio,
        looping: bool,
    ) -> AlarmResult<VoiceId> {
        let voice = self.insert(VoiceSource::Buffer {
            audio: buffer.clone(),
            looping,
        });
        trace!(%voice, looping, "Created buffer player");
        Ok(voice)
    }

    fn schedule_gain(&mut self, voice: VoiceId, level: f32, at: f64) -> AlarmResult<()> {
        self.automate(voice, at, Automation::Gain(level))
    }

    fn schedule_frequency(&mut self, voice: VoiceId, hz: f32, at: f64) -> AlarmResult<()> {
        self.automate(voice, at, Automation::Frequency(hz))
    }

    fn start(&mut self, voice: VoiceId, at: f64) -> AlarmResult<()> {
        let now = self.current_time();
        let entry = self.voice_mut(voice)?;
        if entry.started {
            return Ok(());
        }

        let Some(sink) = entry.sink.as_ref() else {
            warn!(%voice, "Starting a voice that is not connected");
            entry.started = true;
            return Ok(());
        };

        match &mut entry.source {
            VoiceSource::Tone(timeline) => {
                timeline.push(at, Automation::Start);
                let renderer = ToneRenderer::new(timeline.clone(), TONE_SAMPLE_RATE, now);
                sink.append(ToneSource { renderer });
            }
            VoiceSource::Buffer { audio, looping } => {
                if *looping {
                    sink.append(audio.source().repeat_infinite());
                } else {
                    sink.append(audio.source());
                }
            }
        }
        sink.play();
        entry.started = true;
        debug!(%voice, at, "Voice started");
        Ok(())
    }

    fn schedule_stop(&mut self, voice: VoiceId, at: f64) -> AlarmResult<()> {
        self.automate(voice, at, Automation::Stop)
    }

    fn connect_to_output(&mut self, voice: VoiceId) -> AlarmResult<()> {
        // fail on unknown voices before touching the device
        self.voice_mut(voice)?;
        let sink = Sink::try_new(self.output_handle()?)
            .map_err(|e| AlarmError::OutputUnavailable(e.to_string()))?;
        sink.pause();

        let entry = self.voice_mut(voice)?;
        if entry.sink.replace(sink).is_some() {
            warn!(%voice, "Voice reconnected; previous route dropped");
        }
        Ok(())
    }

    fn stop(&mut self, voice: VoiceId) {
        if let Some(sink) = self.voices.get(&voice).and_then(|v| v.sink.as_ref()) {
            sink.stop();
        }
    }

    fn disconnect(&mut self, voice: VoiceId) {
        // dropping the sink detaches it from the mixer
        if self.voices.remove(&voice).is_some() {
            trace!(%voice, "Voice disconnected");
        }
    }
}

fn decode_clip(bytes: Vec<u8>) -> AlarmResult<DecodedAudio> {
    let decoder =
        Decoder::new(Cursor::new(bytes)).map_err(|e| AlarmError::DecodeError(e.to_string()))?;
    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.convert_samples().collect();

    if samples.is_empty() {
        return Err(AlarmError::DecodeError("no audio frames".into()));
    }

    let audio = DecodedAudio {
        channels,
        sample_rate,
        samples: Arc::new(samples),
    };
    debug!(?audio, duration = ?audio.duration(), "Decoded custom audio");
    Ok(audio)
}

/// Rodio source rendering a scheduled tone
struct ToneSource {
    renderer: ToneRenderer,
}

impl Iterator for ToneSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        self.renderer.next()
    }
}

impl Source for ToneSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.renderer.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.renderer
            .remaining_frames()
            .map(|frames| Duration::from_secs_f64(frames as f64 / TONE_SAMPLE_RATE as f64))
    }
}
