//! Integration tests for the alarm engine
//!
//! These run the engine against the recording backend, so they exercise the
//! scheduling and resource handling without an audio device.

use fittimer::audio::melody::{self, ELEVATOR_ACTION, FALLBACK, MOON_PATROL, RALLY_X};
use fittimer::audio::testing::{GraphEvent, RecordingBackend, VoiceKind};
use fittimer::audio::{AlarmEngine, CustomAudioPayload, PlaybackState, Sound, VoiceId};
use fittimer::AlarmError;

fn engine() -> AlarmEngine<RecordingBackend> {
    AlarmEngine::new(RecordingBackend::new())
}

fn wav_payload() -> CustomAudioPayload {
    CustomAudioPayload::from_bytes("audio/wav", b"RIFF\x24\x00\x00\x00WAVEfmt ")
}

fn active_voice(engine: &AlarmEngine<RecordingBackend>) -> VoiceId {
    engine.active_handle().expect("playback should be active").voice()
}

fn position(events: &[GraphEvent], wanted: &GraphEvent) -> usize {
    events
        .iter()
        .position(|event| event == wanted)
        .unwrap_or_else(|| panic!("missing event {:?}", wanted))
}

// Every built-in sound releases its voice on stop
#[tokio::test]
async fn test_play_then_stop_leaves_nothing_active() {
    for sound in [Sound::RallyX, Sound::MoonPatrol, Sound::ElevatorAction] {
        let mut engine = engine();
        engine.play(sound, None, false).await.unwrap();
        assert_eq!(engine.backend().connected_voices().len(), 1);

        engine.stop();
        assert!(engine.backend().active_voices().is_empty(), "{} leaked", sound);
        assert!(!engine.is_playing());
    }
}

// A second play releases the first voice before building the next one
#[tokio::test]
async fn test_play_twice_keeps_one_voice() {
    let mut engine = engine();
    engine.play(Sound::MoonPatrol, None, true).await.unwrap();
    let first = active_voice(&engine);

    engine.play(Sound::ElevatorAction, None, false).await.unwrap();
    let second = active_voice(&engine);

    assert_ne!(first, second);
    assert_eq!(engine.backend().active_voices(), vec![second]);
    assert_eq!(engine.backend().connected_voices(), vec![second]);

    let events = engine.backend().events();
    let released = position(events, &GraphEvent::Disconnect { voice: first });
    let created = position(
        events,
        &GraphEvent::CreateTone {
            voice: second,
            waveform: fittimer::audio::Waveform::Square,
        },
    );
    assert!(released < created, "old voice must be released first");
    assert_eq!(engine.state(), PlaybackState::Synthesizing { looping: false });
}

#[tokio::test]
async fn test_rapid_replays_never_overlap() {
    let mut engine = engine();
    for _ in 0..10 {
        engine.play(Sound::RallyX, None, true).await.unwrap();
        assert_eq!(engine.backend().connected_voices().len(), 1);
    }
    engine.stop();
    assert!(engine.backend().active_voices().is_empty());
}

#[test]
fn test_stop_without_playback() {
    let mut engine = engine();
    engine.stop();
    assert_eq!(engine.state(), PlaybackState::Idle);
}

// The Rally-X timeline: one entry per note, staccato gates, monotonic times
#[tokio::test]
async fn test_rally_x_schedule() {
    let mut engine = engine();
    engine.backend_mut().advance(2.5);
    engine.play(Sound::RallyX, None, false).await.unwrap();

    let notes = engine.scheduled_notes();
    assert_eq!(notes.len(), RALLY_X.len());
    assert!((notes[0].start - 2.5).abs() < 1e-9);

    for (i, note) in notes.iter().enumerate() {
        assert_eq!(note.pitch, RALLY_X[i].pitch);
        if let Some(next) = notes.get(i + 1) {
            assert!(note.start <= next.start);
            if let Some(off) = note.gate_off {
                assert!(off < next.start);
            }
        }
        if let Some(off) = note.gate_off {
            let expected = note.start + RALLY_X[i].duration * 0.9;
            assert!((off - expected).abs() < 1e-9);
        }
    }

    // The backend saw the same timeline
    let voice = active_voice(&engine);
    let events = engine.backend().events_for(voice);
    let gate_ons: Vec<f64> = events
        .iter()
        .filter_map(|event| match event {
            GraphEvent::Gain { level, at, .. } if *level > 0.0 => Some(*at),
            _ => None,
        })
        .collect();
    let tones = RALLY_X.iter().filter(|note| !note.is_rest()).count();
    assert_eq!(gate_ons.len(), tones);
    assert!(gate_ons.windows(2).all(|pair| pair[0] < pair[1]));

    let frequencies = events
        .iter()
        .filter(|event| matches!(event, GraphEvent::Frequency { .. }))
        .count();
    assert_eq!(frequencies, tones);

    let end = 2.5 + melody::total_duration(RALLY_X);
    assert!(events.iter().any(|event| matches!(
        event,
        GraphEvent::ScheduleStop { at, .. } if (at - end).abs() < 1e-9
    )));
}

#[tokio::test]
async fn test_each_builtin_resolves_to_its_melody() {
    let mut engine = engine();
    for (sound, notes) in [
        (Sound::RallyX, RALLY_X),
        (Sound::MoonPatrol, MOON_PATROL),
        (Sound::ElevatorAction, ELEVATOR_ACTION),
    ] {
        engine.play(sound, None, false).await.unwrap();
        assert_eq!(engine.scheduled_notes().len(), notes.len());
    }
}

// Custom with a payload the backend cannot decode plays the default melody
#[tokio::test]
async fn test_undecodable_custom_falls_back_to_default() {
    let mut engine = AlarmEngine::new(RecordingBackend::new().with_failing_decode());
    let result = engine.play(Sound::Custom, Some(&wav_payload()), false).await;

    assert!(result.is_ok());
    assert_eq!(engine.scheduled_notes().len(), RALLY_X.len());
    assert_eq!(engine.state(), PlaybackState::Synthesizing { looping: false });

    let decodes = engine
        .backend()
        .events()
        .iter()
        .filter(|event| matches!(event, GraphEvent::Decode { .. }))
        .count();
    assert_eq!(decodes, 1, "a bad payload is decoded once, never retried");
}

#[tokio::test]
async fn test_malformed_data_url_falls_back() {
    let mut engine = engine();
    let payload = CustomAudioPayload::from_data_url("data:audio/wav;base64,%%%");
    engine.play(Sound::Custom, Some(&payload), true).await.unwrap();

    assert_eq!(engine.scheduled_notes().len(), RALLY_X.len());
    assert_eq!(engine.state(), PlaybackState::Synthesizing { looping: true });
}

// Custom selected but nothing uploaded still makes a sound
#[tokio::test]
async fn test_custom_without_payload_synthesizes() {
    let mut engine = engine();
    engine.play(Sound::Custom, None, true).await.unwrap();

    assert_eq!(engine.scheduled_notes().len(), FALLBACK.len());
    assert_eq!(engine.backend().connected_voices().len(), 1);
}

#[tokio::test]
async fn test_custom_payload_plays_buffer() {
    let mut engine = engine();
    engine
        .play(Sound::Custom, Some(&wav_payload()), true)
        .await
        .unwrap();

    let voice = active_voice(&engine);
    assert_eq!(
        engine.backend().voice_kind(voice),
        Some(VoiceKind::Buffer { looping: true })
    );
    assert_eq!(engine.state(), PlaybackState::PlayingBuffer { looping: true });
    assert!(engine.scheduled_notes().is_empty());
    assert!(engine.time_until_next_loop().is_none());

    engine.stop();
    assert!(engine.backend().active_voices().is_empty());
}

// The loop restarts after the melody plus the pause, and stop cancels it
#[tokio::test]
async fn test_loop_restarts_after_pause() {
    let mut engine = engine();
    engine.play(Sound::MoonPatrol, None, true).await.unwrap();
    let first = active_voice(&engine);
    let boundary = melody::total_duration(MOON_PATROL) + 0.3;

    engine.backend_mut().advance(boundary - 0.01);
    assert!(!engine.poll().unwrap());
    assert_eq!(active_voice(&engine), first);

    engine.backend_mut().advance(0.02);
    assert!(engine.poll().unwrap());
    let second = active_voice(&engine);
    assert_ne!(first, second);
    assert_eq!(engine.backend().active_voices(), vec![second]);
    assert_eq!(engine.backend().tone_voices_created(), 2);

    // Second iteration is scheduled from the time it fired
    let start = engine.scheduled_notes()[0].start;
    assert!((start - (boundary + 0.01)).abs() < 1e-9);
}

#[tokio::test]
async fn test_stop_cancels_pending_loop() {
    let mut engine = engine();
    engine.play(Sound::RallyX, None, true).await.unwrap();

    engine.backend_mut().advance(0.5);
    engine.stop();
    engine.backend_mut().advance(10.0);

    assert!(!engine.poll().unwrap());
    assert_eq!(engine.backend().tone_voices_created(), 1);
    assert!(engine.backend().active_voices().is_empty());
}

#[tokio::test]
async fn test_one_shot_never_loops() {
    let mut engine = engine();
    engine.play(Sound::ElevatorAction, None, false).await.unwrap();
    engine.backend_mut().advance(60.0);

    assert!(!engine.poll().unwrap());
    assert!(engine.time_until_next_loop().is_none());
    assert_eq!(engine.backend().tone_voices_created(), 1);
}

#[tokio::test]
async fn test_time_until_next_loop_counts_down() {
    let mut engine = engine();
    engine.play(Sound::Custom, None, true).await.unwrap();

    let wait = engine.time_until_next_loop().unwrap();
    assert!((wait.as_secs_f64() - 1.3).abs() < 1e-6);

    engine.backend_mut().advance(2.0);
    assert_eq!(engine.time_until_next_loop().unwrap().as_secs_f64(), 0.0);
}

// Device failures are not swallowed
#[tokio::test]
async fn test_output_failure_propagates() {
    let mut engine = AlarmEngine::new(RecordingBackend::new().with_failing_output());
    let result = engine.play(Sound::RallyX, None, false).await;
    assert!(matches!(result, Err(AlarmError::OutputUnavailable(_))));
    assert_eq!(engine.state(), PlaybackState::Idle);

    let result = engine.play(Sound::Custom, Some(&wav_payload()), false).await;
    assert!(matches!(result, Err(AlarmError::OutputUnavailable(_))));
}

#[tokio::test]
async fn test_stop_halts_and_disconnects() {
    let mut engine = engine();
    engine.play(Sound::RallyX, None, true).await.unwrap();
    let voice = active_voice(&engine);

    let events_before = engine.backend().events_for(voice).len();
    engine.stop();
    let events_after = engine.backend().events_for(voice).len();
    assert_eq!(events_after, events_before + 2);

    let voice_events = engine.backend().events_for(voice);
    let tail = &voice_events[events_before..];
    assert_eq!(
        tail,
        &[GraphEvent::Stop { voice }, GraphEvent::Disconnect { voice }]
    );
}
