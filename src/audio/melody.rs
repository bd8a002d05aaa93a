//! Built-in alarm melodies
//!
//! Static note data for the chiptune alarm motifs. Every melody is a fixed
//! sequence of pitched notes and rests; lookup never fails, unknown or
//! non-synthesized sounds resolve to a single-tone fallback.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed musical pitches used by the built-in melodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Pitch {
    Fs4,
    Gs4,
    A4,
    B4,
    Cs5,
    D5,
    Ds5,
    E5,
    F5,
    G5,
    A5,
}

impl Pitch {
    /// Frequency of this pitch in Hz
    pub fn frequency(self) -> f32 {
        match self {
            Pitch::Fs4 => 369.99,
            Pitch::Gs4 => 415.30,
            Pitch::A4 => 440.00,
            Pitch::B4 => 493.88,
            Pitch::Cs5 => 554.37,
            Pitch::D5 => 587.33,
            Pitch::Ds5 => 622.25,
            Pitch::E5 => 659.25,
            Pitch::F5 => 698.46,
            Pitch::G5 => 783.99,
            Pitch::A5 => 880.00,
        }
    }

    /// Note name of this pitch
    pub fn name(self) -> &'static str {
        match self {
            Pitch::Fs4 => "F#4",
            Pitch::Gs4 => "G#4",
            Pitch::A4 => "A4",
            Pitch::B4 => "B4",
            Pitch::Cs5 => "C#5",
            Pitch::D5 => "D5",
            Pitch::Ds5 => "D#5",
            Pitch::E5 => "E5",
            Pitch::F5 => "F5",
            Pitch::G5 => "G5",
            Pitch::A5 => "A5",
        }
    }
}

/// A single melody step: a pitch (or a rest) held for `duration` seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// `None` for a rest
    pub pitch: Option<Pitch>,
    /// Length in seconds
    pub duration: f64,
}

impl Note {
    /// A sounding note
    pub const fn tone(pitch: Pitch, duration: f64) -> Self {
        Self {
            pitch: Some(pitch),
            duration,
        }
    }

    /// A silent gap
    pub const fn rest(duration: f64) -> Self {
        Self {
            pitch: None,
            duration,
        }
    }

    /// Whether this note is silent
    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}

/// An ordered, immutable note sequence
pub type Melody = &'static [Note];

use Pitch::*;

const fn t(pitch: Pitch, duration: f64) -> Note {
    Note::tone(pitch, duration)
}

const fn r(duration: f64) -> Note {
    Note::rest(duration)
}

/// Rally-X start jingle
#[rustfmt::skip]
pub const RALLY_X: Melody = &[
    t(G5, 0.07), r(0.01), t(G5, 0.07), r(0.01), t(G5, 0.07), r(0.01), t(Ds5, 0.08),
    t(G5, 0.12), t(F5, 0.12), t(E5, 0.12), t(Ds5, 0.12),
    t(D5, 0.15), r(0.05), t(D5, 0.15), r(0.05), t(Ds5, 0.15), r(0.05), t(E5, 0.15),
];

/// Moon Patrol motif
#[rustfmt::skip]
pub const MOON_PATROL: Melody = &[
    t(Fs4, 0.15), t(B4, 0.15), t(Cs5, 0.15), t(Ds5, 0.15),
    t(Cs5, 0.15), t(B4, 0.15), t(Fs4, 0.15), t(B4, 0.15),
    t(Cs5, 0.15), t(Ds5, 0.15), t(Cs5, 0.15), t(B4, 0.15),
];

/// Elevator Action motif
#[rustfmt::skip]
pub const ELEVATOR_ACTION: Melody = &[
    t(Cs5, 0.15), t(Ds5, 0.15), t(E5, 0.3),
    t(Cs5, 0.2), t(A4, 0.2), t(B4, 0.4),
    r(0.2),
    t(A4, 0.15), t(B4, 0.15), t(Cs5, 0.3),
    t(A4, 0.2), t(Fs4, 0.2), t(Gs4, 0.4),
];

/// Played when a sound has no melody of its own
pub const FALLBACK: Melody = &[t(A5, 1.0)];

/// Alarm sound selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sound {
    /// Rally-X jingle, the default
    #[default]
    RallyX,
    /// Moon Patrol motif
    MoonPatrol,
    /// Elevator Action motif
    ElevatorAction,
    /// User-supplied audio; has no melody
    Custom,
}

impl Sound {
    /// All sounds in display order
    pub const ALL: [Sound; 4] = [
        Sound::RallyX,
        Sound::MoonPatrol,
        Sound::ElevatorAction,
        Sound::Custom,
    ];

    /// Configuration identifier
    pub fn id(self) -> &'static str {
        match self {
            Sound::RallyX => "rally-x",
            Sound::MoonPatrol => "moon-patrol",
            Sound::ElevatorAction => "elevator-action",
            Sound::Custom => "custom",
        }
    }

    /// Whether this is the user-supplied sound
    pub fn is_custom(self) -> bool {
        self == Sound::Custom
    }
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Sound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sound::ALL
            .into_iter()
            .find(|sound| sound.id() == s)
            .ok_or_else(|| format!("unknown sound '{}'", s))
    }
}

/// Resolve a sound to its melody, falling back to a single tone
pub fn melody_for(sound: Sound) -> Melody {
    match sound {
        Sound::RallyX => RALLY_X,
        Sound::MoonPatrol => MOON_PATROL,
        Sound::ElevatorAction => ELEVATOR_ACTION,
        Sound::Custom => FALLBACK,
    }
}

/// Sum of all note durations in seconds
pub fn total_duration(melody: &[Note]) -> f64 {
    melody.iter().map(|note| note.duration).sum()
}
