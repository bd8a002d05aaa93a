//! User-facing strings
//!
//! Every prompt the binary prints comes from a per-language table, selected
//! by the `language` setting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio::Sound;
use crate::config::AlarmMode;

/// Interface language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,
    /// Spanish
    Es,
}

impl Language {
    /// Configuration identifier
    pub fn id(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    /// The string table for this language
    pub fn strings(self) -> &'static Strings {
        match self {
            Language::En => &EN,
            Language::Es => &ES,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            _ => Err(format!("unknown language '{}'", s)),
        }
    }
}

/// Translated prompts and labels
#[derive(Debug)]
pub struct Strings {
    /// Application name
    pub title: &'static str,
    /// Label printed when the countdown starts
    pub start: &'static str,
    /// Label printed when the alarm is acknowledged
    pub stop: &'static str,
    /// "Sound" label
    pub sound: &'static str,
    /// "Alarm mode" label
    pub alarm_mode: &'static str,
    /// Single alarm mode
    pub once: &'static str,
    /// Continuous alarm mode
    pub looping: &'static str,
    /// Custom sound name
    pub custom: &'static str,
    /// Rally-X sound name
    pub rally_x: &'static str,
    /// Moon Patrol sound name
    pub moon_patrol: &'static str,
    /// Elevator Action sound name
    pub elevator_action: &'static str,
    /// Shown while the alarm sounds
    pub press_to_stop: &'static str,
    /// Shown while a sound is previewed
    pub preview: &'static str,
    /// Keys accepted during the countdown
    pub controls: &'static str,
    /// Countdown paused
    pub paused: &'static str,
    /// Countdown back at its full duration
    pub reset: &'static str,
}

impl Strings {
    /// Display name of a sound
    pub fn sound_name(&self, sound: Sound) -> &'static str {
        match sound {
            Sound::RallyX => self.rally_x,
            Sound::MoonPatrol => self.moon_patrol,
            Sound::ElevatorAction => self.elevator_action,
            Sound::Custom => self.custom,
        }
    }

    /// Display name of an alarm mode
    pub fn mode_name(&self, mode: AlarmMode) -> &'static str {
        match mode {
            AlarmMode::Single => self.once,
            AlarmMode::Continuous => self.looping,
        }
    }
}

static EN: Strings = Strings {
    title: "FitTimer",
    start: "Start",
    stop: "Stop",
    sound: "Sound",
    alarm_mode: "Alarm Mode",
    once: "Once",
    looping: "Loop",
    custom: "Custom",
    rally_x: "Rally-X",
    moon_patrol: "Moon Patrol",
    elevator_action: "Elevator Action",
    press_to_stop: "Press Enter to stop the alarm",
    preview: "Preview",
    controls: "p + Enter: pause/resume, r + Enter: reset",
    paused: "Paused",
    reset: "Reset",
};

static ES: Strings = Strings {
    title: "FitTimer",
    start: "Iniciar",
    stop: "Detener",
    sound: "Sonido",
    alarm_mode: "Modo de Alarma",
    once: "Una vez",
    looping: "Repetir",
    custom: "Personalizado",
    rally_x: "Rally-X",
    moon_patrol: "Moon Patrol",
    elevator_action: "Elevator Action",
    press_to_stop: "Pulsa Enter para detener la alarma",
    preview: "Vista previa",
    controls: "p + Enter: pausar/reanudar, r + Enter: reiniciar",
    paused: "En pausa",
    reset: "Reiniciado",
};
