// FitTimer - interval timer with a chiptune alarm
// Counts down, then plays the configured alarm until acknowledged

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::BufReader;

use fittimer::{
    audio::{melody, AlarmEngine, CustomAudioPayload, DefaultBackend, Sound},
    config::Settings,
    config_watcher::SettingsWatcher,
    console::{Command, Console},
    i18n::Language,
    timer::{Countdown, CountdownState, TickOutcome},
};

/// Fallback wake-up while an alarm plays without a pending loop
const IDLE_POLL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "fittimer")]
#[command(about = "Interval timer with a chiptune alarm")]
#[command(version)]
struct Args {
    /// Countdown minutes (defaults to the saved setting)
    minutes: Option<u32>,

    /// Countdown seconds, 0-59
    seconds: Option<u32>,

    /// Play the selected sound once and exit
    #[arg(long)]
    preview: bool,

    /// Alarm sound: rally-x, moon-patrol, elevator-action or custom
    #[arg(long, value_name = "ID")]
    sound: Option<Sound>,

    /// Audio file to play as the custom alarm
    #[arg(long, value_name = "FILE")]
    custom: Option<PathBuf>,

    /// Interface language: en or es
    #[arg(long, value_name = "LANG")]
    language: Option<Language>,
}

impl Args {
    fn apply(self, settings: &mut Settings) -> Result<()> {
        if let Some(minutes) = self.minutes {
            settings.minutes = minutes;
            settings.seconds = self.seconds.unwrap_or(0);
        }
        if let Some(sound) = self.sound {
            settings.sound = sound;
        }
        if let Some(language) = self.language {
            settings.language = language;
        }
        if let Some(path) = self.custom {
            let payload = CustomAudioPayload::from_file(&path)
                .with_context(|| format!("Failed to load custom sound {}", path.display()))?;
            settings.sound = Sound::Custom;
            settings.custom_sound_data = Some(payload);
        }
        settings.validate().context("Invalid timer settings")?;
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting FitTimer");

    let args = Args::parse();
    let preview = args.preview;

    let mut settings = Settings::load().context("Failed to load settings")?;
    args.apply(&mut settings)?;
    tracing::info!(
        minutes = settings.minutes,
        seconds = settings.seconds,
        sound = %settings.sound,
        mode = ?settings.alarm_mode,
        language = %settings.language,
        "Settings loaded"
    );

    let mut engine = AlarmEngine::with_config(DefaultBackend::new(), settings.engine.clone());

    // Starting the timer is the user gesture that unlocks audio output
    engine
        .resume_context()
        .context("Failed to open audio output")?;

    let mut console = Console::spawn(BufReader::new(tokio::io::stdin()));

    if preview {
        let t = settings.language.strings();
        println!(
            "{}: {} ({})",
            t.preview,
            t.sound_name(settings.sound),
            t.press_to_stop
        );
        engine
            .play(settings.sound, settings.custom_sound_data.as_ref(), false)
            .await?;
        let wait = if settings.sound.is_custom() {
            Duration::MAX
        } else {
            Duration::from_secs_f64(melody::total_duration(melody::melody_for(settings.sound)))
        };
        tokio::select! {
            _ = console.acknowledged() => {}
            _ = tokio::signal::ctrl_c() => {}
            _ = tokio::time::sleep(wait) => {}
        }
        engine.stop();
        return Ok(());
    }

    let watcher = Settings::config_path()
        .and_then(|path| SettingsWatcher::new(&path))
        .map_err(|e| tracing::warn!(error = %e, "Settings hot-reload disabled"))
        .ok();

    let mut countdown = Countdown::new(settings.minutes, settings.seconds);
    countdown.start();
    {
        let t = settings.language.strings();
        println!(
            "{} | {}: {} | {}: {}",
            t.title,
            t.sound,
            t.sound_name(settings.sound),
            t.alarm_mode,
            t.mode_name(settings.alarm_mode)
        );
        println!("{}", t.controls);
        println!("{} {}", t.start, countdown.display_string());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match countdown.tick() {
                    TickOutcome::Running(_) => println!("{}", countdown.display_string()),
                    TickOutcome::Expired => break,
                    TickOutcome::Idle => {}
                }
            }
            Some(command) = console.next_command(), if console.is_open() => {
                let t = settings.language.strings();
                match command {
                    Command::TogglePause if countdown.state() == CountdownState::Running => {
                        countdown.pause();
                        println!("{} {}", t.paused, countdown.display_string());
                    }
                    Command::TogglePause => {
                        countdown.start();
                        ticker.reset();
                        println!("{} {}", t.start, countdown.display_string());
                    }
                    Command::Reset => {
                        countdown.reset();
                        println!("{} {}", t.reset, countdown.display_string());
                    }
                    // Enter during the countdown does nothing
                    Command::Enter | Command::Other(_) => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, exiting gracefully");
                return Ok(());
            }
        }

        if let Some(changed) = watcher.as_ref().and_then(|w| w.try_recv()) {
            match changed.reload() {
                Ok(reloaded) => {
                    tracing::info!("Applying reloaded settings");
                    if reloaded.duration() != settings.duration()
                        && countdown.state() != CountdownState::Running
                    {
                        countdown.set_duration(reloaded.duration());
                        println!("{}", countdown.display_string());
                    }
                    settings.minutes = reloaded.minutes;
                    settings.seconds = reloaded.seconds;
                    settings.sound = reloaded.sound;
                    settings.alarm_mode = reloaded.alarm_mode;
                    settings.language = reloaded.language;
                    engine.set_config(reloaded.engine);
                }
                Err(e) => tracing::error!(error = %e, "Failed to reload settings"),
            }
        }
    }

    // Only a key pressed while the alarm sounds acknowledges it
    console.discard_pending();

    let t = settings.language.strings();
    println!("00:00 - {}", t.press_to_stop);
    engine
        .play(
            settings.sound,
            settings.custom_sound_data.as_ref(),
            settings.alarm_mode.is_looping(),
        )
        .await?;

    loop {
        let wait = engine.time_until_next_loop().unwrap_or(IDLE_POLL);
        tokio::select! {
            _ = console.acknowledged() => break,
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(wait) => {
                if let Err(e) = engine.poll() {
                    tracing::error!(error = %e, "Alarm loop failed");
                    break;
                }
            }
        }
    }

    engine.stop();
    println!("{}", t.stop);
    tracing::info!("Alarm acknowledged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fittimer::config::AlarmMode;

    #[test]
    fn test_positional_duration() {
        let args = Args::try_parse_from(["fittimer", "2", "30"]).unwrap();
        let mut settings = Settings::default();
        args.apply(&mut settings).unwrap();
        assert_eq!(settings.minutes, 2);
        assert_eq!(settings.seconds, 30);
    }

    #[test]
    fn test_minutes_only_clears_seconds() {
        let args = Args::try_parse_from(["fittimer", "1"]).unwrap();
        let mut settings = Settings {
            seconds: 45,
            ..Settings::default()
        };
        args.apply(&mut settings).unwrap();
        assert_eq!(settings.duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_sound_and_language_flags() {
        let args = Args::try_parse_from([
            "fittimer",
            "--sound",
            "elevator-action",
            "--language",
            "es",
            "--preview",
        ])
        .unwrap();
        assert!(args.preview);

        let mut settings = Settings::default();
        args.apply(&mut settings).unwrap();
        assert_eq!(settings.sound, Sound::ElevatorAction);
        assert_eq!(settings.language, Language::Es);
        assert_eq!(settings.alarm_mode, AlarmMode::Single);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Args::try_parse_from(["fittimer", "--sound", "pac-man"]).is_err());
        assert!(Args::try_parse_from(["fittimer", "--language", "fr"]).is_err());
        assert!(Args::try_parse_from(["fittimer", "five"]).is_err());
        assert!(Args::try_parse_from(["fittimer", "1", "2", "3"]).is_err());
    }

    #[test]
    fn test_out_of_range_seconds_rejected() {
        let args = Args::try_parse_from(["fittimer", "0", "75"]).unwrap();
        assert!(args.apply(&mut Settings::default()).is_err());
    }

    #[test]
    fn test_missing_custom_file() {
        let args = Args::try_parse_from(["fittimer", "--custom", "/no/such/alarm.wav"]).unwrap();
        assert!(args.apply(&mut Settings::default()).is_err());
    }
}
