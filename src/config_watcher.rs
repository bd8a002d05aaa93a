//! Settings file watcher

use anyhow::{Context, Result};
use notify::{
    event::{EventKind, ModifyKind},
    Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::config::Settings;

/// Editors often write a file several times per save
const DEBOUNCE_DURATION: Duration = Duration::from_millis(100);

/// The settings file changed on disk
#[derive(Debug, Clone)]
pub struct SettingsChanged {
    /// Watched settings file
    pub path: PathBuf,
    /// When the change was seen
    pub timestamp: Instant,
}

impl SettingsChanged {
    /// Re-read the settings that triggered this event
    pub fn reload(&self) -> Result<Settings> {
        Settings::load_from(&self.path)
    }
}

/// Watches the settings file so a running timer picks up edits
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::Receiver<SettingsChanged>,
}

impl SettingsWatcher {
    /// Start watching `path`
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let watched = path.to_path_buf();
        let mut last_event: Option<Instant> = None;

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => match event.kind {
                    EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                        let now = Instant::now();
                        if last_event.is_some_and(|last| now.duration_since(last) < DEBOUNCE_DURATION)
                        {
                            tracing::trace!("Settings change debounced");
                            return;
                        }
                        last_event = Some(now);

                        tracing::info!(path = %watched.display(), "Settings file changed");
                        let changed = SettingsChanged {
                            path: watched.clone(),
                            timestamp: now,
                        };
                        if let Err(e) = tx.send(changed) {
                            tracing::error!(error = %e, "Failed to send settings change");
                        }
                    }
                    _ => tracing::trace!(kind = ?event.kind, "Ignoring file event"),
                },
                Err(e) => tracing::error!(error = %e, "File watcher error"),
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch settings file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "Settings watcher initialized");

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Non-blocking check for a pending change
    pub fn try_recv(&self) -> Option<SettingsChanged> {
        self.receiver.try_recv().ok()
    }
}
