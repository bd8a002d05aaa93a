//! Line-based keyboard input
//!
//! A background task reads lines from the terminal and forwards them as
//! [`Command`]s. The countdown consumes pause and reset commands while it
//! runs; anything typed before the alarm starts is discarded so only a key
//! pressed while the alarm sounds acknowledges it. Closed or failing input
//! is never treated as an acknowledgement.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty line (plain Enter)
    Enter,
    /// `p`: pause or resume the countdown
    TogglePause,
    /// `r`: reset the countdown to its full duration
    Reset,
    /// Anything else
    Other(String),
}

impl Command {
    /// Interpret one input line
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Command::Enter,
            "p" | "P" => Command::TogglePause,
            "r" | "R" => Command::Reset,
            other => Command::Other(other.to_string()),
        }
    }
}

/// Receiving end of the input task
pub struct Console {
    rx: mpsc::UnboundedReceiver<Command>,
    closed: bool,
}

impl Console {
    /// Read lines from `reader` on a background task
    pub fn spawn<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(Command::parse(&line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Input closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read input");
                        break;
                    }
                }
            }
        });

        Self::from_receiver(rx)
    }

    /// Wrap an existing command channel
    pub fn from_receiver(rx: mpsc::UnboundedReceiver<Command>) -> Self {
        Self { rx, closed: false }
    }

    /// Whether input can still arrive
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Next command, or `None` once input has closed
    pub async fn next_command(&mut self) -> Option<Command> {
        if self.closed {
            return None;
        }
        let command = self.rx.recv().await;
        if command.is_none() {
            self.mark_closed();
        }
        command
    }

    /// Drop every command typed so far, returning how many were dropped
    pub fn discard_pending(&mut self) -> usize {
        let mut discarded = 0;
        loop {
            match self.rx.try_recv() {
                Ok(_) => discarded += 1,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.mark_closed();
                    break;
                }
            }
        }
        if discarded > 0 {
            debug!(discarded, "Discarded input typed before the alarm");
        }
        discarded
    }

    /// Wait until the user presses Enter
    ///
    /// Other lines are ignored. If input closes this never resolves, so the
    /// caller's other stop sources (Ctrl-C) remain the only way out.
    pub async fn acknowledged(&mut self) {
        loop {
            match self.next_command().await {
                Some(Command::Enter) => return,
                Some(other) => debug!(?other, "Ignoring input while the alarm sounds"),
                None => std::future::pending::<()>().await,
            }
        }
    }

    fn mark_closed(&mut self) {
        if !self.closed {
            warn!("Keyboard input unavailable; use Ctrl-C to stop the alarm");
            self.closed = true;
        }
    }
}
