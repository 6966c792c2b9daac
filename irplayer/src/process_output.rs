//! Audio output backed by an external player process
//!
//! Each play run spawns the configured command (`ffplay` by default) with the
//! stream URL as last argument, and a supervisor task turns the process
//! lifecycle into [`AudioEvent`]s:
//!
//! - spawn → `BufferingStarted`
//! - still alive after the start grace period → `PlaybackStarted`
//! - killed by `pause`/`unload`, or normal exit → `Paused`
//! - exit with an error status → `PlaybackFailed` then `Paused`
//! - superseded by a new `load` or `play` → nothing, the next run reports
//!   for itself
//!
//! A live stream cannot be suspended, so pausing kills the process and
//! resuming starts a new one at the live edge.

use crate::audio::{AudioEvent, AudioEventSender, AudioOutput};
use crate::error::{Error, Result};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default player command
pub const DEFAULT_COMMAND: &str = "ffplay";

/// Default grace period before a spawned player counts as playing
pub const DEFAULT_START_GRACE: Duration = Duration::from_millis(800);

/// How to launch the player process
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSettings {
    /// Executable name or path
    pub command: String,
    /// Arguments placed before the stream URL
    pub args: Vec<String>,
    /// Flag taking the volume as a 0-100 integer (`-volume` for ffplay)
    pub volume_arg: Option<String>,
    /// Time the process must survive before `PlaybackStarted`
    pub start_grace: Duration,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            args: ["-nodisp", "-hide_banner", "-loglevel", "error"]
                .into_iter()
                .map(String::from)
                .collect(),
            volume_arg: Some("-volume".to_string()),
            start_grace: DEFAULT_START_GRACE,
        }
    }
}

struct Run {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Event sink of one run, muted once a newer run has started
///
/// The generation check and the send happen under the same lock that
/// `play` holds while it starts a run, so a stale event can never land
/// after the new run's `BufferingStarted`.
struct RunReporter {
    events: Option<AudioEventSender>,
    current: Arc<Mutex<u64>>,
    generation: u64,
}

impl RunReporter {
    fn emit(&self, event: AudioEvent) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == self.generation {
            emit(&self.events, event);
        } else {
            tracing::debug!("Dropping {:?} from superseded run {}", event, self.generation);
        }
    }
}

/// [`AudioOutput`] driving an external player process
///
/// Volume changes apply from the next play run.
pub struct ProcessOutput {
    settings: ProcessSettings,
    source: Option<String>,
    volume: f32,
    run: Option<Run>,
    generation: Arc<Mutex<u64>>,
    events: Option<AudioEventSender>,
}

impl ProcessOutput {
    pub fn new(settings: ProcessSettings) -> Self {
        Self {
            settings,
            source: None,
            volume: 1.0,
            run: None,
            generation: Arc::new(Mutex::new(0)),
            events: None,
        }
    }

    pub fn settings(&self) -> &ProcessSettings {
        &self.settings
    }

    /// Command line for the current source and volume
    fn command_line(&self, url: &str) -> Vec<String> {
        let mut args = self.settings.args.clone();
        if let Some(flag) = &self.settings.volume_arg {
            args.push(flag.clone());
            args.push(((self.volume * 100.0).round() as u32).to_string());
        }
        args.push(url.to_string());
        args
    }

    fn stop_run(&mut self) {
        if let Some(run) = self.run.take() {
            // The supervisor kills the child and reports `Paused`
            run.cancel.cancel();
        }
    }

    /// Drop the current run without reporting it
    ///
    /// The child is killed by `kill_on_drop` when the aborted task drops it.
    fn supersede_run(&mut self) {
        if let Some(run) = self.run.take() {
            run.task.abort();
        }
    }

    fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.task.is_finished())
    }
}

impl Drop for ProcessOutput {
    fn drop(&mut self) {
        self.stop_run();
    }
}

impl AudioOutput for ProcessOutput {
    fn attach(&mut self, events: AudioEventSender) {
        self.events = Some(events);
    }

    fn load(&mut self, url: &str) -> Result<()> {
        self.supersede_run();
        self.source = Some(url.to_string());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        let url = self.source.clone().ok_or(Error::NoSource)?;

        let child = Command::new(&self.settings.command)
            .args(self.command_line(&url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        tracing::debug!(
            "Spawned {} (pid {:?}) for {}",
            self.settings.command,
            child.id(),
            url
        );

        let reporter = {
            let mut current = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
            *current += 1;
            emit(&self.events, AudioEvent::BufferingStarted);
            RunReporter {
                events: self.events.clone(),
                current: self.generation.clone(),
                generation: *current,
            }
        };

        let cancel = CancellationToken::new();
        let task = tokio::spawn(supervise(
            child,
            cancel.clone(),
            self.settings.start_grace,
            reporter,
        ));
        self.run = Some(Run { cancel, task });
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.stop_run();
        Ok(())
    }

    fn unload(&mut self) -> Result<()> {
        self.stop_run();
        self.source = None;
        Ok(())
    }

    fn is_paused(&self) -> bool {
        !self.is_running()
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }
}

fn emit(events: &Option<AudioEventSender>, event: AudioEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

enum Ended {
    Cancelled,
    Exited(std::io::Result<ExitStatus>),
}

async fn supervise(
    mut child: Child,
    cancel: CancellationToken,
    grace: Duration,
    reporter: RunReporter,
) {
    let early = tokio::select! {
        _ = cancel.cancelled() => Some(Ended::Cancelled),
        status = child.wait() => Some(Ended::Exited(status)),
        _ = tokio::time::sleep(grace) => None,
    };

    let ended = match early {
        Some(ended) => ended,
        None => {
            reporter.emit(AudioEvent::PlaybackStarted);
            tokio::select! {
                _ = cancel.cancelled() => Ended::Cancelled,
                status = child.wait() => Ended::Exited(status),
            }
        }
    };

    match ended {
        Ended::Cancelled => {
            let _ = child.kill().await;
            tracing::debug!("Player process stopped");
        }
        Ended::Exited(status) => report_exit(&reporter, status),
    }
    reporter.emit(AudioEvent::Paused);
}

fn report_exit(reporter: &RunReporter, status: std::io::Result<ExitStatus>) {
    match status {
        Ok(status) if status.success() => {
            tracing::info!("Player process ended");
        }
        Ok(status) => {
            tracing::warn!("Player process exited with {}", status);
            reporter.emit(AudioEvent::PlaybackFailed(format!("player exited with {}", status)));
        }
        Err(e) => {
            tracing::warn!("Failed to wait for player process: {}", e);
            reporter.emit(AudioEvent::PlaybackFailed(e.to_string()));
        }
    }
}
