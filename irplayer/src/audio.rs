//! Audio output sink
//!
//! The player never decodes audio itself. An [`AudioOutput`] is the opaque
//! capability that accepts a URL and reports its lifecycle through
//! [`AudioEvent`]s; [`AudioSink`] wraps the single output of the process and
//! gives the service the load/play/pause/stop/toggle vocabulary it needs.

use crate::error::Result;
use tokio::sync::mpsc;

/// Lifecycle event reported by an audio output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    /// The output started fetching the stream
    BufferingStarted,
    /// Audio is actually audible
    PlaybackStarted,
    /// Playback stopped (paused, unloaded or ended)
    Paused,
    /// The output gave up on the current source
    PlaybackFailed(String),
}

pub type AudioEventSender = mpsc::UnboundedSender<AudioEvent>;
pub type AudioEventReceiver = mpsc::UnboundedReceiver<AudioEvent>;

/// Opaque audio playback capability
///
/// Implementations must not block: long-running work (fetching, decoding,
/// supervising a process) belongs in spawned tasks that report through the
/// sender given to [`attach`](AudioOutput::attach).
pub trait AudioOutput: Send + 'static {
    /// Give the output its event sender; called once by [`AudioSink::new`]
    fn attach(&mut self, events: AudioEventSender);

    /// Replace the current source, superseding any pending play request
    fn load(&mut self, url: &str) -> Result<()>;

    /// Request playback of the loaded source
    ///
    /// Returning `Ok` only means the request was accepted; playback has
    /// started once [`AudioEvent::PlaybackStarted`] is emitted.
    fn play(&mut self) -> Result<()>;

    /// Pause, keeping the source loaded
    fn pause(&mut self) -> Result<()>;

    /// Drop the source entirely
    fn unload(&mut self) -> Result<()>;

    /// Native paused state of the output
    fn is_paused(&self) -> bool;

    /// Volume in `0.0..=1.0`
    fn set_volume(&mut self, volume: f32) -> Result<()>;
}

/// Result of [`AudioSink::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Paused,
    /// Playback was requested; the output confirms with an event
    Resumed,
    /// The output refused to play and stays paused
    Rejected,
}

/// Wrapper around the single audio output of the process
pub struct AudioSink {
    output: Box<dyn AudioOutput>,
    source: Option<String>,
    volume: f32,
    events: AudioEventReceiver,
}

impl std::fmt::Debug for AudioSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSink")
            .field("source", &self.source)
            .field("volume", &self.volume)
            .field("paused", &self.output.is_paused())
            .finish()
    }
}

impl AudioSink {
    pub fn new(mut output: Box<dyn AudioOutput>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        output.attach(tx);
        Self {
            output,
            source: None,
            volume: 1.0,
            events: rx,
        }
    }

    /// URL of the loaded source
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_paused(&self) -> bool {
        self.output.is_paused()
    }

    /// Load a new source (last write wins)
    pub fn load(&mut self, url: &str) -> Result<()> {
        self.output.load(url)?;
        self.source = Some(url.to_string());
        Ok(())
    }

    /// Request playback; a rejection is logged and reported as `false`
    pub fn play(&mut self) -> bool {
        match self.output.play() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Playback request rejected: {}", e);
                false
            }
        }
    }

    /// Pause, keeping the source loaded
    pub fn pause(&mut self) {
        if let Err(e) = self.output.pause() {
            tracing::warn!("Failed to pause output: {}", e);
        }
    }

    /// Pause and unload the source
    pub fn stop(&mut self) {
        self.pause();
        if let Err(e) = self.output.unload() {
            tracing::warn!("Failed to unload output: {}", e);
        }
        self.source = None;
    }

    /// Pause if playing, play otherwise
    ///
    /// Looks at the output's own state rather than any cached flag, so a
    /// pause decided out-of-band (audio focus loss, media keys) is honored.
    pub fn toggle(&mut self) -> ToggleOutcome {
        if self.output.is_paused() {
            if self.play() {
                ToggleOutcome::Resumed
            } else {
                ToggleOutcome::Rejected
            }
        } else {
            self.pause();
            ToggleOutcome::Paused
        }
    }

    /// Set the volume, clamped to `0.0..=1.0`; returns the applied value
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        if let Err(e) = self.output.set_volume(volume) {
            tracing::warn!("Failed to set volume: {}", e);
        }
        self.volume = volume;
        volume
    }

    /// Next lifecycle event from the output
    pub async fn next_event(&mut self) -> Option<AudioEvent> {
        self.events.recv().await
    }
}
