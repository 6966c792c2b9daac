//! Playback service: the single owner of playback state
//!
//! The service composes the audio sink, the metadata channel and the
//! now-playing publisher. Every transition happens on the task that drives
//! [`PlaybackService::run`] (or calls [`PlaybackService::process_next`]), one
//! event at a time: commands from [`PlayerHandle`]s, audio output events and
//! metadata channel events. Nothing here needs a lock.
//!
//! ```no_run
//! use irplayer::PlaybackService;
//! use irzeno::Station;
//!
//! # #[tokio::main]
//! # async fn main() -> irplayer::Result<()> {
//! let mut service = PlaybackService::new()?;
//! service.set_metadata_callback(|meta| println!("{:?}", meta.title()));
//!
//! service.play(&Station::new("fdgs82xkzhhvv", "Rocker Radio Gold"))?;
//! service.run().await;
//! # Ok(())
//! # }
//! ```

use crate::audio::{AudioEvent, AudioOutput, AudioSink, ToggleOutcome};
use crate::error::{Error, Result};
use crate::media_session::MediaSession;
use crate::process_output::{ProcessOutput, ProcessSettings};
use crate::publisher::{NowPlaying, NowPlayingPublisher};
use crate::widget::{WidgetBridge, WidgetWriter};
use irzeno::{
    ChannelEvent, ChannelState, EndpointResolver, HttpTransport, MetadataChannel,
    MetadataTransport, ReconnectPolicy, Station, StreamMetadata,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Artist shown while the stream is connecting
pub const CONNECTING_ARTIST: &str = "Connecting...";

/// Artist shown when neither the feed nor the station provide one
pub const LIVE_RADIO_ARTIST: &str = "Live Radio";

// ============================================================================
// State, commands and handle
// ============================================================================

/// Playing/loading flags driven by the audio output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_loading: bool,
}

/// Fields of the active station kept by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentStation {
    pub slug: String,
    pub name: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

impl From<&Station> for CurrentStation {
    fn from(station: &Station) -> Self {
        Self {
            slug: station.slug.trim().to_string(),
            name: station.name.clone(),
            image_url: station.image_url.clone(),
            description: station.description.clone(),
        }
    }
}

/// Request sent to the service from another task
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play(Station),
    Toggle,
    Pause,
    Resume,
    Stop,
    SetVolume(f32),
    /// Stop playback and leave [`PlaybackService::run`]
    Shutdown,
}

/// Cloneable sender of [`PlayerCommand`]s
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    pub fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| Error::ServiceStopped)
    }

    pub fn play(&self, station: Station) -> Result<()> {
        self.send(PlayerCommand::Play(station))
    }

    pub fn toggle(&self) -> Result<()> {
        self.send(PlayerCommand::Toggle)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(PlayerCommand::Resume)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop)
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(PlayerCommand::SetVolume(volume))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(PlayerCommand::Shutdown)
    }
}

type LoadingCallback = Box<dyn FnMut(bool) + Send>;
type MetadataCallback = Box<dyn FnMut(&StreamMetadata) + Send>;

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`PlaybackService`]
pub struct PlaybackServiceBuilder {
    resolver: EndpointResolver,
    output: Option<Box<dyn AudioOutput>>,
    transport: Option<Arc<dyn MetadataTransport>>,
    reconnect: ReconnectPolicy,
    media_session: Option<Box<dyn MediaSession>>,
    widget: Option<Arc<dyn WidgetBridge>>,
    volume: f32,
    commands_tx: mpsc::UnboundedSender<PlayerCommand>,
    commands_rx: mpsc::UnboundedReceiver<PlayerCommand>,
}

impl Default for PlaybackServiceBuilder {
    fn default() -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Self {
            resolver: EndpointResolver::default(),
            output: None,
            transport: None,
            reconnect: ReconnectPolicy::default(),
            media_session: None,
            widget: None,
            volume: 1.0,
            commands_tx,
            commands_rx,
        }
    }
}

impl PlaybackServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the service being built
    ///
    /// Needed by collaborators created before the service, such as the OS
    /// media session forwarding media keys.
    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            tx: self.commands_tx.clone(),
        }
    }

    pub fn resolver(mut self, resolver: EndpointResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Audio output (default: [`ProcessOutput`] running `ffplay`)
    pub fn audio_output(mut self, output: Box<dyn AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Metadata transport (default: [`HttpTransport`])
    pub fn transport(mut self, transport: Arc<dyn MetadataTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn media_session(mut self, session: Box<dyn MediaSession>) -> Self {
        self.media_session = Some(session);
        self
    }

    pub fn widget_bridge(mut self, bridge: Arc<dyn WidgetBridge>) -> Self {
        self.widget = Some(bridge);
        self
    }

    /// Initial volume, clamped to `0.0..=1.0`
    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Build the service; must be called from within a tokio runtime
    pub fn build(self) -> Result<PlaybackService> {
        let output = match self.output {
            Some(output) => output,
            None => Box::new(ProcessOutput::new(ProcessSettings::default())),
        };
        let transport: Arc<dyn MetadataTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };

        let mut sink = AudioSink::new(output);
        sink.set_volume(self.volume);

        let widget = self.widget.map(WidgetWriter::spawn);

        Ok(PlaybackService {
            resolver: self.resolver,
            sink,
            channel: MetadataChannel::with_policy(transport, self.reconnect),
            publisher: NowPlayingPublisher::new(self.media_session, widget),
            station: None,
            state: PlaybackState::default(),
            on_loading: None,
            on_metadata: None,
            commands_tx: self.commands_tx,
            commands_rx: self.commands_rx,
        })
    }
}

// ============================================================================
// PlaybackService
// ============================================================================

/// Orchestrator of live station playback
pub struct PlaybackService {
    resolver: EndpointResolver,
    sink: AudioSink,
    channel: MetadataChannel,
    publisher: NowPlayingPublisher,
    station: Option<CurrentStation>,
    state: PlaybackState,
    on_loading: Option<LoadingCallback>,
    on_metadata: Option<MetadataCallback>,
    commands_tx: mpsc::UnboundedSender<PlayerCommand>,
    commands_rx: mpsc::UnboundedReceiver<PlayerCommand>,
}

impl std::fmt::Debug for PlaybackService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackService")
            .field("station", &self.station)
            .field("state", &self.state)
            .field("sink", &self.sink)
            .field("channel", &self.channel)
            .finish()
    }
}

impl PlaybackService {
    /// Service with the default output, transport and no auxiliary surface
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> PlaybackServiceBuilder {
        PlaybackServiceBuilder::default()
    }

    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            tx: self.commands_tx.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_station(&self) -> Option<&CurrentStation> {
        self.station.as_ref()
    }

    /// Latest metadata of the active station (empty when none arrived yet)
    pub fn metadata(&self) -> &StreamMetadata {
        self.channel.latest()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn volume(&self) -> f32 {
        self.sink.volume()
    }

    /// State the auxiliary surfaces should show right now
    pub fn now_playing(&self) -> NowPlaying {
        let Some(station) = &self.station else {
            return NowPlaying::idle();
        };

        let metadata = self.channel.latest();
        let title = metadata.title().map(String::from);
        let connecting = title.is_none() && self.state.is_loading && !self.state.is_playing;

        let artist = match metadata.artist() {
            Some(artist) => artist.to_string(),
            None if connecting => CONNECTING_ARTIST.to_string(),
            None => station
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or(LIVE_RADIO_ARTIST)
                .to_string(),
        };

        NowPlaying {
            station_name: Some(station.name.clone()),
            title,
            artist: Some(artist),
            album: metadata.album().map(String::from),
            image_url: station.image_url.clone(),
            is_playing: self.state.is_playing,
        }
    }

    // ------------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------------

    /// Called with `true` when buffering starts, `false` once playing or paused
    pub fn set_loading_callback<F>(&mut self, callback: F)
    where
        F: FnMut(bool) + Send + 'static,
    {
        self.on_loading = Some(Box::new(callback));
    }

    /// Called with every well-formed metadata message of the active station
    pub fn set_metadata_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&StreamMetadata) + Send + 'static,
    {
        self.on_metadata = Some(Box::new(callback));
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Start playing a station
    ///
    /// Re-selecting the station that is already playing does nothing. The
    /// only error is an unusable slug, reported before anything changes.
    pub fn play(&mut self, station: &Station) -> Result<()> {
        if let Some(current) = &self.station {
            if current.slug == station.slug.trim() && self.state.is_playing {
                tracing::debug!("Station {} already playing", current.slug);
                return Ok(());
            }
        }

        let endpoints = self.resolver.resolve(&station.slug)?;
        let current = CurrentStation::from(station);
        tracing::info!("Playing {} ({})", current.name, current.slug);

        self.channel.close();
        self.station = Some(current);
        self.state = PlaybackState {
            is_playing: false,
            is_loading: true,
        };

        match self.sink.load(&endpoints.stream_url) {
            Ok(()) => {
                self.sink.play();
            }
            Err(e) => tracing::warn!("Failed to load {}: {}", endpoints.stream_url, e),
        }

        self.channel.open(endpoints.metadata_url);
        self.publish();
        Ok(())
    }

    /// Pause or resume the active station; no-op without one
    pub fn toggle(&mut self) {
        if self.station.is_none() {
            tracing::debug!("Toggle ignored, no station selected");
            return;
        }

        match self.sink.toggle() {
            ToggleOutcome::Paused => {
                self.state = PlaybackState::default();
            }
            // PlaybackStarted sets is_playing once the output confirms
            ToggleOutcome::Resumed => {
                self.state.is_loading = true;
            }
            ToggleOutcome::Rejected => {}
        }
        self.publish();
    }

    /// Pause if the output is playing
    pub fn pause(&mut self) {
        if self.station.is_some() && !self.sink.is_paused() {
            self.toggle();
        }
    }

    /// Resume if the output is paused
    pub fn resume(&mut self) {
        if self.station.is_some() && self.sink.is_paused() {
            self.toggle();
        }
    }

    /// Stop playback, close the metadata feed and clear the station
    pub fn stop(&mut self) {
        if let Some(station) = &self.station {
            tracing::info!("Stopping {}", station.slug);
        }
        self.sink.stop();
        self.channel.close();
        self.station = None;
        self.state = PlaybackState::default();
        self.publish();
    }

    /// Set the volume, clamped to `0.0..=1.0`; returns the applied value
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.sink.set_volume(volume)
    }

    // ------------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------------

    /// Wait for and handle one event
    ///
    /// Returns `false` once a [`PlayerCommand::Shutdown`] was handled.
    pub async fn process_next(&mut self) -> bool {
        tokio::select! {
            biased;
            Some(command) = self.commands_rx.recv() => self.handle_command(command),
            Some(event) = self.sink.next_event() => {
                self.handle_audio_event(event);
                true
            }
            Some(event) = self.channel.next_event() => {
                self.handle_channel_event(event);
                true
            }
            else => false,
        }
    }

    /// Handle events until shutdown
    pub async fn run(&mut self) {
        tracing::info!("Playback service started");
        while self.process_next().await {}
        tracing::info!("Playback service stopped");
    }

    fn handle_command(&mut self, command: PlayerCommand) -> bool {
        tracing::debug!("Command: {:?}", command);
        match command {
            PlayerCommand::Play(station) => {
                if let Err(e) = self.play(&station) {
                    tracing::warn!("Cannot play {}: {}", station.name, e);
                }
            }
            PlayerCommand::Toggle => self.toggle(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::Resume => self.resume(),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::SetVolume(volume) => {
                self.set_volume(volume);
            }
            PlayerCommand::Shutdown => {
                self.stop();
                return false;
            }
        }
        true
    }

    fn handle_audio_event(&mut self, event: AudioEvent) {
        tracing::debug!("Audio event: {:?}", event);
        match event {
            AudioEvent::BufferingStarted => {
                self.state.is_loading = true;
                self.notify_loading(true);
            }
            AudioEvent::PlaybackStarted => {
                self.state = PlaybackState {
                    is_playing: true,
                    is_loading: false,
                };
                self.notify_loading(false);
                self.publish_if_active();
            }
            AudioEvent::Paused => {
                self.state = PlaybackState::default();
                self.notify_loading(false);
                self.publish_if_active();
            }
            AudioEvent::PlaybackFailed(reason) => {
                tracing::warn!("Playback failed: {}", reason);
            }
        }
    }

    fn handle_channel_event(&mut self, event: ChannelEvent) {
        let Some(metadata) = self.channel.accept(event) else {
            return;
        };

        if let Some(callback) = self.on_metadata.as_mut() {
            callback(&metadata);
        }
        if metadata.has_title() {
            self.publish();
        }
    }

    fn notify_loading(&mut self, loading: bool) {
        if let Some(callback) = self.on_loading.as_mut() {
            callback(loading);
        }
    }

    fn publish_if_active(&mut self) {
        if self.station.is_some() {
            self.publish();
        }
    }

    fn publish(&mut self) {
        let now = self.now_playing();
        self.publisher.publish(&now);
    }
}
