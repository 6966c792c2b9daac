//! Live station playback for Indian Radio
//!
//! This crate drives the playback of one Zeno.fm station at a time and keeps
//! the auxiliary surfaces in sync with what is on air:
//!
//! - **Audio sink**: a thin wrapper over an [`AudioOutput`] (by default an
//!   external `ffplay` process) that reports buffering, playing and paused
//! - **Playback service**: the single owner of playback state; it starts
//!   stations, follows their live metadata and reacts to commands sent
//!   through a [`PlayerHandle`]
//! - **Now playing**: the OS media session (MPRIS, SMTC, Now Playing) and a
//!   home screen widget bridge, both best effort
//! - **Configuration Extension**: player settings stored in irconfig
//!
//! # Example
//!
//! ```no_run
//! use irplayer::{PlaybackService, Station};
//!
//! #[tokio::main]
//! async fn main() -> irplayer::Result<()> {
//!     let mut service = PlaybackService::new()?;
//!     let handle = service.handle();
//!
//!     service.play(&Station::new("fdgs82xkzhhvv", "Rocker Radio Gold"))?;
//!
//!     tokio::spawn(async move {
//!         tokio::signal::ctrl_c().await.ok();
//!         handle.shutdown().ok();
//!     });
//!
//!     service.run().await;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `irconfig` (default): [`PlayerConfigExt`]
//! - `media-controls` (default): [`OsMediaSession`] through `souvlaki`

pub mod audio;
pub mod error;
pub mod media_session;
pub mod process_output;
pub mod publisher;
pub mod service;
pub mod widget;

#[cfg(feature = "irconfig")]
pub mod config_ext;

pub use audio::{AudioEvent, AudioEventSender, AudioOutput, AudioSink, ToggleOutcome};
pub use error::{Error, Result};
pub use media_session::{MediaArtwork, MediaSession, MediaSessionMetadata, PlaybackStatus};
pub use process_output::{ProcessOutput, ProcessSettings};
pub use publisher::{NowPlaying, NowPlayingPublisher};
pub use service::{
    CurrentStation, PlaybackService, PlaybackServiceBuilder, PlaybackState, PlayerCommand,
    PlayerHandle,
};
pub use widget::{FileWidgetBridge, WidgetBridge, WidgetPayload, WidgetWriter};

pub use irzeno::{Station, StreamMetadata};

#[cfg(feature = "media-controls")]
pub use media_session::OsMediaSession;

#[cfg(feature = "irconfig")]
pub use config_ext::PlayerConfigExt;
