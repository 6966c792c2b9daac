//! OS media session surface (MPRIS / SMTC / Now Playing)
//!
//! The service only writes to the media session: metadata when a track title
//! is known, and the playback status. The platform implementation uses
//! `souvlaki` and forwards the media keys back to the service as
//! [`PlayerCommand`](crate::service::PlayerCommand)s.

use crate::error::Result;
use serde::Serialize;

/// Artwork sizes announced for station images
pub const ARTWORK_SIZES: &str = "512x512";

/// Artwork MIME type announced for station images
pub const ARTWORK_TYPE: &str = "image/png";

/// Playback status shown by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

/// One artwork entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaArtwork {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl MediaArtwork {
    /// Station artwork with the announced size and type
    pub fn station(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            sizes: ARTWORK_SIZES.to_string(),
            mime_type: ARTWORK_TYPE.to_string(),
        }
    }
}

/// Metadata written to the media session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaSessionMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Vec<MediaArtwork>,
}

/// Write-only OS media session
pub trait MediaSession: Send {
    fn set_metadata(&mut self, metadata: &MediaSessionMetadata) -> Result<()>;

    /// Remove any metadata (no station active)
    fn clear_metadata(&mut self) -> Result<()>;

    fn set_playback_status(&mut self, status: PlaybackStatus) -> Result<()>;
}

#[cfg(feature = "media-controls")]
pub use os::OsMediaSession;

#[cfg(feature = "media-controls")]
mod os {
    use super::{MediaSession, MediaSessionMetadata, PlaybackStatus};
    use crate::error::{Error, Result};
    use crate::service::{PlayerCommand, PlayerHandle};
    use souvlaki::{MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback};

    /// Media session backed by the platform media controls
    pub struct OsMediaSession {
        controls: MediaControls,
    }

    impl std::fmt::Debug for OsMediaSession {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("OsMediaSession").finish_non_exhaustive()
        }
    }

    impl OsMediaSession {
        /// Register with the OS and forward media keys to `commands`
        #[cfg(not(target_os = "windows"))]
        pub fn new(display_name: &str, dbus_name: &str, commands: PlayerHandle) -> Result<Self> {
            let mut controls = MediaControls::new(souvlaki::PlatformConfig {
                display_name,
                dbus_name,
                hwnd: None,
            })
            .map_err(|e| Error::media_session(format!("cannot create media controls: {:?}", e)))?;

            controls
                .attach(move |event| {
                    if let Some(command) = command_for(event) {
                        if commands.send(command).is_err() {
                            tracing::debug!("Media key ignored, playback service stopped");
                        }
                    }
                })
                .map_err(|e| Error::media_session(format!("cannot attach handler: {:?}", e)))?;

            tracing::info!("Media controls registered as {}", display_name);
            Ok(Self { controls })
        }

        /// Windows needs a window handle that a headless player does not have
        #[cfg(target_os = "windows")]
        pub fn new(_display_name: &str, _dbus_name: &str, _commands: PlayerHandle) -> Result<Self> {
            Err(Error::media_session(
                "media controls need a window handle on Windows",
            ))
        }
    }

    /// Media key to service command
    pub(super) fn command_for(event: MediaControlEvent) -> Option<PlayerCommand> {
        match event {
            MediaControlEvent::Play => Some(PlayerCommand::Resume),
            MediaControlEvent::Pause => Some(PlayerCommand::Pause),
            MediaControlEvent::Toggle => Some(PlayerCommand::Toggle),
            MediaControlEvent::Stop => Some(PlayerCommand::Stop),
            MediaControlEvent::Quit => Some(PlayerCommand::Shutdown),
            _ => None,
        }
    }

    impl MediaSession for OsMediaSession {
        fn set_metadata(&mut self, metadata: &MediaSessionMetadata) -> Result<()> {
            self.controls
                .set_metadata(MediaMetadata {
                    title: Some(metadata.title.as_str()),
                    artist: Some(metadata.artist.as_str()),
                    album: Some(metadata.album.as_str()),
                    cover_url: metadata.artwork.first().map(|a| a.src.as_str()),
                    duration: None,
                })
                .map_err(|e| Error::media_session(format!("set_metadata: {:?}", e)))
        }

        fn clear_metadata(&mut self) -> Result<()> {
            self.controls
                .set_metadata(MediaMetadata::default())
                .map_err(|e| Error::media_session(format!("clear metadata: {:?}", e)))
        }

        fn set_playback_status(&mut self, status: PlaybackStatus) -> Result<()> {
            let playback = match status {
                PlaybackStatus::Playing => MediaPlayback::Playing { progress: None },
                PlaybackStatus::Paused => MediaPlayback::Paused { progress: None },
                PlaybackStatus::Stopped => MediaPlayback::Stopped,
            };
            self.controls
                .set_playback(playback)
                .map_err(|e| Error::media_session(format!("set_playback: {:?}", e)))
        }
    }

}
