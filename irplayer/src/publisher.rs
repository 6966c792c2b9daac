//! Now-playing fan-out to the media session and the widget
//!
//! Both surfaces are best effort and independent: a failure on one is logged
//! and does not prevent the other from being updated.

use crate::media_session::{MediaArtwork, MediaSession, MediaSessionMetadata, PlaybackStatus};
use crate::widget::{WidgetPayload, WidgetWriter};

/// Artist shown when the feed has none
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Album shown when the feed has none
pub const DEFAULT_ALBUM: &str = "Radio Stream";

/// What the auxiliary surfaces should display
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NowPlaying {
    /// Active station name, `None` when nothing is playing
    pub station_name: Option<String>,
    /// Track title from the metadata feed
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub image_url: Option<String>,
    pub is_playing: bool,
}

impl NowPlaying {
    /// Nothing active
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.station_name.is_none()
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        if self.is_idle() {
            PlaybackStatus::Stopped
        } else if self.is_playing {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Paused
        }
    }

    /// Media session metadata, only when a non-blank track title is known
    pub fn media_metadata(&self) -> Option<MediaSessionMetadata> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        Some(MediaSessionMetadata {
            title: title.to_string(),
            artist: non_blank_or(&self.artist, UNKNOWN_ARTIST),
            album: non_blank_or(&self.album, DEFAULT_ALBUM),
            artwork: self
                .image_url
                .iter()
                .map(MediaArtwork::station)
                .collect(),
        })
    }

    /// Widget payload; the station name stands in for a missing title
    pub fn widget_payload(&self) -> WidgetPayload {
        let title = self
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.station_name.as_deref())
            .unwrap_or_default();

        WidgetPayload {
            title: title.to_string(),
            artist: self.artist.clone().unwrap_or_default(),
            image_url: self.image_url.clone(),
            is_playing: self.is_playing,
        }
    }
}

fn non_blank_or(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Pushes [`NowPlaying`] to the configured surfaces
#[derive(Default)]
pub struct NowPlayingPublisher {
    media: Option<Box<dyn MediaSession>>,
    widget: Option<WidgetWriter>,
    last: Option<NowPlaying>,
}

impl std::fmt::Debug for NowPlayingPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NowPlayingPublisher")
            .field("media", &self.media.is_some())
            .field("widget", &self.widget.is_some())
            .field("last", &self.last)
            .finish()
    }
}

impl NowPlayingPublisher {
    pub fn new(media: Option<Box<dyn MediaSession>>, widget: Option<WidgetWriter>) -> Self {
        Self {
            media,
            widget,
            last: None,
        }
    }

    /// Last state handed to [`publish`](Self::publish)
    pub fn last(&self) -> Option<&NowPlaying> {
        self.last.as_ref()
    }

    pub fn publish(&mut self, now: &NowPlaying) {
        if let Some(media) = self.media.as_mut() {
            if let Err(e) = media.set_playback_status(now.playback_status()) {
                tracing::warn!("Media session status update failed: {}", e);
            }

            let result = if now.is_idle() {
                media.clear_metadata()
            } else if let Some(metadata) = now.media_metadata() {
                media.set_metadata(&metadata)
            } else {
                // A blank title would be worse than the previous one
                Ok(())
            };
            if let Err(e) = result {
                tracing::warn!("Media session metadata update failed: {}", e);
            }
        }

        if let Some(widget) = &self.widget {
            widget.submit(now.widget_payload());
        }

        tracing::debug!(
            "Published now playing: {:?} - {:?} (playing: {})",
            now.station_name,
            now.title,
            now.is_playing
        );
        self.last = Some(now.clone());
    }
}
