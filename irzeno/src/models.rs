//! Data models for stations and live metadata messages

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Station
// ============================================================================

/// A station as handed over by the catalog
///
/// Only the fields the player needs: the provider slug used to build the
/// stream and metadata endpoints, and the display data shown on the media
/// session and widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Station {
    /// Zeno.fm mount identifier (e.g., "fdgs82xkzhhvv")
    pub slug: String,
    /// Human-readable name (e.g., "Rocker Radio Gold")
    pub name: String,
    /// Artwork URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Short description, used as artist fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Station {
    /// Create a station without artwork nor description
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            image_url: None,
            description: None,
        }
    }

    /// Set the artwork URL
    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ============================================================================
// Live metadata
// ============================================================================

/// "Now airing" message pushed by the metadata endpoint
///
/// Every field is optional; unknown fields are ignored.
///
/// ```
/// use irzeno::StreamMetadata;
///
/// let meta = StreamMetadata::from_json(r#"{"streamTitle":"Song A","artist":"Artist B"}"#).unwrap();
/// assert_eq!(meta.title(), Some("Song A"));
/// assert_eq!(meta.artist(), Some("Artist B"));
/// assert!(StreamMetadata::from_json("not-json").is_err());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    #[serde(default)]
    pub stream_title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
}

impl StreamMetadata {
    /// Parse one message payload
    ///
    /// The payload must be a JSON object; arrays and scalars are rejected
    /// even when serde could coerce them.
    pub fn from_json(data: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(data)?;
        if !value.is_object() {
            return Err(Error::invalid_payload(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Track title, if present and not blank
    pub fn title(&self) -> Option<&str> {
        non_blank(self.stream_title.as_deref())
    }

    /// Artist, if present and not blank
    pub fn artist(&self) -> Option<&str> {
        non_blank(self.artist.as_deref())
    }

    /// Album, if present and not blank
    pub fn album(&self) -> Option<&str> {
        non_blank(self.album.as_deref())
    }

    /// True when the message carries a usable track title
    pub fn has_title(&self) -> bool {
        self.title().is_some()
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.stream_title.is_none() && self.artist.is_none() && self.album.is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
