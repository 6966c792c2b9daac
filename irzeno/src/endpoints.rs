//! Stream and metadata endpoint resolution
//!
//! Both URLs are pure compositions of a provider base and the station slug;
//! nothing here touches the network.

use crate::error::{Error, Result};
use url::Url;

/// Default Zeno.fm stream base URL
pub const DEFAULT_STREAM_BASE: &str = "https://stream.zeno.fm/";

/// Default Zeno.fm metadata subscription base URL
pub const DEFAULT_METADATA_BASE: &str = "https://api.zeno.fm/mounts/metadata/subscribe/";

/// Endpoints for one station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoints {
    /// Playable audio stream
    pub stream_url: String,
    /// Server-sent events metadata subscription
    pub metadata_url: String,
}

/// Maps a station slug to its stream and metadata URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    stream_base: String,
    metadata_base: String,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self {
            stream_base: DEFAULT_STREAM_BASE.to_string(),
            metadata_base: DEFAULT_METADATA_BASE.to_string(),
        }
    }
}

impl EndpointResolver {
    /// Create a resolver with custom bases
    ///
    /// Both bases must be absolute hierarchical URLs (`http`/`https`).
    pub fn new(stream_base: impl Into<String>, metadata_base: impl Into<String>) -> Result<Self> {
        let resolver = Self {
            stream_base: stream_base.into(),
            metadata_base: metadata_base.into(),
        };
        // Validate once so misconfiguration shows up at construction
        append_segment(&resolver.stream_base, "probe")?;
        append_segment(&resolver.metadata_base, "probe")?;
        Ok(resolver)
    }

    /// Stream base URL
    pub fn stream_base(&self) -> &str {
        &self.stream_base
    }

    /// Metadata base URL
    pub fn metadata_base(&self) -> &str {
        &self.metadata_base
    }

    /// Resolve both endpoints for a station slug
    ///
    /// Only an empty slug is rejected. The slug is appended as a single path
    /// segment, so reserved characters are percent-encoded rather than
    /// interpreted.
    ///
    /// ```
    /// use irzeno::EndpointResolver;
    ///
    /// let endpoints = EndpointResolver::default().resolve("fdgs82xkzhhvv").unwrap();
    /// assert_eq!(endpoints.stream_url, "https://stream.zeno.fm/fdgs82xkzhhvv");
    /// assert_eq!(
    ///     endpoints.metadata_url,
    ///     "https://api.zeno.fm/mounts/metadata/subscribe/fdgs82xkzhhvv"
    /// );
    /// ```
    pub fn resolve(&self, slug: &str) -> Result<StreamEndpoints> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(Error::InvalidSlug(slug.to_string()));
        }

        Ok(StreamEndpoints {
            stream_url: append_segment(&self.stream_base, slug)?,
            metadata_url: append_segment(&self.metadata_base, slug)?,
        })
    }
}

fn append_segment(base: &str, segment: &str) -> Result<String> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| Error::other(format!("URL cannot be used as a base: {}", base)))?
        .pop_if_empty()
        .push(segment);
    Ok(url.into())
}
