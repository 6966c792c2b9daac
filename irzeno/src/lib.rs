//! Zeno.fm client library for Indian Radio
//!
//! This crate covers the provider side of live station playback:
//!
//! - **Endpoints**: derive the audio stream URL and the metadata subscription
//!   URL from a station slug
//! - **Live Metadata**: follow the server-sent "now playing" feed of a station,
//!   one subscription at a time, with bounded reconnection
//! - **Configuration Extension**: provider base URLs and reconnect policy
//!   stored in irconfig
//!
//! # Example
//!
//! ```no_run
//! use irzeno::{EndpointResolver, HttpTransport, MetadataChannel};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoints = EndpointResolver::default().resolve("fdgs82xkzhhvv")?;
//!     println!("Stream: {}", endpoints.stream_url);
//!
//!     let mut channel = MetadataChannel::new(Arc::new(HttpTransport::new()?));
//!     channel.open(endpoints.metadata_url);
//!
//!     while let Some(event) = channel.next_event().await {
//!         if let Some(meta) = channel.accept(event) {
//!             println!("Now: {}", meta.title().unwrap_or("-"));
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Metadata feed
//!
//! The feed is a `text/event-stream` whose `data` payloads are JSON objects
//! with optional `streamTitle`, `artist` and `album` fields. Unknown fields are
//! ignored and malformed payloads are logged and skipped.

pub mod channel;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod sse;
pub mod transport;

#[cfg(feature = "irconfig")]
pub mod config_ext;

// Re-exports
pub use channel::{ChannelEvent, ChannelState, MetadataChannel, ReconnectPolicy, SessionId};
pub use endpoints::{EndpointResolver, StreamEndpoints, DEFAULT_METADATA_BASE, DEFAULT_STREAM_BASE};
pub use error::{Error, Result};
pub use models::{Station, StreamMetadata};
pub use sse::{SseEvent, SseParser};
pub use transport::{ByteStream, HttpTransport, MetadataTransport, TransportBuilder};

#[cfg(feature = "irconfig")]
pub use config_ext::ZenoConfigExt;
