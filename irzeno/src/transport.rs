//! Transport for the metadata push connection
//!
//! The channel only needs "give me the body of this URL as a byte stream".
//! `HttpTransport` does it with reqwest; tests plug in their own
//! implementation of [`MetadataTransport`].

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use std::time::Duration;

/// Default timeout for establishing the connection
///
/// No overall request timeout is set: the push connection stays open as
/// long as the station plays.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "IndianRadio/0.1 (irzeno)";

/// Body of an open push connection
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Opens push connections for the metadata channel
#[async_trait]
pub trait MetadataTransport: Send + Sync + 'static {
    /// Connect to `url` and return the response body as a stream
    ///
    /// Fails when the connection cannot be established or the server
    /// answers with a non-success status.
    async fn connect(&self, url: &str) -> Result<ByteStream>;
}

/// reqwest-backed transport speaking `text/event-stream`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the transport
    pub fn builder() -> TransportBuilder {
        TransportBuilder::default()
    }

    /// Create a transport around an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl MetadataTransport for HttpTransport {
    async fn connect(&self, url: &str) -> Result<ByteStream> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }

        tracing::debug!(url = %url, "Metadata stream connected");
        Ok(response.bytes_stream().map_err(Error::from).boxed())
    }
}

/// Builder for [`HttpTransport`]
#[derive(Debug)]
pub struct TransportBuilder {
    client: Option<Client>,
    connect_timeout: Duration,
    user_agent: String,
    proxy: Option<String>,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self {
            client: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
        }
    }
}

impl TransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a proxy URL
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Build the transport
    pub fn build(self) -> Result<HttpTransport> {
        let client = if let Some(client) = self.client {
            client
        } else {
            let mut builder = Client::builder()
                .user_agent(&self.user_agent)
                .connect_timeout(self.connect_timeout);

            if let Some(proxy_url) = &self.proxy {
                let proxy = reqwest::Proxy::all(proxy_url)
                    .map_err(|e| Error::other(format!("Invalid proxy: {}", e)))?;
                builder = builder.proxy(proxy);
            }

            builder.build()?
        };

        Ok(HttpTransport { client })
    }
}
