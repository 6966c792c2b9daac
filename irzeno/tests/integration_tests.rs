//! Integration tests for irzeno against a mock SSE endpoint

use futures::StreamExt;
use irzeno::{
    ChannelEvent, ChannelState, EndpointResolver, Error, HttpTransport, MetadataChannel,
    MetadataTransport, ReconnectPolicy,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

async fn next(channel: &mut MetadataChannel) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), channel.next_event())
        .await
        .expect("timed out waiting for a channel event")
        .expect("event channel closed")
}

fn resolver_for(server: &MockServer) -> EndpointResolver {
    EndpointResolver::new(
        format!("{}/stream/", server.uri()),
        format!("{}/mounts/metadata/subscribe/", server.uri()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_transport_sends_sse_headers_and_streams_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mounts/metadata/subscribe/abc"))
        .and(header("accept", "text/event-stream"))
        .and(header("cache-control", "no-cache"))
        .respond_with(sse_response("data: {\"streamTitle\":\"Song A\"}\n\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoints = resolver_for(&mock_server).resolve("abc").unwrap();
    let transport = HttpTransport::new().unwrap();
    let mut body = match transport.connect(&endpoints.metadata_url).await {
        Ok(body) => body,
        Err(e) => panic!("connect failed: {}", e),
    };

    let mut received = Vec::new();
    while let Some(chunk) = body.next().await {
        received.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(received, b"data: {\"streamTitle\":\"Song A\"}\n\n");
}

#[tokio::test]
async fn test_transport_rejects_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mounts/metadata/subscribe/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let endpoints = resolver_for(&mock_server).resolve("gone").unwrap();
    let transport = HttpTransport::new().unwrap();
    match transport.connect(&endpoints.metadata_url).await {
        Err(Error::HttpStatus(404)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("expected an error status"),
    }
}

#[tokio::test]
async fn test_channel_follows_feed_and_skips_malformed_messages() {
    let mock_server = MockServer::start().await;

    let body = concat!(
        ": welcome\n\n",
        "data: {\"streamTitle\":\"Tum Hi Ho\",\"artist\":\"Arijit Singh\"}\n\n",
        "data: not-json\n\n",
        "data: {\"streamTitle\":\"Kesariya\",\"album\":\"Brahmastra\",\"listeners\":42}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/mounts/metadata/subscribe/abc"))
        .respond_with(sse_response(body))
        .mount(&mock_server)
        .await;

    let endpoints = resolver_for(&mock_server).resolve("abc").unwrap();
    let mut channel = MetadataChannel::with_policy(
        Arc::new(HttpTransport::new().unwrap()),
        ReconnectPolicy::disabled(),
    );
    channel.open(endpoints.metadata_url);

    let connected = next(&mut channel).await;
    assert!(matches!(connected, ChannelEvent::Connected { .. }));
    channel.accept(connected);
    assert_eq!(channel.state(), ChannelState::Active);

    let first = next(&mut channel).await;
    let meta = channel.accept(first).unwrap();
    assert_eq!(meta.title(), Some("Tum Hi Ho"));
    assert_eq!(meta.artist(), Some("Arijit Singh"));

    let second = next(&mut channel).await;
    let meta = channel.accept(second).unwrap();
    assert_eq!(meta.title(), Some("Kesariya"));
    assert_eq!(meta.album(), Some("Brahmastra"));
    assert_eq!(channel.latest(), &meta);

    // The mock closes the body after the last message
    let closed = next(&mut channel).await;
    match &closed {
        ChannelEvent::TransportError { retry_in, .. } => assert_eq!(*retry_in, None),
        other => panic!("unexpected event {:?}", other),
    }
    channel.accept(closed);
    assert_eq!(channel.state(), ChannelState::Errored);
}

#[tokio::test]
async fn test_channel_reconnects_after_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mounts/metadata/subscribe/abc"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/mounts/metadata/subscribe/abc"))
        .respond_with(sse_response("data: {\"streamTitle\":\"Back on air\"}\n\n"))
        .mount(&mock_server)
        .await;

    let policy = ReconnectPolicy {
        max_retries: 2,
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        ..ReconnectPolicy::default()
    };
    let endpoints = resolver_for(&mock_server).resolve("abc").unwrap();
    let mut channel =
        MetadataChannel::with_policy(Arc::new(HttpTransport::new().unwrap()), policy);
    channel.open(endpoints.metadata_url);

    match next(&mut channel).await {
        ChannelEvent::TransportError {
            error, retry_in, ..
        } => {
            assert!(error.contains("503"));
            assert_eq!(retry_in, Some(Duration::from_millis(20)));
        }
        other => panic!("unexpected event {:?}", other),
    }

    let connected = next(&mut channel).await;
    assert!(matches!(connected, ChannelEvent::Connected { .. }));
    channel.accept(connected);

    let event = next(&mut channel).await;
    let meta = channel.accept(event).unwrap();
    assert_eq!(meta.title(), Some("Back on air"));
}

#[tokio::test]
async fn test_reopen_drops_previous_station_messages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mounts/metadata/subscribe/first"))
        .respond_with(sse_response("data: {\"streamTitle\":\"From first\"}\n\n"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mounts/metadata/subscribe/second"))
        .respond_with(sse_response("data: {\"streamTitle\":\"From second\"}\n\n"))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let mut channel = MetadataChannel::with_policy(
        Arc::new(HttpTransport::new().unwrap()),
        ReconnectPolicy::disabled(),
    );

    channel.open(resolver.resolve("first").unwrap().metadata_url);
    // Let the first subscription deliver before switching
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second = channel.open(resolver.resolve("second").unwrap().metadata_url);

    let mut titles = Vec::new();
    loop {
        let event = next(&mut channel).await;
        let is_end = matches!(
            event,
            ChannelEvent::TransportError { session, .. } if session == second
        );
        if let Some(meta) = channel.accept(event) {
            titles.push(meta.title().unwrap_or_default().to_string());
        }
        if is_end {
            break;
        }
    }
    assert_eq!(titles, vec!["From second".to_string()]);
}
