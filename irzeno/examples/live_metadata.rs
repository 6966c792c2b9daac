//! Example: Follow the live metadata feed of a Zeno.fm station
//!
//! Run with: cargo run -p irzeno --example live_metadata
//! Or with a specific station: cargo run -p irzeno --example live_metadata -- fdgs82xkzhhvv

use irzeno::{ChannelEvent, EndpointResolver, HttpTransport, MetadataChannel};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Get station from command line or use default
    let slug = env::args()
        .nth(1)
        .unwrap_or_else(|| "fdgs82xkzhhvv".to_string());

    let endpoints = EndpointResolver::default().resolve(&slug)?;
    println!("Stream:   {}", endpoints.stream_url);
    println!("Metadata: {}\n", endpoints.metadata_url);

    let mut channel = MetadataChannel::new(Arc::new(HttpTransport::new()?));
    channel.open(endpoints.metadata_url);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = channel.next_event() => {
                let Some(event) = event else { break };
                let giving_up = matches!(event, ChannelEvent::TransportError { retry_in: None, .. });

                if let Some(meta) = channel.accept(event) {
                    println!(
                        "Now playing: {} - {}",
                        meta.artist().unwrap_or("?"),
                        meta.title().unwrap_or("?")
                    );
                }

                if giving_up {
                    println!("Metadata feed lost, giving up");
                    break;
                }
            }
        }
    }

    channel.close();
    Ok(())
}
