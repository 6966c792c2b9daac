//! Example: Play a Zeno.fm station and print what is on air
//!
//! Needs `ffplay` on the PATH.
//!
//! Run with: cargo run -p irplayer --example play_station
//! Or with a specific station: cargo run -p irplayer --example play_station -- fdgs82xkzhhvv "Rocker Radio Gold"

use irplayer::{PlaybackService, Station};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let slug = args.next().unwrap_or_else(|| "fdgs82xkzhhvv".to_string());
    let name = args.next().unwrap_or_else(|| slug.clone());

    let mut service = PlaybackService::new()?;
    service.set_loading_callback(|loading| {
        if loading {
            println!("Buffering...");
        }
    });
    service.set_metadata_callback(|meta| {
        if let Some(title) = meta.title() {
            println!("Now playing: {} - {}", meta.artist().unwrap_or("?"), title);
        }
    });

    let handle = service.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = handle.shutdown();
        }
    });

    service.play(&Station::new(slug, name))?;
    println!("Press Ctrl+C to stop...");
    service.run().await;

    Ok(())
}
