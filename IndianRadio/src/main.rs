mod logs;

use irconfig::get_config;
use irplayer::{PlayerConfigExt, Station};
use tracing::info;

const USAGE: &str = "usage: IndianRadio <station-slug> [station-name] [image-url]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logs::init_logging();

    let mut args = std::env::args().skip(1);
    let Some(slug) = args.next() else {
        anyhow::bail!(USAGE);
    };
    let name = args.next().unwrap_or_else(|| slug.clone());
    let mut station = Station::new(slug, name);
    if let Some(image) = args.next() {
        station = station.with_image(image);
    }

    // ========== Service ==========
    let config = get_config();
    info!("📁 Configuration directory: {}", config.directory());

    let mut service = config.player_service_builder()?.build()?;
    service.set_loading_callback(|loading| {
        if loading {
            info!("⏳ Buffering...");
        }
    });
    service.set_metadata_callback(|meta| {
        if let Some(title) = meta.title() {
            info!("🎵 {} - {}", meta.artist().unwrap_or("?"), title);
        }
    });

    let handle = service.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stopping...");
            let _ = handle.shutdown();
        }
    });

    // ========== Lecture ==========
    info!("📻 Tuning to {}...", station.name);
    service.play(&station)?;

    info!("Press Ctrl+C to stop...");
    service.run().await;

    Ok(())
}
