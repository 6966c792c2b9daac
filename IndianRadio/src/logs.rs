//! Initialisation du logging depuis la configuration

use irconfig::get_config;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

fn string_to_levelfilter(level: &str) -> Option<LevelFilter> {
    match level.trim().to_uppercase().as_str() {
        "ERROR" => Some(LevelFilter::ERROR),
        "WARN" | "WARNING" => Some(LevelFilter::WARN),
        "INFO" => Some(LevelFilter::INFO),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "TRACE" => Some(LevelFilter::TRACE),
        "OFF" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Initialise le subscriber global
///
/// Le niveau minimal vient de `host.logger.min_level`; `RUST_LOG` le
/// remplace lorsqu'il est défini. Sans console, rien n'est affiché.
pub fn init_logging() {
    let config = get_config();

    let log_level = match config.get_log_min_level() {
        Ok(l) => string_to_levelfilter(&l).unwrap_or(LevelFilter::INFO),
        Err(_) => LevelFilter::INFO,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let enable_console = match config.get_log_enable_console() {
        Ok(b) => b,
        Err(_) => true,
    };

    let subscriber = Registry::default().with(filter);
    if enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    } else {
        subscriber.init();
    }
}
