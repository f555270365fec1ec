pub mod bridge;
pub mod config;
pub mod gpio;
pub mod mqtt;

use crate::bridge::{Bridge, Uninitialized};
use crate::config::BridgeConfig;
use crate::gpio::rppal_pins::RppalPins;
use crate::mqtt::mqtt_handler::RumqttClient;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = BridgeConfig::default_path();
    let config = BridgeConfig::load_or_default(&config_path).await?;

    let client = Arc::new(RumqttClient::new(config.mqtt.clone()));
    let pins = Arc::new(RppalPins);

    // The collaborators block and spawn their own threads, keep them off the runtime.
    let bridge = tokio::task::spawn_blocking(move || {
        Bridge::<Uninitialized>::create(config, client, pins).startup()
    })
    .await
    .map_err(|e| eyre!("Startup task failed: {}", e))?;

    info!("Waiting for Ctrl-C");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;

    tokio::task::spawn_blocking(move || bridge.shutdown())
        .await
        .map_err(|e| eyre!("Shutdown task failed: {}", e))?;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
