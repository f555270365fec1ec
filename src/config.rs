//! Bridge configuration
//!
//! Everything the bridge needs to know is read once at startup from a single
//! TOML file and then shared immutably. Every section falls back to the values
//! the device was deployed with, so an empty or partial file is valid.

use crate::mqtt::config::MqttConfig;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_ENV_VAR: &str = "AULATE_BRIDGE_CONFIG";
const CONFIG_DIR: &str = "aulate-bridge";
const CONFIG_FILE: &str = "config.toml";

/// The three topics the bridge talks on.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Topics {
    /// Lifecycle notices: welcome message and last will
    pub gestion: String,
    /// LED commands, the only subscription
    pub led: String,
    /// Button events
    pub boton: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            gestion: "aulate/gestion".to_string(),
            led: "aulate/led".to_string(),
            boton: "aulate/boton".to_string(),
        }
    }
}

/// BCM pin numbers of the button and the LED.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PinConfig {
    pub button: u8,
    pub led: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            button: 23,
            led: 18,
        }
    }
}

/// Timing of the `Shake!` sequence.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct BlinkConfig {
    /// Number of on/off cycles
    pub cycles: u32,
    /// Time spent in each half of a cycle
    pub step_ms: u64,
}

impl BlinkConfig {
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            cycles: 4,
            step_ms: 500,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub mqtt: MqttConfig,
    pub topics: Topics,
    pub pins: PinConfig,
    pub blink: BlinkConfig,
}

impl BridgeConfig {
    /// Resolves the configuration file location.
    ///
    /// `$AULATE_BRIDGE_CONFIG` wins; otherwise the file lives in the user's
    /// config directory, or the working directory when none can be determined.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| eyre!("Failed to parse bridge config: {}", e))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| eyre!("Failed to serialize bridge config: {}", e))
    }

    /// Loads the configuration at `path`.
    ///
    /// A missing file yields the defaults, which are then written to `path` so
    /// the user has something to edit. A file that exists but does not parse is
    /// an error.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?;

        if exists {
            debug!("Reading bridge config from {}", path.display());
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
            let config = Self::from_toml(&content)?;
            info!("Loaded bridge config from {}", path.display());
            return Ok(config);
        }

        info!("No config found at {}, using defaults", path.display());
        let config = Self::default();
        if let Err(e) = config.save(path).await {
            warn!("Could not write default config: {}", e);
        }
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        tokio::fs::write(path, self.to_toml()?)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;
        info!("Default config written to {}", path.display());
        Ok(())
    }
}
