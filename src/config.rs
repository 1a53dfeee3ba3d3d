use std::{fs, path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::{
    emitter::DEFAULT_TOPIC,
    location::{Priority, SamplingConfiguration},
    platform::Capabilities,
};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub cells: CellsConfig,
    #[serde(default)]
    pub capabilities: Capabilities,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub update_interval_ms: u64,
    pub fastest_interval_ms: u64,
    pub priority: Priority,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 30_000,
            fastest_interval_ms: 5_000,
            priority: Priority::HighAccuracy,
        }
    }
}

impl LocationConfig {
    pub fn sampling(&self) -> SamplingConfiguration {
        SamplingConfiguration {
            update_interval: Duration::from_millis(self.update_interval_ms),
            fastest_interval: Duration::from_millis(self.fastest_interval_ms),
            priority: self.priority,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CellsConfig {
    // how often telephony is polled, 0 disables cell scanning
    pub scan_interval_ms: u64,
}

impl Default for CellsConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 30_000,
        }
    }
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_owned()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            location: LocationConfig::default(),
            cells: CellsConfig::default(),
            capabilities: Capabilities::default(),
        }
    }
}

pub fn parse(data: &str) -> Result<Config> {
    let config: Config = toml::from_str(data).context("Failed to parse config")?;
    ensure!(
        config.location.update_interval_ms > 0,
        "location.update_interval_ms must be positive"
    );
    Ok(config)
}

pub fn load(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).context("Failed to read config")?;
    parse(&data)
}
