use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    HighAccuracy,
    Balanced,
    LowPower,
    NoPower,
}

/// How often the location service should report, fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfiguration {
    pub update_interval: Duration,
    pub fastest_interval: Duration,
    pub priority: Priority,
}

/// Request handed to the platform when updates are started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub interval: Duration,
    pub fastest_interval: Duration,
    pub priority: Priority,
}

impl From<&SamplingConfiguration> for LocationRequest {
    fn from(config: &SamplingConfiguration) -> Self {
        Self {
            interval: config.update_interval,
            fastest_interval: config.fastest_interval,
            priority: config.priority,
        }
    }
}

/// A position fix, also the payload of a location event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,
    pub timestamp_millis: i64,
}
