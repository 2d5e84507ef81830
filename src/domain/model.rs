use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sensor keys used in a device's `newest_events` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Temperature,
    Humidity,
    Illumination,
    Movement,
}

impl SensorType {
    pub fn key(self) -> &'static str {
        match self {
            Self::Temperature => "te",
            Self::Humidity => "hu",
            Self::Illumination => "il",
            Self::Movement => "mo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    #[serde(rename = "val")]
    pub value: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A Nature Remo unit as returned by the hub API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub firmware_version: String,
    /// Keyed by [`SensorType::key`]. Unknown sensor kinds are kept as-is.
    #[serde(default)]
    pub newest_events: HashMap<String, SensorEvent>,
}

impl Device {
    pub fn reading(&self, sensor: SensorType) -> Option<&SensorEvent> {
        self.newest_events.get(sensor.key())
    }

    /// Latest illumination value. A missing reading counts as 0, which the
    /// poller treats as a dark room.
    pub fn illumination(&self) -> f64 {
        self.reading(SensorType::Illumination)
            .map(|event| event.value)
            .unwrap_or(0.0)
    }

    pub fn firmware_contains(&self, marker: &str) -> bool {
        self.firmware_version.contains(marker)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appliance {
    pub id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub signals: Vec<Signal>,
}

/// The device, appliance and signal one invocation operates on.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub device: Device,
    pub appliance: Appliance,
    pub signal: Signal,
}
