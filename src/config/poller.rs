use crate::utils::error::{LightsOutError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RETRY_BUDGET: u32 = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);
/// Longest accepted tick interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);
pub const DEFAULT_APPLIANCE_NAME: &str = "Light";
pub const DEFAULT_SIGNAL_NAME: &str = "off";
pub const DEFAULT_MINI_MARKER: &str = "Remo-mini";

/// Everything the resolver and the poller need to know about one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Readings at or above this value mean the room is still bright.
    pub threshold: f64,
    #[serde(rename = "interval_secs", with = "duration_secs")]
    pub interval: Duration,
    pub appliance_name: String,
    pub signal_name: String,
    pub retry_budget: u32,
    pub firmware_mini_filter_enabled: bool,
    pub mini_firmware_marker: String,
    /// When false the snapshot taken during resolution is reused every tick.
    pub refresh_each_tick: bool,
    pub max_consecutive_read_failures: Option<u32>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Preset::default().config()
    }
}

impl PollerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    pub fn with_refresh_each_tick(mut self, refresh: bool) -> Self {
        self.refresh_each_tick = refresh;
        self
    }

    pub fn with_max_consecutive_read_failures(mut self, limit: Option<u32>) -> Self {
        self.max_consecutive_read_failures = limit;
        self
    }
}

impl Validate for PollerConfig {
    fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(LightsOutError::InvalidConfigValueError {
                field: "threshold".to_string(),
                value: self.threshold.to_string(),
                reason: "Threshold must be a finite number".to_string(),
            });
        }
        validate_range("threshold", self.threshold, 0.0, 10_000.0)?;

        if self.interval.is_zero() {
            return Err(LightsOutError::InvalidConfigValueError {
                field: "interval_secs".to_string(),
                value: "0".to_string(),
                reason: "Interval must be greater than zero".to_string(),
            });
        }
        if self.interval > MAX_INTERVAL {
            return Err(LightsOutError::InvalidConfigValueError {
                field: "interval_secs".to_string(),
                value: self.interval.as_secs_f64().to_string(),
                reason: format!(
                    "Interval must be at most {} seconds",
                    MAX_INTERVAL.as_secs()
                ),
            });
        }

        validate_positive_number("retry_budget", u64::from(self.retry_budget), 1)?;
        validate_non_empty_string("appliance_name", &self.appliance_name)?;
        validate_non_empty_string("signal_name", &self.signal_name)?;

        if self.firmware_mini_filter_enabled {
            validate_non_empty_string("mini_firmware_marker", &self.mini_firmware_marker)?;
        }

        if let Some(limit) = self.max_consecutive_read_failures {
            validate_positive_number("max_consecutive_read_failures", u64::from(limit), 1)?;
        }

        Ok(())
    }
}

/// The deployment variants the function has historically shipped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// HTTP-triggered deployment.
    #[default]
    Request,
    /// Message-queue deployment with a brighter cut-off.
    Event,
    /// Takes the first device without checking firmware.
    FirstDevice,
}

impl Preset {
    pub fn config(self) -> PollerConfig {
        let (threshold, mini_filter) = match self {
            Preset::Request => (50.0, true),
            Preset::Event => (100.0, true),
            Preset::FirstDevice => (20.0, false),
        };

        PollerConfig {
            threshold,
            interval: DEFAULT_INTERVAL,
            appliance_name: DEFAULT_APPLIANCE_NAME.to_string(),
            signal_name: DEFAULT_SIGNAL_NAME.to_string(),
            retry_budget: DEFAULT_RETRY_BUDGET,
            firmware_mini_filter_enabled: mini_filter,
            mini_firmware_marker: DEFAULT_MINI_MARKER.to_string(),
            refresh_each_tick: true,
            max_consecutive_read_failures: None,
        }
    }
}

impl FromStr for Preset {
    type Err = LightsOutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "request" | "http" => Ok(Preset::Request),
            "event" | "pubsub" => Ok(Preset::Event),
            "first-device" | "first_device" => Ok(Preset::FirstDevice),
            other => Err(LightsOutError::InvalidConfigValueError {
                field: "preset".to_string(),
                value: other.to_string(),
                reason: "Expected one of: request, event, first-device".to_string(),
            }),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_match_deployed_variants() {
        let request = Preset::Request.config();
        assert_eq!(request.threshold, 50.0);
        assert!(request.firmware_mini_filter_enabled);

        let event = Preset::Event.config();
        assert_eq!(event.threshold, 100.0);
        assert_eq!(event.interval, Duration::from_secs(15));

        let first = Preset::FirstDevice.config();
        assert_eq!(first.threshold, 20.0);
        assert!(!first.firmware_mini_filter_enabled);
        assert_eq!(first.retry_budget, 10);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = PollerConfig::from_toml_str(
            r#"
threshold = 80
interval_secs = 2.5
appliance_name = "Ceiling"
"#,
        )
        .unwrap();

        assert_eq!(config.threshold, 80.0);
        assert_eq!(config.interval, Duration::from_millis(2500));
        assert_eq!(config.appliance_name, "Ceiling");
        assert_eq!(config.signal_name, "off");
        assert_eq!(config.retry_budget, 10);
        assert!(config.refresh_each_tick);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PollerConfig::default().validate().is_ok());
        assert!(PollerConfig::default().with_retry_budget(0).validate().is_err());
        assert!(PollerConfig::default()
            .with_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(PollerConfig::default()
            .with_threshold(f64::NAN)
            .validate()
            .is_err());
        assert!(PollerConfig::default()
            .with_max_consecutive_read_failures(Some(0))
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_bounds_interval() {
        assert!(PollerConfig::default()
            .with_interval(MAX_INTERVAL)
            .validate()
            .is_ok());

        let err = PollerConfig::default()
            .with_interval(Duration::from_secs_f64(1e19))
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            LightsOutError::InvalidConfigValueError { ref field, ref reason, .. }
                if field == "interval_secs" && reason.contains("3600")
        ));
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("pubsub".parse::<Preset>().unwrap(), Preset::Event);
        assert_eq!("First-Device".parse::<Preset>().unwrap(), Preset::FirstDevice);
        assert!("mini".parse::<Preset>().is_err());
    }
}
