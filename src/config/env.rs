use crate::config::poller::{PollerConfig, Preset};
use crate::utils::error::{LightsOutError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_required_field, validate_url, Validate,
};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const TOKEN_VAR: &str = "NATURE_REMO_GLOBAL_TOKEN";
pub const API_BASE_VAR: &str = "NATURE_REMO_API_BASE";
pub const DEFAULT_API_BASE: &str = "https://api.nature.global";

pub const PRESET_VAR: &str = "LIGHTS_OUT_PRESET";
pub const THRESHOLD_VAR: &str = "LIGHTS_OUT_THRESHOLD";
pub const INTERVAL_VAR: &str = "LIGHTS_OUT_INTERVAL_SECS";
pub const APPLIANCE_VAR: &str = "LIGHTS_OUT_APPLIANCE";
pub const SIGNAL_VAR: &str = "LIGHTS_OUT_SIGNAL";
pub const RETRY_BUDGET_VAR: &str = "LIGHTS_OUT_RETRY_BUDGET";
pub const MINI_FILTER_VAR: &str = "LIGHTS_OUT_MINI_FILTER";
pub const MINI_MARKER_VAR: &str = "LIGHTS_OUT_MINI_MARKER";
pub const REFRESH_VAR: &str = "LIGHTS_OUT_REFRESH_EACH_TICK";
pub const MAX_READ_FAILURES_VAR: &str = "LIGHTS_OUT_MAX_READ_FAILURES";

/// Per-invocation settings: credentials plus the poller tuning.
#[derive(Clone)]
pub struct AppConfig {
    pub token: String,
    pub api_base_url: String,
    pub poller: PollerConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("poller", &self.poller)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_with_base(lookup, None)
    }

    /// Builds the config from `lookup`, starting from `base` when given
    /// (e.g. a TOML file) or from the preset named in the environment.
    pub fn from_lookup_with_base<F>(lookup: F, base: Option<PollerConfig>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(TOKEN_VAR).filter(|token| !token.trim().is_empty());
        let token = validate_required_field(TOKEN_VAR, &token)?.clone();

        let api_base_url = lookup(API_BASE_VAR)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let mut poller = match base {
            Some(base) => base,
            None => parse_var::<Preset, _>(&lookup, PRESET_VAR)?
                .unwrap_or_default()
                .config(),
        };
        apply_overrides(&mut poller, &lookup)?;

        Ok(Self {
            token,
            api_base_url,
            poller,
        })
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("token", &self.token)?;
        validate_url("api_base_url", &self.api_base_url)?;
        self.poller.validate()?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

fn apply_overrides<F>(poller: &mut PollerConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(threshold) = parse_var::<f64, _>(lookup, THRESHOLD_VAR)? {
        poller.threshold = threshold;
    }
    if let Some(secs) = parse_var::<f64, _>(lookup, INTERVAL_VAR)? {
        poller.interval = Duration::try_from_secs_f64(secs).map_err(|e| {
            LightsOutError::InvalidConfigValueError {
                field: INTERVAL_VAR.to_string(),
                value: secs.to_string(),
                reason: e.to_string(),
            }
        })?;
    }
    if let Some(name) = lookup(APPLIANCE_VAR) {
        poller.appliance_name = name;
    }
    if let Some(name) = lookup(SIGNAL_VAR) {
        poller.signal_name = name;
    }
    if let Some(budget) = parse_var::<u32, _>(lookup, RETRY_BUDGET_VAR)? {
        poller.retry_budget = budget;
    }
    if let Some(enabled) = parse_bool(lookup, MINI_FILTER_VAR)? {
        poller.firmware_mini_filter_enabled = enabled;
    }
    if let Some(marker) = lookup(MINI_MARKER_VAR) {
        poller.mini_firmware_marker = marker;
    }
    if let Some(refresh) = parse_bool(lookup, REFRESH_VAR)? {
        poller.refresh_each_tick = refresh;
    }
    if let Some(limit) = parse_var::<u32, _>(lookup, MAX_READ_FAILURES_VAR)? {
        // 0 turns the read-failure stop off
        poller.max_consecutive_read_failures = (limit > 0).then_some(limit);
    }
    Ok(())
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            LightsOutError::InvalidConfigValueError {
                field: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }
        }),
    }
}

fn parse_bool<F>(lookup: &F, key: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(LightsOutError::InvalidConfigValueError {
            field: key.to_string(),
            value: raw,
            reason: "Expected true or false".to_string(),
        }),
    }
}
