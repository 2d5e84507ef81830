use thiserror::Error;

#[derive(Error, Debug)]
pub enum LightsOutError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Resolution(#[from] ResolveError),
}

/// Failures that stop an invocation before polling starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Could not find devices")]
    NoDevicesFound,

    #[error("There was no device supporting measuring illumination value (skipped firmware containing '{marker}')")]
    NoCapableDeviceFound { marker: String },

    #[error("Could not find appliances")]
    NoAppliancesFound,

    #[error("Could not find light with nickname : {nickname}")]
    ApplianceNotFound { nickname: String },

    #[error("Could not find turn off signal : {signal} (appliance '{appliance}')")]
    SignalNotFound { appliance: String, signal: String },
}

/// A failed call inside one poll tick. Logged by the poller, never returned.
#[derive(Error, Debug)]
pub enum TickError {
    #[error("Error updating device {device_id}: {source}")]
    Refresh {
        device_id: String,
        #[source]
        source: LightsOutError,
    },

    #[error("Error executing signal {signal_id}: {source}")]
    Send {
        signal_id: String,
        #[source]
        source: LightsOutError,
    },
}

impl LightsOutError {
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ApiError(_) => "Check network access and that the Nature Remo token is still valid",
            Self::IoError(_) => "Check file permissions and that the bind address is free",
            Self::TomlError(_) => "Fix the syntax of the poller config file",
            Self::InvalidConfigValueError { .. } => {
                "Review the LIGHTS_OUT_* environment variables and config file"
            }
            Self::MissingConfigError { .. } => "Set NATURE_REMO_GLOBAL_TOKEN to a Nature Remo access token",
            Self::Resolution(ResolveError::NoDevicesFound)
            | Self::Resolution(ResolveError::NoCapableDeviceFound { .. }) => {
                "Register a Nature Remo with an illumination sensor, or disable the mini filter"
            }
            Self::Resolution(_) => "Check the appliance nickname and signal name in the Nature Remo app",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingConfigError { field } => format!("{} is not set", field),
            Self::Resolution(e) => e.to_string(),
            other => format!("lights-out failed: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LightsOutError>;
