pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::NatureRemoClient;
pub use crate::app::{start_polling, InvocationContext, RequestReply};
pub use crate::config::{AppConfig, PollerConfig, Preset};
pub use crate::core::{resolve, DarknessPoller, HubApi, PollHandle, PollOutcome, PollReport};
pub use crate::utils::error::{LightsOutError, ResolveError, Result};
