#[cfg(feature = "cli")]
pub mod cli;
pub mod env;
pub mod poller;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use env::AppConfig;
pub use poller::{PollerConfig, Preset};
