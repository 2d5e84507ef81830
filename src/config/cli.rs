use crate::config::poller::Preset;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "lights-out")]
#[command(about = "Keeps sending the 'off' signal to a light until the room is dark")]
pub struct CliConfig {
    /// Path to a TOML poller configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Poller preset used when no config file is given
    #[arg(long, global = true)]
    pub preset: Option<Preset>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the request-triggered entry point over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },
    /// Run a single invocation and wait for the poller to finish
    Run,
}
