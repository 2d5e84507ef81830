use anyhow::Context;
use clap::Parser;
use lights_out::adapters::server;
use lights_out::config::cli::Command;
use lights_out::utils::logger;
use lights_out::{CliConfig, InvocationContext, PollerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting lights-out");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let base = match (&cli.config, cli.preset) {
        (Some(path), _) => Some(
            PollerConfig::from_file(path)
                .with_context(|| format!("failed to load config file '{}'", path.display()))?,
        ),
        (None, Some(preset)) => Some(preset.config()),
        (None, None) => None,
    };

    let mut ctx = InvocationContext::from_env();
    if let Some(base) = base {
        ctx = ctx.with_base(base);
    }

    match cli.command {
        Command::Serve { bind } => {
            // Each request re-reads the environment, so a bad config only warns here.
            if let Err(e) = ctx.load_config() {
                tracing::warn!("⚠️ Configuration is not usable yet: {}", e);
                tracing::warn!("💡 Suggestion: {}", e.recovery_suggestion());
            }
            server::serve(bind, ctx).await?;
        }
        Command::Run => {
            let handle = match ctx.start().await {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::error!("❌ Invocation failed: {}", e);
                    eprintln!("❌ {}", e.user_friendly_message());
                    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
                    std::process::exit(1);
                }
            };

            let cancel = handle.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, stopping poller");
                    cancel.cancel();
                }
            });

            let report = handle.join().await.context("poller task panicked")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
