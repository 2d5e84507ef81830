use crate::adapters::NatureRemoClient;
use crate::config::{AppConfig, PollerConfig};
use crate::core::{resolve, spawn_poller, HubApi, PollHandle};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::sync::Arc;

pub const OK_BODY: &str = "OK";
pub const FAILED_BODY: &str = "Failed";

/// Source of environment variables for one invocation.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reply of the request-triggered entry point. The status is always 200;
/// failures are only visible in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestReply {
    pub status: u16,
    pub body: &'static str,
}

impl RequestReply {
    fn ok() -> Self {
        Self {
            status: 200,
            body: OK_BODY,
        }
    }

    fn failed() -> Self {
        Self {
            status: 200,
            body: FAILED_BODY,
        }
    }
}

/// Everything an entry point needs to run one invocation.
///
/// Polling is detached: the entry points return as soon as the poller has
/// been spawned. A serverless host may freeze or stop the process before the
/// attempt budget is used up, so completion of the loop is best effort.
#[derive(Clone)]
pub struct InvocationContext {
    lookup: EnvLookup,
    base: Option<PollerConfig>,
}

impl InvocationContext {
    pub fn new(lookup: EnvLookup) -> Self {
        Self { lookup, base: None }
    }

    pub fn from_env() -> Self {
        Self::new(Arc::new(|key: &str| std::env::var(key).ok()))
    }

    /// Uses `base` instead of the environment preset as the starting poller config.
    pub fn with_base(mut self, base: PollerConfig) -> Self {
        self.base = Some(base);
        self
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        let config =
            AppConfig::from_lookup_with_base(|key: &str| (self.lookup)(key), self.base.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads config, resolves the target and spawns the poller.
    pub async fn start(&self) -> Result<PollHandle> {
        let config = self.load_config()?;
        let client = Arc::new(NatureRemoClient::new(&config.api_base_url, &config.token));
        start_polling(client, config.poller).await
    }

    /// Request-triggered entry point. Errors are logged and collapsed into a
    /// "Failed" body.
    pub async fn handle_request(&self) -> RequestReply {
        match self.start().await {
            Ok(_detached) => RequestReply::ok(),
            Err(e) => {
                tracing::error!("❌ Invocation failed: {}", e);
                tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
                RequestReply::failed()
            }
        }
    }

    /// Event-triggered entry point. The payload is only logged; errors are
    /// returned to the caller unchanged.
    pub async fn handle_event(&self, payload: &[u8]) -> Result<PollHandle> {
        tracing::info!("📨 Event payload: {}", String::from_utf8_lossy(payload));
        self.start().await.inspect_err(|e| {
            tracing::error!("❌ Invocation failed: {}", e);
        })
    }
}

/// Validates `config`, resolves the target through `api` and spawns the
/// poller for it.
pub async fn start_polling<H>(api: Arc<H>, config: PollerConfig) -> Result<PollHandle>
where
    H: HubApi + ?Sized + 'static,
{
    config.validate()?;
    let target = resolve(&*api, &config).await?;
    Ok(spawn_poller(api, target, config))
}
