use crate::domain::model::{Appliance, Device, Signal};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The calls the resolver and poller make against the hub.
///
/// Implementations must be safe to share with the background poll task.
#[async_trait]
pub trait HubApi: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<Device>>;
    async fn list_appliances(&self) -> Result<Vec<Appliance>>;
    /// Fetch a fresh snapshot of `device`, including its newest sensor events.
    async fn refresh_device(&self, device: &Device) -> Result<Device>;
    async fn send_signal(&self, signal: &Signal) -> Result<()>;
}
