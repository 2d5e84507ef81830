use crate::domain::model::{Appliance, Device, Signal};
use crate::domain::ports::HubApi;
use crate::utils::error::Result;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Nature Remo cloud API client authenticated with a static bearer token.
#[derive(Clone)]
pub struct NatureRemoClient {
    client: Client,
    base_url: String,
    token: String,
}

impl NatureRemoClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/1/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }
}

#[async_trait::async_trait]
impl HubApi for NatureRemoClient {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        let url = self.url("devices");
        tracing::debug!("Making API request to: {}", url);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!("API response status: {}", response.status());

        Ok(response.json().await?)
    }

    async fn list_appliances(&self) -> Result<Vec<Appliance>> {
        let url = self.url("appliances");
        tracing::debug!("Making API request to: {}", url);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!("API response status: {}", response.status());

        Ok(response.json().await?)
    }

    async fn refresh_device(&self, device: &Device) -> Result<Device> {
        // Posting the unchanged name back returns the device with its newest events.
        let url = self.url(&format!("devices/{}", device.id));
        tracing::debug!("Refreshing device via: {}", url);

        let response = self
            .authorized(self.client.post(&url))
            .form(&[("name", device.name.as_str())])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    async fn send_signal(&self, signal: &Signal) -> Result<()> {
        let url = self.url(&format!("signals/{}/send", signal.id));
        tracing::debug!("Sending signal '{}' via: {}", signal.name, url);

        self.authorized(self.client.post(&url))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
