//! License server transport over HTTP

use super::{KeyRequestTransport, ModularDrmKeyRequest};
use anyhow::{bail, Context};
use bytes::Bytes;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, instrument};
use url::Url;

/// Default license request timeout
pub const DEFAULT_LICENSE_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs license challenges to a license server.
///
/// Requests go to the server hinted by the content when there is one, and to
/// the configured `license_url` otherwise.
///
/// `exchange` blocks on the given runtime handle, so it must be called from
/// a thread that is not driving that runtime (the engine's player thread).
/// The handle must belong to a multi-thread runtime: `Handle::block_on` on a
/// current-thread runtime never drives its IO or timer drivers.
pub struct HttpLicenseTransport {
    client: Client,
    license_url: Url,
    headers: HashMap<String, String>,
    runtime: Handle,
}

impl HttpLicenseTransport {
    pub fn new(license_url: Url, runtime: Handle) -> anyhow::Result<Self> {
        Self::with_timeout(license_url, runtime, DEFAULT_LICENSE_TIMEOUT)
    }

    pub fn with_timeout(license_url: Url, runtime: Handle, timeout: Duration) -> anyhow::Result<Self> {
        if runtime.runtime_flavor() == RuntimeFlavor::CurrentThread {
            bail!("license transport needs a multi-thread runtime");
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to create license HTTP client")?;

        Ok(Self {
            client,
            license_url,
            headers: HashMap::new(),
            runtime,
        })
    }

    /// Add a custom header for license requests
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn license_url(&self) -> &Url {
        &self.license_url
    }

    #[instrument(skip(self, challenge), fields(url = %url))]
    async fn post_challenge(&self, url: Url, challenge: Bytes) -> anyhow::Result<Bytes> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/octet-stream")
            .body(challenge);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .context("license request failed")?
            .error_for_status()
            .context("license server rejected the request")?;

        let license = response.bytes().await.context("failed to read license")?;
        debug!(bytes = license.len(), "License received");
        Ok(license)
    }
}

impl KeyRequestTransport for HttpLicenseTransport {
    fn exchange(&self, request: &ModularDrmKeyRequest) -> anyhow::Result<Bytes> {
        if Handle::try_current().is_ok() {
            bail!("license exchange cannot block inside an async context");
        }
        let url = request.url.clone().unwrap_or_else(|| self.license_url.clone());
        self.runtime.block_on(self.post_challenge(url, request.data.clone()))
    }
}
