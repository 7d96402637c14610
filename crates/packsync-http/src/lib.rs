use std::time::Duration;

use packsync::{Locator, MetaError, Transport};
use reqwest::header::USER_AGENT;

/// Sent with every request. The Forge maven refuses requests without one.
pub const DEFAULT_USER_AGENT: &str = concat!("packsync/", env!("CARGO_PKG_VERSION"));

/// Configuration for an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub user_agent: String,
    /// Whole-request timeout. `None` waits until the server answers or the
    /// read is cancelled.
    pub timeout: Option<Duration>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: None,
        }
    }
}

/// Reads `http` and `https` locators with reqwest and `file` locators from
/// the local filesystem.
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, MetaError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| MetaError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, MetaError> {
        let url = locator.to_string();
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await
            .map_err(|e| MetaError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetaError::Fetch(format!("HTTP {status} for {url}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MetaError::Fetch(e.to_string()))?;

        Ok(body.to_vec())
    }

    async fn read_file(&self, locator: &Locator) -> Result<Vec<u8>, MetaError> {
        let path = locator
            .to_path()
            .ok_or_else(|| MetaError::InvalidLocator(format!("{locator} is not a file locator")))?;
        tracing::debug!(path = %path.display(), "reading file");

        tokio::fs::read(&path)
            .await
            .map_err(|e| MetaError::Fetch(format!("{}: {e}", path.display())))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    fn label(&self) -> &str {
        "http"
    }

    async fn read(&self, locator: &Locator) -> Result<Vec<u8>, MetaError> {
        if locator.scheme().is_remote() {
            self.fetch(locator).await
        } else {
            self.read_file(locator).await
        }
    }
}
