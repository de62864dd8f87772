use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;

pub struct Downloader {
    client: Client,
    check_status: bool,
}

impl Downloader {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if config.disable_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build().context("failed to build http client")?,
            check_status: config.check_status,
        })
    }

    /// One GET, body returned as text. The status is only enforced with `check_status`.
    #[instrument(skip(self))]
    pub async fn page(&self, url: &str) -> Result<String> {
        info!("fetching page");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            if self.check_status {
                anyhow::bail!("{} returned {}", url, status);
            }
            warn!(%status, "non-success status, parsing body anyway");
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read body of {}", url))?;
        debug!(bytes = body.len(), "page downloaded");
        Ok(body)
    }

    /// Image bytes; any non-2xx response is an error regardless of `check_status`.
    #[instrument(skip(self))]
    pub async fn image(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{} returned {}", url, status);
        }

        let image_bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {}", url))?;
        debug!(bytes = image_bytes.len(), "image downloaded");
        Ok(image_bytes)
    }
}
