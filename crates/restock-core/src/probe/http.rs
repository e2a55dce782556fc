use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{Probe, ProbeError};
use crate::monitor::observation::Target;

/// HTTP-based availability probe with connection pooling, retries, and backoff.
///
/// Fetches the target's locator and reports the item as purchasable when the
/// configured marker (typically the retailer's add-to-basket control) appears
/// in the page body. A missing marker is a negative observation, not an
/// error; only transport failures become [`ProbeError`]s.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    marker: String,
    max_retries: u32,
    base_backoff: Duration,
}

impl HttpProbe {
    pub fn new(
        client: Client,
        marker: impl Into<String>,
        max_retries: u32,
        base_backoff: Duration,
    ) -> Self {
        Self {
            client,
            marker: marker.into(),
            max_retries,
            base_backoff,
        }
    }

    pub fn from_config(config: &crate::config::MonitorConfig, marker: impl Into<String>) -> Self {
        Self::new(
            Self::build_client(config.request_timeout),
            marker,
            config.max_retries,
            config.retry_backoff,
        )
    }

    pub fn from_config_with_client(
        config: &crate::config::MonitorConfig,
        client: Client,
        marker: impl Into<String>,
    ) -> Self {
        Self::new(client, marker, config.max_retries, config.retry_backoff)
    }

    pub fn build_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(20)
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client")
    }

    async fn fetch(&self, url: &str) -> Result<String, ProbeError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.base_backoff * 2u32.saturating_pow(attempt - 1);
                debug!(url, attempt, backoff_ms = backoff.as_millis(), "Retrying probe fetch");
                tokio::time::sleep(backoff).await;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.text().await {
                            Ok(body) => return Ok(body),
                            Err(e) => {
                                last_error = Some(ProbeError::Network {
                                    url: url.to_string(),
                                    reason: e.to_string(),
                                });
                            }
                        }
                    } else {
                        let status = response.status().as_u16();
                        let message = response
                            .status()
                            .canonical_reason()
                            .unwrap_or("Unknown")
                            .to_string();
                        warn!(url, status, attempt, "Probe fetch returned error status");
                        let err = ProbeError::Http {
                            url: url.to_string(),
                            status,
                            message,
                        };

                        if status >= 400 && status < 500 && status != 429 {
                            return Err(err);
                        }
                        last_error = Some(err);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        warn!(url, attempt, "Probe fetch timed out");
                        last_error = Some(ProbeError::Timeout {
                            url: url.to_string(),
                        });
                    } else {
                        warn!(url, attempt, error = %e, "Probe fetch network error");
                        last_error = Some(ProbeError::Network {
                            url: url.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        Err(last_error.expect("Loop must have produced an error"))
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, target: &Target) -> Result<bool, ProbeError> {
        debug!(source = %target.source, item = %target.item, url = %target.locator, "Probing availability");
        let body = self.fetch(&target.locator).await?;
        Ok(body.contains(&self.marker))
    }
}
