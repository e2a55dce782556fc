use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::{Notifier, NotifyError};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API notifier.
///
/// POSTs one `sendMessage` call per alert, with bounded retries and
/// exponential backoff. Client-side errors other than 429 are not retried;
/// a bad token or chat id will not fix itself mid-run.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
    timeout: Duration,
    max_retries: u32,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(client: Client, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            timeout: Duration::from_millis(5000),
            max_retries: 2,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
        };

        let mut last_error = NotifyError::Network {
            reason: "no attempt made".to_string(),
        };

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let req = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(&body);

            match req.send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(chat_id = %self.chat_id, "Telegram message delivered");
                    return Ok(());
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let message = resp
                        .status()
                        .canonical_reason()
                        .unwrap_or("Unknown")
                        .to_string();
                    warn!(status, attempt, "Telegram API rejected message");
                    let err = NotifyError::Http { status, message };
                    if status >= 400 && status < 500 && status != 429 {
                        return Err(err);
                    }
                    last_error = err;
                }
                Err(e) => {
                    if e.is_timeout() {
                        warn!(attempt, "Telegram request timed out");
                        last_error = NotifyError::Timeout;
                    } else {
                        warn!(attempt, error = %e, "Telegram request failed");
                        last_error = NotifyError::Network {
                            reason: e.to_string(),
                        };
                    }
                }
            }
        }

        Err(last_error)
    }
}
