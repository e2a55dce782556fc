mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Notification rejected with HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Notification transport error: {reason}")]
    Network { reason: String },
    #[error("Notification timed out")]
    Timeout,
}

/// Trait for delivering one alert message to the operator.
///
/// Exactly one `send` call is made per alert decision; delivery failure is
/// surfaced to the caller but never retried across passes.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Used when no delivery transport is configured so
/// the engine's alert path still runs end to end.
#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        info!(alert = %text, "Alert (no notifier configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_notifier_always_succeeds() {
        let notifier = NullNotifier;
        assert!(notifier.send("console is available now from http://x").await.is_ok());
    }
}
