//! Out-of-band alarms for failures nobody is watching the logs for.
//!
//! Handlers never wait on an alarm: [`AlarmHandle::notify`] spawns the
//! delivery and returns. Delivery retries a bounded number of times and
//! only ever logs its outcome.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use thiserror::Error;

use crate::config::TelegramConfig;

pub const MAX_ATTEMPTS: u32 = 3;
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
const BACKOFF_STEP: Duration = Duration::from_secs(1);
const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("alarm notifier is already initialized")]
    AlreadyInitialized,

    #[error("invalid alarm configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("alarm message cannot be empty")]
    EmptyMessage,

    #[error("attempt {attempt} failed: {reason}")]
    Attempt { attempt: u32, reason: String },

    #[error("all {attempts} attempts failed: {reasons}")]
    Exhausted { attempts: u32, reasons: String },
}

/// A single delivery attempt to some channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), String>;
}

/// Posts alarms to a Telegram chat through the Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, AlarmError> {
        Self::with_base_url(config, TELEGRAM_API)
    }

    /// Point at a different Bot API host.
    pub fn with_base_url(config: &TelegramConfig, base_url: &str) -> Result<Self, AlarmError> {
        if config.bot_token.trim().is_empty() {
            return Err(AlarmError::InvalidConfig("bot token cannot be empty"));
        }
        if config.chat_id.trim().is_empty() {
            return Err(AlarmError::InvalidConfig("chat id cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|_| AlarmError::InvalidConfig("failed to build http client"))?;

        Ok(TelegramNotifier {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                base_url.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), String> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", message)])
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("telegram API returned status {status}"))
        }
    }
}

/// Writes alarms to the log. Used when no channel is configured.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), String> {
        tracing::error!(target: "alarm", %message, "alarm raised");
        Ok(())
    }
}

/// Try `notifier` up to `attempts` times, sleeping `attempt × step` between
/// tries. Returns the number of failed attempts before success.
pub async fn deliver(
    notifier: &dyn Notifier,
    message: &str,
    attempts: u32,
    step: Duration,
) -> Result<u32, AlarmError> {
    if message.trim().is_empty() {
        return Err(AlarmError::EmptyMessage);
    }

    let mut failures = Vec::new();
    for attempt in 1..=attempts {
        match notifier.send(message).await {
            Ok(()) => return Ok(failures.len() as u32),
            Err(reason) => {
                failures.push(AlarmError::Attempt { attempt, reason }.to_string());
                if attempt < attempts {
                    tokio::time::sleep(step * attempt).await;
                }
            }
        }
    }

    Err(AlarmError::Exhausted {
        attempts,
        reasons: failures.join("; "),
    })
}

/// Process-wide alarm slot, constructed once and passed around in state.
///
/// The notifier is installed at most once; alarms raised before that are
/// logged and dropped.
#[derive(Clone, Default)]
pub struct AlarmHandle {
    slot: Arc<OnceLock<Arc<dyn Notifier>>>,
}

impl AlarmHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle with `notifier` already installed.
    pub fn with_notifier(notifier: impl Notifier + 'static) -> Self {
        let handle = Self::new();
        let _ = handle.slot.set(Arc::new(notifier));
        handle
    }

    /// Telegram when configured, the log otherwise.
    pub fn from_config(telegram: Option<&TelegramConfig>) -> Result<Self, AlarmError> {
        let handle = Self::new();
        match telegram {
            Some(config) => handle.install(TelegramNotifier::new(config)?)?,
            None => handle.install(LogNotifier)?,
        }
        Ok(handle)
    }

    pub fn install(&self, notifier: impl Notifier + 'static) -> Result<(), AlarmError> {
        self.slot
            .set(Arc::new(notifier))
            .map_err(|_| AlarmError::AlreadyInitialized)
    }

    pub fn is_installed(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Deliver `message` in the background.
    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        let Some(notifier) = self.slot.get().cloned() else {
            tracing::warn!(%message, "alarm dropped: no notifier installed");
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(%message, "alarm dropped: no async runtime");
            return;
        };

        runtime.spawn(async move {
            let outcome = deliver(notifier.as_ref(), &message, MAX_ATTEMPTS, BACKOFF_STEP).await;
            report(&outcome);
        });
    }

    /// Deliver `message` and wait for the outcome.
    pub async fn notify_and_wait(&self, message: &str) -> Result<u32, AlarmError> {
        let Some(notifier) = self.slot.get().cloned() else {
            return Err(AlarmError::InvalidConfig("no notifier installed"));
        };
        let outcome = deliver(notifier.as_ref(), message, MAX_ATTEMPTS, BACKOFF_STEP).await;
        report(&outcome);
        outcome
    }
}

fn report(outcome: &Result<u32, AlarmError>) {
    match outcome {
        Ok(0) => {}
        Ok(failures) => tracing::warn!(failures, "alarm succeeded after {failures} failures"),
        Err(err) => tracing::error!(error = %err, "alarm delivery failed"),
    }
}
