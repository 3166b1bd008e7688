//! Channel dispatchers and the retry and logging machinery they share.
//!
//! Every dispatch follows the same shape: validate, load and decrypt the
//! provider, insert a `PENDING` log row, attempt delivery under a
//! [`RetryPolicy`], then move the row to `SENT` or `FAILED`.

use std::future::Future;
use std::time::Duration;

use herald_core::error::CoreError;
use herald_core::notification::ChannelKind;
use herald_core::types::DbId;
use herald_db::models::notification_log::NotificationLog;
use herald_db::Datastore;
use tokio_util::sync::CancellationToken;

use crate::providers::{ProviderService, UnsealedProvider};

pub mod email;
pub mod fcm;
pub mod push;
pub mod sms;

/// Replacement for secret values found in transport error text.
const REDACTED: &str = "***";

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failure reported by an outbound transport for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("{0}")]
    Failed(String),

    /// The push service rejected the device token as invalid or unregistered.
    #[error("device token is invalid or unregistered: {0}")]
    InvalidToken(String),
}

impl SendError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::InvalidToken(_))
    }

    /// Replace every occurrence of a secret value in the message.
    pub fn scrubbed(self, secrets: &[String]) -> Self {
        match self {
            Self::Failed(m) => Self::Failed(scrub_secrets(&m, secrets)),
            Self::InvalidToken(m) => Self::InvalidToken(scrub_secrets(&m, secrets)),
        }
    }
}

/// Replace every non-empty secret in `message` with `***`.
pub fn scrub_secrets(message: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|secret| !secret.is_empty())
        .fold(message.to_string(), |acc, secret| {
            acc.replace(secret.as_str(), REDACTED)
        })
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `step * (attempt - 1)` before each retry.
    Linear(Duration),
    /// The same delay before each retry.
    Fixed(Duration),
}

/// Bounded retry budget for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// 3 attempts, 1 s before the second and 2 s before the third.
    pub const SMTP: Self = Self {
        max_attempts: 3,
        backoff: Backoff::Linear(Duration::from_secs(1)),
    };

    /// 3 attempts, 1 s before the second and the third.
    pub const SMS: Self = Self {
        max_attempts: 3,
        backoff: Backoff::Fixed(Duration::from_secs(1)),
    };

    /// A single attempt.
    pub const ONCE: Self = Self {
        max_attempts: 1,
        backoff: Backoff::Fixed(Duration::ZERO),
    };

    /// Delay before the 1-based `attempt`. Always zero for the first.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Linear(step) => step * (attempt - 1),
            Backoff::Fixed(delay) => delay,
        }
    }
}

/// How a retry loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Delivered {
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        last_error: SendError,
    },
    /// Cancelled between attempts. `last_error` is set when at least one
    /// attempt had already failed.
    Cancelled {
        attempts: u32,
        last_error: Option<SendError>,
    },
}

/// Run `attempt` until it succeeds or the policy's budget is spent.
///
/// Cancellation is observed before each attempt and during backoff, never
/// mid-attempt. Errors passed in must already be scrubbed; they are logged.
pub async fn run_with_retry<F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> RetryOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), SendError>>,
{
    let mut last_error: Option<SendError> = None;

    for n in 1..=policy.max_attempts {
        let delay = policy.delay_before(n);
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled {
                attempts: n - 1,
                last_error,
            };
        }
        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return RetryOutcome::Cancelled { attempts: n - 1, last_error };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        match attempt(n).await {
            Ok(()) => return RetryOutcome::Delivered { attempts: n },
            Err(e) => {
                tracing::warn!(
                    attempt = n,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Delivery attempt failed"
                );
                last_error = Some(e);
            }
        }
    }

    RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
        last_error: last_error.unwrap_or_else(|| SendError::failed("no attempt was made")),
    }
}

// ---------------------------------------------------------------------------
// Provider loading
// ---------------------------------------------------------------------------

/// Load and decrypt the provider named by a dispatch request and confirm it
/// is an active provider of `kind`.
pub(crate) async fn load_provider(
    providers: &ProviderService,
    provider_id: DbId,
    kind: ChannelKind,
) -> Result<UnsealedProvider, CoreError> {
    let unsealed = providers.get_decrypted(provider_id).await?;
    if unsealed.provider.kind != kind {
        return Err(CoreError::configuration(format!(
            "provider {provider_id} is a {} provider, not {kind}",
            unsealed.provider.kind
        )));
    }
    if !unsealed.provider.is_active {
        return Err(CoreError::configuration(format!(
            "provider {provider_id} is inactive"
        )));
    }
    Ok(unsealed)
}

// ---------------------------------------------------------------------------
// Log finalization
// ---------------------------------------------------------------------------

fn log_row(row: Option<NotificationLog>, id: DbId) -> Result<NotificationLog, CoreError> {
    row.ok_or_else(|| CoreError::Internal(format!("notification log {id} disappeared mid-dispatch")))
}

/// Move a log row to `SENT`.
pub(crate) async fn mark_sent(
    store: &dyn Datastore,
    log_id: DbId,
) -> Result<NotificationLog, CoreError> {
    let row = store.mark_log_sent(log_id, chrono::Utc::now()).await?;
    log_row(row, log_id)
}

/// Move a log row to `FAILED`.
pub(crate) async fn mark_failed(
    store: &dyn Datastore,
    log_id: DbId,
    message: &str,
) -> Result<NotificationLog, CoreError> {
    let row = store.mark_log_failed(log_id, message).await?;
    log_row(row, log_id)
}

/// Record a retry loop's outcome on its log row and turn it into the
/// dispatch result.
///
/// A cancelled loop leaves the row `PENDING` if nothing failed yet and
/// `FAILED` otherwise.
pub(crate) async fn finalize(
    store: &dyn Datastore,
    log_id: DbId,
    outcome: RetryOutcome,
) -> Result<NotificationLog, CoreError> {
    match outcome {
        RetryOutcome::Delivered { attempts } => {
            let log = mark_sent(store, log_id).await?;
            tracing::info!(log_id = %log_id, attempts, channel = %log.channel, "Notification sent");
            Ok(log)
        }
        RetryOutcome::Exhausted {
            attempts,
            last_error,
        } => {
            let message = last_error.to_string();
            mark_failed(store, log_id, &message).await?;
            tracing::error!(log_id = %log_id, attempts, error = %message, "Notification failed");
            Err(CoreError::Transport { attempts, message })
        }
        RetryOutcome::Cancelled {
            attempts,
            last_error: Some(last_error),
        } => {
            mark_failed(store, log_id, &last_error.to_string()).await?;
            Err(CoreError::Cancelled(format!(
                "dispatch cancelled after {attempts} failed attempt(s)"
            )))
        }
        RetryOutcome::Cancelled {
            last_error: None, ..
        } => Err(CoreError::Cancelled(
            "dispatch cancelled before the first attempt".to_string(),
        )),
    }
}
