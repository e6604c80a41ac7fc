//! Confirmation policy, bounded retry and the confirmation waiter.
//!
//! Every suspension point in an orchestrator run goes through
//! [`retry_bounded`]: transient RPC failures and not-yet-confirmed
//! transactions are retried on a fixed budget, never in an open loop.

use std::{
    fmt::Display,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use alloy_core::primitives::TxHash;
use backon::{ConstantBuilder, ExponentialBuilder, Retryable};

use crate::{
    contract::ChainClient,
    error::{LifecycleError, Result},
    network::NetworkProfile,
    tx::{TransactionReceipt, TxStatus},
};

/// Confirmations required on production networks.
pub const PRODUCTION_CONFIRMATIONS: u64 = 3;

/// Confirmations required on test and local networks: inclusion is enough.
pub const NON_PRODUCTION_CONFIRMATIONS: u64 = 1;

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default overall deadline for one confirmation wait.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Shape of the delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Constant,
    Exponential,
}

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub delay: Duration,
    /// Upper bound on a single delay for exponential backoff.
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn constant(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            max_delay: delay,
            backoff: Backoff::Constant,
        }
    }

    pub fn exponential(max_attempts: usize, delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            max_delay,
            backoff: Backoff::Exponential,
        }
    }

    fn retries(&self) -> usize {
        self.max_attempts.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(4, Duration::from_millis(500), Duration::from_secs(8))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the attempt budget is spent.
///
/// The last error is returned when attempts run out.
pub async fn retry_bounded<T, E, F, Fut, P>(
    label: &str,
    policy: &RetryPolicy,
    op: F,
    retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
    E: Display,
{
    let notify = |err: &E, delay: Duration| {
        tracing::debug!(operation = %label, error = %err, ?delay, "Retrying");
    };

    match policy.backoff {
        Backoff::Constant => {
            let backoff = ConstantBuilder::default()
                .with_delay(policy.delay)
                .with_max_times(policy.retries());
            op.retry(backoff).when(retryable).notify(notify).await
        }
        Backoff::Exponential => {
            let backoff = ExponentialBuilder::default()
                .with_min_delay(policy.delay)
                .with_max_delay(policy.max_delay)
                .with_max_times(policy.retries());
            op.retry(backoff).when(retryable).notify(notify).await
        }
    }
}

/// How long to wait for a transaction before reading state that depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Blocks from inclusion to head, inclusive. Never below one.
    pub required_confirmations: u64,
    pub poll_interval: Duration,
    /// Overall deadline for one wait.
    pub timeout: Duration,
}

impl ConfirmationPolicy {
    /// Default policy for a network class.
    pub fn for_profile(profile: &NetworkProfile) -> Self {
        let required_confirmations = if profile.is_production {
            PRODUCTION_CONFIRMATIONS
        } else {
            NON_PRODUCTION_CONFIRMATIONS
        };

        Self {
            required_confirmations,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll budget derived from the deadline and the interval.
    pub fn max_polls(&self) -> usize {
        let interval = self.poll_interval.as_millis().max(1);
        let polls = self.timeout.as_millis().div_ceil(interval);
        usize::try_from(polls).unwrap_or(usize::MAX).saturating_add(1)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::constant(self.max_polls(), self.poll_interval)
    }
}

/// Outcome of one receipt poll that did not produce a confirmed receipt.
enum PollError {
    NotConfirmed { confirmations: u64 },
    Fatal(LifecycleError),
}

impl Display for PollError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollError::NotConfirmed { confirmations } => {
                write!(f, "{confirmations} confirmation(s) so far")
            }
            PollError::Fatal(err) => Display::fmt(err, f),
        }
    }
}

/// Wait until `hash` is included and buried under the required number of blocks.
///
/// A reverted transaction fails immediately with [`LifecycleError::Reverted`].
/// Running out of polls, hitting the deadline, or losing the endpoint for the
/// whole budget yields [`LifecycleError::ConfirmationTimeout`]; the transaction
/// stays outstanding on the network.
pub async fn await_confirmations<C: ChainClient>(
    client: &C,
    hash: TxHash,
    policy: &ConfirmationPolicy,
) -> Result<TransactionReceipt> {
    let required = policy.required_confirmations.max(1);
    let observed = AtomicU64::new(0);

    tracing::info!(
        tx_hash = %hash,
        required_confirmations = required,
        timeout_secs = policy.timeout.as_secs(),
        "Waiting for confirmations..."
    );

    let observed = &observed;
    let poll = move || async move {
        let receipt = client.receipt(hash).await.map_err(PollError::Fatal)?;
        match receipt {
            None => Err(PollError::NotConfirmed { confirmations: 0 }),
            Some(receipt) if receipt.status == TxStatus::Failed => {
                Err(PollError::Fatal(LifecycleError::Reverted {
                    hash: Some(hash),
                    reason: format!(
                        "transaction reverted in block {}",
                        receipt
                            .block_number
                            .map(|n| n.to_string())
                            .unwrap_or_else(|| "unknown".to_string())
                    ),
                }))
            }
            Some(receipt) if receipt.confirmations < required => {
                observed.store(receipt.confirmations, Ordering::Relaxed);
                Err(PollError::NotConfirmed {
                    confirmations: receipt.confirmations,
                })
            }
            Some(receipt) => Ok(receipt),
        }
    };

    let retryable = |err: &PollError| match err {
        PollError::NotConfirmed { .. } => true,
        PollError::Fatal(err) => err.is_retryable(),
    };

    let timeout_error = |confirmations: u64| LifecycleError::ConfirmationTimeout {
        hash,
        confirmations,
        required,
        waited_secs: policy.timeout.as_secs(),
    };

    let waited = tokio::time::timeout(
        policy.timeout,
        retry_bounded("await_confirmations", &policy.retry_policy(), poll, retryable),
    )
    .await;

    match waited {
        Ok(Ok(receipt)) => {
            tracing::info!(
                tx_hash = %hash,
                block_number = ?receipt.block_number,
                confirmations = receipt.confirmations,
                "Transaction confirmed"
            );
            Ok(receipt)
        }
        Ok(Err(PollError::NotConfirmed { confirmations })) => Err(timeout_error(confirmations)),
        Ok(Err(PollError::Fatal(err))) if err.is_retryable() => {
            tracing::warn!(tx_hash = %hash, error = %err, "Endpoint unavailable while waiting for confirmations");
            Err(timeout_error(observed.load(Ordering::Relaxed)))
        }
        Ok(Err(PollError::Fatal(err))) => Err(err),
        Err(_) => Err(timeout_error(observed.load(Ordering::Relaxed))),
    }
}
