//! Concurrency gate and retry wrapper for outbound provider calls.
//!
//! A [`ConcurrencyManager`] bounds how many provider calls are in flight
//! across every agent sharing it, and retries failed calls with exponential
//! backoff. [`GatedProvider`] applies it transparently to any [`Provider`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::{FutureExt, future::BoxFuture};
use tokio::sync::Semaphore;

use crate::config::ConcurrencyConfig;
use crate::llm::{LLMResult, SendRequest, error::LLMError, traits::Provider};

/// Backoff schedule. After the `n`-th failed attempt the manager waits
/// `base_delay * 2^n`, capped at `max_delay`, before trying again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        ConcurrencyConfig::default().retry_policy()
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, failures: u32) -> Duration {
        let factor = 2u32.checked_pow(failures).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConcurrencyStats {
    pub capacity: usize,
    pub active: usize,
    pub peak_active: usize,
    pub total: u64,
    pub failed: u64,
}

impl fmt::Display for ConcurrencyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "active {}/{} (peak {}), total {}, failed {}",
            self.active, self.capacity, self.peak_active, self.total, self.failed
        )
    }
}

/// Process-wide gate shared by every agent (wrap it in an `Arc`).
///
/// Capacity is fixed at construction. Changing it means building a new
/// manager and handing it to the agents; there is no runtime resize.
#[derive(Debug)]
pub struct ConcurrencyManager {
    permits: Semaphore,
    capacity: usize,
    policy: RetryPolicy,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    total: AtomicU64,
    failed: AtomicU64,
}

impl Default for ConcurrencyManager {
    fn default() -> Self {
        Self::from_config(&ConcurrencyConfig::default())
    }
}

impl ConcurrencyManager {
    pub fn new(capacity: usize, policy: RetryPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Semaphore::new(capacity),
            capacity,
            policy,
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
            total: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &ConcurrencyConfig) -> Self {
        Self::new(config.max_concurrent, config.retry_policy())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn stats(&self) -> ConcurrencyStats {
        ConcurrencyStats {
            capacity: self.capacity,
            active: self.active.load(Ordering::SeqCst),
            peak_active: self.peak_active.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }

    /// Zero the totals. `active` reflects live calls and is left alone.
    pub fn reset_stats(&self) {
        self.peak_active.store(self.active.load(Ordering::SeqCst), Ordering::SeqCst);
        self.total.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
    }

    /// Run `op` inside the gate, retrying per the policy. The permit is held
    /// across retries and backoff sleeps. After the final failed attempt the
    /// last error is returned and the failure counter incremented.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> LLMResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LLMResult<T>>,
    {
        // the semaphore is never closed
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LLMError::InvalidResponse("concurrency gate closed".into()))?;
        let _active = ActiveGuard::enter(self);

        let max_attempts = self.policy.max_attempts.max(1);
        let mut failures = 0u32;
        loop {
            let outcome = match self.policy.timeout {
                Some(limit) => match tokio::time::timeout(limit, op()).await {
                    Ok(result) => result,
                    Err(_) => Err(LLMError::Timeout { secs: limit.as_secs() }),
                },
                None => op().await,
            };
            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            failures += 1;
            if failures >= max_attempts || !err.is_retryable() {
                self.failed.fetch_add(1, Ordering::SeqCst);
                tracing::error!(attempts = failures, error = %err, "provider call failed");
                return Err(err);
            }
            let delay = self.policy.delay_for(failures);
            tracing::warn!(
                attempt = failures,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "provider call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

struct ActiveGuard<'a> {
    manager: &'a ConcurrencyManager,
}

impl<'a> ActiveGuard<'a> {
    fn enter(manager: &'a ConcurrencyManager) -> Self {
        manager.total.fetch_add(1, Ordering::SeqCst);
        let now = manager.active.fetch_add(1, Ordering::SeqCst) + 1;
        manager.peak_active.fetch_max(now, Ordering::SeqCst);
        Self { manager }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.manager.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A provider whose `send` goes through a shared [`ConcurrencyManager`].
#[derive(Clone)]
pub struct GatedProvider {
    inner: Arc<dyn Provider>,
    gate: Arc<ConcurrencyManager>,
}

impl GatedProvider {
    pub fn new(inner: Arc<dyn Provider>, gate: Arc<ConcurrencyManager>) -> Self {
        Self { inner, gate }
    }

    pub fn gate(&self) -> &Arc<ConcurrencyManager> {
        &self.gate
    }
}

impl Provider for GatedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn send<'a>(&'a self, request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
        self.gate.execute(move || self.inner.send(request)).boxed()
    }

    fn test_connection(&self) -> BoxFuture<'_, bool> {
        self.inner.test_connection()
    }
}
