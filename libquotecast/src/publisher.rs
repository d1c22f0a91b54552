//! Quota-checked publishing with rate-limit backoff
//!
//! One call to [`Publisher::publish`] runs this state machine:
//!
//! ```text
//! CheckQuota ──over limit──▶ QuotaExceeded
//!     │
//!     ▼
//! Submitting ──ok──▶ Success (quota recorded)
//!     │  └──other error──▶ Failed
//!     ▼
//! RateLimited ──▶ Waiting ──▶ CheckQuota
//! ```
//!
//! The quota is re-read on every pass, since a wait can cross midnight or
//! another run may have posted meanwhile. Waiting is bounded by
//! [`RetryPolicy`] and observes the shutdown flag once per second.

use chrono::{DateTime, Local, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{ApiError, PublishError, Result};
use crate::platforms::PostingApi;
use crate::quota::QuotaTracker;
use crate::types::DailyQuota;

/// Longest single sleep between shutdown checks
const WAIT_SLICE: Duration = Duration::from_secs(1);

/// Outcome of one publish call
#[derive(Debug, Clone, PartialEq)]
pub enum PublishResult {
    /// Posted; `quota` is the persisted count including this post
    Success { id: String, quota: DailyQuota },
    /// The daily limit was already reached; nothing was sent
    QuotaExceeded { quota: DailyQuota },
    /// Gave up without posting
    Failed(PublishError),
}

/// Bounds on rate-limit retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Rate-limit responses tolerated before giving up
    pub max_rate_limit_retries: u32,
    /// Longest wait accepted for a single reset
    pub max_wait: Duration,
    /// Wait used when the server gives no reset time
    pub fallback_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 5,
            max_wait: Duration::from_secs(900),
            fallback_wait: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Time to wait for `reset_at` as seen at `now`; zero if already passed
    pub fn wait_for(&self, reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
        match reset_at {
            Some(reset) => (reset - now).to_std().unwrap_or(Duration::ZERO),
            None => self.fallback_wait,
        }
    }
}

pub struct Publisher {
    api: Box<dyn PostingApi>,
    tracker: QuotaTracker,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    shutdown: Arc<AtomicBool>,
}

impl Publisher {
    pub fn new(
        api: Box<dyn PostingApi>,
        tracker: QuotaTracker,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            api,
            tracker,
            clock,
            policy,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use `shutdown` as the cancellation flag for rate-limit waits
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn daily_limit(&self) -> u32 {
        self.tracker.daily_limit()
    }

    /// Publish `text` if today's quota allows it
    ///
    /// # Errors
    ///
    /// Only storage failures (reading or writing the quota file) are errors;
    /// every API outcome is reported through [`PublishResult`].
    pub async fn publish(&self, text: &str) -> Result<PublishResult> {
        let mut rate_limited = 0u32;

        loop {
            let quota = self.tracker.load(self.clock.today())?;
            if !self.tracker.can_post(&quota) {
                debug!(
                    "Daily limit reached: {}/{}",
                    quota.count,
                    self.tracker.daily_limit()
                );
                return Ok(PublishResult::QuotaExceeded { quota });
            }

            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(PublishResult::Failed(PublishError::Cancelled));
            }

            match self.api.create_post(text).await {
                Ok(id) => {
                    let quota = self
                        .tracker
                        .record_post(&quota, self.clock.today())
                        .map_err(|e| {
                            warn!("Posted {} but could not record quota: {}", id, e);
                            e
                        })?;
                    debug!(
                        "Posted to {}: {} ({}/{})",
                        self.api.name(),
                        id,
                        quota.count,
                        self.tracker.daily_limit()
                    );
                    return Ok(PublishResult::Success { id, quota });
                }
                Err(ApiError::RateLimited { reset_at }) => {
                    rate_limited += 1;
                    if rate_limited > self.policy.max_rate_limit_retries {
                        warn!(
                            "Still rate limited by {} after {} retries, giving up",
                            self.api.name(),
                            self.policy.max_rate_limit_retries
                        );
                        return Ok(PublishResult::Failed(
                            PublishError::RateLimitRetriesExhausted(
                                self.policy.max_rate_limit_retries,
                            ),
                        ));
                    }

                    let wait = self.policy.wait_for(reset_at, self.clock.now());
                    if wait > self.policy.max_wait {
                        warn!(
                            "Rate limit reset in {} exceeds maximum wait of {}",
                            humantime::format_duration(wait),
                            humantime::format_duration(self.policy.max_wait)
                        );
                        return Ok(PublishResult::Failed(PublishError::RateLimitWaitTooLong(
                            wait,
                        )));
                    }

                    if wait.is_zero() {
                        info!("Rate limit reset already passed, retrying");
                        continue;
                    }

                    match reset_at {
                        Some(reset) => warn!(
                            "Rate limited by {}: waiting {} until {}",
                            self.api.name(),
                            humantime::format_duration(wait),
                            reset.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                        ),
                        None => warn!(
                            "Rate limited by {} without a reset time: waiting {}",
                            self.api.name(),
                            humantime::format_duration(wait)
                        ),
                    }

                    if !self.wait(wait).await {
                        info!("Shutdown requested during rate-limit wait");
                        return Ok(PublishResult::Failed(PublishError::Cancelled));
                    }
                }
                Err(e) => {
                    debug!("Failed to post to {}: {}", self.api.name(), e);
                    return Ok(PublishResult::Failed(PublishError::Api(e)));
                }
            }
        }
    }

    /// Sleep for `total`, checking for shutdown between slices
    ///
    /// Returns false if shutdown was requested before the wait finished.
    async fn wait(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            sleep((deadline - now).min(WAIT_SLICE)).await;
        }
    }
}
