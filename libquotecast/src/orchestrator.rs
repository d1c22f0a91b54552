//! A single run: pick a quotation, format it, publish it

use rand::Rng;
use tracing::{info, warn};

use crate::error::{PublishError, Result};
use crate::formatter::{PostFormatter, Rejected};
use crate::publisher::{PublishResult, Publisher};
use crate::store::QuoteStore;
use crate::types::DailyQuota;

/// Every handled way a run can end. None of these is a process failure.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Published {
        id: String,
        quota: DailyQuota,
        limit: u32,
    },
    EmptyStore,
    TooLong {
        length: usize,
        max: usize,
    },
    QuotaExceeded {
        quota: DailyQuota,
        limit: u32,
    },
    PublishFailed(PublishError),
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Published { id, quota, limit } => {
                write!(f, "Published post {} ({}/{})", id, quota.count, limit)
            }
            RunOutcome::EmptyStore => write!(f, "No quotation found, nothing to post"),
            RunOutcome::TooLong { length, max } => write!(
                f,
                "Quotation too long ({} > {} characters), skipped",
                length, max
            ),
            RunOutcome::QuotaExceeded { quota, limit } => {
                write!(f, "Daily limit reached: {}/{}", quota.count, limit)
            }
            RunOutcome::PublishFailed(e) => write!(f, "Could not publish now: {}", e),
        }
    }
}

/// Run fetch → format → quota check → publish once
///
/// # Errors
///
/// Only storage failures propagate; every other ending is a [`RunOutcome`].
pub async fn run_once<R: Rng>(
    store: &QuoteStore,
    formatter: &PostFormatter,
    publisher: &Publisher,
    rng: &mut R,
) -> Result<RunOutcome> {
    let quotation = match store.pick_random(rng).await? {
        Some(q) => q,
        None => {
            warn!("No quotation found in store");
            return Ok(RunOutcome::EmptyStore);
        }
    };

    let post = match formatter.format(&quotation) {
        Ok(post) => post,
        Err(Rejected::TooLong { length, max }) => {
            warn!(
                "Quotation by {} is too long ({} > {} characters), skipped",
                quotation.author, length, max
            );
            return Ok(RunOutcome::TooLong { length, max });
        }
    };

    let limit = publisher.daily_limit();
    let outcome = match publisher.publish(&post.text).await? {
        PublishResult::Success { id, quota } => {
            info!("Published post {} ({}/{})", id, quota.count, limit);
            RunOutcome::Published { id, quota, limit }
        }
        PublishResult::QuotaExceeded { quota } => {
            warn!("Daily limit reached: {}/{}", quota.count, limit);
            RunOutcome::QuotaExceeded { quota, limit }
        }
        PublishResult::Failed(e) => {
            warn!("Error while publishing: {}", e);
            RunOutcome::PublishFailed(e)
        }
    };

    Ok(outcome)
}
