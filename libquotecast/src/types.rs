//! Core types for Quotecast

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A stored text/author pair eligible for posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quotation {
    pub text: String,
    pub author: String,
}

impl Quotation {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
        }
    }
}

/// Text ready for submission; always within the formatter's length limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedPost {
    pub text: String,
}

/// Successful posts made on `date`.
///
/// A quota whose `date` is not the current day counts as zero; see
/// [`crate::QuotaTracker::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuota {
    pub count: u32,
    pub date: NaiveDate,
}

impl DailyQuota {
    /// A quota with nothing posted yet on `date`
    pub fn fresh(date: NaiveDate) -> Self {
        Self { count: 0, date }
    }
}

impl std::fmt::Display for DailyQuota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.count, self.date.format("%Y-%m-%d"))
    }
}
