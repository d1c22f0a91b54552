//! Quotecast - post a random quotation to a social platform, once per run
//!
//! This library provides the pieces a single scheduled run needs: a read-only
//! quotation store, a post formatter, a persisted daily quota, and a publisher
//! that honours platform rate limits.

pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod formatter;
pub mod logging;
pub mod orchestrator;
pub mod platforms;
pub mod publisher;
pub mod quota;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use credentials::Credentials;
pub use error::{ApiError, PublishError, QuotecastError, Result};
pub use formatter::{PostFormatter, Rejected};
pub use orchestrator::{run_once, RunOutcome};
pub use publisher::{PublishResult, Publisher, RetryPolicy};
pub use quota::QuotaTracker;
pub use store::QuoteStore;
pub use types::{DailyQuota, FormattedPost, Quotation};
