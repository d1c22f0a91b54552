//! Posting API abstraction and implementations
//!
//! The publisher only needs one operation from a social platform: create a
//! post and get its id back. Platform clients map their wire-level failures
//! onto [`ApiError`] so the publisher can tell a rate limit (retried) from
//! everything else (not retried).
//!
//! # Examples
//!
//! ```no_run
//! use libquotecast::platforms::{twitter::TwitterClient, PostingApi};
//! use libquotecast::config::ApiConfig;
//! use libquotecast::Credentials;
//!
//! # async fn example() -> libquotecast::error::Result<()> {
//! let credentials = Credentials::from_env()?;
//! let client = TwitterClient::new(&ApiConfig::default(), credentials);
//!
//! match client.create_post("Hello, world!").await {
//!     Ok(id) => println!("Posted: {}", id),
//!     Err(e) => eprintln!("{} refused the post: {}", client.name(), e),
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::ApiError;

pub mod oauth;
pub mod twitter;

// Mock API is available for all builds (not just tests) to support integration tests
pub mod mock;

/// A social platform that can publish text posts
#[async_trait]
pub trait PostingApi: Send + Sync {
    /// Publish `text` and return the platform's id for the new post
    ///
    /// # Errors
    ///
    /// - `ApiError::RateLimited` when the platform throttles the request; carries
    ///   the reset instant if the platform reported one
    /// - `ApiError::Authentication` for rejected credentials
    /// - `ApiError::Http`, `ApiError::Network`, `ApiError::InvalidResponse` otherwise
    async fn create_post(&self, text: &str) -> Result<String, ApiError>;

    /// Lowercase platform identifier used in logs (e.g. "twitter")
    fn name(&self) -> &str;
}
