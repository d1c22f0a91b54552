//! Mock posting API for testing
//!
//! Replays a scripted list of responses, then succeeds. Clones share the
//! script and the call log, so a test can keep one handle while the
//! publisher owns another.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::ApiError;
use crate::platforms::PostingApi;

#[derive(Debug, Clone)]
pub struct MockApi {
    name: String,
    /// Responses returned in order; empty means success
    script: Arc<Mutex<VecDeque<Result<String, ApiError>>>>,
    /// Number of times create_post has been called
    call_count: Arc<Mutex<usize>>,
    /// Text of every call, successful or not
    posted_content: Arc<Mutex<Vec<String>>>,
}

impl MockApi {
    /// Create a mock that replays `script` before falling back to success
    pub fn new(script: Vec<Result<String, ApiError>>) -> Self {
        Self {
            name: "mock".to_string(),
            script: Arc::new(Mutex::new(script.into())),
            call_count: Arc::new(Mutex::new(0)),
            posted_content: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds
    pub fn success() -> Self {
        Self::new(Vec::new())
    }

    /// Create a mock whose first call fails with `error`
    pub fn failing(error: ApiError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Get the number of times create_post was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Get all content that was submitted
    pub fn posted_content(&self) -> Vec<String> {
        self.posted_content.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostingApi for MockApi {
    async fn create_post(&self, text: &str) -> Result<String, ApiError> {
        let call = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.posted_content.lock().unwrap().push(text.to_string());

        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("mock-post-{}", call)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
