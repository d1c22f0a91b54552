//! Turning a quotation into post text

use thiserror::Error;

use crate::types::{FormattedPost, Quotation};

/// Maximum post length in characters
pub const MAX_POST_LENGTH: usize = 280;

/// Why a quotation cannot be posted as-is
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    #[error("post is {length} characters, limit is {max}")]
    TooLong { length: usize, max: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct PostFormatter {
    max_length: usize,
}

impl Default for PostFormatter {
    fn default() -> Self {
        Self::new(MAX_POST_LENGTH)
    }
}

impl PostFormatter {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Build `"<text>\n\n- <author>"`, rejecting it if it exceeds the limit.
    ///
    /// Length is counted in Unicode scalar values, not bytes.
    pub fn format(&self, quotation: &Quotation) -> Result<FormattedPost, Rejected> {
        let text = format!("{}\n\n- {}", quotation.text, quotation.author);
        let length = text.chars().count();

        if length > self.max_length {
            return Err(Rejected::TooLong {
                length,
                max: self.max_length,
            });
        }

        Ok(FormattedPost { text })
    }
}
