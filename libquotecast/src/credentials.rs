//! API credentials from the process environment
//!
//! The four OAuth 1.0a secrets are read once at startup and held as
//! [`SecretString`]s, which are zeroed on drop and redacted from `Debug`
//! output.

use secrecy::SecretString;

use crate::error::{QuotecastError, Result};

pub const API_KEY_VAR: &str = "API_KEY";
pub const API_SECRET_VAR: &str = "API_SECRET";
pub const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";
pub const ACCESS_SECRET_VAR: &str = "ACCESS_SECRET";

/// Every variable that must be set, in reporting order
pub const REQUIRED_VARS: [&str; 4] = [
    API_KEY_VAR,
    API_SECRET_VAR,
    ACCESS_TOKEN_VAR,
    ACCESS_SECRET_VAR,
];

#[derive(Debug)]
pub struct Credentials {
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub access_token: SecretString,
    pub access_token_secret: SecretString,
}

impl Credentials {
    /// Read credentials from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from any name -> value lookup
    ///
    /// Absent and empty values are both missing. All missing names are
    /// reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut take = |name: &str| match lookup(name).filter(|value| !value.trim().is_empty()) {
            Some(value) => Some(SecretString::from(value)),
            None => {
                missing.push(name.to_string());
                None
            }
        };

        let api_key = take(API_KEY_VAR);
        let api_secret = take(API_SECRET_VAR);
        let access_token = take(ACCESS_TOKEN_VAR);
        let access_token_secret = take(ACCESS_SECRET_VAR);

        match (api_key, api_secret, access_token, access_token_secret) {
            (Some(api_key), Some(api_secret), Some(access_token), Some(access_token_secret)) => {
                Ok(Self {
                    api_key,
                    api_secret,
                    access_token,
                    access_token_secret,
                })
            }
            _ => Err(QuotecastError::MissingCredentials(missing)),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_testing() -> Self {
        Self {
            api_key: SecretString::from("test-api-key".to_string()),
            api_secret: SecretString::from("test-api-secret".to_string()),
            access_token: SecretString::from("test-access-token".to_string()),
            access_token_secret: SecretString::from("test-access-secret".to_string()),
        }
    }
}
