//! X/Twitter v2 client
//!
//! Posts through `POST /2/tweets` with OAuth 1.0a user-context signing.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::platforms::oauth::{authorization_header, SigningKeys};
use crate::platforms::PostingApi;

/// Header carrying the epoch second at which the rate-limit window resets
pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

const TWEETS_PATH: &str = "/2/tweets";

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

/// Problem document returned with 4xx/5xx responses
#[derive(Deserialize, Default)]
struct ApiProblem {
    title: Option<String>,
    detail: Option<String>,
}

pub struct TwitterClient {
    http_client: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
}

impl TwitterClient {
    /// Create a client for the API at `config.base_url`
    pub fn new(config: &ApiConfig, credentials: Credentials) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("quotecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), TWEETS_PATH),
            credentials,
        }
    }

    fn authorization(&self) -> String {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        let keys = SigningKeys {
            consumer_key: self.credentials.api_key.expose_secret(),
            consumer_secret: self.credentials.api_secret.expose_secret(),
            token: self.credentials.access_token.expose_secret(),
            token_secret: self.credentials.access_token_secret.expose_secret(),
        };

        authorization_header(
            &keys,
            "POST",
            &self.endpoint,
            &[],
            &nonce,
            Utc::now().timestamp(),
        )
    }
}

#[async_trait]
impl PostingApi for TwitterClient {
    async fn create_post(&self, text: &str) -> Result<String, ApiError> {
        tracing::debug!("Posting to Twitter: {} characters", text.chars().count());

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.authorization())
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: CreateTweetResponse = response
                .json()
                .await
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
            tracing::debug!("Posted to Twitter: {}", body.data.id);
            return Ok(body.data.id);
        }

        let reset_at = parse_reset(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, reset_at, &body))
    }

    fn name(&self) -> &str {
        "twitter"
    }
}

/// Read the rate-limit reset instant, if the server sent a usable one
fn parse_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(RATE_LIMIT_RESET_HEADER)?.to_str().ok()?;
    let epoch = value.trim().parse::<i64>().ok()?;
    Utc.timestamp_opt(epoch, 0).single()
}

/// Map a non-success response to an [`ApiError`]
fn map_status(status: StatusCode, reset_at: Option<DateTime<Utc>>, body: &str) -> ApiError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ApiError::RateLimited { reset_at };
    }

    let problem: ApiProblem = serde_json::from_str(body).unwrap_or_default();
    let message = problem
        .detail
        .or(problem.title)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if !is_content_rejection(&message) => {
            ApiError::Authentication(format!(
                "Twitter rejected the credentials ({}): {}",
                status.as_u16(),
                message
            ))
        }
        _ => ApiError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

/// A 403 is also returned for duplicate or disallowed content, which is not a credential problem
fn is_content_rejection(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("duplicate") || lower.contains("not allowed to create a tweet")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;

    /// Serve `responses` to consecutive connections on a local port
    ///
    /// Returns the base URL and a receiver yielding each raw request.
    fn serve(responses: Vec<String>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let request = read_request(&mut stream);
                stream.write_all(response.as_bytes()).unwrap();
                let _ = tx.send(request);
            }
        });

        (base_url, rx)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).to_string()
    }

    fn http_response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
        let extra: String = headers
            .iter()
            .map(|(name, value)| format!("{}: {}\r\n", name, value))
            .collect();
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
            status,
            body.len(),
            extra,
            body
        )
    }

    #[test]
    fn test_parse_reset_header() {
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("1700000000"));

        let reset = parse_reset(&headers).unwrap();
        assert_eq!(reset.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parse_reset_missing_or_garbage() {
        assert!(parse_reset(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("soon"));
        assert!(parse_reset(&headers).is_none());
    }

    #[test]
    fn test_429_maps_to_rate_limited() {
        let reset = Utc.timestamp_opt(1_700_000_000, 0).single();
        let error = map_status(StatusCode::TOO_MANY_REQUESTS, reset, "");
        assert_eq!(error, ApiError::RateLimited { reset_at: reset });
    }

    #[test]
    fn test_401_maps_to_authentication() {
        let body = r#"{"title":"Unauthorized","type":"about:blank","status":401,"detail":"Unauthorized"}"#;
        let error = map_status(StatusCode::UNAUTHORIZED, None, body);
        assert!(matches!(error, ApiError::Authentication(msg) if msg.contains("401")));
    }

    #[test]
    fn test_duplicate_content_is_not_authentication() {
        let body = r#"{"detail":"You are not allowed to create a Tweet with duplicate content.","status":403,"title":"Forbidden"}"#;
        let error = map_status(StatusCode::FORBIDDEN, None, body);
        assert_eq!(
            error,
            ApiError::Http {
                status: 403,
                message: "You are not allowed to create a Tweet with duplicate content."
                    .to_string()
            }
        );
    }

    #[test]
    fn test_non_json_body_uses_status_reason() {
        let error = map_status(StatusCode::SERVICE_UNAVAILABLE, None, "<html>oops</html>");
        assert_eq!(
            error,
            ApiError::Http {
                status: 503,
                message: "Service Unavailable".to_string()
            }
        );
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:8080/".to_string(),
            timeout_secs: 5,
        };
        let client = TwitterClient::new(&config, Credentials::for_testing());
        assert_eq!(client.endpoint, "http://127.0.0.1:8080/2/tweets");
        assert_eq!(client.name(), "twitter");
    }

    #[test]
    fn test_authorization_header_shape() {
        let client = TwitterClient::new(&ApiConfig::default(), Credentials::for_testing());
        let header = client.authorization();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"test-api-key\""));
        assert!(header.contains("oauth_token=\"test-access-token\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(!header.contains("test-api-secret"), "secrets are never sent");
    }

    #[tokio::test]
    async fn test_create_post_against_local_server() {
        let (base_url, requests) = serve(vec![
            http_response(
                "429 Too Many Requests",
                &[(RATE_LIMIT_RESET_HEADER, "1700000000")],
                r#"{"title":"Too Many Requests"}"#,
            ),
            http_response("201 Created", &[], r#"{"data":{"id":"123","text":"hello"}}"#),
            http_response("200 OK", &[], "{}"),
        ]);
        let config = ApiConfig {
            base_url,
            timeout_secs: 5,
        };
        let client = TwitterClient::new(&config, Credentials::for_testing());

        assert_eq!(
            client.create_post("hello").await,
            Err(ApiError::RateLimited {
                reset_at: Utc.timestamp_opt(1_700_000_000, 0).single()
            })
        );
        assert_eq!(client.create_post("hello").await.unwrap(), "123");
        assert!(matches!(
            client.create_post("hello").await,
            Err(ApiError::InvalidResponse(_))
        ));

        let request = requests.recv().unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("POST /2/tweets HTTP/1.1"));
        assert!(lower.contains("authorization: oauth "));
        assert!(lower.contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"text":"hello"}"#));
        assert_eq!(requests.iter().count(), 2);
    }
}
