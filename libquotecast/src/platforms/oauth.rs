//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Implements the signature steps of RFC 5849 §3.4 for requests whose body is
//! not form-encoded, so only the `oauth_*` parameters and any query
//! parameters are signed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Keys and tokens needed to sign a request
pub struct SigningKeys<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
}

/// Percent-encode per RFC 3986: only unreserved characters pass through.
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                out.push('%');
                out.push(HEX_UPPER[(byte >> 4) as usize] as char);
                out.push(HEX_UPPER[(byte & 0x0F) as usize] as char);
            }
        }
    }
    out
}

/// Build the signature base string: `METHOD&url&sorted-params`, each part encoded
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    )
}

/// HMAC-SHA1 over the base string, base64-encoded
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Build the `Authorization: OAuth ...` header value
///
/// `extra_params` are request parameters that take part in the signature
/// (query string or form body); they are not repeated in the header.
pub fn authorization_header(
    keys: &SigningKeys<'_>,
    method: &str,
    url: &str,
    extra_params: &[(String, String)],
    nonce: &str,
    timestamp: i64,
) -> String {
    let oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), keys.consumer_key.to_string()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_token".to_string(), keys.token.to_string()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let mut all_params = oauth_params.clone();
    all_params.extend_from_slice(extra_params);

    let base = signature_base_string(method, url, &all_params);
    let signature = sign(&base, keys.consumer_secret, keys.token_secret);

    let mut header_params = oauth_params;
    header_params.push(("oauth_signature".to_string(), signature));
    header_params.sort();

    let fields = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {}", fields)
}
