//! Header inspection helpers shared by the request and response heads.
//!
//! Token lists (`Connection`, `Transfer-Encoding`) are matched
//! case-insensitively and split on commas, so `Connection: Upgrade, close`
//! counts as a `close` token.

use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Version};

/// Returns true if any value of the header `name` carries `token`.
pub fn contains_token(headers: &HeaderMap, name: impl http::header::AsHeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .flat_map(|value| value.as_bytes().split(|b| *b == b','))
        .any(|item| item.trim_ascii().eq_ignore_ascii_case(token.as_bytes()))
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 9112, chunked must be the last encoding if present.
pub fn is_chunked(headers: &HeaderMap) -> bool {
    headers.get_all(TRANSFER_ENCODING).iter().next_back().is_some_and(is_chunked_value)
}

fn is_chunked_value(value: &HeaderValue) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    value.as_bytes().rsplit(|b| *b == b',').next().is_some_and(|bytes| bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED))
}

/// Returns true if a Content-Length header is present, valid or not.
pub fn is_content_length_set(headers: &HeaderMap) -> bool {
    headers.contains_key(CONTENT_LENGTH)
}

/// Reads the declared content length, falling back to `default` when the
/// header is absent or malformed.
///
/// A malformed value is not an error here: the message is treated as if it
/// declared `default`.
pub fn content_length_or(headers: &HeaderMap, default: u64) -> u64 {
    match headers.get(CONTENT_LENGTH) {
        None => default,
        Some(value) => value.to_str().ok().and_then(|str| str.trim().parse::<u64>().ok()).unwrap_or(default),
    }
}

/// HTTP/1.1 connections persist unless told otherwise, HTTP/1.0 ones don't.
#[inline]
pub fn is_keep_alive_default(version: Version) -> bool {
    version == Version::HTTP_11
}

/// Rewrites the `Connection` header so the message announces whether the
/// connection persists after it.
pub fn set_keep_alive(headers: &mut HeaderMap, version: Version, keep_alive: bool) {
    match (is_keep_alive_default(version), keep_alive) {
        (true, true) => {
            headers.remove(CONNECTION);
        }
        (true, false) => {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
        }
        (false, true) => {
            headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        }
        (false, false) => {
            headers.remove(CONNECTION);
        }
    }
}
