// ABOUTME: Response-header capture and the cache tokens used for conditional GET.
// ABOUTME: Header state resets on every status line so only the final response of a redirect chain counts.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH,
    LAST_MODIFIED,
};
use serde::{Deserialize, Serialize};
use syndic_feed::{format_http_date, parse_http_date, DEFAULT_CHARSET};
use tracing::{debug, warn};

/// RFC 3229 instance-manipulation request header.
pub const A_IM: HeaderName = HeaderName::from_static("a-im");

/// Validators remembered between polls of one resource.
///
/// `last_modified` is epoch seconds, 0 when unknown; `etag` is empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTokens {
    pub last_modified: i64,
    pub etag: String,
}

impl CacheTokens {
    pub fn new(last_modified: i64, etag: impl Into<String>) -> Self {
        CacheTokens {
            last_modified,
            etag: etag.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_modified == 0 && self.etag.is_empty()
    }
}

/// Headers accumulated while reading one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub last_modified: i64,
    pub etag: String,
    pub charset: String,
}

impl Default for ResponseHeaders {
    fn default() -> Self {
        ResponseHeaders {
            last_modified: 0,
            etag: String::new(),
            charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

impl ResponseHeaders {
    /// A new status line starts a new response: forget everything seen so far.
    pub fn status_line(&mut self, status: u16) {
        debug!(status, "status line, resetting captured headers");
        *self = ResponseHeaders::default();
    }

    /// Examines one header line. Names match case-insensitively.
    pub fn capture(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case(LAST_MODIFIED.as_str()) {
            match parse_http_date(value) {
                Some(ts) => {
                    debug!(last_modified = ts, "captured last-modified");
                    self.last_modified = ts;
                }
                None => warn!(value, "ignoring unparseable last-modified header"),
            }
        } else if name.eq_ignore_ascii_case(ETAG.as_str()) {
            self.etag = value.trim().to_string();
            debug!(etag = %self.etag, "captured etag");
        } else if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            if let Some(charset) = charset_from_content_type(value) {
                debug!(charset = %charset, "captured charset");
                self.charset = charset;
            }
        }
    }

    /// Examines every header of one response, in order.
    pub fn capture_all(&mut self, headers: &HeaderMap) {
        for (name, value) in headers {
            match value.to_str() {
                Ok(value) => self.capture(name.as_str(), value),
                Err(_) => debug!(header = %name, "skipping non-ascii header value"),
            }
        }
    }

    /// The validators to store for the next poll.
    pub fn cache_tokens(&self) -> CacheTokens {
        CacheTokens::new(self.last_modified, self.etag.clone())
    }
}

/// Extracts the `charset` parameter of a Content-Type value, quotes removed.
pub fn charset_from_content_type(value: &str) -> Option<String> {
    let lower = value.to_ascii_lowercase();
    let start = lower.find("charset=")? + "charset=".len();
    let rest = &value[start..];
    let rest = match rest.find(';') {
        Some(end) => &rest[..end],
        None => rest,
    };
    let charset = rest.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if charset.is_empty() {
        None
    } else {
        Some(charset.to_string())
    }
}

/// Request headers for a conditional GET with `tokens`.
pub fn conditional_headers(tokens: &CacheTokens) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if !tokens.etag.is_empty() {
        match HeaderValue::from_str(&tokens.etag) {
            Ok(value) => {
                headers.insert(IF_NONE_MATCH, value);
            }
            Err(_) => warn!(etag = %tokens.etag, "etag is not a valid header value, not sending it"),
        }
    }

    if tokens.last_modified != 0 {
        if let Some(value) = format_http_date(tokens.last_modified)
            .and_then(|date| HeaderValue::from_str(&date).ok())
        {
            headers.insert(IF_MODIFIED_SINCE, value);
        }
    }

    if !tokens.is_empty() {
        headers.insert(A_IM, HeaderValue::from_static("feed"));
    }

    headers
}
