// ABOUTME: The Fetcher: retrieves a feed URL with conditional GET and hands the body to the parser.
// ABOUTME: Keeps no state between calls, so one Fetcher can serve many threads.

use std::collections::HashMap;
use std::path::Path;

use reqwest::cookie::CookieStore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use syndic_feed::{normalize, DecoderRegistry, Feed, FeedError, FeedParser};
use tracing::{debug, warn};

use crate::cookies::CookieJar;
use crate::headers::{conditional_headers, CacheTokens};
use crate::options::{FetchOptions, FetcherBuilder};
use crate::provider::HeaderProvider;
use crate::transport::Transport;

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// Decoded feed; empty when the server reported no change.
    pub feed: Feed,
    /// Validators to send on the next poll of the same URL.
    pub cache_tokens: CacheTokens,
    /// Final HTTP status, after redirects.
    pub status: u16,
}

impl FetchOutcome {
    /// True when nothing new was delivered (304, unmet time condition or empty body).
    pub fn not_modified(&self) -> bool {
        self.feed.is_empty()
    }
}

/// Fetches and parses feeds.
#[derive(Debug, Clone)]
pub struct Fetcher {
    opts: FetchOptions,
    transport: Transport,
    parser: FeedParser,
    static_headers: HeaderMap,
}

impl Fetcher {
    /// Create a new FetcherBuilder for configuring the fetcher.
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::new()
    }

    /// Create a new Fetcher with the given options.
    pub fn new(
        opts: FetchOptions,
        registry: DecoderRegistry,
        ca_bundle: Option<&[u8]>,
    ) -> Result<Self, FeedError> {
        let transport = Transport::new(&opts, ca_bundle)?;
        let static_headers = header_map(&opts.headers)?;
        Ok(Self {
            opts,
            transport,
            parser: FeedParser::with_registry(registry),
            static_headers,
        })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.opts
    }

    pub fn parser(&self) -> &FeedParser {
        &self.parser
    }

    /// Fetches `url` and decodes the feed it serves.
    ///
    /// `cache_tokens` come from the previous successful fetch of the same URL
    /// (use [`CacheTokens::default`] the first time). When `cookie_path` is
    /// given the jar there is read before the exchange and rewritten after it.
    ///
    /// A 304, an unmet time condition or an empty body yields an empty feed.
    pub fn fetch(
        &self,
        url: &str,
        cache_tokens: &CacheTokens,
        header_provider: Option<&dyn HeaderProvider>,
        cookie_path: Option<&Path>,
    ) -> Result<FetchOutcome, FeedError> {
        // Request headers: static, then conditional, then caller-provided
        let mut headers = self.static_headers.clone();
        headers.extend(conditional_headers(cache_tokens));
        if let Some(provider) = header_provider {
            provider.add_custom_headers(&mut headers);
        }

        let jar = cookie_path.map(CookieJar::load);
        let result = self.transport.execute(
            url,
            &headers,
            cache_tokens,
            jar.as_ref().map(|j| j as &dyn CookieStore),
        );
        if let Some(jar) = &jar {
            if let Err(e) = jar.save() {
                warn!(path = %jar.path().display(), error = %e, "could not write cookie jar");
            }
        }

        let exchange = result?.error_for_status()?;
        let status = exchange.status;
        let cache_tokens = exchange.headers.cache_tokens();

        // Nothing to parse
        if exchange.body.is_empty() {
            debug!(url = %url, status, "empty body, returning empty feed");
            return Ok(FetchOutcome {
                feed: Feed::default(),
                cache_tokens,
                status,
            });
        }

        // Convert to the canonical encoding, then parse the text as-is
        let text = normalize(&exchange.body, &exchange.headers.charset)?;
        debug!(url = %url, charset = %exchange.headers.charset, "handing over to parser");
        let feed = self.parser.parse_str(&text, exchange.final_url.as_str())?;

        Ok(FetchOutcome {
            feed,
            cache_tokens,
            status,
        })
    }
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, FeedError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FeedError::transport(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FeedError::transport(format!("invalid value for header {}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_headers_are_validated() {
        let err = Fetcher::builder()
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn fetcher_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Fetcher>();
    }

    #[test]
    fn outcome_not_modified() {
        let outcome = FetchOutcome {
            feed: Feed::default(),
            cache_tokens: CacheTokens::default(),
            status: 304,
        };
        assert!(outcome.not_modified());
    }
}
