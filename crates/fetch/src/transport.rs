// ABOUTME: HTTP exchange for feeds: redirects followed by hand, header capture per hop, size limits.
// ABOUTME: Produces an Exchange holding the final status, captured headers and raw body.

use std::io::Read;

use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::cookie::CookieStore;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Certificate, StatusCode};
use syndic_feed::FeedError;
use tracing::{debug, error, info};
use url::Url;

use crate::headers::{CacheTokens, ResponseHeaders};
use crate::options::FetchOptions;

/// Maximum accepted body size (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Outcome of one HTTP exchange, after redirects.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub status: u16,
    pub headers: ResponseHeaders,
    pub body: Bytes,
    pub final_url: Url,
}

impl Exchange {
    /// Turns an HTTP error status into a transport error.
    pub fn error_for_status(self) -> Result<Exchange, FeedError> {
        if self.status >= 400 {
            return Err(FeedError::transport(format!(
                "HTTP response code said error {}",
                self.status
            )));
        }
        Ok(self)
    }
}

/// A configured HTTP client. Cheap to share between threads.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    max_redirects: usize,
}

impl Transport {
    pub fn new(opts: &FetchOptions, ca_bundle: Option<&[u8]>) -> Result<Transport, FeedError> {
        let mut builder = Client::builder()
            .user_agent(opts.user_agent.as_str())
            .timeout(opts.timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(!opts.verify_tls);

        if let Some(proxy) = &opts.proxy {
            debug!(proxy = %proxy.url(), "using proxy");
            builder = builder.proxy(proxy.to_reqwest()?);
        }

        if let Some(pem) = ca_bundle {
            for cert in parse_ca_bundle(pem)? {
                builder = builder.add_root_certificate(cert);
            }
        }

        let client = builder
            .build()
            .map_err(|e| FeedError::from_transport_error(&e))?;

        Ok(Transport {
            client,
            max_redirects: opts.max_redirects,
        })
    }

    /// Performs a GET of `url`, following redirects.
    ///
    /// `tokens` only decide whether a 200 answer actually satisfied the
    /// `If-Modified-Since` condition; the request headers are taken from
    /// `request_headers` as given.
    pub fn execute(
        &self,
        url: &str,
        request_headers: &HeaderMap,
        tokens: &CacheTokens,
        jar: Option<&dyn CookieStore>,
    ) -> Result<Exchange, FeedError> {
        let origin = Url::parse(url)
            .map_err(|e| FeedError::transport(format!("invalid URL {}: {}", url, e)))?;
        let mut current = origin.clone();
        let mut captured = ResponseHeaders::default();
        let mut redirects = 0;

        loop {
            let mut headers = request_headers.clone();
            if current.host_str() != origin.host_str() {
                headers.remove(AUTHORIZATION);
            }
            if let Some(cookies) = jar.and_then(|j| j.cookies(&current)) {
                headers.insert(COOKIE, cookies);
            }

            debug!(url = %current, hop = redirects, "sending request");
            let response = self
                .client
                .get(current.clone())
                .headers(headers)
                .send()
                .map_err(|e| {
                    error!(url = %current, error = %e, "request failed");
                    FeedError::from_transport_error(&e)
                })?;

            let status = response.status();
            captured.status_line(status.as_u16());
            captured.capture_all(response.headers());

            if let Some(jar) = jar {
                let mut set_cookies = response.headers().get_all(SET_COOKIE).iter();
                jar.set_cookies(&mut set_cookies, &current);
            }

            if status.is_redirection() && status != StatusCode::NOT_MODIFIED {
                if let Some(location) = response.headers().get(LOCATION) {
                    if redirects >= self.max_redirects {
                        return Err(FeedError::transport(format!(
                            "Maximum ({}) redirects followed",
                            self.max_redirects
                        )));
                    }
                    current = next_location(&current, location)?;
                    redirects += 1;
                    debug!(status = status.as_u16(), location = %current, "following redirect");
                    continue;
                }
            }

            let body = if status == StatusCode::NOT_MODIFIED {
                debug!(url = %current, "not modified");
                Bytes::new()
            } else if condition_unmet(status, &captured, tokens) {
                debug!(url = %current, "not newer than If-Modified-Since, dropping body");
                Bytes::new()
            } else if status.is_client_error() || status.is_server_error() {
                debug!(url = %current, status = status.as_u16(), "error status, skipping body");
                Bytes::new()
            } else {
                read_body(response)?
            };

            info!(
                url = %current,
                status = status.as_u16(),
                bytes = body.len(),
                "retrieved data"
            );

            return Ok(Exchange {
                status: status.as_u16(),
                headers: captured,
                body,
                final_url: current,
            });
        }
    }
}

/// A 200 whose Last-Modified is not newer than the time condition we sent.
fn condition_unmet(status: StatusCode, captured: &ResponseHeaders, tokens: &CacheTokens) -> bool {
    status == StatusCode::OK
        && tokens.last_modified != 0
        && captured.last_modified != 0
        && captured.last_modified <= tokens.last_modified
}

fn next_location(current: &Url, location: &HeaderValue) -> Result<Url, FeedError> {
    let location = location
        .to_str()
        .map_err(|_| FeedError::transport("redirect location is not valid ASCII"))?;
    current
        .join(location.trim())
        .map_err(|e| FeedError::transport(format!("invalid redirect location {}: {}", location, e)))
}

fn read_body(response: reqwest::blocking::Response) -> Result<Bytes, FeedError> {
    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(FeedError::transport("content too large"));
        }
    }

    let mut body = Vec::new();
    response
        .take(MAX_CONTENT_LENGTH as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| FeedError::transport(format!("failed to read body: {}", e)))?;
    if body.len() > MAX_CONTENT_LENGTH {
        return Err(FeedError::transport("content too large"));
    }
    Ok(Bytes::from(body))
}

/// Parses a PEM bundle into certificates, rejecting bundles with none.
pub fn parse_ca_bundle(pem: &[u8]) -> Result<Vec<Certificate>, FeedError> {
    let certs = Certificate::from_pem_bundle(pem)
        .map_err(|e| FeedError::from_transport_error(&e))?;
    if certs.is_empty() {
        return Err(FeedError::transport("no certificates found in CA bundle"));
    }
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;

    fn transport() -> Transport {
        Transport::new(&FetchOptions::default(), None).unwrap()
    }

    #[test]
    fn test_fetch_ok_utf8() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/feed");
            then.status(200)
                .header("content-type", "text/xml; charset=utf-8")
                .header("etag", "\"abc\"")
                .body("<rss/>");
        });

        let exchange = transport()
            .execute(&server.url("/feed"), &HeaderMap::new(), &CacheTokens::default(), None)
            .unwrap();
        mock.assert();

        assert_eq!(exchange.status, 200);
        assert_eq!(exchange.headers.etag, "\"abc\"");
        assert_eq!(exchange.headers.charset, "utf-8");
        assert_eq!(&exchange.body[..], b"<rss/>");
    }

    #[test]
    fn test_error_status_is_transport_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(404).body("not found");
        });

        let exchange = transport()
            .execute(&server.url("/gone"), &HeaderMap::new(), &CacheTokens::default(), None)
            .unwrap();
        mock.assert();
        assert_eq!(exchange.status, 404);

        let err = exchange.error_for_status().unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "HTTP response code said error 404");
    }

    #[test]
    fn test_error_status_skips_oversized_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/huge-error");
            then.status(404).body(vec![b'x'; MAX_CONTENT_LENGTH + 1024 * 1024]);
        });

        let exchange = transport()
            .execute(&server.url("/huge-error"), &HeaderMap::new(), &CacheTokens::default(), None)
            .unwrap();
        assert_eq!(exchange.status, 404);
        assert!(exchange.body.is_empty());

        let err = exchange.error_for_status().unwrap_err();
        assert_eq!(err.to_string(), "HTTP response code said error 404");
    }

    #[test]
    fn test_redirect_keeps_only_final_headers() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/moved");
            then.status(302)
                .header("location", "/current")
                .header("etag", "\"hop\"")
                .header("last-modified", "Mon, 01 Jan 2024 00:00:00 GMT")
                .header("content-type", "text/xml; charset=koi8-r");
        });
        server.mock(|when, then| {
            when.method(GET).path("/current");
            then.status(200)
                .header("etag", "\"final\"")
                .header("last-modified", "Sun, 06 Nov 1994 08:49:37 GMT")
                .header("content-type", "application/rss+xml; charset=ISO-8859-1")
                .body("<rss/>");
        });

        let exchange = transport()
            .execute(&server.url("/moved"), &HeaderMap::new(), &CacheTokens::default(), None)
            .unwrap();
        assert_eq!(exchange.headers.etag, "\"final\"");
        assert_eq!(exchange.headers.last_modified, 784111777);
        assert_eq!(exchange.headers.charset, "ISO-8859-1");
    }

    #[test]
    fn test_redirect_resets_headers() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET).path("/old");
            then.status(301)
                .header("location", "/new")
                .header("etag", "\"stale\"")
                .header("content-type", "text/html; charset=koi8-r");
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/new");
            then.status(200).body("<rss/>");
        });

        let exchange = transport()
            .execute(&server.url("/old"), &HeaderMap::new(), &CacheTokens::default(), None)
            .unwrap();
        first.assert();
        second.assert();

        assert_eq!(exchange.headers, ResponseHeaders::default());
        assert_eq!(exchange.final_url.path(), "/new");
    }

    #[test]
    fn test_redirect_limit() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/loop");
            then.status(302).header("location", "/loop");
        });

        let err = transport()
            .execute(&server.url("/loop"), &HeaderMap::new(), &CacheTokens::default(), None)
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("redirects"));
    }

    #[test]
    fn test_not_modified_has_empty_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/feed");
            then.status(304).header("etag", "\"v2\"");
        });

        let exchange = transport()
            .execute(&server.url("/feed"), &HeaderMap::new(), &CacheTokens::new(0, "\"v2\""), None)
            .unwrap();
        assert_eq!(exchange.status, 304);
        assert!(exchange.body.is_empty());
        assert_eq!(exchange.headers.etag, "\"v2\"");
    }

    #[test]
    fn test_condition_unmet_drops_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/feed");
            then.status(200)
                .header("last-modified", "Sun, 06 Nov 1994 08:49:37 GMT")
                .body("<rss version=\"2.0\"/>");
        });

        let exchange = transport()
            .execute(
                &server.url("/feed"),
                &HeaderMap::new(),
                &CacheTokens::new(784111777, ""),
                None,
            )
            .unwrap();
        assert!(exchange.body.is_empty());
        assert_eq!(exchange.headers.last_modified, 784111777);
    }

    #[test]
    fn test_connection_refused() {
        let err = transport()
            .execute("http://127.0.0.1:1/feed", &HeaderMap::new(), &CacheTokens::default(), None)
            .unwrap_err();
        assert!(err.is_transport());
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_invalid_url() {
        let err = transport()
            .execute("not a url", &HeaderMap::new(), &CacheTokens::default(), None)
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().starts_with("invalid URL not a url"));
    }

    #[test]
    fn test_empty_ca_bundle_rejected() {
        let err = parse_ca_bundle(b"not a certificate").unwrap_err();
        assert!(err.is_transport());
    }
}
