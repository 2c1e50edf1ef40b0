// ABOUTME: Main library entry point for syndic-fetch, the HTTP side of feed retrieval.
// ABOUTME: Re-exports the public API: Fetcher, FetcherBuilder, FetchOutcome, CacheTokens, init and Runtime.

//! syndic-fetch - conditional, cache-aware retrieval of RSS and Atom feeds.
//!
//! The [`Fetcher`] performs a GET with `If-None-Match`/`If-Modified-Since`
//! built from the caller's [`CacheTokens`], converts the body to UTF-8 and
//! decodes it with `syndic-feed`.
//!
//! # Example
//!
//! ```no_run
//! use syndic_fetch::{init, CacheTokens, FeedError};
//!
//! fn main() -> Result<(), FeedError> {
//!     let runtime = init()?;
//!     let fetcher = runtime.builder().build()?;
//!     let outcome = fetcher.fetch("https://example.com/feed.xml", &CacheTokens::default(), None, None)?;
//!     println!("{} items", outcome.feed.items.len());
//!     // Store outcome.cache_tokens for the next poll.
//!     runtime.shutdown();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod cookies;
pub mod headers;
pub mod lifecycle;
pub mod options;
pub mod provider;
pub mod transport;

pub use crate::client::{FetchOutcome, Fetcher};
pub use crate::cookies::CookieJar;
pub use crate::headers::{charset_from_content_type, conditional_headers, CacheTokens, ResponseHeaders};
pub use crate::lifecycle::{init, Runtime, CA_BUNDLE_ENV};
pub use crate::options::{
    FetchOptions, FetcherBuilder, ProxyConfig, ProxyKind, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT,
};
pub use crate::provider::HeaderProvider;
pub use crate::transport::{Exchange, Transport, MAX_CONTENT_LENGTH};

pub use reqwest::header::HeaderMap;
pub use syndic_feed::{Feed, FeedError, FeedItem, FormatVariant};
