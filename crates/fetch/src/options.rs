// ABOUTME: Configuration for fetching: FetchOptions, ProxyConfig and the FetcherBuilder.
// ABOUTME: FetcherBuilder provides a fluent API for constructing Fetcher instances.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use syndic_feed::{DecoderRegistry, FeedError};

use crate::client::Fetcher;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("syndic/", env!("CARGO_PKG_VERSION"));

/// Redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Protocol spoken to the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyKind {
    #[default]
    Http,
    Https,
    Socks5,
    /// SOCKS5 with name resolution done by the proxy.
    Socks5h,
}

impl ProxyKind {
    pub fn scheme(self) -> &'static str {
        match self {
            ProxyKind::Http => "http",
            ProxyKind::Https => "https",
            ProxyKind::Socks5 => "socks5",
            ProxyKind::Socks5h => "socks5h",
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for ProxyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyKind::Http),
            "https" => Ok(ProxyKind::Https),
            "socks5" | "socks" => Ok(ProxyKind::Socks5),
            "socks5h" => Ok(ProxyKind::Socks5h),
            other => Err(format!("unknown proxy type: {}", other)),
        }
    }
}

/// Proxy to route requests through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// `host:port`, or a full URL whose scheme wins over `kind`.
    pub address: String,
    /// `user:password` credentials.
    pub auth: Option<String>,
    pub kind: ProxyKind,
}

impl ProxyConfig {
    pub fn new(address: impl Into<String>) -> Self {
        ProxyConfig {
            address: address.into(),
            auth: None,
            kind: ProxyKind::default(),
        }
    }

    pub fn auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn kind(mut self, kind: ProxyKind) -> Self {
        self.kind = kind;
        self
    }

    /// The proxy URL with the kind's scheme applied when the address has none.
    pub fn url(&self) -> String {
        let address = self.address.trim();
        if address.contains("://") {
            address.to_string()
        } else {
            format!("{}://{}", self.kind.scheme(), address)
        }
    }

    pub(crate) fn to_reqwest(&self) -> Result<reqwest::Proxy, FeedError> {
        let url = self.url();
        let mut proxy = reqwest::Proxy::all(&url)
            .map_err(|e| FeedError::transport(format!("invalid proxy {}: {}", url, e)))?;
        if let Some(auth) = self.auth.as_deref().filter(|a| !a.is_empty()) {
            let (user, password) = auth.split_once(':').unwrap_or((auth, ""));
            proxy = proxy.basic_auth(user, password);
        }
        Ok(proxy)
    }
}

/// Configuration options for a Fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub user_agent: String,
    pub proxy: Option<ProxyConfig>,
    pub verify_tls: bool,
    pub max_redirects: usize,
    /// Sent with every request, before conditional and provider headers.
    pub headers: HashMap<String, String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            verify_tls: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            headers: HashMap::new(),
        }
    }
}

/// Builder for constructing Fetcher instances with custom configuration.
#[derive(Debug, Clone, Default)]
pub struct FetcherBuilder {
    opts: FetchOptions,
    registry: Option<DecoderRegistry>,
    ca_bundle: Option<Arc<Vec<u8>>>,
}

impl FetcherBuilder {
    /// Create a new FetcherBuilder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the whole-exchange timeout. Zero means no timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = if timeout.is_zero() { None } else { Some(timeout) };
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Route requests through a proxy.
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.opts.proxy = Some(proxy);
        self
    }

    /// Enable or disable TLS certificate and host verification.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.opts.verify_tls = verify;
        self
    }

    /// Set how many redirects are followed.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.opts.max_redirects = max;
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Use custom decoders instead of the built-in set.
    pub fn registry(mut self, registry: DecoderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Trust the certificates of a PEM bundle in addition to the system roots.
    pub fn ca_bundle(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_bundle = Some(Arc::new(pem.into()));
        self
    }

    pub(crate) fn shared_ca_bundle(mut self, pem: Option<Arc<Vec<u8>>>) -> Self {
        self.ca_bundle = pem;
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.opts
    }

    /// Build the Fetcher with the configured options.
    pub fn build(self) -> Result<Fetcher, FeedError> {
        Fetcher::new(
            self.opts,
            self.registry.unwrap_or_default(),
            self.ca_bundle.as_deref().map(Vec::as_slice),
        )
    }
}
