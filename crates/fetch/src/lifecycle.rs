// ABOUTME: Process-wide setup for fetching: reads the CA bundle override once.
// ABOUTME: init() returns a Runtime that hands the shared settings to every FetcherBuilder.

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use syndic_feed::FeedError;
use tracing::{debug, info};

use crate::options::FetcherBuilder;
use crate::transport::parse_ca_bundle;

/// Environment variable naming a PEM file of extra trusted roots.
pub const CA_BUNDLE_ENV: &str = "CURL_CA_BUNDLE";

/// Shared settings read at startup.
///
/// Create it once with [`init`] before fetching, and end it with
/// [`Runtime::shutdown`] after the last fetch has returned.
#[derive(Debug, Clone, Default)]
pub struct Runtime {
    ca_bundle: Option<Arc<Vec<u8>>>,
}

/// Reads process-wide configuration from the environment.
///
/// Fails when `CURL_CA_BUNDLE` names a file that cannot be read or holds no
/// certificates.
pub fn init() -> Result<Runtime, FeedError> {
    match env::var_os(CA_BUNDLE_ENV).filter(|v| !v.is_empty()) {
        Some(path) => Runtime::with_ca_bundle(Path::new(&path)),
        None => {
            debug!("no CA bundle override");
            Ok(Runtime::default())
        }
    }
}

impl Runtime {
    /// A runtime trusting the certificates in the PEM file at `path`.
    pub fn with_ca_bundle(path: impl AsRef<Path>) -> Result<Runtime, FeedError> {
        let path = path.as_ref();
        let pem = fs::read(path).map_err(|e| {
            FeedError::transport(format!("could not read CA bundle {}: {}", path.display(), e))
        })?;
        let count = parse_ca_bundle(&pem)?.len();
        info!(path = %path.display(), certificates = count, "using CA bundle");
        Ok(Runtime {
            ca_bundle: Some(Arc::new(pem)),
        })
    }

    pub fn has_ca_bundle(&self) -> bool {
        self.ca_bundle.is_some()
    }

    /// A FetcherBuilder carrying this runtime's settings.
    pub fn builder(&self) -> FetcherBuilder {
        FetcherBuilder::new().shared_ca_bundle(self.ca_bundle.clone())
    }

    /// Ends the lifecycle. Fetchers built from this runtime keep working.
    pub fn shutdown(self) {
        debug!(ca_bundle = self.has_ca_bundle(), "runtime shut down");
    }
}
