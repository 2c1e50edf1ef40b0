// ABOUTME: Buffer, text and file entry points: tree building, classification and dispatch.
// ABOUTME: The document tree lives only for the duration of one parse call.

use std::path::Path;

use tracing::{debug, info};

use crate::decoders::DecoderRegistry;
use crate::detect::classify;
use crate::encoding::{sniff_document, CANONICAL_ENCODING};
use crate::error::FeedError;
use crate::models::Feed;
use crate::xml::Document;

/// Turns XML documents into [`Feed`]s using a set of decoders.
///
/// Holds no per-document state, so one parser can serve many threads.
#[derive(Debug, Clone, Default)]
pub struct FeedParser {
    registry: DecoderRegistry,
}

impl FeedParser {
    /// A parser with the built-in decoders.
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser dispatching to `registry`.
    pub fn with_registry(registry: DecoderRegistry) -> Self {
        FeedParser { registry }
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DecoderRegistry {
        &mut self.registry
    }

    /// Parses raw document bytes of unknown encoding.
    ///
    /// # Arguments
    /// * `data` - Raw XML bytes
    /// * `base_url` - Logical identifier of the document, used for relative `xml:base`
    ///
    /// # Returns
    /// * `Ok(Feed)` - Decoded feed
    /// * `Err(FeedError)` - No root element, unsupported format or decoder failure
    pub fn parse_buffer(&self, data: &[u8], base_url: &str) -> Result<Feed, FeedError> {
        let sniffed = sniff_document(data);
        let doc = Document::parse(&sniffed.text, base_url);
        if doc.root().is_none() {
            debug!(url = %base_url, bytes = data.len(), "buffer produced no root element");
            return Err(FeedError::malformed("could not parse buffer"));
        }
        self.decode_document(&doc)
    }

    /// Parses text that is already in the canonical encoding.
    ///
    /// Used for bodies the transport layer has converted; the text is not
    /// decoded a second time.
    pub fn parse_str(&self, text: &str, base_url: &str) -> Result<Feed, FeedError> {
        let doc = Document::parse(text, base_url);
        if doc.root().is_none() {
            debug!(url = %base_url, "text produced no root element");
            return Err(FeedError::malformed("could not parse buffer"));
        }
        self.decode_document(&doc)
    }

    /// Reads and parses a document from disk.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Feed, FeedError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            FeedError::malformed(format!("could not parse file {}: {}", path.display(), e))
        })?;

        let sniffed = sniff_document(&data);
        let base_url = path.display().to_string();
        let doc = Document::parse(&sniffed.text, &base_url);
        if doc.root().is_none() {
            debug!(path = %path.display(), "file produced no root element");
            return Err(FeedError::malformed("could not parse file"));
        }
        self.decode_document(&doc)
    }

    /// Classifies an already built document and runs its decoder.
    ///
    /// The feed's encoding is the document's declared one, falling back to
    /// the canonical encoding.
    pub fn parse_document(&self, doc: &Document) -> Result<Feed, FeedError> {
        self.decode_document(doc)
    }

    fn decode_document(&self, doc: &Document) -> Result<Feed, FeedError> {
        let root = doc.root();
        let variant = classify(root)?;
        let root = root.ok_or_else(|| FeedError::malformed("XML root node is NULL"))?;

        let encoding = doc.encoding().unwrap_or(CANONICAL_ENCODING);
        let mut feed = Feed::with_format(variant, encoding);

        self.registry.get(variant)?.decode(&mut feed, root)?;

        info!(
            url = %doc.url(),
            format = %variant,
            encoding = %feed.encoding,
            items = feed.items.len(),
            "decoded feed"
        );
        Ok(feed)
    }
}

/// Parses feed bytes with the built-in decoders.
///
/// # Arguments
/// * `data` - Raw feed bytes (RSS 0.9x/1.0/2.0 or Atom 0.3/1.0)
/// * `feed_url` - The URL or name the bytes came from
///
/// # Returns
/// * `Ok(Feed)` - Successfully parsed feed
/// * `Err(FeedError)` - Malformed document, unsupported format or decoder failure
pub fn parse_feed_bytes(data: &[u8], feed_url: &str) -> Result<Feed, FeedError> {
    FeedParser::new().parse_buffer(data, feed_url)
}
