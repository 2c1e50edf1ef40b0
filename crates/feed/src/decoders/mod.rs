// ABOUTME: Decoder trait and the registry that maps each FormatVariant to its decoder.
// ABOUTME: Ships reference decoders for RSS 0.9x/2.0, RSS 1.0 (RDF) and Atom 0.3/1.0.

mod atom;
mod rdf;
mod rss;

pub use atom::AtomDecoder;
pub use rdf::RdfDecoder;
pub use rss::RssDecoder;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DecodeError, FeedError};
use crate::models::{Feed, FormatVariant};
use crate::time_parse::parse_flexible_time;
use crate::xml::Node;

/// Fills a [`Feed`] from the root element of a classified document.
///
/// `root.document()` gives access to the whole tree when a decoder needs more
/// than the subtree. Errors are handed to the caller unchanged.
pub trait Decoder: Send + Sync {
    fn decode(&self, feed: &mut Feed, root: Node<'_>) -> Result<(), FeedError>;
}

impl<F> Decoder for F
where
    F: Fn(&mut Feed, Node<'_>) -> Result<(), FeedError> + Send + Sync,
{
    fn decode(&self, feed: &mut Feed, root: Node<'_>) -> Result<(), FeedError> {
        self(feed, root)
    }
}

/// Decoders keyed by the format they handle.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<FormatVariant, Arc<dyn Decoder>>,
}

impl DecoderRegistry {
    /// A registry with no decoders at all.
    pub fn new() -> Self {
        DecoderRegistry {
            decoders: HashMap::new(),
        }
    }

    /// A registry with the built-in decoder for every supported format.
    pub fn with_builtin() -> Self {
        let rss: Arc<dyn Decoder> = Arc::new(RssDecoder);
        let atom: Arc<dyn Decoder> = Arc::new(AtomDecoder);

        let mut registry = Self::new();
        for variant in [
            FormatVariant::Rss091,
            FormatVariant::Rss092,
            FormatVariant::Rss094,
            FormatVariant::Rss20,
        ] {
            registry.decoders.insert(variant, Arc::clone(&rss));
        }
        registry.register(FormatVariant::Rss10, RdfDecoder);
        for variant in [
            FormatVariant::Atom03,
            FormatVariant::Atom03NoNs,
            FormatVariant::Atom10,
        ] {
            registry.decoders.insert(variant, Arc::clone(&atom));
        }
        registry
    }

    /// Installs `decoder` for `variant`, replacing any previous one.
    pub fn register(&mut self, variant: FormatVariant, decoder: impl Decoder + 'static) -> &mut Self {
        self.decoders.insert(variant, Arc::new(decoder));
        self
    }

    /// The decoder for `variant`.
    pub fn get(&self, variant: FormatVariant) -> Result<&dyn Decoder, FeedError> {
        self.decoders
            .get(&variant)
            .map(|d| d.as_ref())
            .ok_or_else(|| {
                FeedError::decode(DecodeError(format!("no decoder registered for {}", variant)))
            })
    }

    pub fn contains(&self, variant: FormatVariant) -> bool {
        self.decoders.contains_key(&variant)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut variants: Vec<_> = self.decoders.keys().map(|v| v.to_string()).collect();
        variants.sort();
        f.debug_struct("DecoderRegistry")
            .field("variants", &variants)
            .finish()
    }
}

/// Trimmed text of the first child named `name` in `ns`, or empty.
fn text_of(node: Node<'_>, name: &str, ns: Option<&str>) -> String {
    node.child_text(name, ns).unwrap_or_default()
}

/// First non-empty candidate.
fn first_non_empty(candidates: impl IntoIterator<Item = Option<String>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn epoch(date: &str) -> Option<i64> {
    parse_flexible_time(date).map(|dt| dt.timestamp())
}
