// ABOUTME: Classifies a document's root element into one of the supported feed formats.
// ABOUTME: Looks only at the root's local name, namespace and version attribute.

use tracing::debug;

use crate::error::FeedError;
use crate::models::FormatVariant;
use crate::namespaces::{ATOM_0_3_URI, ATOM_1_0_URI};
use crate::xml::Node;

/// Decides which format `root` is written in.
///
/// A missing root is a malformed document; every other failure is a
/// format-detection error.
pub fn classify(root: Option<Node<'_>>) -> Result<FormatVariant, FeedError> {
    let root = root.ok_or_else(|| FeedError::malformed("XML root node is NULL"))?;

    let variant = match root.name() {
        "rss" => classify_rss(root)?,
        "RDF" => FormatVariant::Rss10,
        "feed" => classify_atom(root)?,
        other => {
            return Err(FeedError::format_detection(format!(
                "no supported feed format found (root element <{}>)",
                other
            )))
        }
    };

    debug!(root = root.name(), format = %variant, "classified document");
    Ok(variant)
}

fn classify_rss(root: Node<'_>) -> Result<FormatVariant, FeedError> {
    let version = root
        .attribute("version")
        .ok_or_else(|| FeedError::format_detection("no RSS version"))?;

    match version {
        "0.91" => Ok(FormatVariant::Rss091),
        "0.92" => Ok(FormatVariant::Rss092),
        "0.94" => Ok(FormatVariant::Rss094),
        "2.0" | "2" => Ok(FormatVariant::Rss20),
        // Legacy documents label plain RSS as 1.0; real RSS 1.0 is RDF-rooted.
        "1.0" => Ok(FormatVariant::Rss091),
        _ => Err(FeedError::format_detection("invalid RSS version")),
    }
}

fn classify_atom(root: Node<'_>) -> Result<FormatVariant, FeedError> {
    let namespace = root
        .namespace()
        .ok_or_else(|| FeedError::format_detection("no Atom version"))?;

    match namespace {
        ATOM_0_3_URI => Ok(FormatVariant::Atom03),
        ATOM_1_0_URI => Ok(FormatVariant::Atom10),
        _ => match root.attribute("version") {
            Some("0.3") => Ok(FormatVariant::Atom03NoNs),
            _ => Err(FeedError::format_detection("invalid Atom version")),
        },
    }
}
