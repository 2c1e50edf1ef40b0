// ABOUTME: Canonical, format-agnostic models produced by every decoder.
// ABOUTME: Defines FormatVariant, Feed, FeedItem and Enclosure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire format a document was classified as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatVariant {
    /// No classification has happened (empty fetch result).
    #[default]
    Unknown,
    Rss091,
    Rss092,
    Rss094,
    Rss10,
    Rss20,
    /// Atom 0.3 in the `http://purl.org/atom/ns#` namespace.
    Atom03,
    /// Atom 0.3 identified by `version="0.3"` under a foreign namespace.
    Atom03NoNs,
    Atom10,
}

impl FormatVariant {
    /// All variants a document can be classified as.
    pub const SUPPORTED: [FormatVariant; 8] = [
        FormatVariant::Rss091,
        FormatVariant::Rss092,
        FormatVariant::Rss094,
        FormatVariant::Rss10,
        FormatVariant::Rss20,
        FormatVariant::Atom03,
        FormatVariant::Atom03NoNs,
        FormatVariant::Atom10,
    ];

    pub fn is_rss(self) -> bool {
        matches!(
            self,
            FormatVariant::Rss091
                | FormatVariant::Rss092
                | FormatVariant::Rss094
                | FormatVariant::Rss10
                | FormatVariant::Rss20
        )
    }

    pub fn is_atom(self) -> bool {
        matches!(
            self,
            FormatVariant::Atom03 | FormatVariant::Atom03NoNs | FormatVariant::Atom10
        )
    }
}

impl fmt::Display for FormatVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FormatVariant::Unknown => "unknown",
            FormatVariant::Rss091 => "RSS 0.91",
            FormatVariant::Rss092 => "RSS 0.92",
            FormatVariant::Rss094 => "RSS 0.94",
            FormatVariant::Rss10 => "RSS 1.0",
            FormatVariant::Rss20 => "RSS 2.0",
            FormatVariant::Atom03 => "Atom 0.3",
            FormatVariant::Atom03NoNs => "Atom 0.3 (no namespace)",
            FormatVariant::Atom10 => "Atom 1.0",
        };
        write!(f, "{}", s)
    }
}

/// Represents a media enclosure (audio, video, or image attachment).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: Option<String>,
    pub length: u64,
}

/// Represents a single item/entry within a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    /// MIME-ish type of the title (`text`, `html`, `xhtml`) when the format declares one.
    pub title_type: Option<String>,
    pub link: String,
    pub author: String,
    pub author_email: Option<String>,
    pub description: String,
    /// Full content (`content:encoded` or Atom `content`).
    pub content: String,
    /// Date exactly as written in the document.
    pub pub_date: String,
    /// `pub_date` as epoch seconds, when it could be parsed.
    pub published: Option<i64>,
    pub updated: Option<i64>,
    pub guid: String,
    pub guid_is_permalink: bool,
    pub enclosures: Vec<Enclosure>,
    pub categories: Vec<String>,
    /// `xml:base` in effect for the item, if any.
    pub base: Option<String>,
}

/// Canonical parse result shared by all decoders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub format: FormatVariant,
    /// Declared document encoding, or the canonical encoding when none was declared.
    pub encoding: String,
    pub title: String,
    pub title_type: Option<String>,
    pub link: String,
    pub description: String,
    pub language: Option<String>,
    pub pub_date: String,
    pub managing_editor: Option<String>,
    pub items: Vec<FeedItem>,
}

impl Feed {
    /// An empty feed with the format already decided, ready for a decoder.
    pub fn with_format(format: FormatVariant, encoding: impl Into<String>) -> Self {
        Feed {
            format,
            encoding: encoding.into(),
            ..Default::default()
        }
    }

    /// True when nothing was decoded (e.g. the server reported no change).
    pub fn is_empty(&self) -> bool {
        self.format == FormatVariant::Unknown && self.items.is_empty()
    }
}
